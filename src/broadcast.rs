use crate::{config::AM_BIN, error::Result, parts_config::DozeConfig, shell::CommandRunner};

pub fn send(runner: &dyn CommandRunner, action: &str, extra: Option<(&str, bool)>) -> Result<()> {
    let mut args = vec!["broadcast", "--user", "current", "-a", action];
    if let Some((name, value)) = extra {
        args.extend(["--ez", name, if value { "true" } else { "false" }]);
    }
    runner.run(AM_BIN, &args)?;
    Ok(())
}

/// Ask SystemUI for an ambient display pulse.
pub fn launch_doze_pulse(runner: &dyn CommandRunner, doze: &DozeConfig) -> Result<()> {
    log::debug!("DOZE: pulse");
    send(runner, &doze.pulse_action, None)
}

pub fn broadcast_cust_intent(
    runner: &dyn CommandRunner,
    doze: &DozeConfig,
    value: bool,
) -> Result<()> {
    send(runner, &doze.cust_action, Some((&doze.cust_extra, value)))
}
