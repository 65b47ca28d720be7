use crate::{config::AM_BIN, error::Result, shell::CommandRunner};

pub fn start_service(runner: &dyn CommandRunner, component: &str) -> Result<()> {
    log::debug!("DOZE: starting {}", component);
    runner.run(AM_BIN, &["start-service", "--user", "current", "-n", component])?;
    Ok(())
}

pub fn stop_service(runner: &dyn CommandRunner, component: &str) -> Result<()> {
    log::debug!("DOZE: stopping {}", component);
    runner.run(AM_BIN, &["stop-service", "--user", "current", "-n", component])?;
    Ok(())
}

/// Start or stop `component` so that it runs iff `wanted`.
pub fn set_running(runner: &dyn CommandRunner, component: &str, wanted: bool) -> Result<()> {
    if wanted {
        start_service(runner, component)
    } else {
        stop_service(runner, component)
    }
}
