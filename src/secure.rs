use crate::{
    config::{DOZE_ENABLED, SETTINGS_BIN},
    error::Result,
    shell::CommandRunner,
};

/// `Settings.Secure` integer lookup; `None` when unset.
pub fn get_int(runner: &dyn CommandRunner, name: &str) -> Result<Option<i64>> {
    let out = runner.run(SETTINGS_BIN, &["get", "secure", name])?;
    Ok(out.trim().parse::<i64>().ok())
}

pub fn put_int(runner: &dyn CommandRunner, name: &str, value: i64) -> Result<()> {
    let v = value.to_string();
    runner.run(SETTINGS_BIN, &["put", "secure", name, &v])?;
    Ok(())
}

/// Doze counts as enabled when the setting is missing.
pub fn is_doze_enabled(runner: &dyn CommandRunner) -> bool {
    match get_int(runner, DOZE_ENABLED) {
        Ok(v) => v.unwrap_or(1) != 0,
        Err(e) => {
            log::warn!("DOZE: cannot read {}: {}", DOZE_ENABLED, e);
            true
        }
    }
}

pub fn enable_doze(runner: &dyn CommandRunner, enable: bool) -> Result<()> {
    put_int(runner, DOZE_ENABLED, if enable { 1 } else { 0 })
}
