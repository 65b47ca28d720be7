use std::process::Command;

use crate::error::{PartsError, Result};

/// Seam for `am` / `settings` invocations.
pub trait CommandRunner {
    /// Run `program args...`; returns trimmed stdout on success.
    fn run(&self, program: &str, args: &[&str]) -> Result<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        let cmdline = || format!("{} {}", program, args.join(" "));
        log::debug!("SH: {}", cmdline());

        let out = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| PartsError::Command {
                cmd: cmdline(),
                detail: e.to_string(),
            })?;

        if !out.status.success() {
            return Err(PartsError::Command {
                cmd: cmdline(),
                detail: format!(
                    "{} ({})",
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            });
        }
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }
}
