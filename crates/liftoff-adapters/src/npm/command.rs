//! Running the npm executable

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use liftoff_core::error::{RegistryError, Result};

/// Captured result of one npm invocation
#[derive(Debug, Clone)]
pub(crate) struct CommandOutput {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CommandOutput {
    /// npm error code (`E401`, `ENEEDAUTH`, ...) reported on stderr
    pub fn error_code(&self) -> Option<&str> {
        error_code(&self.stderr)
    }

    /// Short failure description for error messages
    pub fn failure_reason(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            "exited unsuccessfully".to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Run `program args...` in `cwd`, capturing output
pub(crate) async fn run(program: &Path, args: &[String], cwd: Option<&Path>) -> Result<CommandOutput> {
    let command = format!("npm {}", args.join(" "));
    debug!(command = %command, "running npm");

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = cmd.output().await.map_err(|e| RegistryError::CommandFailed {
        command: command.clone(),
        reason: e.to_string(),
    })?;

    Ok(CommandOutput {
        command,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        success: output.status.success(),
    })
}

/// Extract the npm error code from stderr (`npm ERR! code E401` / `npm error code E401`)
pub(crate) fn error_code(stderr: &str) -> Option<&str> {
    stderr.lines().find_map(|line| {
        let line = line.trim();
        line.strip_prefix("npm ERR! code ")
            .or_else(|| line.strip_prefix("npm error code "))
            .map(str::trim)
    })
}
