//! External tool execution.
//!
//! Runs a rendered [`CommandLine`] through `sh -c` and captures its output.
//! The call blocks the pipeline until the process exits; there is no timeout.
//! Interpreting a non-zero exit is left to [`classify`].

pub mod classify;

use crate::command::CommandLine;
use crate::utils::ExecError;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Shell exit status for "command not found"
const EXIT_NOT_FOUND: i32 = 127;
/// Shell exit status for "found but not executable"
const EXIT_NOT_EXECUTABLE: i32 = 126;

/// Output of a process that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,

    /// stdout followed by stderr
    pub output: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run one command to completion.
///
/// Returns `Ok` for any ordinary exit status, including non-zero ones.
/// Spawn failures, missing tools and signal deaths are `Err`.
pub async fn run(cmd: &CommandLine) -> Result<ExecOutput, ExecError> {
    let rendered = cmd.render();
    debug!("Executing command: {}", rendered);

    let result = Command::new("sh")
        .arg("-c")
        .arg(&rendered)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| ExecError::Spawn {
            command: rendered.clone(),
            source,
        })?;

    let mut output = String::from_utf8_lossy(&result.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&result.stderr);
    if !stderr.is_empty() {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&stderr);
    }

    match result.status.code() {
        Some(EXIT_NOT_FOUND) => Err(ExecError::NotFound {
            command: rendered,
            output,
        }),
        Some(EXIT_NOT_EXECUTABLE) => Err(ExecError::NotExecutable {
            command: rendered,
            output,
        }),
        Some(exit_code) => Ok(ExecOutput { exit_code, output }),
        None => Err(ExecError::Killed {
            command: rendered,
            output,
        }),
    }
}
