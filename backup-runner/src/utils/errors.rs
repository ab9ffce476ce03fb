//! Error types for the backup pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Terminal failure of a single job. Never aborts the rest of the run.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("no backup found with name '{0}'")]
    Lookup(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecError),

    #[error("Placement error: {0}")]
    Placement(#[from] PlacementError),
}

/// Failure to run an external tool to a successful (or benign) end.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to spawn shell for `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command not found: `{command}`\nOutput: {output}")]
    NotFound { command: String, output: String },

    #[error("command not executable: `{command}`\nOutput: {output}")]
    NotExecutable { command: String, output: String },

    #[error("`{command}` was terminated by a signal\nOutput: {output}")]
    Killed { command: String, output: String },

    #[error("{tool} command failed with exit code {exit_code}\nCommand: {command}\nOutput: {output}")]
    Failed {
        tool: &'static str,
        command: String,
        exit_code: i32,
        output: String,
    },

    #[error("failed to prepare {what}: {source}")]
    Prepare {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// The finished archive could not be made durable in its destination.
#[derive(Error, Debug)]
pub enum PlacementError {
    #[error("failed to move backup to {}: {source}", .dest.display())]
    Rename {
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to copy backup to {}: {source}", .dest.display())]
    Copy {
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("placement task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, JobError>;
