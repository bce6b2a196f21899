//! Error type for configuration loading, execution and workflows.

use mysql_dump::{ConfigError, Environment};
use std::path::PathBuf;

use crate::workflow::Step;

/// Error type for db-sync operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid dump configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Config file missing or malformed
    #[error("Failed to load config file {path}: {reason}")]
    ConfigFile { path: PathBuf, reason: String },

    /// A command exited unsuccessfully or could not be started
    #[error("Command failed on {environment} ({}): {stderr}", exit_status(.code))]
    Execution {
        environment: Environment,
        code: Option<i32>,
        stderr: String,
    },

    /// Copying an artifact between hosts failed
    #[error("Failed to copy {from} to {to}: {reason}")]
    Transfer {
        from: String,
        to: String,
        reason: String,
    },

    /// A working directory could not be created
    #[error("Failed to create directory {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Resolving the dump artifact failed
    #[error(transparent)]
    Artifact(#[from] anyhow::Error),

    /// A workflow step failed; nothing after it ran
    #[error("Step '{step}' failed")]
    StepFailed {
        step: Step,
        #[source]
        source: Box<Error>,
    },
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code".to_string(),
    }
}

impl Error {
    /// The step that failed, if this error came out of a workflow.
    pub fn step(&self) -> Option<Step> {
        match self {
            Error::StepFailed { step, .. } => Some(*step),
            _ => None,
        }
    }
}
