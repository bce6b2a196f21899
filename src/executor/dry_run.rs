//! Executor that records what would run.

use async_trait::async_trait;
use mysql_dump::Environment;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{Direction, Executor};
use crate::Error;

/// One action a workflow asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    EnsureDirectory {
        environment: Environment,
        path: PathBuf,
    },
    Execute {
        environment: Environment,
        command: String,
    },
    Copy {
        from: PathBuf,
        to: PathBuf,
        direction: Direction,
    },
}

impl PlannedAction {
    /// The command, for [`PlannedAction::Execute`].
    pub fn command(&self) -> Option<&str> {
        match self {
            PlannedAction::Execute { command, .. } => Some(command),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlannedAction::EnsureDirectory { environment, path } => {
                write!(f, "[{environment}] mkdir -p {}", path.display())
            }
            PlannedAction::Execute {
                environment,
                command,
            } => write!(f, "[{environment}] {command}"),
            PlannedAction::Copy {
                from,
                to,
                direction,
            } => write!(
                f,
                "[copy {direction}] {} -> {}",
                from.display(),
                to.display()
            ),
        }
    }
}

/// Records every action and succeeds without running anything.
///
/// `execute` returns an empty stdout.
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    actions: Mutex<Vec<PlannedAction>>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Actions recorded so far, in order.
    pub fn actions(&self) -> Vec<PlannedAction> {
        self.lock().clone()
    }

    /// Recorded commands for `environment`, in order.
    pub fn commands(&self, environment: Environment) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|action| match action {
                PlannedAction::Execute {
                    environment: env,
                    command,
                } if *env == environment => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<PlannedAction>> {
        // A poisoned log is still a valid log
        self.actions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, action: PlannedAction) {
        self.lock().push(action);
    }
}

#[async_trait]
impl Executor for DryRunExecutor {
    async fn execute(&self, environment: Environment, command: &str) -> Result<String, Error> {
        self.record(PlannedAction::Execute {
            environment,
            command: command.to_string(),
        });
        Ok(String::new())
    }

    async fn copy(&self, from: &Path, to: &Path, direction: Direction) -> Result<(), Error> {
        self.record(PlannedAction::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            direction,
        });
        Ok(())
    }

    async fn ensure_directory(&self, environment: Environment, path: &Path) -> Result<(), Error> {
        self.record(PlannedAction::EnsureDirectory {
            environment,
            path: path.to_path_buf(),
        });
        Ok(())
    }
}
