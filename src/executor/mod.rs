//! Running commands and moving files on either host.

use async_trait::async_trait;
use mysql_dump::Environment;
use std::path::Path;

use crate::Error;

mod dry_run;
mod shell;

pub use dry_run::{DryRunExecutor, PlannedAction};
pub use shell::ShellExecutor;

/// Direction of an artifact copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Pull: the remote host produces, the local machine consumes.
    RemoteToLocal,
    /// Push: the local machine produces, the remote host consumes.
    LocalToRemote,
}

impl Direction {
    /// Environment the artifact is dumped in.
    pub fn producer(self) -> Environment {
        match self {
            Direction::RemoteToLocal => Environment::Remote,
            Direction::LocalToRemote => Environment::Local,
        }
    }

    /// Environment the artifact is loaded into.
    pub fn consumer(self) -> Environment {
        self.producer().other()
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.producer(), self.consumer())
    }
}

/// Capabilities the workflows need from the outside world.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run `command` in `environment` and return its stdout.
    ///
    /// A non-zero exit is an [`Error::Execution`].
    async fn execute(&self, environment: Environment, command: &str) -> Result<String, Error>;

    /// Copy `from` on the producing side of `direction` to `to` on the other.
    ///
    /// Fails with [`Error::Transfer`].
    async fn copy(&self, from: &Path, to: &Path, direction: Direction) -> Result<(), Error>;

    /// Create `path` and its parents in `environment` if missing.
    ///
    /// Fails with [`Error::Io`].
    async fn ensure_directory(&self, environment: Environment, path: &Path) -> Result<(), Error>;
}
