//! Where artifacts live on each host.
//!
//! Paths are derived from the producing environment only, so the local and
//! remote copies of one artifact share a relative path.

use mysql_dump::Environment;
use std::path::PathBuf;

/// Directory layout of dump artifacts on both hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    dump_dir: PathBuf,
    workspace: PathBuf,
    remote_root: PathBuf,
}

impl ArtifactLayout {
    /// `dump_dir` is relative to both `workspace` (local) and `remote_root`.
    pub fn new(
        dump_dir: impl Into<PathBuf>,
        workspace: impl Into<PathBuf>,
        remote_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dump_dir: dump_dir.into(),
            workspace: workspace.into(),
            remote_root: remote_root.into(),
        }
    }

    /// `<dump_dir>/<producer>/<name>`
    pub fn relative_path(&self, producer: Environment, name: &str) -> PathBuf {
        self.dump_dir.join(producer.as_str()).join(name)
    }

    /// Path of an artifact on the remote host.
    pub fn remote_dump_file(&self, producer: Environment, name: &str) -> PathBuf {
        self.remote_root.join(self.relative_path(producer, name))
    }

    /// Path of an artifact in the local workspace.
    pub fn local_dump_file(&self, producer: Environment, name: &str) -> PathBuf {
        self.workspace.join(self.relative_path(producer, name))
    }

    /// Directory holding artifacts produced by `producer`, on the local side.
    pub fn local_producer_dir(&self, producer: Environment) -> PathBuf {
        self.workspace.join(&self.dump_dir).join(producer.as_str())
    }

    /// Dump root plus both producer subdirectories, rooted at `env`'s root.
    pub fn directories(&self, env: Environment) -> [PathBuf; 3] {
        let root = match env {
            Environment::Local => self.workspace.join(&self.dump_dir),
            Environment::Remote => self.remote_root.join(&self.dump_dir),
        };
        let local = root.join(Environment::Local.as_str());
        let remote = root.join(Environment::Remote.as_str());
        [root, local, remote]
    }
}
