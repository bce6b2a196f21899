//! The two endpoints of a sync.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::ConfigError;

/// Which side of the sync a path, credential set or command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// The operator's machine.
    Local,
    /// The deployed host, reached over SSH.
    Remote,
}

impl Environment {
    /// Get the string representation of this environment.
    ///
    /// Also the name of the dump subdirectory holding artifacts produced here.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Remote => "remote",
        }
    }

    /// The opposite endpoint.
    pub fn other(self) -> Self {
        match self {
            Environment::Local => Environment::Remote,
            Environment::Remote => Environment::Local,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "remote" => Ok(Environment::Remote),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}
