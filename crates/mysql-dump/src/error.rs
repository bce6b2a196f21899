use thiserror::Error;

use crate::Environment;

/// Error type for invalid dump configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No database configured for the {0} environment")]
    MissingDatabase(Environment),

    #[error("ignore_tables contains an empty table name")]
    EmptyIgnoreTable,

    #[error("Unknown environment '{0}' (expected 'local' or 'remote')")]
    UnknownEnvironment(String),
}
