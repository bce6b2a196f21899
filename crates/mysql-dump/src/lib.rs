//! MySQL dump/load command construction for db-sync
//!
//! Everything in this crate is pure: it renders shell command strings from
//! configuration and never touches a database, a shell or the filesystem.
//!
//! # Components
//!
//! - [`CommandBuilder`] - credential flags, ignore-table flags, `mysqldump`,
//!   `CREATE DATABASE`, `mysql` import, bzip2 compression and decompression
//! - [`DumpNormalizer`] - ordered text-rewrite rules that strip `DEFINER`
//!   clauses and canonicalize charset/collation declarations, rendered either
//!   as a `sed` pipeline or applied in-process
//! - [`ShellOverrides`] - optional replacements for the dump, load, clean,
//!   zip and unzip stages
//!
//! # Example
//!
//! ```
//! use mysql_dump::{CommandBuilder, DatabaseConfig, DumpOptions, Environment, ShellOverrides};
//!
//! let local = DatabaseConfig::new("shop_dev");
//! let remote = DatabaseConfig::new("shop");
//! let builder = CommandBuilder::new(local, remote, DumpOptions::default(), ShellOverrides::default())?;
//!
//! assert!(builder.dump_cmd(Environment::Remote).starts_with("mysqldump shop "));
//! # Ok::<(), mysql_dump::ConfigError>(())
//! ```

mod command;
mod credentials;
mod environment;
mod error;
mod normalize;
mod overrides;
mod pattern;

pub use command::{shell_quote, CommandBuilder, DumpOptions, DEFAULT_DUMP_FLAGS, DUMP_EXTENSION};
pub use credentials::{credential_params, qualify_table, DatabaseConfig};
pub use environment::Environment;
pub use error::ConfigError;
pub use normalize::{DumpNormalizer, CANONICAL_CHARSET, CANONICAL_COLLATION};
pub use overrides::{
    CommandOverride, OverrideContext, ShellConfig, ShellOverrides, ShellTemplate, Stage,
};
