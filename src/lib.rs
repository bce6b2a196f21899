//! db-sync Library
//!
//! Keeps a MySQL database on a workstation and one on a deployed host in
//! step by dumping one side, shipping the compressed dump over SSH and
//! loading it on the other side.
//!
//! # Features
//!
//! - Pull: remote database into the local one
//! - Push: local database into the remote one, reusing a dump left behind
//!   by an interrupted push
//! - Dump normalization: `DEFINER` clauses stripped, legacy utf8 charsets
//!   and collations rewritten to utf8mb4
//! - Shell overrides for every stage, for hosts without bzip2 or mysql
//!
//! # CLI Usage
//!
//! ```bash
//! # Pull the remote database
//! db-sync --config deploy/db-sync.toml pull
//!
//! # Show what a push would run
//! db-sync plan push
//!
//! # Normalize a plain SQL dump in-process
//! db-sync normalize --input dump.sql --output normalized.sql
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod workflow;

pub use config::Config;
pub use error::Error;
pub use executor::{Direction, DryRunExecutor, Executor, PlannedAction, ShellExecutor};
pub use workflow::{CleanPolicy, Step, SyncReport, Workflow};

// Re-export the building blocks
pub use dump_artifact;
pub use mysql_dump;
