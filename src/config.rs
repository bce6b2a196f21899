//! TOML configuration.
//!
//! ```toml
//! workspace = "."
//!
//! [remote]
//! host = "app.example.com"
//! user = "deploy"
//! root = "/var/www/app/shared"
//!
//! [db]
//! dump_dir = "db"
//! ignore_tables = ["sessions", "audit.events"]
//! clean_local = true
//! clean_remote = true
//!
//! [db.local]
//! database = "app_dev"
//! username = "root"
//!
//! [db.remote]
//! database = "app"
//! username = "app"
//! password = "secret"
//! port = 3306
//!
//! [db.shell]
//! zip = "gzip > {file}"
//! unzip = "gunzip -c {file}"
//! ```

use dump_artifact::{ArtifactLayout, ArtifactResolver};
use mysql_dump::{CommandBuilder, DatabaseConfig, DumpOptions, ShellConfig, ShellOverrides};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::Error;

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Local root the dump directory is resolved against
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    pub remote: RemoteConfig,

    pub db: DbConfig,

    #[serde(default)]
    pub exec: ExecConfig,
}

/// How to reach the remote host.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    pub host: String,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub identity_file: Option<PathBuf>,

    /// Remote root the dump directory is resolved against
    pub root: PathBuf,
}

impl RemoteConfig {
    /// `user@host`, or just `host`.
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }
}

/// `[db]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    #[serde(default = "default_dump_dir")]
    pub dump_dir: PathBuf,

    #[serde(default)]
    pub ignore_tables: Vec<String>,

    #[serde(default)]
    pub char_set: Option<String>,

    /// Replaces the default `mysqldump` flags
    #[serde(default)]
    pub dump_flags: Option<Vec<String>>,

    #[serde(default = "default_true")]
    pub clean_local: bool,

    #[serde(default = "default_true")]
    pub clean_remote: bool,

    pub local: DatabaseConfig,

    pub remote: DatabaseConfig,

    #[serde(default)]
    pub shell: ShellConfig,
}

/// `[exec]` section: how commands are run.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecConfig {
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Fail a pipeline when any stage fails, not just the last
    #[serde(default = "default_true")]
    pub pipefail: bool,

    /// Extra options passed to both `ssh` and `scp`
    #[serde(default)]
    pub ssh_options: Vec<String>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            pipefail: true,
            ssh_options: Vec::new(),
        }
    }
}

fn default_workspace() -> PathBuf {
    PathBuf::from(".")
}

fn default_dump_dir() -> PathBuf {
    PathBuf::from("db")
}

fn default_shell() -> String {
    "bash".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load and validate a config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            Error::ConfigFile { reason, .. } => Error::ConfigFile {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, Error> {
        let config: Config = toml::from_str(content).map_err(|e| Error::ConfigFile {
            path: PathBuf::new(),
            reason: e.to_string(),
        })?;
        config.command_builder()?;
        Ok(config)
    }

    pub fn dump_options(&self) -> DumpOptions {
        DumpOptions {
            ignore_tables: self.db.ignore_tables.clone(),
            char_set: self.db.char_set.clone(),
            dump_flags: self.db.dump_flags.clone(),
        }
    }

    /// Builder for every command, with `[db.shell]` overrides installed.
    pub fn command_builder(&self) -> Result<CommandBuilder, Error> {
        Ok(CommandBuilder::new(
            self.db.local.clone(),
            self.db.remote.clone(),
            self.dump_options(),
            ShellOverrides::from(&self.db.shell),
        )?)
    }

    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(&self.db.dump_dir, &self.workspace, &self.remote.root)
    }

    pub fn resolver(&self) -> ArtifactResolver {
        ArtifactResolver::new(self.layout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysql_dump::{ConfigError, Environment, Stage};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[remote]
host = "app.example.com"
root = "/srv/app"

[db.local]
database = "app_dev"

[db.remote]
database = "app"
"#;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.workspace, PathBuf::from("."));
        assert_eq!(config.db.dump_dir, PathBuf::from("db"));
        assert!(config.db.clean_local);
        assert!(config.db.clean_remote);
        assert!(config.db.ignore_tables.is_empty());
        assert_eq!(config.exec.shell, "bash");
        assert!(config.exec.pipefail);
        assert_eq!(config.remote.destination(), "app.example.com");
    }

    #[test]
    fn test_full_config() {
        let content = r#"
workspace = "/home/dev/app"

[remote]
host = "app.example.com"
user = "deploy"
port = 2222
root = "/srv/app"

[db]
dump_dir = "dumps"
ignore_tables = ["sessions", "audit.events"]
char_set = "utf8mb4"
clean_local = false

[db.local]
database = "app_dev"
username = "root"

[db.remote]
database = "app"
username = "app"
password = "secret"
port = "3307"

[db.shell]
zip = "gzip > {file}"

[exec]
ssh_options = ["-o", "BatchMode=yes"]
"#;
        let config = Config::from_toml(content).unwrap();
        assert_eq!(config.remote.destination(), "deploy@app.example.com");
        assert_eq!(config.remote.port, Some(2222));
        assert!(!config.db.clean_local);
        assert!(config.db.clean_remote);
        assert_eq!(config.db.remote.port.as_deref(), Some("3307"));
        assert_eq!(config.exec.ssh_options.len(), 2);

        let builder = config.command_builder().unwrap();
        assert!(builder.overrides().get(Stage::Zip).is_some());
        assert_eq!(
            builder.ignore_tables_args(Environment::Remote),
            "--ignore-table=app.sessions --ignore-table=audit.events"
        );
        assert_eq!(
            config.layout().local_dump_file(Environment::Remote, "x.sql.bz2"),
            PathBuf::from("/home/dev/app/dumps/remote/x.sql.bz2")
        );
    }

    #[test]
    fn test_missing_database_rejected() {
        let content = MINIMAL.replace("database = \"app\"\n", "");
        let err = Config::from_toml(&content).unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::MissingDatabase(Environment::Remote))
        ));
    }

    #[test]
    fn test_empty_ignore_table_rejected() {
        let content = r#"
[remote]
host = "app.example.com"
root = "/srv/app"

[db]
ignore_tables = ["sessions", " "]

[db.local]
database = "app_dev"

[db.remote]
database = "app"
"#;
        let err = Config::from_toml(content).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::EmptyIgnoreTable)));
    }

    #[test]
    fn test_from_file_reports_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[remote]\nhost = 1").unwrap();

        match Config::from_file(file.path()).unwrap_err() {
            Error::ConfigFile { path, .. } => assert_eq!(path, file.path()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_file_missing() {
        let err = Config::from_file("/nonexistent/db-sync.toml").unwrap_err();
        assert!(matches!(err, Error::ConfigFile { .. }));
    }
}
