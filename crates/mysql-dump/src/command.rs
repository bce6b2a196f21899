//! Shell command construction.

use crate::normalize::{DumpNormalizer, FOREIGN_KEY_CHECKS_OFF, FOREIGN_KEY_CHECKS_ON};
use crate::{
    credential_params, qualify_table, ConfigError, DatabaseConfig, Environment, OverrideContext,
    ShellOverrides, Stage,
};

/// File extension of every dump artifact (bzip2-compressed SQL).
pub const DUMP_EXTENSION: &str = "sql.bz2";

/// Flags passed to `mysqldump` unless configured otherwise.
pub const DEFAULT_DUMP_FLAGS: [&str; 4] = [
    "--single-transaction",
    "--lock-tables=false",
    "--quick",
    "--no-tablespaces",
];

/// Settings shared by both environments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpOptions {
    /// Tables to leave out, `table` or `database.table`
    pub ignore_tables: Vec<String>,

    /// Passed as `--default-character-set` to every client invocation
    pub char_set: Option<String>,

    /// Replaces [`DEFAULT_DUMP_FLAGS`]
    pub dump_flags: Option<Vec<String>>,
}

/// Builds every shell command the sync runs.
///
/// Pure: given the same configuration and inputs it always returns the same
/// string and never performs I/O.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    local: DatabaseConfig,
    remote: DatabaseConfig,
    options: DumpOptions,
    overrides: ShellOverrides,
    normalizer: DumpNormalizer,
}

impl CommandBuilder {
    /// Validate the configuration and create a builder.
    pub fn new(
        local: DatabaseConfig,
        remote: DatabaseConfig,
        options: DumpOptions,
        overrides: ShellOverrides,
    ) -> Result<Self, ConfigError> {
        for (env, config) in [(Environment::Local, &local), (Environment::Remote, &remote)] {
            if config.database.trim().is_empty() {
                return Err(ConfigError::MissingDatabase(env));
            }
        }
        if options.ignore_tables.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::EmptyIgnoreTable);
        }

        Ok(Self {
            local,
            remote,
            options,
            overrides,
            normalizer: DumpNormalizer::new(),
        })
    }

    /// Connection settings for `env`.
    pub fn database(&self, env: Environment) -> &DatabaseConfig {
        match env {
            Environment::Local => &self.local,
            Environment::Remote => &self.remote,
        }
    }

    pub fn overrides(&self) -> &ShellOverrides {
        &self.overrides
    }

    /// `-u'…' -p'…'` flags for `env`.
    pub fn credential_params(&self, env: Environment) -> String {
        credential_params(self.database(env))
    }

    /// `--ignore-table=db.table` for every configured table.
    ///
    /// Bare names are qualified with `env`'s database on every call.
    pub fn ignore_tables_args(&self, env: Environment) -> String {
        let database = &self.database(env).database;
        self.options
            .ignore_tables
            .iter()
            .map(|table| format!("--ignore-table={}", qualify_table(table.trim(), database)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn char_set_arg(&self) -> String {
        match self.options.char_set.as_deref() {
            Some(cs) if !cs.is_empty() => format!("--default-character-set={cs}"),
            _ => String::new(),
        }
    }

    /// `mysqldump` for `env`'s database.
    pub fn dump_cmd(&self, env: Environment) -> String {
        let flags = match &self.options.dump_flags {
            Some(flags) => flags.join(" "),
            None => DEFAULT_DUMP_FLAGS.join(" "),
        };
        join_words([
            "mysqldump".to_string(),
            self.credential_params(env),
            self.database(env).database.clone(),
            self.char_set_arg(),
            flags,
            self.ignore_tables_args(env),
        ])
    }

    /// `mysql --execute "CREATE DATABASE IF NOT EXISTS …;"`
    pub fn create_cmd(&self, env: Environment) -> String {
        join_words([
            "mysql".to_string(),
            self.credential_params(env),
            self.char_set_arg(),
            format!(
                "--execute \"CREATE DATABASE IF NOT EXISTS {};\"",
                self.database(env).database
            ),
        ])
    }

    /// `mysql … -D <database>`, reading SQL from stdin.
    pub fn import_cmd(&self, env: Environment) -> String {
        join_words([
            "mysql".to_string(),
            self.credential_params(env),
            self.char_set_arg(),
            format!("-D {}", self.database(env).database),
        ])
    }

    /// Decompress `file` to stdout, keeping the archive.
    pub fn unzip_cmd(&self, file: &str) -> String {
        self.render_override(Stage::Unzip, None, file, true)
            .unwrap_or_else(|| format!("bunzip2 -k -f -c {}", shell_quote(file)))
    }

    /// Compress stdin into `file`.
    pub fn zip_cmd(&self, file: &str) -> String {
        self.render_override(Stage::Zip, None, file, true)
            .unwrap_or_else(|| format!("bzip2 > {}", shell_quote(file)))
    }

    /// The default dump pipeline: foreign key checks off, dump, normalize,
    /// foreign key checks on, compress into `file`.
    pub fn dump_pipeline(&self, env: Environment, file: &str) -> String {
        format!(
            "{{ echo '{}'; {} | {}; echo '{}'; }} | {}",
            FOREIGN_KEY_CHECKS_OFF,
            self.dump_cmd(env),
            self.normalizer.sed_pipeline(),
            FOREIGN_KEY_CHECKS_ON,
            self.zip_cmd(file)
        )
    }

    /// The default load pipeline: create the database, then stream the
    /// decompressed dump into it.
    pub fn load_pipeline(&self, env: Environment, file: &str) -> String {
        format!(
            "{} && {} | {}",
            self.create_cmd(env),
            self.unzip_cmd(file),
            self.import_cmd(env)
        )
    }

    /// Command for the dump stage, honouring a dump override.
    pub fn dump_command(&self, env: Environment, file: &str) -> Option<String> {
        match self.overrides.get(Stage::Dump) {
            Some(_) => self.render_override(Stage::Dump, Some(env), file, true),
            None => Some(self.dump_pipeline(env, file)),
        }
    }

    /// Command for the load stage, honouring a load override.
    pub fn load_command(&self, env: Environment, file: &str) -> Option<String> {
        match self.overrides.get(Stage::Load) {
            Some(_) => self.render_override(Stage::Load, Some(env), file, true),
            None => Some(self.load_pipeline(env, file)),
        }
    }

    /// Command removing `path`, or `None` when cleaning is disabled.
    pub fn clean_command(&self, env: Environment, path: &str, enabled: bool) -> Option<String> {
        match self.overrides.get(Stage::Clean) {
            Some(_) => self.render_override(Stage::Clean, Some(env), path, enabled),
            None if enabled => Some(format!("rm -f {}", shell_quote(path))),
            None => None,
        }
    }

    fn render_override(
        &self,
        stage: Stage,
        environment: Option<Environment>,
        file: &str,
        enabled: bool,
    ) -> Option<String> {
        let command = self.overrides.get(stage)?;
        tracing::debug!("Using {} override", stage);
        command.render(&OverrideContext {
            builder: self,
            stage,
            environment,
            file,
            enabled,
        })
    }

    /// Mask configured passwords in `command` for logging.
    pub fn redact(&self, command: &str) -> String {
        [&self.local, &self.remote]
            .into_iter()
            .filter_map(|config| config.password.as_deref())
            .filter(|password| !password.is_empty())
            .fold(command.to_string(), |acc, password| {
                acc.replace(&format!("-p'{password}'"), "-p'****'")
            })
    }
}

/// Wrap `value` in single quotes for a POSIX shell.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn join_words<const N: usize>(words: [String; N]) -> String {
    words
        .into_iter()
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
