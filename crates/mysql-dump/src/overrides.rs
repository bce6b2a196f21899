//! Replaceable pipeline stages.
//!
//! Any stage can be swapped for a different command, e.g. when the target
//! engine is not MySQL or the hosts lack bzip2. An override receives the
//! same inputs the default command would have received.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{credential_params, shell_quote, CommandBuilder, Environment};

/// The stages that can be overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Dump,
    Load,
    Clean,
    Zip,
    Unzip,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Dump => "dump",
            Stage::Load => "load",
            Stage::Clean => "clean",
            Stage::Zip => "zip",
            Stage::Unzip => "unzip",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs handed to an override.
#[derive(Debug, Clone, Copy)]
pub struct OverrideContext<'a> {
    pub builder: &'a CommandBuilder,
    pub stage: Stage,
    /// Environment the command runs in; `None` for zip and unzip.
    pub environment: Option<Environment>,
    /// Artifact path.
    pub file: &'a str,
    /// Whether cleaning is enabled; always `true` for other stages.
    pub enabled: bool,
}

/// A replacement for one stage's command.
pub trait CommandOverride: Send + Sync + std::fmt::Debug {
    /// Render the command to run, or `None` when there is nothing to run.
    fn render(&self, ctx: &OverrideContext<'_>) -> Option<String>;
}

/// Command template read from configuration.
///
/// Placeholders: `{file}`, `{file_raw}`, `{environment}`, `{database}`,
/// `{credentials}`, `{enabled}`, `{dump_cmd}`, `{create_cmd}`, `{import_cmd}`.
/// `{file}` is shell-quoted; `{file_raw}` is the path as is. The
/// environment-bound ones expand to an empty string for zip and unzip.
///
/// A clean template renders nothing while cleaning is disabled, unless it
/// uses `{enabled}`; then it always renders and decides for itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShellTemplate(pub String);

impl ShellTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }
}

impl CommandOverride for ShellTemplate {
    fn render(&self, ctx: &OverrideContext<'_>) -> Option<String> {
        if ctx.stage == Stage::Clean && !ctx.enabled && !self.0.contains("{enabled}") {
            return None;
        }

        let env_bound = |render: &dyn Fn(Environment) -> String| {
            ctx.environment.map(render).unwrap_or_default()
        };

        let mut out = self
            .0
            .replace("{file}", &shell_quote(ctx.file))
            .replace("{file_raw}", ctx.file);
        out = out.replace("{enabled}", if ctx.enabled { "true" } else { "false" });
        out = out.replace(
            "{environment}",
            ctx.environment.map(|e| e.as_str()).unwrap_or_default(),
        );
        if out.contains("{database}") {
            let database = env_bound(&|env| ctx.builder.database(env).database.clone());
            out = out.replace("{database}", &database);
        }
        if out.contains("{credentials}") {
            let credentials = env_bound(&|env| credential_params(ctx.builder.database(env)));
            out = out.replace("{credentials}", &credentials);
        }
        if out.contains("{dump_cmd}") {
            out = out.replace("{dump_cmd}", &env_bound(&|env| ctx.builder.dump_cmd(env)));
        }
        if out.contains("{create_cmd}") {
            out = out.replace(
                "{create_cmd}",
                &env_bound(&|env| ctx.builder.create_cmd(env)),
            );
        }
        if out.contains("{import_cmd}") {
            out = out.replace(
                "{import_cmd}",
                &env_bound(&|env| ctx.builder.import_cmd(env)),
            );
        }
        Some(out)
    }
}

/// `[db.shell]` configuration section: one optional template per stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default)]
    pub dump: Option<ShellTemplate>,
    #[serde(default)]
    pub load: Option<ShellTemplate>,
    #[serde(default)]
    pub clean: Option<ShellTemplate>,
    #[serde(default)]
    pub zip: Option<ShellTemplate>,
    #[serde(default)]
    pub unzip: Option<ShellTemplate>,
}

/// The overrides in effect, selected per stage at call time.
#[derive(Debug, Clone, Default)]
pub struct ShellOverrides {
    pub dump: Option<Arc<dyn CommandOverride>>,
    pub load: Option<Arc<dyn CommandOverride>>,
    pub clean: Option<Arc<dyn CommandOverride>>,
    pub zip: Option<Arc<dyn CommandOverride>>,
    pub unzip: Option<Arc<dyn CommandOverride>>,
}

impl ShellOverrides {
    pub fn get(&self, stage: Stage) -> Option<&Arc<dyn CommandOverride>> {
        match stage {
            Stage::Dump => self.dump.as_ref(),
            Stage::Load => self.load.as_ref(),
            Stage::Clean => self.clean.as_ref(),
            Stage::Zip => self.zip.as_ref(),
            Stage::Unzip => self.unzip.as_ref(),
        }
    }

    /// Install an override for `stage`.
    pub fn with(mut self, stage: Stage, command: Arc<dyn CommandOverride>) -> Self {
        let slot = match stage {
            Stage::Dump => &mut self.dump,
            Stage::Load => &mut self.load,
            Stage::Clean => &mut self.clean,
            Stage::Zip => &mut self.zip,
            Stage::Unzip => &mut self.unzip,
        };
        *slot = Some(command);
        self
    }
}

impl From<&ShellConfig> for ShellOverrides {
    fn from(config: &ShellConfig) -> Self {
        let wrap = |template: &Option<ShellTemplate>| {
            template
                .clone()
                .map(|t| Arc::new(t) as Arc<dyn CommandOverride>)
        };
        Self {
            dump: wrap(&config.dump),
            load: wrap(&config.load),
            clean: wrap(&config.clean),
            zip: wrap(&config.zip),
            unzip: wrap(&config.unzip),
        }
    }
}
