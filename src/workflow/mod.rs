//! Directional sync workflows.
//!
//! Both directions run the same fail-fast chain of steps:
//!
//! 1. ensure the dump directories exist on both hosts
//! 2. dump on the producing side (push may reuse an existing local dump)
//! 3. copy the artifact to the consuming side
//! 4. remove the producer's copy, if enabled
//! 5. load the artifact on the consuming side
//! 6. remove the consumer's copy, if enabled
//!
//! The first failing step ends the run with [`Error::StepFailed`]; artifacts
//! already written are left in place.

use dump_artifact::{ArtifactResolver, DumpArtifact};
use mysql_dump::{CommandBuilder, Environment};
use std::future::Future;
use std::path::{Path, PathBuf};

use crate::executor::{Direction, Executor};
use crate::Error;

mod pull;
mod push;

/// A workflow step, as reported when it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    EnsureDirectories,
    Dump,
    Copy,
    Clean(Environment),
    Load,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::EnsureDirectories => f.write_str("ensure directories"),
            Step::Dump => f.write_str("dump"),
            Step::Copy => f.write_str("copy"),
            Step::Clean(env) => write!(f, "clean {env}"),
            Step::Load => f.write_str("load"),
        }
    }
}

/// Which artifact copies are removed after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanPolicy {
    pub local: bool,
    pub remote: bool,
}

impl CleanPolicy {
    pub fn enabled(&self, env: Environment) -> bool {
        match env {
            Environment::Local => self.local,
            Environment::Remote => self.remote,
        }
    }
}

impl Default for CleanPolicy {
    fn default() -> Self {
        Self {
            local: true,
            remote: true,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub direction: Direction,
    /// Artifact file name
    pub artifact: String,
    pub local_path: PathBuf,
    pub remote_path: PathBuf,
    /// `false` when an existing dump was reused
    pub dumped: bool,
    pub local_cleaned: bool,
    pub remote_cleaned: bool,
}

/// Runs pull and push against one configuration.
pub struct Workflow<'a> {
    builder: &'a CommandBuilder,
    resolver: &'a ArtifactResolver,
    executor: &'a dyn Executor,
    clean: CleanPolicy,
}

impl<'a> Workflow<'a> {
    pub fn new(
        builder: &'a CommandBuilder,
        resolver: &'a ArtifactResolver,
        executor: &'a dyn Executor,
        clean: CleanPolicy,
    ) -> Self {
        Self {
            builder,
            resolver,
            executor,
            clean,
        }
    }

    /// Run the workflow for `direction`.
    pub async fn run(&self, direction: Direction) -> Result<SyncReport, Error> {
        match direction {
            Direction::RemoteToLocal => self.pull().await,
            Direction::LocalToRemote => self.push().await,
        }
    }

    /// The artifact the producer of `direction` would write next.
    pub async fn artifact(&self, direction: Direction) -> Result<DumpArtifact, Error> {
        let producer = direction.producer();
        let database = &self.builder.database(producer).database;
        Ok(self.resolver.resolve(producer, database).await?)
    }

    async fn ensure_directories(&self) -> Result<(), Error> {
        for env in [Environment::Local, Environment::Remote] {
            for dir in self.resolver.layout().directories(env) {
                self.executor.ensure_directory(env, &dir).await?;
            }
        }
        Ok(())
    }

    /// Dump into the producer's copy of `artifact`. Returns whether a
    /// command ran.
    async fn dump(&self, artifact: &DumpArtifact) -> Result<bool, Error> {
        let env = artifact.producer;
        let file = path_in(artifact, env).display().to_string();
        match self.builder.dump_command(env, &file) {
            Some(command) => {
                self.execute(env, &command).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn copy(&self, direction: Direction, artifact: &DumpArtifact) -> Result<(), Error> {
        let from = path_in(artifact, direction.producer());
        let to = path_in(artifact, direction.consumer());
        tracing::debug!("Copying {} to {}", from.display(), to.display());
        self.executor.copy(from, to, direction).await
    }

    async fn load(&self, env: Environment, artifact: &DumpArtifact) -> Result<(), Error> {
        let file = path_in(artifact, env).display().to_string();
        if let Some(command) = self.builder.load_command(env, &file) {
            self.execute(env, &command).await?;
        }
        Ok(())
    }

    /// Remove `env`'s copy of `artifact` when cleaning is enabled there.
    /// Returns whether a command ran.
    async fn clean(&self, env: Environment, artifact: &DumpArtifact) -> Result<bool, Error> {
        let file = path_in(artifact, env).display().to_string();
        match self
            .builder
            .clean_command(env, &file, self.clean.enabled(env))
        {
            Some(command) => {
                self.execute(env, &command).await?;
                Ok(true)
            }
            None => {
                tracing::info!("Keeping {} artifact {}", env, file);
                Ok(false)
            }
        }
    }

    async fn execute(&self, env: Environment, command: &str) -> Result<String, Error> {
        tracing::debug!("[{}] {}", env, self.builder.redact(command));
        self.executor.execute(env, command).await
    }

    /// Steps 3 to 6, shared by both directions.
    async fn deliver(
        &self,
        direction: Direction,
        artifact: DumpArtifact,
        dumped: bool,
    ) -> Result<SyncReport, Error> {
        let producer = direction.producer();
        let consumer = direction.consumer();

        run_step(Step::Copy, self.copy(direction, &artifact)).await?;
        let producer_cleaned =
            run_step(Step::Clean(producer), self.clean(producer, &artifact)).await?;
        run_step(Step::Load, self.load(consumer, &artifact)).await?;
        let consumer_cleaned =
            run_step(Step::Clean(consumer), self.clean(consumer, &artifact)).await?;

        let (local_cleaned, remote_cleaned) = match producer {
            Environment::Local => (producer_cleaned, consumer_cleaned),
            Environment::Remote => (consumer_cleaned, producer_cleaned),
        };

        Ok(SyncReport {
            direction,
            artifact: artifact.name,
            local_path: artifact.local_path,
            remote_path: artifact.remote_path,
            dumped,
            local_cleaned,
            remote_cleaned,
        })
    }
}

fn path_in(artifact: &DumpArtifact, env: Environment) -> &Path {
    match env {
        Environment::Local => &artifact.local_path,
        Environment::Remote => &artifact.remote_path,
    }
}

/// Run one step, tagging its failure with the step.
async fn run_step<T, F>(step: Step, fut: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    tracing::info!("Step: {}", step);
    fut.await.map_err(|source| Error::StepFailed {
        step,
        source: Box::new(source),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use dump_artifact::ArtifactLayout;
    use mysql_dump::{DatabaseConfig, DumpOptions, ShellOverrides};

    pub(crate) fn builder() -> CommandBuilder {
        let remote = DatabaseConfig {
            username: Some("app".to_string()),
            password: Some("s3cret".to_string()),
            ..DatabaseConfig::new("app")
        };
        let local = DatabaseConfig {
            username: Some("root".to_string()),
            ..DatabaseConfig::new("app_dev")
        };
        CommandBuilder::new(
            local,
            remote,
            DumpOptions::default(),
            ShellOverrides::default(),
        )
        .unwrap()
    }

    pub(crate) fn resolver(workspace: &Path) -> ArtifactResolver {
        ArtifactResolver::new(ArtifactLayout::new("db", workspace, "/srv/app"))
    }

    #[test]
    fn test_step_display() {
        assert_eq!(Step::EnsureDirectories.to_string(), "ensure directories");
        assert_eq!(Step::Clean(Environment::Remote).to_string(), "clean remote");
    }

    #[test]
    fn test_clean_policy() {
        let policy = CleanPolicy {
            local: false,
            remote: true,
        };
        assert!(!policy.enabled(Environment::Local));
        assert!(policy.enabled(Environment::Remote));
        assert_eq!(CleanPolicy::default(), CleanPolicy { local: true, remote: true });
    }

    #[tokio::test]
    async fn test_run_step_wraps_error() {
        let err = run_step(Step::Load, async {
            Err::<(), _>(Error::Execution {
                environment: Environment::Local,
                code: Some(1),
                stderr: "ERROR 1049".to_string(),
            })
        })
        .await
        .unwrap_err();
        assert_eq!(err.step(), Some(Step::Load));
    }
}
