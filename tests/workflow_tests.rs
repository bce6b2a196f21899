//! Pull and push against two simulated hosts backed by temp directories.

use async_trait::async_trait;
use db_sync::dump_artifact::{ArtifactLayout, ArtifactResolver};
use db_sync::mysql_dump::{
    CommandBuilder, DatabaseConfig, DumpOptions, Environment, ShellOverrides, ShellTemplate, Stage,
};
use db_sync::{CleanPolicy, Direction, Error, Executor, Step, Workflow};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Interprets the commands rendered by [`builder`] against the real
/// filesystem, so both hosts are directories under one temp dir.
#[derive(Default)]
struct SimulatedHosts {
    log: Mutex<Vec<(Environment, String)>>,
    loaded: Mutex<Vec<(Environment, String)>>,
}

impl SimulatedHosts {
    fn commands(&self) -> Vec<(Environment, String)> {
        self.log.lock().unwrap().clone()
    }

    fn loaded(&self) -> Vec<(Environment, String)> {
        self.loaded.lock().unwrap().clone()
    }

    fn dumps(&self) -> usize {
        self.commands()
            .iter()
            .filter(|(_, c)| c.starts_with("dump "))
            .count()
    }
}

/// Split `command` into words the way `sh` would for the simple commands
/// used here: whitespace separates, single quotes group.
fn shell_words(command: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut word: Option<String> = None;
    let mut quoted = false;
    let mut chars = command.chars();
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                quoted = !quoted;
                word.get_or_insert_with(String::new);
            }
            c if quoted => word.get_or_insert_with(String::new).push(c),
            '\\' => {
                if let Some(next) = chars.next() {
                    word.get_or_insert_with(String::new).push(next);
                }
            }
            c if c.is_whitespace() => words.extend(word.take()),
            c => word.get_or_insert_with(String::new).push(c),
        }
    }
    words.extend(word);
    words
}

fn failed(environment: Environment, stderr: impl Into<String>) -> Error {
    Error::Execution {
        environment,
        code: Some(1),
        stderr: stderr.into(),
    }
}

#[async_trait]
impl Executor for SimulatedHosts {
    async fn execute(&self, environment: Environment, command: &str) -> Result<String, Error> {
        self.log
            .lock()
            .unwrap()
            .push((environment, command.to_string()));

        let words = shell_words(command);
        let words: Vec<&str> = words.iter().map(String::as_str).collect();
        match words.as_slice() {
            ["dump", database, file] => {
                std::fs::write(file, format!("-- {environment} dump of {database}\n"))
                    .map_err(|e| failed(environment, e.to_string()))?;
            }
            ["load", file] => {
                let content = std::fs::read_to_string(file)
                    .map_err(|e| failed(environment, e.to_string()))?;
                self.loaded.lock().unwrap().push((environment, content));
            }
            ["rm", "-f", file] => match std::fs::remove_file(file) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(failed(environment, e.to_string())),
            },
            _ => return Err(failed(environment, format!("unknown command: {command}"))),
        }
        Ok(String::new())
    }

    async fn copy(&self, from: &Path, to: &Path, _direction: Direction) -> Result<(), Error> {
        std::fs::copy(from, to).map_err(|e| Error::Transfer {
            from: from.display().to_string(),
            to: to.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    async fn ensure_directory(&self, _environment: Environment, path: &Path) -> Result<(), Error> {
        std::fs::create_dir_all(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fails the first action matching `step`, delegating everything else.
struct FailAt<'a> {
    inner: &'a SimulatedHosts,
    step: Step,
}

#[async_trait]
impl Executor for FailAt<'_> {
    async fn execute(&self, environment: Environment, command: &str) -> Result<String, Error> {
        let step = match command.split_whitespace().next() {
            Some("dump") => Step::Dump,
            Some("load") => Step::Load,
            _ => Step::Clean(environment),
        };
        if step == self.step {
            return Err(failed(environment, "injected failure"));
        }
        self.inner.execute(environment, command).await
    }

    async fn copy(&self, from: &Path, to: &Path, direction: Direction) -> Result<(), Error> {
        if self.step == Step::Copy {
            return Err(Error::Transfer {
                from: from.display().to_string(),
                to: to.display().to_string(),
                reason: "connection reset".to_string(),
            });
        }
        self.inner.copy(from, to, direction).await
    }

    async fn ensure_directory(&self, environment: Environment, path: &Path) -> Result<(), Error> {
        if self.step == Step::EnsureDirectories {
            return Err(Error::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.inner.ensure_directory(environment, path).await
    }
}

struct Hosts {
    _temp_dir: TempDir,
    workspace: PathBuf,
    remote_root: PathBuf,
    resolver: ArtifactResolver,
}

fn hosts() -> Hosts {
    let temp_dir = TempDir::new().unwrap();
    let workspace = temp_dir.path().join("workspace");
    let remote_root = temp_dir.path().join("remote");
    let resolver = ArtifactResolver::new(ArtifactLayout::new("db", &workspace, &remote_root));
    Hosts {
        _temp_dir: temp_dir,
        workspace,
        remote_root,
        resolver,
    }
}

fn builder() -> CommandBuilder {
    let overrides = ShellOverrides::default()
        .with(
            Stage::Dump,
            Arc::new(ShellTemplate::new("dump {database} {file}")),
        )
        .with(Stage::Load, Arc::new(ShellTemplate::new("load {file}")));
    CommandBuilder::new(
        DatabaseConfig::new("shop_dev"),
        DatabaseConfig::new("shop"),
        DumpOptions::default(),
        overrides,
    )
    .unwrap()
}

#[tokio::test]
async fn test_pull_keeps_local_and_removes_remote() {
    let hosts = hosts();
    let builder = builder();
    let executor = SimulatedHosts::default();
    let clean = CleanPolicy {
        local: false,
        remote: true,
    };

    let report = Workflow::new(&builder, &hosts.resolver, &executor, clean)
        .pull()
        .await
        .unwrap();

    assert!(report.dumped);
    assert!(!report.local_cleaned);
    assert!(report.remote_cleaned);
    assert!(report.local_path.starts_with(hosts.workspace.join("db/remote")));
    assert!(report.remote_path.starts_with(hosts.remote_root.join("db/remote")));
    assert!(report.local_path.exists());
    assert!(!report.remote_path.exists());

    assert_eq!(
        executor.loaded(),
        [(Environment::Local, "-- remote dump of shop\n".to_string())]
    );
}

#[tokio::test]
async fn test_pull_creates_directories_on_both_hosts() {
    let hosts = hosts();
    let builder = builder();
    let executor = SimulatedHosts::default();

    Workflow::new(&builder, &hosts.resolver, &executor, CleanPolicy::default())
        .pull()
        .await
        .unwrap();

    for root in [&hosts.workspace, &hosts.remote_root] {
        assert!(root.join("db/local").is_dir());
        assert!(root.join("db/remote").is_dir());
    }
}

#[tokio::test]
async fn test_pull_always_dumps() {
    let hosts = hosts();
    let builder = builder();
    let executor = SimulatedHosts::default();
    let workflow = Workflow::new(&builder, &hosts.resolver, &executor, CleanPolicy::default());

    workflow.pull().await.unwrap();
    workflow.pull().await.unwrap();

    assert_eq!(executor.dumps(), 2);
}

#[tokio::test]
async fn test_push_dumps_then_loads_remotely() {
    let hosts = hosts();
    let builder = builder();
    let executor = SimulatedHosts::default();

    let report = Workflow::new(&builder, &hosts.resolver, &executor, CleanPolicy::default())
        .push()
        .await
        .unwrap();

    assert!(report.dumped);
    assert!(report.artifact.starts_with("shop_dev-"));
    assert!(report.artifact.ends_with(".sql.bz2"));
    assert!(!report.local_path.exists());
    assert!(!report.remote_path.exists());
    assert_eq!(
        executor.loaded(),
        [(Environment::Remote, "-- local dump of shop_dev\n".to_string())]
    );
}

#[tokio::test]
async fn test_push_reuses_existing_local_dump() {
    let hosts = hosts();
    let builder = builder();
    let executor = SimulatedHosts::default();

    let dir = hosts.workspace.join("db/local");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("shop_dev-20240101000000.sql.bz2"), "-- interrupted push\n").unwrap();

    let report = Workflow::new(&builder, &hosts.resolver, &executor, CleanPolicy::default())
        .push()
        .await
        .unwrap();

    assert!(!report.dumped);
    assert_eq!(report.artifact, "shop_dev-20240101000000.sql.bz2");
    assert_eq!(executor.dumps(), 0);
    assert_eq!(
        executor.loaded(),
        [(Environment::Remote, "-- interrupted push\n".to_string())]
    );
}

#[tokio::test]
async fn test_copy_failure_stops_the_chain() {
    let hosts = hosts();
    let builder = builder();
    let inner = SimulatedHosts::default();
    let executor = FailAt {
        inner: &inner,
        step: Step::Copy,
    };

    let err = Workflow::new(&builder, &hosts.resolver, &executor, CleanPolicy::default())
        .pull()
        .await
        .unwrap_err();

    assert_eq!(err.step(), Some(Step::Copy));
    match err {
        Error::StepFailed { source, .. } => assert!(matches!(*source, Error::Transfer { .. })),
        other => panic!("unexpected error: {other}"),
    }

    // Only the dump ran; the remote artifact is left for inspection
    let commands = inner.commands();
    assert_eq!(commands.len(), 1);
    assert!(commands[0].1.starts_with("dump shop "));
    assert!(inner.loaded().is_empty());

    let artifact = shell_words(&commands[0].1).pop().unwrap();
    assert!(Path::new(&artifact).exists());
}

#[tokio::test]
async fn test_dump_failure_stops_the_chain() {
    let hosts = hosts();
    let builder = builder();
    let inner = SimulatedHosts::default();
    let executor = FailAt {
        inner: &inner,
        step: Step::Dump,
    };

    let err = Workflow::new(&builder, &hosts.resolver, &executor, CleanPolicy::default())
        .push()
        .await
        .unwrap_err();

    assert_eq!(err.step(), Some(Step::Dump));
    assert!(format!("{:#}", anyhow::Error::from(err)).contains("injected failure"));
    assert!(inner.commands().is_empty());
}

#[tokio::test]
async fn test_load_failure_skips_consumer_cleanup() {
    let hosts = hosts();
    let builder = builder();
    let inner = SimulatedHosts::default();
    let executor = FailAt {
        inner: &inner,
        step: Step::Load,
    };

    let err = Workflow::new(&builder, &hosts.resolver, &executor, CleanPolicy::default())
        .pull()
        .await
        .unwrap_err();

    assert_eq!(err.step(), Some(Step::Load));

    // dump, then the remote clean; the local clean never ran
    let commands = inner.commands();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[1].0, Environment::Remote);
    assert!(commands[1].1.starts_with("rm -f "));

    let local_dir = hosts.workspace.join("db/remote");
    assert_eq!(std::fs::read_dir(local_dir).unwrap().count(), 1);
}

#[tokio::test]
async fn test_ensure_directories_failure_runs_nothing() {
    let hosts = hosts();
    let builder = builder();
    let inner = SimulatedHosts::default();
    let executor = FailAt {
        inner: &inner,
        step: Step::EnsureDirectories,
    };

    let err = Workflow::new(&builder, &hosts.resolver, &executor, CleanPolicy::default())
        .push()
        .await
        .unwrap_err();

    assert_eq!(err.step(), Some(Step::EnsureDirectories));
    match err {
        Error::StepFailed { source, .. } => assert!(matches!(*source, Error::Io { .. })),
        other => panic!("unexpected error: {other}"),
    }
    assert!(inner.commands().is_empty());
    assert!(!hosts.workspace.join("db/local").exists());
}

#[tokio::test]
async fn test_producer_clean_failure_skips_load() {
    let hosts = hosts();
    let builder = builder();
    let inner = SimulatedHosts::default();
    let executor = FailAt {
        inner: &inner,
        step: Step::Clean(Environment::Remote),
    };

    let err = Workflow::new(&builder, &hosts.resolver, &executor, CleanPolicy::default())
        .pull()
        .await
        .unwrap_err();

    assert_eq!(err.step(), Some(Step::Clean(Environment::Remote)));

    // The copy already happened, so both hosts still hold the artifact
    let commands = inner.commands();
    assert_eq!(commands.len(), 1);
    assert!(commands[0].1.starts_with("dump shop "));
    assert!(inner.loaded().is_empty());

    let remote = PathBuf::from(shell_words(&commands[0].1).pop().unwrap());
    assert!(remote.exists());
    let local = hosts
        .workspace
        .join("db/remote")
        .join(remote.file_name().unwrap());
    assert!(local.exists());
}

#[test]
fn test_shell_words_handles_quoted_paths() {
    assert_eq!(
        shell_words("rm -f '/tmp/My Project/a.sql.bz2'"),
        ["rm", "-f", "/tmp/My Project/a.sql.bz2"]
    );
    assert_eq!(shell_words(r"load 'it'\''s'"), ["load", "it's"]);
}
