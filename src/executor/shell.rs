//! Executor backed by a local shell, `ssh` and `scp`.

use async_trait::async_trait;
use mysql_dump::{shell_quote, Environment};
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;

use super::{Direction, Executor};
use crate::config::Config;
use crate::Error;

/// Runs local commands through `<shell> -c`, remote ones through `ssh`.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
    pipefail: bool,
    destination: String,
    port: Option<u16>,
    identity_file: Option<PathBuf>,
    ssh_options: Vec<String>,
}

impl ShellExecutor {
    pub fn new(shell: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            pipefail: true,
            destination: destination.into(),
            port: None,
            identity_file: None,
            ssh_options: Vec::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            shell: config.exec.shell.clone(),
            pipefail: config.exec.pipefail,
            destination: config.remote.destination(),
            port: config.remote.port,
            identity_file: config.remote.identity_file.clone(),
            ssh_options: config.exec.ssh_options.clone(),
        }
    }

    /// Arguments that make the shell run `command`.
    fn shell_args<'a>(&'a self, command: &'a str) -> Vec<&'a str> {
        let mut args = Vec::with_capacity(4);
        if self.pipefail {
            args.extend(["-o", "pipefail"]);
        }
        args.extend(["-c", command]);
        args
    }

    /// The remote command line handed to `ssh`, quoted for the login shell.
    fn remote_command_line(&self, command: &str) -> String {
        std::iter::once(self.shell.as_str())
            .chain(self.shell_args(command))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn ssh_command(&self, command: &str) -> Command {
        let mut cmd = Command::new("ssh");
        if let Some(port) = self.port {
            cmd.arg("-p").arg(port.to_string());
        }
        if let Some(identity) = &self.identity_file {
            cmd.arg("-i").arg(identity);
        }
        cmd.args(&self.ssh_options)
            .arg(&self.destination)
            .arg(self.remote_command_line(command));
        cmd
    }

    fn scp_command(&self, from: &str, to: &str) -> Command {
        let mut cmd = Command::new("scp");
        if let Some(port) = self.port {
            cmd.arg("-P").arg(port.to_string());
        }
        if let Some(identity) = &self.identity_file {
            cmd.arg("-i").arg(identity);
        }
        cmd.args(&self.ssh_options).arg(from).arg(to);
        cmd
    }

    fn remote_path(&self, path: &Path) -> String {
        format!("{}:{}", self.destination, path.display())
    }
}

async fn run(environment: Environment, mut cmd: Command) -> Result<Output, Error> {
    let output = cmd.output().await.map_err(|e| Error::Execution {
        environment,
        code: None,
        stderr: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(Error::Execution {
            environment,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output)
}

#[async_trait]
impl Executor for ShellExecutor {
    async fn execute(&self, environment: Environment, command: &str) -> Result<String, Error> {
        let cmd = match environment {
            Environment::Local => {
                let mut cmd = Command::new(&self.shell);
                cmd.args(self.shell_args(command));
                cmd
            }
            Environment::Remote => self.ssh_command(command),
        };
        let output = run(environment, cmd).await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn copy(&self, from: &Path, to: &Path, direction: Direction) -> Result<(), Error> {
        let (from, to) = match direction {
            Direction::RemoteToLocal => (self.remote_path(from), to.display().to_string()),
            Direction::LocalToRemote => (from.display().to_string(), self.remote_path(to)),
        };

        let transfer_error = |reason: String| Error::Transfer {
            from: from.clone(),
            to: to.clone(),
            reason,
        };

        match run(Environment::Local, self.scp_command(&from, &to)).await {
            Ok(_) => Ok(()),
            Err(Error::Execution { stderr, .. }) => Err(transfer_error(stderr)),
            Err(e) => Err(transfer_error(e.to_string())),
        }
    }

    async fn ensure_directory(&self, environment: Environment, path: &Path) -> Result<(), Error> {
        match environment {
            Environment::Local => {
                tokio::fs::create_dir_all(path)
                    .await
                    .map_err(|source| Error::Io {
                        path: path.to_path_buf(),
                        source,
                    })
            }
            Environment::Remote => {
                let command = format!("mkdir -p {}", shell_quote(&path.display().to_string()));
                match self.execute(Environment::Remote, &command).await {
                    Ok(_) => Ok(()),
                    Err(Error::Execution { stderr, .. }) => Err(Error::Io {
                        path: path.to_path_buf(),
                        source: std::io::Error::other(stderr),
                    }),
                    Err(e) => Err(e),
                }
            }
        }
    }
}
