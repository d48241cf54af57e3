//! Shell-command tasks built from `[[jobs]]` tables.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use cadence_config::JobConfig;
use cadence_core::{Task, TaskError, TaskResult};

/// Longest stderr excerpt carried in a failure message.
const STDERR_EXCERPT: usize = 512;

/// Runs a command through `sh -c`. A non-zero exit is a task failure.
#[derive(Debug, Clone)]
pub(crate) struct ShellTask {
    command: String,
    working_dir: Option<PathBuf>,
    env: HashMap<String, String>,
}

impl ShellTask {
    pub(crate) fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            working_dir: None,
            env: HashMap::new(),
        }
    }

    pub(crate) fn from_config(job: &JobConfig) -> Self {
        let mut task = Self::new(job.command.as_str());
        task.working_dir = job.working_dir.as_ref().map(PathBuf::from);
        task.env = job.env.clone();
        task
    }

    fn command(&self) -> Command {
        let (shell, flag) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };

        let mut cmd = Command::new(shell);
        cmd.arg(flag)
            .arg(&self.command)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl Task for ShellTask {
    async fn run(&self) -> TaskResult {
        let output = self.command().output().await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!(command = %self.command, stdout = %stdout.trim_end(), "Command output");
        }

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        let excerpt = match stderr.char_indices().nth(STDERR_EXCERPT) {
            Some((cut, _)) => &stderr[..cut],
            None => stderr,
        };
        let status = match output.status.code() {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };

        Err(if excerpt.is_empty() {
            TaskError::new(format!("Command failed with {}", status))
        } else {
            TaskError::new(format!("Command failed with {}: {}", status, excerpt))
        })
    }
}
