//! Launches the external Facebook scraper as a child process.

use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::process::Command;
use tokio::task::JoinHandle;

/// One scraper run.
#[derive(Debug, Clone)]
pub struct ScrapeLaunch {
    pub job_id: String,
    pub target_url: String,
    pub max_posts: i32,
    pub callback_url: String,
}

/// How the scraper process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessExit {
    Success,
    Failed(String),
}

pub trait ScrapeLauncher: Send + Sync {
    /// Spawn the scraper and return a handle resolving when it exits.
    /// An `Err` means the process could not be started at all.
    fn launch(&self, launch: &ScrapeLaunch) -> Result<JoinHandle<ProcessExit>>;
}

/// Runs `command args... --job-id <id> --target <url> --max-posts <n> --callback <url>`.
pub struct ProcessScrapeLauncher {
    command: String,
    args: Vec<String>,
}

impl ProcessScrapeLauncher {
    pub fn new(command: &str, args: Vec<String>) -> Self {
        Self {
            command: command.to_string(),
            args,
        }
    }

    fn build_command(&self, launch: &ScrapeLaunch) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .arg("--job-id")
            .arg(&launch.job_id)
            .arg("--target")
            .arg(&launch.target_url)
            .arg("--max-posts")
            .arg(launch.max_posts.to_string())
            .arg("--callback")
            .arg(&launch.callback_url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());
        cmd
    }
}

impl ScrapeLauncher for ProcessScrapeLauncher {
    fn launch(&self, launch: &ScrapeLaunch) -> Result<JoinHandle<ProcessExit>> {
        if self.command.trim().is_empty() {
            anyhow::bail!("scraper command is not configured");
        }
        let mut child = self
            .build_command(launch)
            .spawn()
            .with_context(|| format!("failed to start scraper '{}'", self.command))?;

        tracing::info!(
            job_id = %launch.job_id,
            pid = ?child.id(),
            target = %launch.target_url,
            "Scraper process started"
        );

        let job_id = launch.job_id.clone();
        Ok(tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => ProcessExit::Success,
                Ok(status) => {
                    tracing::warn!(job_id = %job_id, status = %status, "Scraper exited unsuccessfully");
                    ProcessExit::Failed(format!("scraper exited with {status}"))
                }
                Err(e) => {
                    tracing::error!(job_id = %job_id, error = %e, "Failed to wait for scraper");
                    ProcessExit::Failed("scraper process was lost".to_string())
                }
            }
        }))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn launch() -> ScrapeLaunch {
        ScrapeLaunch {
            job_id: "1".to_string(),
            target_url: "https://facebook.com/groups/ai".to_string(),
            max_posts: 10,
            callback_url: "http://localhost/v1/scrape-jobs/callback".to_string(),
        }
    }

    #[tokio::test]
    async fn successful_exit() {
        let launcher = ProcessScrapeLauncher::new("true", vec![]);
        let handle = launcher.launch(&launch()).unwrap();
        assert_eq!(handle.await.unwrap(), ProcessExit::Success);
    }

    #[tokio::test]
    async fn failing_exit_is_reported() {
        let launcher =
            ProcessScrapeLauncher::new("sh", vec!["-c".to_string(), "exit 3".to_string()]);
        let handle = launcher.launch(&launch()).unwrap();
        match handle.await.unwrap() {
            ProcessExit::Failed(msg) => assert!(msg.contains('3')),
            ProcessExit::Success => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn missing_binary_fails_to_launch() {
        let launcher = ProcessScrapeLauncher::new("/nonexistent/magazine-scraper", vec![]);
        assert!(launcher.launch(&launch()).is_err());
    }
}
