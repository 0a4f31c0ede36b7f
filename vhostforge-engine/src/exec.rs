//! External command invocation
//!
//! Every external tool the engine drives goes through [`CommandRunner`], so
//! tests can substitute scripted outputs. The production runner captures
//! combined output and enforces a wall-clock timeout; a hung tool becomes an
//! error instead of blocking the operation forever.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use vhostforge_core::{Error, Result};

/// Captured result of one external command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Process exited with status zero
    pub status_ok: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stdout and stderr joined, the way operators read tool output
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }
}

/// Runs an argv-style command and captures its output
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, argv: &[String]) -> Result<CommandOutput>;
}

/// Production runner on tokio's process support
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, argv: &[String]) -> Result<CommandOutput> {
        let Some((program, args)) = argv.split_first() else {
            return Err(Error::Tool("empty command line".to_string()));
        };

        tracing::debug!("running {:?}", argv);

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| {
            Error::Tool(format!(
                "'{}' timed out after {}s",
                program,
                self.timeout.as_secs()
            ))
        })?
        .map_err(|e| Error::Tool(format!("failed to run '{}': {}", program, e)))?;

        Ok(CommandOutput {
            status_ok: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout() {
        let runner = TokioCommandRunner::new(5);
        let out = runner
            .run(&["echo".to_string(), "Syntax OK".to_string()])
            .await
            .unwrap();
        assert!(out.status_ok);
        assert!(out.combined().contains("Syntax OK"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_reported() {
        let runner = TokioCommandRunner::new(5);
        let out = runner.run(&["false".to_string()]).await.unwrap();
        assert!(!out.status_ok);
    }

    #[tokio::test]
    async fn test_empty_command_rejected() {
        let runner = TokioCommandRunner::new(5);
        assert!(runner.run(&[]).await.is_err());
    }

    #[tokio::test]
    async fn test_timeout_enforced() {
        let runner = TokioCommandRunner::new(1);
        let result = runner
            .run(&["sleep".to_string(), "30".to_string()])
            .await;
        match result {
            Err(Error::Tool(msg)) => assert!(msg.contains("timed out")),
            other => panic!("expected timeout error, got {:?}", other.map(|o| o.status_ok)),
        }
    }
}
