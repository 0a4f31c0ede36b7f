//! Certificate issuance
//!
//! 🔐 Drives the external certificate tool for a newly added domain. Only
//! success or failure is consumed; the tool's own output is kept for the
//! error message.

use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Issuance error types
#[derive(Debug, Error)]
pub enum IssueError {
    #[error("certificate tool is not configured")]
    NotConfigured,

    #[error("failed to start certificate tool: {0}")]
    Spawn(String),

    #[error("certificate tool timed out after {0:?}")]
    Timeout(Duration),

    #[error("certificate tool failed: {0}")]
    Failed(String),
}

/// 🔐 Runs the certificate tool non-interactively for one domain
pub struct CertbotIssuer {
    cmd: Vec<String>,
    email: Option<String>,
    timeout: Duration,
}

impl CertbotIssuer {
    pub fn new(cmd: Vec<String>, email: Option<String>, timeout_secs: u64) -> Self {
        Self {
            cmd,
            email,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Request a certificate for `domain`, agreeing to terms and never
    /// prompting
    pub async fn issue(&self, domain: &str) -> Result<(), IssueError> {
        let Some((program, base_args)) = self.cmd.split_first() else {
            return Err(IssueError::NotConfigured);
        };

        let mut command = Command::new(program);
        command
            .args(base_args)
            .arg("--apache")
            .arg("-d")
            .arg(domain)
            .arg("-n")
            .arg("--agree-tos");

        match &self.email {
            Some(email) => {
                command.arg("--email").arg(email);
            }
            None => {
                command.arg("--register-unsafely-without-email");
            }
        }

        command.stdin(Stdio::null());

        tracing::info!("🔐 Requesting certificate for {}", domain);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| IssueError::Timeout(self.timeout))?
            .map_err(|e| IssueError::Spawn(e.to_string()))?;

        if output.status.success() {
            tracing::info!("✅ Certificate obtained for {}", domain);
            Ok(())
        } else {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            tracing::warn!("❌ Certificate tool failed for {}: {}", domain, combined.trim());
            Err(IssueError::Failed(combined.trim().to_string()))
        }
    }
}
