//! Privileged file operations
//!
//! The engine only ever needs three verbs against the configuration files:
//! copy, chmod, delete. They sit behind a trait so the mutation logic never
//! knows whether it is talking to `sudo` or to the plain filesystem.

use crate::exec::CommandRunner;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use vhostforge_core::{Error, Result};

/// The three file operations the engine performs with elevated rights
#[async_trait]
pub trait PrivilegedOps: Send + Sync {
    async fn copy(&self, from: &Path, to: &Path) -> Result<()>;
    async fn chmod(&self, mode: &str, path: &Path) -> Result<()>;
    async fn delete(&self, path: &Path) -> Result<()>;
}

/// Shells out through a configurable privilege prefix (typically `sudo`)
pub struct ShellPrivOps {
    runner: Arc<dyn CommandRunner>,
    prefix: Vec<String>,
}

impl ShellPrivOps {
    pub fn new(runner: Arc<dyn CommandRunner>, prefix: Vec<String>) -> Self {
        Self { runner, prefix }
    }

    async fn invoke(&self, verb: &str, args: &[&str]) -> Result<()> {
        let mut argv = self.prefix.clone();
        argv.push(verb.to_string());
        argv.extend(args.iter().map(|a| a.to_string()));

        let output = self.runner.run(&argv).await?;
        if output.status_ok {
            Ok(())
        } else {
            Err(Error::Tool(format!(
                "privileged {} failed: {}",
                verb,
                output.combined().trim()
            )))
        }
    }
}

#[async_trait]
impl PrivilegedOps for ShellPrivOps {
    async fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        self.invoke("cp", &[&from.to_string_lossy(), &to.to_string_lossy()])
            .await
    }

    async fn chmod(&self, mode: &str, path: &Path) -> Result<()> {
        self.invoke("chmod", &[mode, &path.to_string_lossy()]).await
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        self.invoke("rm", &["-f", &path.to_string_lossy()]).await
    }
}

/// Plain-filesystem implementation for unprivileged deployments and tests
pub struct DirectPrivOps;

#[async_trait]
impl PrivilegedOps for DirectPrivOps {
    async fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(from, to).await?;
        Ok(())
    }

    async fn chmod(&self, mode: &str, path: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let bits = u32::from_str_radix(mode, 8)
                .map_err(|_| Error::Tool(format!("bad mode '{}'", mode)))?;
            tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(bits)).await?;
        }
        #[cfg(not(unix))]
        {
            let _ = (mode, path);
        }
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
