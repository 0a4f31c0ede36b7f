//! Mutation operations
//!
//! Each operation is a small state machine ending Committed or RolledBack:
//! validate, stage, backup, commit, syntax-check, reload. The syntax check
//! trusts only the tool's "Syntax OK" marker, never its exit code. A failed
//! check restores the backup and keeps the rejected file for inspection; a
//! failed reload restores the backup and reloads once more with it.

use crate::exec::{CommandRunner, TokioCommandRunner};
use crate::privops::{PrivilegedOps, ShellPrivOps};
use crate::templates;
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;
use vhostforge_config::{declared_names, extract_blocks, parse_file, tokenize, Block};
use vhostforge_core::settings::Settings;
use vhostforge_core::{validate, Error, Result};

/// Literal marker the syntax-test tool prints on success
const SYNTAX_OK_MARKER: &str = "Syntax OK";

/// Syntax failures caused only by certificate material that no longer exists
static MISSING_CERT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)SSLCertificate(?:Key)?File.*(?:does not exist|No such file)")
        .expect("missing cert regex")
});

/// Loopback target port in ProxyPass / ProxyPassReverse lines
static PROXY_PORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^(\s*proxypass(?:reverse)?\s+\S+\s+(?:wss?|https?)://(?:127\.0\.0\.1|localhost):)\d+")
        .expect("proxy port regex")
});

/// DocumentRoot directive line
static DOCUMENT_ROOT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?im)^(\s*documentroot\s+).*$"#).expect("document root regex")
});

/// Issues a certificate for a freshly added domain. The engine only needs
/// success or a printable failure; the concrete tool lives elsewhere.
#[async_trait]
pub trait CertIssuer: Send + Sync {
    async fn issue(&self, domain: &str) -> std::result::Result<(), String>;
}

/// What kind of site to create
#[derive(Debug, Clone)]
pub enum AddSpec {
    Proxy { port: u16 },
    Static { content_root: PathBuf },
}

/// What to change on an existing site
#[derive(Debug, Clone)]
pub enum UpdateSpec {
    ProxyPort(u16),
    ContentRoot(PathBuf),
}

/// Which of the two managed files an upload replaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfTarget {
    Http,
    Ssl,
}

/// Outcome of a committed (or no-op) mutation
#[derive(Debug, Clone, Default)]
pub struct MutationReport {
    /// False only for the idempotent-upload no-op
    pub changed: bool,
    /// Raw syntax-tool output, for operator visibility
    pub syntax_output: Option<String>,
    /// Secondary failure of the follow-up certificate issuance; the primary
    /// mutation is committed regardless
    pub cert_warning: Option<String>,
}

impl MutationReport {
    fn no_op() -> Self {
        Self::default()
    }
}

/// Validated, rollback-capable mutations of the virtual host files
pub struct MutationEngine {
    settings: Settings,
    runner: Arc<dyn CommandRunner>,
    privops: Arc<dyn PrivilegedOps>,
    issuer: Option<Arc<dyn CertIssuer>>,
    /// Serializes mutating operations; two writers must never interleave
    /// stage/backup/commit phases
    write_lock: Mutex<()>,
}

impl MutationEngine {
    pub fn new(
        settings: Settings,
        runner: Arc<dyn CommandRunner>,
        privops: Arc<dyn PrivilegedOps>,
        issuer: Option<Arc<dyn CertIssuer>>,
    ) -> Self {
        Self {
            settings,
            runner,
            privops,
            issuer,
            write_lock: Mutex::new(()),
        }
    }

    /// Production wiring: tokio runner and sudo-prefixed file operations
    pub fn with_defaults(settings: Settings) -> Self {
        let runner = Arc::new(TokioCommandRunner::new(settings.command_timeout_secs));
        let privops = Arc::new(ShellPrivOps::new(
            runner.clone(),
            settings.privilege_prefix.clone(),
        ));
        Self::new(settings, runner, privops, None)
    }

    pub fn with_issuer(mut self, issuer: Arc<dyn CertIssuer>) -> Self {
        self.issuer = Some(issuer);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ========================================
    // Add
    // ========================================

    /// Append a new block for `domain` to the plaintext file, then trigger
    /// certificate issuance as a dependent follow-up
    pub async fn add_site(&self, domain: &str, spec: AddSpec) -> Result<MutationReport> {
        validate::validate_domain(domain)?;
        let block = match &spec {
            AddSpec::Proxy { port } => {
                validate::validate_port(*port)?;
                templates::proxy_block(domain, *port)
            }
            AddSpec::Static { content_root } => {
                validate::validate_content_root(content_root)?;
                templates::static_block(domain, content_root)
            }
        };

        let _guard = self.write_lock.lock().await;

        let current = read_or_empty(&self.settings.http_conf)?;
        let ssl_current = read_or_empty(&self.settings.ssl_conf)?;
        let taken = parse_file(&current)
            .iter()
            .chain(parse_file(&ssl_current).iter())
            .any(|r| r.domain == domain);
        if taken {
            return Err(Error::Validation {
                field: "domain",
                reason: format!("'{}' is already configured", domain),
            });
        }

        let mut new_content = current;
        if !new_content.is_empty() {
            if !new_content.ends_with('\n') {
                new_content.push('\n');
            }
            new_content.push('\n');
        }
        new_content.push_str(&block);

        tracing::info!("adding {} site for {}", kind_name(&spec), domain);
        let mut report = self
            .apply_file(&self.settings.http_conf, &new_content, false)
            .await?;

        if let Some(issuer) = &self.issuer {
            if let Err(e) = issuer.issue(domain).await {
                tracing::warn!("certificate issuance failed for {}: {}", domain, e);
                report.cert_warning = Some(e);
            }
        }

        Ok(report)
    }

    // ========================================
    // Update
    // ========================================

    /// Rewrite the routing port or content root inside the one block whose
    /// declared names include `domain`
    pub async fn update_site(&self, domain: &str, change: UpdateSpec) -> Result<MutationReport> {
        validate::validate_domain(domain)?;
        match &change {
            UpdateSpec::ProxyPort(port) => validate::validate_port(*port)?,
            UpdateSpec::ContentRoot(root) => validate::validate_content_root(root)?,
        }

        let _guard = self.write_lock.lock().await;

        let text = read_or_empty(&self.settings.http_conf)?;
        let blocks = extract_blocks(&text);
        let Some(block) = blocks.iter().find(|b| block_declares(b, domain)) else {
            return Err(Error::NotFound(domain.to_string()));
        };

        let new_block = match &change {
            UpdateSpec::ProxyPort(port) => rewrite_proxy_port(&block.raw, *port),
            UpdateSpec::ContentRoot(root) => rewrite_content_root(block, root),
        };
        if new_block == block.raw {
            return Err(Error::NoChange(domain.to_string()));
        }

        // splice the rewritten block back into place; bytes outside the
        // span are untouched
        let mut new_text = String::with_capacity(text.len() + new_block.len());
        new_text.push_str(&text[..block.start]);
        new_text.push_str(&new_block);
        new_text.push_str(&text[block.end..]);

        tracing::info!("updating site {}", domain);
        self.apply_file(&self.settings.http_conf, &new_text, false)
            .await
    }

    // ========================================
    // Remove
    // ========================================

    /// Splice out every block declaring `domain`, independently in each of
    /// the two files
    pub async fn remove_site(&self, domain: &str) -> Result<MutationReport> {
        validate::validate_domain(domain)?;

        let _guard = self.write_lock.lock().await;

        let mut last_report = None;
        let files = [
            self.settings.http_conf.clone(),
            self.settings.ssl_conf.clone(),
        ];

        for path in &files {
            let text = read_or_empty(path)?;
            if text.is_empty() {
                continue;
            }

            let blocks = extract_blocks(&text);
            let doomed: Vec<&Block> =
                blocks.iter().filter(|b| block_declares(b, domain)).collect();
            if doomed.is_empty() {
                continue;
            }

            let mut new_text = String::with_capacity(text.len());
            let mut cursor = 0;
            for block in &doomed {
                new_text.push_str(&text[cursor..block.start]);
                cursor = block.end;
            }
            new_text.push_str(&text[cursor..]);

            tracing::info!(
                "removing {} block(s) for {} from {}",
                doomed.len(),
                domain,
                path.display()
            );
            // a certificate that no longer exists is not a reason to keep
            // the dead block
            let report = self.apply_file(path, &new_text, true).await?;
            last_report = Some(report);
        }

        last_report.ok_or_else(|| Error::NotFound(domain.to_string()))
    }

    // ========================================
    // Upload
    // ========================================

    /// Replace a whole managed file. Content identical to what is on disk
    /// (after newline normalization) is a no-op: no write, no reload.
    pub async fn upload_config(&self, target: ConfTarget, content: &str) -> Result<MutationReport> {
        let path = match target {
            ConfTarget::Http => self.settings.http_conf.clone(),
            ConfTarget::Ssl => self.settings.ssl_conf.clone(),
        };

        let _guard = self.write_lock.lock().await;

        let current = read_or_empty(&path)?;
        if normalize_newlines(&current) == normalize_newlines(content) {
            tracing::info!("upload for {} is identical, skipping", path.display());
            return Ok(MutationReport::no_op());
        }

        self.apply_file(&path, content, false).await
    }

    // ========================================
    // Stage / backup / commit / check / reload
    // ========================================

    async fn apply_file(
        &self,
        target: &Path,
        content: &str,
        tolerate_missing_cert: bool,
    ) -> Result<MutationReport> {
        // stage; the handle removes the file on drop no matter how the
        // operation ends
        let staged = tempfile::NamedTempFile::new()?;
        std::fs::write(staged.path(), content)?;

        // backup
        let backup = if target.exists() {
            let backup_path = self.stamped_path(target, "bak");
            let _ = std::fs::create_dir_all(&self.settings.backup_dir);
            self.privops.copy(target, &backup_path).await?;
            tracing::debug!("backed up {} to {}", target.display(), backup_path.display());
            Some(backup_path)
        } else {
            None
        };

        // commit
        self.privops.copy(staged.path(), target).await?;
        self.privops.chmod("644", target).await?;

        // syntax check: scan combined output for the marker, the tool may
        // exit non-zero on mere warnings
        let syntax = self.runner.run(&self.settings.syntax_check_cmd).await?;
        let combined = syntax.combined();

        if !combined.contains(SYNTAX_OK_MARKER) {
            if tolerate_missing_cert && MISSING_CERT_RE.is_match(&combined) {
                tracing::warn!(
                    "syntax check reports missing certificate material, proceeding: {}",
                    combined.trim()
                );
            } else {
                let inspect_path = self.save_for_inspection(target).await;
                self.restore(target, backup.as_deref()).await?;
                return Err(Error::SyntaxCheck {
                    output: combined,
                    inspect_path,
                });
            }
        }

        // reload
        let reload = self.runner.run(&self.settings.reload_cmd).await?;
        if !reload.status_ok {
            self.restore(target, backup.as_deref()).await?;
            // one more reload with the restored file; its outcome cannot
            // improve the error we are about to return
            let _ = self.runner.run(&self.settings.reload_cmd).await;
            return Err(Error::Reload(reload.combined().trim().to_string()));
        }

        tracing::info!("committed {} and reloaded", target.display());
        Ok(MutationReport {
            changed: true,
            syntax_output: Some(combined),
            cert_warning: None,
        })
    }

    /// Keep a copy of the rejected file next to the backups
    async fn save_for_inspection(&self, target: &Path) -> Option<PathBuf> {
        let path = self.stamped_path(target, "rejected");
        let _ = std::fs::create_dir_all(&self.settings.backup_dir);
        match self.privops.copy(target, &path).await {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!("could not save rejected file for inspection: {}", e);
                None
            }
        }
    }

    /// Put the target back the way it was: from the backup, or gone if it
    /// did not exist
    async fn restore(&self, target: &Path, backup: Option<&Path>) -> Result<()> {
        match backup {
            Some(backup) => self.privops.copy(backup, target).await,
            None => self.privops.delete(target).await,
        }
    }

    fn stamped_path(&self, target: &Path, label: &str) -> PathBuf {
        let name = target
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("config");
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        self.settings
            .backup_dir
            .join(format!("{}.{}.{}", name, stamp, label))
    }
}

fn kind_name(spec: &AddSpec) -> &'static str {
    match spec {
        AddSpec::Proxy { .. } => "proxy",
        AddSpec::Static { .. } => "static",
    }
}

fn block_declares(block: &Block, domain: &str) -> bool {
    declared_names(&tokenize(&block.interior))
        .iter()
        .any(|n| n == domain)
}

fn rewrite_proxy_port(raw: &str, port: u16) -> String {
    PROXY_PORT_RE
        .replace_all(raw, |caps: &regex::Captures| {
            format!("{}{}", &caps[1], port)
        })
        .into_owned()
}

fn rewrite_content_root(block: &Block, root: &Path) -> String {
    let mut rewritten = DOCUMENT_ROOT_RE
        .replace_all(&block.raw, |caps: &regex::Captures| {
            format!("{}{}", &caps[1], root.display())
        })
        .into_owned();

    // keep any <Directory> section pointing at the old root in step
    let map = tokenize(&block.interior);
    if let Some(old_root) = map
        .get("documentroot")
        .and_then(|values| values.first())
        .and_then(|v| v.split_whitespace().next())
    {
        let old_root = old_root.trim_matches('"');
        if let Ok(dir_re) = Regex::new(&format!(
            r#"(?i)(<directory\s+"?){}("?\s*>)"#,
            regex::escape(old_root)
        )) {
            rewritten = dir_re
                .replace_all(&rewritten, |caps: &regex::Captures| {
                    format!("{}{}{}", &caps[1], root.display(), &caps[2])
                })
                .into_owned();
        }
    }

    rewritten
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
}

fn read_or_empty(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}
