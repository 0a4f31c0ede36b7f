//! Site record data model
//!
//! A [`SiteRecord`] is the structured view of one advertised domain name.
//! Records are rebuilt from the configuration files on every read; the files
//! are the only source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// What a site's block routes requests to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteKind {
    /// Reverse-proxied to a loopback port
    Proxy,
    /// Served from a document root
    Static,
    /// Document root handed to the PHP interpreter; not managed further
    LegacyPhp,
}

/// Certificate health derived from renewal metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertStatus {
    /// No certificate metadata known for the domain
    #[default]
    None,
    Active,
    /// Seven days or less remaining
    Expiring,
    Expired,
}

/// TLS state of a site, merged from block directives and renewal metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsState {
    /// Certificate-material directives are present in the block
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub status: CertStatus,

    pub expires_at: Option<DateTime<Utc>>,

    pub days_remaining: Option<i64>,

    /// Declared certificate file, if any
    pub cert_file: Option<PathBuf>,

    /// Declared private key file, if any
    pub key_file: Option<PathBuf>,
}

/// One advertised domain name and everything derived from its block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteRecord {
    /// Stable id derived from the domain name
    pub id: Uuid,

    /// Primary name this record describes
    pub domain: String,

    /// Other names declared by the same block, in declaration order
    #[serde(default)]
    pub aliases: Vec<String>,

    pub kind: SiteKind,

    /// Loopback port requests are proxied to (`Proxy` only)
    pub proxy_port: Option<u16>,

    /// Filesystem root (`Static` / `LegacyPhp`)
    pub content_root: Option<PathBuf>,

    pub access_log: Option<PathBuf>,

    pub error_log: Option<PathBuf>,

    #[serde(default)]
    pub tls: TlsState,

    /// True iff a record for this name's two-label parent exists in the
    /// same resolved set
    #[serde(default)]
    pub is_subordinate: bool,

    pub parent_domain: Option<String>,

    /// Exact source text of the originating block, kept for audit and
    /// removal matching
    pub raw_block: String,
}

/// Derive the stable, content-addressed id for a domain name
pub fn site_id(domain: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, domain.as_bytes())
}

impl SiteRecord {
    /// All names this record's block answers to, primary first
    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.domain.as_str()).chain(self.aliases.iter().map(|a| a.as_str()))
    }
}
