//! Certificate renewal metadata
//!
//! 📜 The certificate tool keeps one bookkeeping file per domain in its
//! renewal directory. Each file carries at least an `expiry_date = <value>`
//! line; from it we compute how many whole days remain and a health status.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use vhostforge_core::{CertStatus, SiteRecord};

/// Expiry metadata for one domain
#[derive(Debug, Clone)]
pub struct RenewalInfo {
    pub domain: String,
    pub expires_at: DateTime<Utc>,
    pub days_remaining: i64,
    pub status: CertStatus,
}

/// Status thresholds: negative days is expired, a week or less is expiring
pub fn status_for(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> (i64, CertStatus) {
    let days = (expires_at - now).num_seconds().div_euclid(86_400);
    let status = if days < 0 {
        CertStatus::Expired
    } else if days <= 7 {
        CertStatus::Expiring
    } else {
        CertStatus::Active
    };
    (days, status)
}

/// 📂 Scan the renewal bookkeeping directory into a domain → metadata map.
/// An absent directory yields an empty map; unreadable or unparseable
/// entries are skipped with a warning.
pub async fn load_renewal_dir(dir: &Path) -> HashMap<String, RenewalInfo> {
    let mut map = HashMap::new();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => {
            tracing::debug!("renewal directory {} absent", dir.display());
            return map;
        }
    };

    let now = Utc::now();

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().map(|e| e != "conf").unwrap_or(true) {
            continue;
        }
        let Some(domain) = path.file_stem().and_then(|s| s.to_str()).map(String::from) else {
            continue;
        };

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("⚠️ cannot read renewal file {}: {}", path.display(), e);
                continue;
            }
        };

        match expiry_from_content(&content) {
            Some(expires_at) => {
                let (days_remaining, status) = status_for(expires_at, now);
                map.insert(
                    domain.clone(),
                    RenewalInfo {
                        domain,
                        expires_at,
                        days_remaining,
                        status,
                    },
                );
            }
            None => {
                tracing::warn!("⚠️ no usable expiry in renewal file {}", path.display());
            }
        }
    }

    tracing::debug!("📜 loaded renewal metadata for {} domain(s)", map.len());
    map
}

/// Merge metadata into site records by domain name. Records without
/// metadata keep `CertStatus::None`.
pub fn apply_metadata(records: &mut [SiteRecord], metadata: &HashMap<String, RenewalInfo>) {
    for record in records {
        if let Some(info) = metadata.get(&record.domain) {
            record.tls.status = info.status;
            record.tls.expires_at = Some(info.expires_at);
            record.tls.days_remaining = Some(info.days_remaining);
        }
    }
}

/// Expiry from the `expiry_date =` line, falling back to the certificate
/// artifact named by a `cert =` line
fn expiry_from_content(content: &str) -> Option<DateTime<Utc>> {
    if let Some(value) = keyed_value(content, "expiry_date") {
        if let Some(parsed) = parse_expiry(value) {
            return Some(parsed);
        }
        tracing::warn!("⚠️ unparseable expiry_date value '{}'", value);
    }

    let cert_path = keyed_value(content, "cert")?;
    cert_not_after(Path::new(cert_path))
}

/// Value of the first `key = value` line
fn keyed_value<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    content.lines().find_map(|line| {
        let (k, v) = line.split_once('=')?;
        (k.trim() == key).then(|| v.trim())
    })
}

/// Accepted formats: RFC 3339, then `%Y-%m-%d %H:%M:%S`, then a bare date
/// (midnight UTC)
fn parse_expiry(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// notAfter of a PEM certificate on disk
fn cert_not_after(path: &Path) -> Option<DateTime<Utc>> {
    let data = std::fs::read(path).ok()?;
    let (_, pem) = x509_parser::pem::parse_x509_pem(&data).ok()?;
    let cert = pem.parse_x509().ok()?;
    let ts = cert.validity().not_after.timestamp();
    DateTime::from_timestamp(ts, 0)
}
