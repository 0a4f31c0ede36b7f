//! Input validation for mutating operations
//!
//! Every check here runs before any file I/O, so a rejected input never
//! touches the configuration files.

use crate::error::{Error, Result};
use regex::Regex;
use std::path::{Component, Path};
use std::sync::LazyLock;

/// Hostname labels plus an alphabetic TLD of at least two characters
static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}$")
        .expect("domain regex")
});

/// System paths a content root may never fall under
pub const DENIED_ROOTS: &[&str] = &[
    "/etc", "/bin", "/sbin", "/usr/bin", "/usr/sbin", "/usr/lib", "/lib", "/boot", "/dev",
    "/proc", "/sys", "/root", "/var/lib",
];

/// Validate a domain name (label rules, TLD-like suffix)
pub fn validate_domain(domain: &str) -> Result<()> {
    if domain.len() > 253 || !DOMAIN_RE.is_match(domain) {
        return Err(Error::Validation {
            field: "domain",
            reason: format!("'{}' is not a valid domain name", domain),
        });
    }
    Ok(())
}

/// Validate a proxy target port; privileged and out-of-range ports are rejected
pub fn validate_port(port: u16) -> Result<()> {
    if port < 1024 {
        return Err(Error::Validation {
            field: "port",
            reason: format!("port {} is below 1024", port),
        });
    }
    Ok(())
}

/// Validate a content-root path: absolute, no parent traversal, and not
/// under a sensitive system path
pub fn validate_content_root(path: &Path) -> Result<()> {
    if !path.is_absolute() {
        return Err(Error::Validation {
            field: "content_root",
            reason: format!("'{}' is not an absolute path", path.display()),
        });
    }

    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(Error::Validation {
            field: "content_root",
            reason: format!("'{}' contains parent-traversal segments", path.display()),
        });
    }

    for denied in DENIED_ROOTS {
        if path.starts_with(denied) {
            return Err(Error::Validation {
                field: "content_root",
                reason: format!("'{}' falls under protected path {}", path.display(), denied),
            });
        }
    }

    Ok(())
}
