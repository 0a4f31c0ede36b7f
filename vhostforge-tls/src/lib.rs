//! Vhostforge TLS support
//!
//! 🔐 Reads the certificate tool's renewal bookkeeping directory and drives
//! certificate issuance for new sites.

pub mod issuer;
pub mod renewal;

pub use issuer::{CertbotIssuer, IssueError};
pub use renewal::{apply_metadata, load_renewal_dir, status_for, RenewalInfo};
