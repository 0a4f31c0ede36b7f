//! Vhostforge Core Library
//!
//! This crate provides the shared foundation for the Vhostforge virtual-host
//! engine: the site record data model, input validation, runtime settings,
//! and error handling.

pub mod error;
pub mod settings;
pub mod site;
pub mod validate;

pub use error::{Error, Result};
pub use site::{CertStatus, SiteKind, SiteRecord, TlsState};

/// Vhostforge version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
