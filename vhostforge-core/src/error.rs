//! Error types for Vhostforge

use thiserror::Error;

/// Result type for Vhostforge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Vhostforge
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any file I/O
    #[error("validation failed: {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Update/remove target absent from every configuration file
    #[error("domain not found: {0}")]
    NotFound(String),

    /// Update matched a block but produced no change
    #[error("not found or no change: {0}")]
    NoChange(String),

    /// Syntax-test tool rejected the committed file; the target was rolled back
    #[error("syntax check failed: {output}")]
    SyntaxCheck {
        output: String,
        /// Copy of the rejected file kept for inspection
        inspect_path: Option<std::path::PathBuf>,
    },

    /// Service reload command failed; the target was rolled back if possible
    #[error("reload failed: {0}")]
    Reload(String),

    /// An external tool (privileged copy, certificate tool) failed or timed out
    #[error("external tool error: {0}")]
    Tool(String),

    /// Settings error
    #[error("settings error: {0}")]
    Settings(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
