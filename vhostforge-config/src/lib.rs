//! Vhostforge Virtual Host Parser
//!
//! This crate turns Apache-style virtual host files into structured
//! [`SiteRecord`]s.
//!
//! # Example
//!
//! ```rust
//! use vhostforge_config::parse_sites;
//!
//! let http = r#"
//! <VirtualHost *:80>
//!     ServerName app.example.com
//!     ProxyPass / http://127.0.0.1:3000/
//! </VirtualHost>
//! "#;
//!
//! let sites = parse_sites(http, "");
//! assert_eq!(sites.len(), 1);
//! assert_eq!(sites[0].proxy_port, Some(3000));
//! ```

pub mod classify;
pub mod parser;
pub mod reader;
pub mod site_builder;

pub use classify::classify_relationships;
pub use parser::{extract_blocks, tokenize, Block, DirectiveMap};
pub use reader::{parse_sites, read_sites};
pub use site_builder::{build_record, build_records, declared_names};

use vhostforge_core::SiteRecord;

/// Parse one file's text into site records, one per declared name
pub fn parse_file(text: &str) -> Vec<SiteRecord> {
    extract_blocks(text)
        .iter()
        .flat_map(build_records)
        .collect()
}
