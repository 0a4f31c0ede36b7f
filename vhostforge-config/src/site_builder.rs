//! Site descriptor builder
//!
//! Converts one extracted block and its directive map into [`SiteRecord`]s.
//! A block advertises every name it declares, so one block can yield several
//! records sharing the same raw text.

use crate::parser::{tokenize, Block, DirectiveMap};
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use vhostforge_core::site::site_id;
use vhostforge_core::{SiteKind, SiteRecord, TlsState};

/// Loopback proxy target: scheme://(127.0.0.1|localhost):port
static PROXY_TARGET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:wss?|https?)://(?:127\.0\.0\.1|localhost):(\d{1,5})")
        .expect("proxy target regex")
});

/// Build all records a block declares, primary name first
pub fn build_records(block: &Block) -> Vec<SiteRecord> {
    let map = tokenize(&block.interior);
    let names = declared_names(&map);

    names
        .iter()
        .map(|name| {
            let aliases: Vec<String> = names.iter().filter(|n| *n != name).cloned().collect();
            let mut record = build_record(name, &map, &block.raw);
            record.aliases = aliases;
            record
        })
        .collect()
}

/// Every name the block answers to: ServerName first, then each ServerAlias
/// token, duplicates removed in order
pub fn declared_names(map: &DirectiveMap) -> Vec<String> {
    let mut names = Vec::new();

    if let Some(values) = map.get("servername") {
        for value in values {
            if let Some(first) = value.split_whitespace().next() {
                push_unique(&mut names, first);
            }
        }
    }

    if let Some(values) = map.get("serveralias") {
        for value in values {
            for token in value.split_whitespace() {
                push_unique(&mut names, token);
            }
        }
    }

    names
}

fn push_unique(names: &mut Vec<String>, candidate: &str) {
    let candidate = candidate.trim_matches('"');
    if !candidate.is_empty() && !names.iter().any(|n| n == candidate) {
        names.push(candidate.to_string());
    }
}

/// Pure build of one record from a name, a directive map, and the raw block
pub fn build_record(domain: &str, map: &DirectiveMap, raw: &str) -> SiteRecord {
    let (kind, proxy_port, content_root) = classify(map);

    SiteRecord {
        id: site_id(domain),
        domain: domain.to_string(),
        aliases: Vec::new(),
        kind,
        proxy_port,
        content_root,
        access_log: first_path_token(map, "customlog"),
        error_log: first_path_token(map, "errorlog"),
        tls: tls_state(map),
        is_subordinate: false,
        parent_domain: None,
        raw_block: raw.to_string(),
    }
}

/// Classification order, first match wins: routing directive, interpreter
/// handler, content root, default static
fn classify(map: &DirectiveMap) -> (SiteKind, Option<u16>, Option<PathBuf>) {
    let content_root = first_path_token(map, "documentroot");

    if let Some(values) = map.get("proxypass") {
        let port = values.iter().find_map(|v| extract_loopback_port(v));
        return (SiteKind::Proxy, port, None);
    }

    let handler_mentions_php = ["addhandler", "sethandler"].iter().any(|d| {
        map.get(*d)
            .map(|values| values.iter().any(|v| v.to_ascii_lowercase().contains("php")))
            .unwrap_or(false)
    });
    if handler_mentions_php {
        return (SiteKind::LegacyPhp, None, content_root);
    }

    (SiteKind::Static, None, content_root)
}

/// Pull the port out of a loopback proxy URL
pub fn extract_loopback_port(value: &str) -> Option<u16> {
    PROXY_TARGET_RE
        .captures(value)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u16>().ok())
}

/// TLS presence comes from certificate-material directives alone; it never
/// affects the kind
fn tls_state(map: &DirectiveMap) -> TlsState {
    let cert_file = first_path_token(map, "sslcertificatefile");
    let key_file = first_path_token(map, "sslcertificatekeyfile");

    let engine_on = map
        .get("sslengine")
        .and_then(|values| values.first())
        .map(|v| v.eq_ignore_ascii_case("on"))
        .unwrap_or(false);

    TlsState {
        enabled: engine_on || cert_file.is_some() || key_file.is_some(),
        cert_file,
        key_file,
        ..TlsState::default()
    }
}

/// First whitespace token of a directive's first value, unquoted
fn first_path_token(map: &DirectiveMap, directive: &str) -> Option<PathBuf> {
    map.get(directive)
        .and_then(|values| values.first())
        .and_then(|v| v.split_whitespace().next())
        .map(|t| PathBuf::from(t.trim_matches('"')))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract_blocks;

    fn one_block(text: &str) -> Block {
        let mut blocks = extract_blocks(text);
        assert_eq!(blocks.len(), 1);
        blocks.remove(0)
    }

    #[test]
    fn test_proxy_classification() {
        let block = one_block(
            r#"<VirtualHost *:80>
    ServerName app.example.com
    ProxyPreserveHost On
    ProxyPass / http://127.0.0.1:3000/
    ProxyPassReverse / http://127.0.0.1:3000/
</VirtualHost>"#,
        );
        let records = build_records(&block);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, SiteKind::Proxy);
        assert_eq!(records[0].proxy_port, Some(3000));
        assert!(records[0].content_root.is_none());
    }

    #[test]
    fn test_websocket_scheme_accepted() {
        assert_eq!(extract_loopback_port("/ ws://localhost:8081/"), Some(8081));
        assert_eq!(extract_loopback_port("/ wss://127.0.0.1:9443/"), Some(9443));
        assert_eq!(extract_loopback_port("/ https://localhost:8443/"), Some(8443));
        // non-loopback targets are not routing targets
        assert_eq!(extract_loopback_port("/ http://10.0.0.5:3000/"), None);
    }

    #[test]
    fn test_static_classification() {
        let block = one_block(
            r#"<VirtualHost *:80>
    ServerName static.example.com
    DocumentRoot "/var/www/static"
</VirtualHost>"#,
        );
        let records = build_records(&block);
        assert_eq!(records[0].kind, SiteKind::Static);
        assert_eq!(
            records[0].content_root.as_deref(),
            Some(std::path::Path::new("/var/www/static"))
        );
    }

    #[test]
    fn test_legacy_php_classification() {
        let block = one_block(
            r#"<VirtualHost *:80>
    ServerName old.example.com
    DocumentRoot /var/www/old
    AddHandler application/x-httpd-php .php
</VirtualHost>"#,
        );
        let records = build_records(&block);
        assert_eq!(records[0].kind, SiteKind::LegacyPhp);
        assert!(records[0].content_root.is_some());
    }

    #[test]
    fn test_proxy_wins_over_handler() {
        let block = one_block(
            r#"<VirtualHost *:80>
    ServerName both.example.com
    ProxyPass / http://127.0.0.1:4000/
    AddHandler application/x-httpd-php .php
</VirtualHost>"#,
        );
        assert_eq!(build_records(&block)[0].kind, SiteKind::Proxy);
    }

    #[test]
    fn test_bare_block_defaults_to_static() {
        let block = one_block(
            "<VirtualHost *:80>\n    ServerName bare.example.com\n</VirtualHost>",
        );
        let records = build_records(&block);
        assert_eq!(records[0].kind, SiteKind::Static);
        assert!(records[0].content_root.is_none());
    }

    #[test]
    fn test_one_record_per_declared_name() {
        let block = one_block(
            r#"<VirtualHost *:80>
    ServerName example.com
    ServerAlias www.example.com cdn.example.com
    DocumentRoot /var/www/example
</VirtualHost>"#,
        );
        let records = build_records(&block);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].domain, "example.com");
        assert_eq!(
            records[0].aliases,
            vec!["www.example.com", "cdn.example.com"]
        );
        assert_eq!(records[1].domain, "www.example.com");
        assert!(records[1].aliases.contains(&"example.com".to_string()));
        // every record keeps the same originating block text
        assert!(records.iter().all(|r| r.raw_block == records[0].raw_block));
    }

    #[test]
    fn test_tls_detection_independent_of_kind() {
        let block = one_block(
            r#"<VirtualHost *:443>
    ServerName secure.example.com
    ProxyPass / http://127.0.0.1:5000/
    SSLEngine on
    SSLCertificateFile /etc/letsencrypt/live/secure.example.com/fullchain.pem
    SSLCertificateKeyFile /etc/letsencrypt/live/secure.example.com/privkey.pem
</VirtualHost>"#,
        );
        let records = build_records(&block);
        assert_eq!(records[0].kind, SiteKind::Proxy);
        assert!(records[0].tls.enabled);
        assert!(records[0].tls.cert_file.is_some());
        assert!(records[0].tls.key_file.is_some());
    }

    #[test]
    fn test_log_paths_extracted() {
        let block = one_block(
            r#"<VirtualHost *:80>
    ServerName logged.example.com
    DocumentRoot /var/www/logged
    ErrorLog /var/log/apache2/logged-error.log
    CustomLog /var/log/apache2/logged-access.log combined
</VirtualHost>"#,
        );
        let records = build_records(&block);
        assert_eq!(
            records[0].access_log.as_deref(),
            Some(std::path::Path::new("/var/log/apache2/logged-access.log"))
        );
        assert_eq!(
            records[0].error_log.as_deref(),
            Some(std::path::Path::new("/var/log/apache2/logged-error.log"))
        );
    }
}
