//! Merged two-file read
//!
//! The plaintext file and the TLS file are parsed separately, merged by
//! domain, then classified as one set. The TLS file's certificate-bearing
//! copy supplies the merged `tls` field; everything else comes from the
//! plaintext copy when both exist.

use crate::classify::classify_relationships;
use crate::parse_file;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use vhostforge_core::{Result, SiteRecord};

/// Parse both files' text into one merged, classified record list
pub fn parse_sites(http_text: &str, ssl_text: &str) -> Vec<SiteRecord> {
    let mut records = parse_file(http_text);
    let ssl_records = parse_file(ssl_text);

    let mut index: HashMap<String, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.domain.clone(), i))
        .collect();

    for ssl_record in ssl_records {
        match index.get(&ssl_record.domain) {
            Some(&i) => {
                // certificate-bearing copy wins the tls field
                records[i].tls = ssl_record.tls;
            }
            None => {
                index.insert(ssl_record.domain.clone(), records.len());
                records.push(ssl_record);
            }
        }
    }

    classify_relationships(&mut records);
    records
}

/// Read and merge the two configuration files; a missing file is an empty
/// file, any other IO failure propagates
pub fn read_sites(http_conf: &Path, ssl_conf: &Path) -> Result<Vec<SiteRecord>> {
    let http_text = read_or_empty(http_conf)?;
    let ssl_text = read_or_empty(ssl_conf)?;

    let records = parse_sites(&http_text, &ssl_text);
    tracing::debug!(
        "resolved {} site record(s) from {} and {}",
        records.len(),
        http_conf.display(),
        ssl_conf.display()
    );
    Ok(records)
}

fn read_or_empty(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTTP: &str = r#"
<VirtualHost *:80>
    ServerName shop.example.com
    ProxyPass / http://127.0.0.1:3000/
</VirtualHost>

<VirtualHost *:80>
    ServerName example.com
    DocumentRoot /var/www/example
</VirtualHost>
"#;

    const SSL: &str = r#"
<VirtualHost *:443>
    ServerName shop.example.com
    ProxyPass / http://127.0.0.1:3000/
    SSLEngine on
    SSLCertificateFile /etc/letsencrypt/live/shop.example.com/fullchain.pem
    SSLCertificateKeyFile /etc/letsencrypt/live/shop.example.com/privkey.pem
</VirtualHost>
"#;

    #[test]
    fn test_merge_supplies_tls_from_ssl_copy() {
        let records = parse_sites(HTTP, SSL);
        assert_eq!(records.len(), 2);

        let shop = records.iter().find(|r| r.domain == "shop.example.com").unwrap();
        assert!(shop.tls.enabled);
        assert!(shop.tls.cert_file.is_some());
        // the plaintext copy's raw block is retained for the merged record
        assert!(shop.raw_block.contains("*:80"));
    }

    #[test]
    fn test_ssl_only_domain_still_appears() {
        let records = parse_sites("", SSL);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].domain, "shop.example.com");
        assert!(records[0].tls.enabled);
    }

    #[test]
    fn test_classification_runs_after_merge() {
        // the subordinate's only occurrence is in the TLS file; it must
        // still see the principal from the plaintext file
        let http = r#"
<VirtualHost *:80>
    ServerName example.com
    DocumentRoot /var/www/example
</VirtualHost>
"#;
        let records = parse_sites(http, SSL);
        let shop = records.iter().find(|r| r.domain == "shop.example.com").unwrap();
        assert!(shop.is_subordinate);
        assert_eq!(shop.parent_domain.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_missing_files_yield_empty_set() {
        let dir = std::env::temp_dir().join("vhostforge-missing");
        let records = read_sites(&dir.join("no-http.conf"), &dir.join("no-ssl.conf")).unwrap();
        assert!(records.is_empty());
    }
}
