//! Block templates for new sites

use std::path::Path;

/// Proxy-backed site: everything forwarded to a loopback port
pub fn proxy_block(domain: &str, port: u16) -> String {
    format!(
        r#"<VirtualHost *:80>
    ServerName {domain}
    ProxyPreserveHost On
    ProxyPass / http://127.0.0.1:{port}/
    ProxyPassReverse / http://127.0.0.1:{port}/
    ErrorLog ${{APACHE_LOG_DIR}}/{domain}-error.log
    CustomLog ${{APACHE_LOG_DIR}}/{domain}-access.log combined
</VirtualHost>
"#
    )
}

/// Static-content site with standard browsing and override options
pub fn static_block(domain: &str, content_root: &Path) -> String {
    let root = content_root.display();
    format!(
        r#"<VirtualHost *:80>
    ServerName {domain}
    DocumentRoot {root}
    <Directory {root}>
        Options Indexes FollowSymLinks
        AllowOverride All
        Require all granted
    </Directory>
    ErrorLog ${{APACHE_LOG_DIR}}/{domain}-error.log
    CustomLog ${{APACHE_LOG_DIR}}/{domain}-access.log combined
</VirtualHost>
"#
    )
}
