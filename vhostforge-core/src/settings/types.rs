//! Settings type definitions
//!
//! These types describe where the managed configuration files live and which
//! external commands the engine drives.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runtime settings for the Vhostforge engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Plaintext-routing virtual host file
    #[serde(default = "default_http_conf")]
    pub http_conf: PathBuf,

    /// TLS-provisioned virtual host file written by the certificate tool
    #[serde(default = "default_ssl_conf")]
    pub ssl_conf: PathBuf,

    /// Certificate tool's renewal bookkeeping directory
    #[serde(default = "default_renewal_dir")]
    pub renewal_dir: PathBuf,

    /// Where timestamped backups and inspection copies are kept
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Syntax-test command; its combined output must contain "Syntax OK"
    #[serde(default = "default_syntax_check_cmd")]
    pub syntax_check_cmd: Vec<String>,

    /// Service reload command; any non-zero exit is a failure
    #[serde(default = "default_reload_cmd")]
    pub reload_cmd: Vec<String>,

    /// Certificate issuance tool
    #[serde(default = "default_cert_cmd")]
    pub cert_cmd: Vec<String>,

    /// Contact email passed to the certificate tool
    pub cert_email: Option<String>,

    /// Prefix for privileged file operations (typically `sudo`)
    #[serde(default = "default_privilege_prefix")]
    pub privilege_prefix: Vec<String>,

    /// Wall-clock limit for every external command
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

fn default_http_conf() -> PathBuf {
    PathBuf::from("/etc/apache2/sites-enabled/vhosts.conf")
}

fn default_ssl_conf() -> PathBuf {
    PathBuf::from("/etc/apache2/sites-enabled/vhosts-le-ssl.conf")
}

fn default_renewal_dir() -> PathBuf {
    PathBuf::from("/etc/letsencrypt/renewal")
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("/var/backups/vhostforge")
}

fn default_syntax_check_cmd() -> Vec<String> {
    vec!["apachectl".to_string(), "configtest".to_string()]
}

fn default_reload_cmd() -> Vec<String> {
    vec![
        "systemctl".to_string(),
        "reload".to_string(),
        "apache2".to_string(),
    ]
}

fn default_cert_cmd() -> Vec<String> {
    vec!["certbot".to_string()]
}

fn default_privilege_prefix() -> Vec<String> {
    vec!["sudo".to_string()]
}

fn default_command_timeout() -> u64 {
    60
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            http_conf: default_http_conf(),
            ssl_conf: default_ssl_conf(),
            renewal_dir: default_renewal_dir(),
            backup_dir: default_backup_dir(),
            syntax_check_cmd: default_syntax_check_cmd(),
            reload_cmd: default_reload_cmd(),
            cert_cmd: default_cert_cmd(),
            cert_email: None,
            privilege_prefix: default_privilege_prefix(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}
