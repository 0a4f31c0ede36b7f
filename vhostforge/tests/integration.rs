//! End-to-end tests over the real engine wiring: plain-filesystem shell
//! tools stand in for the privileged environment, `echo` stands in for the
//! syntax-test tool, and `true` for the service reload.

use std::path::Path;
use std::sync::Arc;
use vhostforge_core::settings::Settings;
use vhostforge_core::{CertStatus, SiteKind};
use vhostforge_engine::{AddSpec, MutationEngine, ShellPrivOps, TokioCommandRunner, UpdateSpec};

fn harmless_settings(dir: &Path) -> Settings {
    Settings {
        http_conf: dir.join("vhosts.conf"),
        ssl_conf: dir.join("vhosts-le-ssl.conf"),
        renewal_dir: dir.join("renewal"),
        backup_dir: dir.join("backups"),
        syntax_check_cmd: vec!["echo".to_string(), "Syntax OK".to_string()],
        reload_cmd: vec!["true".to_string()],
        cert_cmd: vec!["true".to_string()],
        cert_email: None,
        privilege_prefix: Vec::new(),
        command_timeout_secs: 10,
    }
}

fn real_engine(settings: Settings) -> MutationEngine {
    let runner = Arc::new(TokioCommandRunner::new(settings.command_timeout_secs));
    let privops = Arc::new(ShellPrivOps::new(runner.clone(), Vec::new()));
    MutationEngine::new(settings, runner, privops, None)
}

async fn list_sites(settings: &Settings) -> Vec<vhostforge_core::SiteRecord> {
    let mut records =
        vhostforge_config::read_sites(&settings.http_conf, &settings.ssl_conf).unwrap();
    let metadata = vhostforge_tls::load_renewal_dir(&settings.renewal_dir).await;
    vhostforge_tls::apply_metadata(&mut records, &metadata);
    records
}

#[tokio::test]
async fn test_full_site_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let settings = harmless_settings(dir.path());
    let engine = real_engine(settings.clone());

    // add a principal static site and a proxied subdomain
    engine
        .add_site(
            "example.com",
            AddSpec::Static {
                content_root: dir.path().join("www"),
            },
        )
        .await
        .unwrap();
    engine
        .add_site("app.example.com", AddSpec::Proxy { port: 3000 })
        .await
        .unwrap();

    let records = list_sites(&settings).await;
    assert_eq!(records.len(), 2);

    let parent = records.iter().find(|r| r.domain == "example.com").unwrap();
    assert_eq!(parent.kind, SiteKind::Static);
    assert!(!parent.is_subordinate);
    assert_eq!(parent.tls.status, CertStatus::None);

    let child = records.iter().find(|r| r.domain == "app.example.com").unwrap();
    assert_eq!(child.kind, SiteKind::Proxy);
    assert_eq!(child.proxy_port, Some(3000));
    assert!(child.is_subordinate);
    assert_eq!(child.parent_domain.as_deref(), Some("example.com"));

    // change the routing target and read it back
    engine
        .update_site("app.example.com", UpdateSpec::ProxyPort(4100))
        .await
        .unwrap();
    let records = list_sites(&settings).await;
    let child = records.iter().find(|r| r.domain == "app.example.com").unwrap();
    assert_eq!(child.proxy_port, Some(4100));

    // remove the subdomain; the parent must survive untouched
    engine.remove_site("app.example.com").await.unwrap();
    let records = list_sites(&settings).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].domain, "example.com");

    // removing it again is a distinct not-found error
    assert!(matches!(
        engine.remove_site("app.example.com").await,
        Err(vhostforge_core::Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_tls_merge_with_renewal_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let settings = harmless_settings(dir.path());

    std::fs::write(
        &settings.http_conf,
        concat!(
            "<VirtualHost *:80>\n",
            "    ServerName shop.example.com\n",
            "    ProxyPass / http://127.0.0.1:3000/\n",
            "</VirtualHost>\n",
        ),
    )
    .unwrap();
    std::fs::write(
        &settings.ssl_conf,
        concat!(
            "<VirtualHost *:443>\n",
            "    ServerName shop.example.com\n",
            "    ProxyPass / http://127.0.0.1:3000/\n",
            "    SSLEngine on\n",
            "    SSLCertificateFile /etc/letsencrypt/live/shop.example.com/fullchain.pem\n",
            "    SSLCertificateKeyFile /etc/letsencrypt/live/shop.example.com/privkey.pem\n",
            "</VirtualHost>\n",
        ),
    )
    .unwrap();

    std::fs::create_dir_all(&settings.renewal_dir).unwrap();
    let expiry = chrono::Utc::now() + chrono::Duration::days(10) + chrono::Duration::hours(2);
    std::fs::write(
        settings.renewal_dir.join("shop.example.com.conf"),
        format!("version = 2.1\nexpiry_date = {}\n", expiry.to_rfc3339()),
    )
    .unwrap();

    let records = list_sites(&settings).await;
    assert_eq!(records.len(), 1);

    let shop = &records[0];
    assert_eq!(shop.domain, "shop.example.com");
    assert!(shop.tls.enabled);
    assert_eq!(shop.tls.status, CertStatus::Active);
    assert_eq!(shop.tls.days_remaining, Some(10));
    assert!(shop.tls.expires_at.is_some());
}

#[tokio::test]
async fn test_rejected_syntax_rolls_back_with_real_tools() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = harmless_settings(dir.path());

    let engine = real_engine(settings.clone());
    engine
        .add_site("keep.example.com", AddSpec::Proxy { port: 3000 })
        .await
        .unwrap();
    let before = std::fs::read_to_string(&settings.http_conf).unwrap();

    // the checker now reports an error instead of the marker
    settings.syntax_check_cmd =
        vec!["echo".to_string(), "AH00526: Syntax error on line 2".to_string()];
    let engine = real_engine(settings.clone());

    let err = engine
        .add_site("bad.example.com", AddSpec::Proxy { port: 4000 })
        .await
        .unwrap_err();
    match err {
        vhostforge_core::Error::SyntaxCheck { output, inspect_path } => {
            assert!(output.contains("AH00526"));
            assert!(inspect_path.is_some());
        }
        other => panic!("expected SyntaxCheck, got {:?}", other),
    }

    assert_eq!(std::fs::read_to_string(&settings.http_conf).unwrap(), before);
}
