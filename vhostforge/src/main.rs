//! Vhostforge - virtual host configuration engine for Apache
//!
//! This is the main entry point for the Vhostforge CLI.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vhostforge_core::settings::{Settings, SettingsLoader};
use vhostforge_engine::{AddSpec, ConfTarget, MutationEngine, UpdateSpec};
use vhostforge_tls::CertbotIssuer;

/// Vhostforge - manage Apache virtual hosts without ever leaving the
/// configuration broken or unreloaded
#[derive(Parser)]
#[command(name = "vhostforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the settings file
    #[arg(long, global = true, default_value = "/etc/vhostforge/settings.toml")]
    settings: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all sites as JSON, merged across both files and the renewal
    /// metadata
    List,

    /// Add a new site
    Add {
        /// Domain name of the new site
        domain: String,

        /// Proxy requests to this loopback port
        #[arg(long, conflicts_with = "root")]
        port: Option<u16>,

        /// Serve static content from this directory
        #[arg(long)]
        root: Option<PathBuf>,

        /// Skip certificate issuance for the new site
        #[arg(long)]
        no_cert: bool,
    },

    /// Change an existing site's routing port or content root
    Update {
        /// Domain name of the site to change
        domain: String,

        /// New loopback port
        #[arg(long, conflicts_with = "root")]
        port: Option<u16>,

        /// New content root
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Remove a site from both files
    Remove {
        /// Domain name of the site to remove
        domain: String,
    },

    /// Replace one managed file wholesale
    Upload {
        /// Which file to replace: http or ssl
        #[arg(value_parser = parse_target)]
        target: ConfTarget,

        /// File holding the new content
        file: PathBuf,
    },

    /// Run the syntax-test tool and print its output
    Check,

    /// Show version information
    Version,
}

fn parse_target(value: &str) -> Result<ConfTarget, String> {
    match value {
        "http" => Ok(ConfTarget::Http),
        "ssl" => Ok(ConfTarget::Ssl),
        other => Err(format!("expected 'http' or 'ssl', got '{}'", other)),
    }
}

/// Bridges the engine's issuance follow-up to the certificate tool
struct CertbotBridge(CertbotIssuer);

#[async_trait::async_trait]
impl vhostforge_engine::CertIssuer for CertbotBridge {
    async fn issue(&self, domain: &str) -> Result<(), String> {
        self.0.issue(domain).await.map_err(|e| e.to_string())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    let settings = SettingsLoader::load(&cli.settings)?;

    match cli.command {
        Commands::List => {
            let records = list_sites(&settings).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }

        Commands::Add {
            domain,
            port,
            root,
            no_cert,
        } => {
            let spec = match (port, root) {
                (Some(port), None) => AddSpec::Proxy { port },
                (None, Some(content_root)) => AddSpec::Static { content_root },
                _ => anyhow::bail!("pass exactly one of --port or --root"),
            };

            let mut engine = MutationEngine::with_defaults(settings.clone());
            if !no_cert {
                let issuer = CertbotIssuer::new(
                    settings.cert_cmd.clone(),
                    settings.cert_email.clone(),
                    settings.command_timeout_secs,
                );
                engine = engine.with_issuer(Arc::new(CertbotBridge(issuer)));
            }

            let report = engine.add_site(&domain, spec).await?;
            println!("✅ Site {} added", domain);
            if let Some(warning) = report.cert_warning {
                eprintln!("⚠️ Site added, but certificate issuance failed: {}", warning);
            }
        }

        Commands::Update { domain, port, root } => {
            let change = match (port, root) {
                (Some(port), None) => UpdateSpec::ProxyPort(port),
                (None, Some(root)) => UpdateSpec::ContentRoot(root),
                _ => anyhow::bail!("pass exactly one of --port or --root"),
            };

            let engine = MutationEngine::with_defaults(settings);
            engine.update_site(&domain, change).await?;
            println!("✅ Site {} updated", domain);
        }

        Commands::Remove { domain } => {
            let engine = MutationEngine::with_defaults(settings);
            engine.remove_site(&domain).await?;
            println!("✅ Site {} removed", domain);
        }

        Commands::Upload { target, file } => {
            let content = std::fs::read_to_string(&file)?;
            let engine = MutationEngine::with_defaults(settings);
            let report = engine.upload_config(target, &content).await?;
            if report.changed {
                println!("✅ Configuration replaced and reloaded");
            } else {
                println!("✅ Content identical, nothing to do");
            }
        }

        Commands::Check => {
            let runner = vhostforge_engine::TokioCommandRunner::new(settings.command_timeout_secs);
            use vhostforge_engine::CommandRunner;
            let output = runner.run(&settings.syntax_check_cmd).await?;
            print!("{}", output.combined());
            if !output.combined().contains("Syntax OK") {
                std::process::exit(1);
            }
        }

        Commands::Version => {
            println!("Vhostforge v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// The read path: parse both files, merge, classify, and fold in renewal
/// metadata
async fn list_sites(settings: &Settings) -> anyhow::Result<Vec<vhostforge_core::SiteRecord>> {
    let mut records = vhostforge_config::read_sites(&settings.http_conf, &settings.ssl_conf)?;
    let metadata = vhostforge_tls::load_renewal_dir(&settings.renewal_dir).await;
    vhostforge_tls::apply_metadata(&mut records, &metadata);
    Ok(records)
}
