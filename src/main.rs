use clap::{Parser, Subcommand};
use exn::{OptionExt, ResultExt};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tally::error::{ErrorKind, Result};
use tally::http::{self, AppState};
use tally_config::{Config, ObjectStoreDefaults};
use tally_engine::{Registry, ScanRequest, ScanStatus, Scanner};
use tally_storage::{ObjectStoreTarget, Target};
use tally_store::{Database, Repository};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Inventory files on local disks, S3-compatible buckets and network shares.
#[derive(Debug, Parser)]
#[command(name = "tally", version, about)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, env = "TALLY_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Address to listen on, overriding `server.bind`
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Run a single scan in the foreground and print its status as JSON
    Scan {
        /// Display name of the scan
        #[arg(long, global = true)]
        name: Option<String>,
        #[command(subcommand)]
        target: ScanTarget,
    },
}

#[derive(Debug, Subcommand)]
enum ScanTarget {
    /// A local directory
    Local { path: PathBuf },
    /// A mounted network share
    Share {
        path: PathBuf,
        #[arg(long)]
        share_name: String,
    },
    /// An S3-compatible bucket
    S3 {
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        prefix: Option<String>,
        /// Defaults to `object_store.region`
        #[arg(long)]
        region: Option<String>,
        /// Defaults to `object_store.endpoint`
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long, env = "AWS_ACCESS_KEY_ID")]
        key_id: String,
        #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
        key_secret: String,
    },
}
impl ScanTarget {
    fn into_target(self, defaults: &ObjectStoreDefaults) -> Target {
        match self {
            ScanTarget::Local { path } => Target::Local { path },
            ScanTarget::Share { path, share_name } => Target::Share { path, share_name },
            ScanTarget::S3 { bucket, prefix, region, endpoint, key_id, key_secret } => {
                Target::ObjectStore(ObjectStoreTarget {
                    bucket,
                    prefix,
                    region: region.unwrap_or_else(|| defaults.region.clone()),
                    endpoint: endpoint.or_else(|| defaults.endpoint.clone()),
                    key_id,
                    key_secret,
                })
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    tally::logging::init();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    match cli.command {
        Command::Serve { bind } => serve(config, bind).await,
        Command::Scan { name, target } => scan(config, name, target).await,
    }
}

async fn open_scanner(config: &Config) -> Result<Scanner> {
    if let Some(parent) = config.database.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Store)?;
    }
    let db = Database::connect(&config.database).await.or_raise(|| ErrorKind::Store)?;
    tracing::debug!(path = %config.database.display(), "Result store ready");
    Ok(Scanner::new(Arc::new(Registry::new()), Repository::from(&db)).with_timeout(config.scan.timeout()))
}

/// Periodically drop finished scans from memory; the store still has them.
fn spawn_pruner(registry: Arc<Registry>, retention: Duration) -> JoinHandle<()> {
    let period = retention.clamp(Duration::from_secs(1), Duration::from_secs(60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let removed = registry.prune(retention).await;
            if removed > 0 {
                tracing::debug!(removed, "Pruned finished scans");
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn serve(config: Config, bind: Option<SocketAddr>) -> Result<()> {
    let scanner = open_scanner(&config).await?;
    let pruner = spawn_pruner(Arc::clone(scanner.registry()), config.scan.retention());
    let bind = bind.unwrap_or(config.server.bind);
    let listener = TcpListener::bind(bind).await.or_raise(|| ErrorKind::Server)?;
    tracing::info!(%bind, "Listening");

    let app = http::router(AppState::new(scanner, config));
    let served = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await;
    pruner.abort();
    served.or_raise(|| ErrorKind::Server)
}

async fn scan(config: Config, name: Option<String>, target: ScanTarget) -> Result<()> {
    let scanner = open_scanner(&config).await?;
    let target = target.into_target(&config.object_store);
    let kind = target.kind();
    let submission = scanner.submit(ScanRequest { target, name }).await.or_raise(|| ErrorKind::Scan)?;
    let id = submission.id;

    // Ctrl-C stops the scan; whatever was found so far is kept.
    let stopper = {
        let scanner = scanner.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                if let Err(err) = scanner.stop(kind, &id).await {
                    tracing::debug!(error = %*err, "Could not stop scan");
                }
            }
        })
    };
    let finished = submission.handle.await;
    stopper.abort();
    finished.or_raise(|| ErrorKind::Scan)?;

    let status = scanner.status(&id).await.or_raise(|| ErrorKind::Scan)?.ok_or_raise(|| ErrorKind::Scan)?;
    let json = serde_json::to_string_pretty(&status).or_raise(|| ErrorKind::Scan)?;
    println!("{json}");
    if status.status == ScanStatus::Failed {
        exn::bail!(ErrorKind::ScanFailed(status.error.unwrap_or_default()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_s3_target_uses_configured_defaults() {
        let cli = Cli::try_parse_from([
            "tally", "scan", "--name", "Archive", "s3", "--bucket", "archive", "--key-id", "AKIA", "--key-secret",
            "secret",
        ])
        .unwrap();
        let Command::Scan { name, target } = cli.command else { panic!("expected scan command") };
        assert_eq!(name.as_deref(), Some("Archive"));
        let defaults = ObjectStoreDefaults { region: "eu-west-1".to_string(), endpoint: None };
        let Target::ObjectStore(store) = target.into_target(&defaults) else { panic!("expected object store") };
        assert_eq!(store.bucket, "archive");
        assert_eq!(store.region, "eu-west-1");
        assert_eq!(store.prefix, None);
    }

    #[test]
    fn test_share_requires_share_name() {
        assert!(Cli::try_parse_from(["tally", "scan", "share", "/mnt/finance"]).is_err());
        let cli = Cli::try_parse_from(["tally", "scan", "share", "/mnt/finance", "--share-name", "finance"]).unwrap();
        let Command::Scan { target, .. } = cli.command else { panic!("expected scan command") };
        assert_eq!(
            target.into_target(&ObjectStoreDefaults::default()),
            Target::Share { path: "/mnt/finance".into(), share_name: "finance".to_string() }
        );
    }
}
