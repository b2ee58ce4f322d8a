//! reaper - tag-driven cloud resource lifecycle sweeper
//!
//! Wires together configuration loading, the inventory-backed cloud adapter,
//! the chat notifier, the audit store and the sweeper, then runs a single
//! sweep for the requested run date.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use reaper_cloud_api::{CloudAdapter, Notifier};
use reaper_cloud_file::{InventoryCloud, LogNotifier, SlackNotifier};
use reaper_config::{load_config, NotifierConfig, Policy};
use reaper_core::{SweepOptions, SweepReport, Sweeper};
use reaper_store::{SqliteStore, Store};
use reaper_util::{
    default_config_path, format_iso_date, parse_iso_date, Region, AUDIT_DB_FILENAME,
    REAPER_DATA_DIR_ENV,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// reaper - Tag-driven lifecycle sweeper for cloud resources
#[derive(Parser, Debug)]
#[command(name = "reaper")]
#[command(about = "Tag-driven lifecycle sweeper for cloud resources", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/tag-reaper/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Run as if today were this date (yyyy-mm-dd)
    #[arg(long, value_parser = parse_run_date)]
    run_date: Option<NaiveDate>,

    /// Log what would happen without writing tags, acting or sending direct messages
    #[arg(long)]
    dry_run: bool,

    /// Region to process; repeat for several (overrides config regions)
    #[arg(short, long = "region")]
    regions: Vec<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Inventory file override
    #[arg(short, long)]
    inventory: Option<PathBuf>,

    /// Data directory override (or set REAPER_DATA_DIR env var)
    #[arg(short, long, env = REAPER_DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,
}

fn parse_run_date(value: &str) -> Result<NaiveDate, String> {
    parse_iso_date(value).map_err(|e| e.to_string())
}

async fn build_cloud(args: &Args, policy: &Policy) -> Result<Arc<dyn CloudAdapter>> {
    let Some(path) = args
        .inventory
        .clone()
        .or_else(|| policy.global.inventory_path.clone())
    else {
        bail!("No inventory configured: pass --inventory or set global.inventory_path");
    };

    let cloud = InventoryCloud::open(&path)
        .await
        .with_context(|| format!("Failed to open inventory {:?}", path))?;
    Ok(Arc::new(cloud))
}

fn build_notifier(config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
    match config {
        NotifierConfig::Log => Ok(Arc::new(LogNotifier::new())),
        NotifierConfig::Slack {
            api_base,
            channel,
            token_env,
        } => match std::env::var(token_env) {
            Ok(token) if !token.is_empty() => {
                let notifier = SlackNotifier::new(api_base.clone(), channel.clone(), token)
                    .context("Failed to create chat client")?;
                info!(channel = %channel, "Chat notifications enabled");
                Ok(Arc::new(notifier))
            }
            _ => {
                warn!(
                    token_env = %token_env,
                    "Chat token not set, notifications will only be logged"
                );
                Ok(Arc::new(LogNotifier::new()))
            }
        },
    }
}

fn open_store(args: &Args, policy: &Policy) -> Result<Arc<dyn Store>> {
    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| policy.global.data_dir.clone());
    let db_path = data_dir.join(AUDIT_DB_FILENAME);

    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("Failed to open database {:?}", db_path))?;
    if !store.is_healthy() {
        bail!("Database {:?} is not usable", db_path);
    }
    info!(db_path = %db_path.display(), "Store initialized");
    Ok(Arc::new(store))
}

/// Exit status when a second interrupt aborts the run mid-resource
const FORCED_EXIT_CODE: i32 = 130;

/// Flag a graceful stop on the first interrupt. Returns `true` when a second
/// interrupt arrives and the process should exit immediately.
async fn handle_interrupts<F, Fut>(mut next_interrupt: F, shutdown: watch::Sender<bool>) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = next_interrupt().await {
        warn!(error = %e, "Cannot listen for interrupts");
        return false;
    }
    info!("Interrupt received, stopping after the current resource (interrupt again to abort)");
    let _ = shutdown.send(true);

    match next_interrupt().await {
        Ok(()) => {
            warn!("Second interrupt received, aborting");
            true
        }
        Err(_) => false,
    }
}

fn log_report(report: &SweepReport) {
    for (kind, count) in &report.notices {
        info!(notice = %kind, count, "Notices emitted");
    }
    for failure in &report.failures {
        error!(
            region = %failure.region,
            kind = %failure.kind,
            resource_id = ?failure.resource_id.as_ref().map(|id| id.as_str()),
            error = %failure.error,
            "Resource failed"
        );
    }
    info!(
        run_id = %report.run_id,
        run_date = %format_iso_date(report.run_date),
        dry_run = report.dry_run,
        actions = report.actions,
        failures = report.failures.len(),
        interrupted = report.interrupted,
        "Run complete"
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "reaper starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if handle_interrupts(tokio::signal::ctrl_c, shutdown_tx).await {
            std::process::exit(FORCED_EXIT_CODE);
        }
    });

    let policy = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    info!(
        config_path = %args.config.display(),
        kinds = policy.enabled_kinds().count(),
        "Configuration loaded"
    );

    let cloud = build_cloud(&args, &policy).await?;
    let notifier = build_notifier(&policy.notifier)?;
    let store = open_store(&args, &policy)?;

    let mut options = SweepOptions::new(args.run_date.unwrap_or_else(reaper_util::today));
    options.dry_run = args.dry_run;
    options.regions = args.regions.iter().map(Region::new).collect();

    let sweeper = Sweeper::new(policy, cloud, notifier, store, options);
    let report = sweeper.run(shutdown_rx).await?;
    log_report(&report);

    Ok(())
}
