//! harvester CLI
//!
//! Subcommands mirror the pipeline stages: `capture` drives the browser and
//! persists raw order artifacts, `process` reconciles artifacts and payments
//! exports into CSV tables, `sync` mirrors artifacts between backends.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

use harvester::capture::{self, CaptureConfig, OrderCapture};
use harvester::config::{Config, StorageTarget};
use harvester::normalize::normalize_orders;
use harvester::payments::{self, PaymentsTables};
use harvester::report::write_reports;
use harvester::storage::{backend_for, load_raw_orders, sync_backends};
use portal_client::{SessionConfig, SessionState, WebDriverSession};

#[derive(Parser)]
#[command(
    name = "harvester",
    about = "Seller-portal order acquisition and reconciliation pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture order artifacts for a date range
    Capture {
        /// Start date (MM/DD/YYYY)
        #[arg(long)]
        from: String,

        /// End date (MM/DD/YYYY)
        #[arg(long)]
        to: String,

        /// Storage backend for captured artifacts
        #[arg(long, value_enum, default_value = "local")]
        storage: StorageKind,

        /// Skip writes whose digest matches the stored artifact
        #[arg(long)]
        check_digest: bool,

        /// Resume with persisted cookies only; never attempt a credential login
        #[arg(long)]
        cookies_only: bool,
    },

    /// Normalize captured orders and emit CSV report tables
    Process {
        /// Storage backend holding captured artifacts
        #[arg(long, value_enum, default_value = "local")]
        storage: StorageKind,

        /// Directory holding payments exports (optional)
        #[arg(long)]
        payments: Option<PathBuf>,

        /// Output directory for report tables
        #[arg(long, default_value = "output")]
        out: PathBuf,
    },

    /// Mirror artifacts between the configured backends
    Sync {
        #[arg(long, value_enum)]
        direction: SyncDirection,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StorageKind {
    Local,
    S3,
}

#[derive(Clone, Copy, ValueEnum)]
enum SyncDirection {
    S3ToLocal,
    LocalToS3,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "harvester=info,portal_client=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().map_err(anyhow::Error::msg)?;

    match cli.command {
        Command::Capture {
            from,
            to,
            storage,
            check_digest,
            cookies_only,
        } => run_capture(&config, &from, &to, storage, check_digest, cookies_only).await,
        Command::Process {
            storage,
            payments,
            out,
        } => run_process(&config, storage, payments.as_deref(), &out).await,
        Command::Sync { direction } => run_sync(&config, direction).await,
    }
}

fn resolve_target(config: &Config, kind: StorageKind) -> anyhow::Result<StorageTarget> {
    match kind {
        StorageKind::Local => Ok(config.local_target()),
        StorageKind::S3 => config.s3_target().map_err(anyhow::Error::msg),
    }
}

async fn run_capture(
    config: &Config,
    from: &str,
    to: &str,
    kind: StorageKind,
    check_digest: bool,
    cookies_only: bool,
) -> anyhow::Result<()> {
    let target = resolve_target(config, kind)?;
    let storage = backend_for(&target).await?;

    let state = SessionState::load(&config.session_state_path)?;
    if state.is_some() {
        tracing::info!(path = %config.session_state_path.display(), "loaded session state");
    }

    let session_config = SessionConfig::new(config.webdriver_url.as_str())
        .with_page_load_timeout(config.page_load_timeout)
        .with_wait_timeout(config.wait_timeout)
        .with_headless(config.headless);
    let session = WebDriverSession::connect(session_config).await?;

    let capture_config = CaptureConfig {
        dashboard_url: config.dashboard_url.clone(),
        seller_portal_url: config.seller_portal_url.clone(),
        order_api_url: config.order_api_url.clone(),
        credentials: if cookies_only {
            None
        } else {
            config.credentials()
        },
        check_digest,
        settle_ms: config.settle_ms,
    };

    let capture = OrderCapture::new(&session, storage.as_ref(), capture_config);
    let outcome = capture.run(state.as_ref(), from, to).await;

    // Cookies persist and the driver dies on every exit path
    capture::teardown(&session, &config.session_state_path).await;

    let summary = outcome?;
    tracing::info!(
        captured = summary.captured,
        skipped_not_found = summary.skipped_not_found,
        failed = summary.failed,
        "capture run complete"
    );
    Ok(())
}

async fn run_process(
    config: &Config,
    kind: StorageKind,
    payments_dir: Option<&Path>,
    out: &Path,
) -> anyhow::Result<()> {
    let target = resolve_target(config, kind)?;
    let storage = backend_for(&target).await?;

    let raw_orders = load_raw_orders(storage.as_ref()).await?;
    tracing::info!(count = raw_orders.len(), "loaded captured orders");

    let (orders, lines) = normalize_orders(&raw_orders);

    let payments_tables = match payments_dir {
        Some(dir) => payments::load_payments_dir(dir)?,
        None => PaymentsTables::default(),
    };

    write_reports(out, &orders, &lines, &payments_tables)?;
    Ok(())
}

async fn run_sync(config: &Config, direction: SyncDirection) -> anyhow::Result<()> {
    let (source_target, destination_target) = match direction {
        SyncDirection::S3ToLocal => (
            config.s3_target().map_err(anyhow::Error::msg)?,
            config.local_target(),
        ),
        SyncDirection::LocalToS3 => (
            config.local_target(),
            config.s3_target().map_err(anyhow::Error::msg)?,
        ),
    };

    let source = backend_for(&source_target).await?;
    let destination = backend_for(&destination_target).await?;

    let summary = sync_backends(source.as_ref(), destination.as_ref()).await?;
    tracing::info!(%summary, "sync run complete");
    Ok(())
}
