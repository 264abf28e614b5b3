use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use login_ingest::config::Config;
use login_ingest::infra::sqs_client::SqsQueue;
use login_ingest::pipeline::{PollController, SqliteStore};
use login_ingest::{logging, metrics};

#[derive(Parser)]
#[command(name = "login_ingest")]
#[command(about = "Drains the login queue into the user_logins store, masking PII on the way")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database path, overrides store.path
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging();
    metrics::init_metrics();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(path) = cli.database {
        config.store.path = path;
    }

    info!(
        queue_url = %config.queue.queue_url,
        store = %config.store.path.display(),
        idle_ceiling_secs = config.poll.idle_ceiling_secs,
        "Starting login ingestion"
    );

    let store = SqliteStore::open(&config.store.path).context("opening login store")?;
    let queue = SqsQueue::new(&config.queue).context("building queue client")?;

    let summary = PollController::new(queue, store, config.poll)
        .run()
        .await
        .context("poll loop failed")?;

    info!(
        rows = summary.rows_persisted,
        rejected = summary.messages_rejected,
        "Exiting"
    );
    Ok(())
}
