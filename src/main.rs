use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use decentralhire_projector::store::PgStore;
use decentralhire_projector::event::EVENT_SCHEMA_VERSION;
use decentralhire_projector::{event_loop, IngestionGate, ProjectorConfig, TransitionPolicy};
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Delay between polls when there are no pending event records
    #[arg(long, default_value = "2000")]
    poll_interval_ms: u64,

    /// Maximum number of event records handled per poll
    #[arg(long, default_value = "100")]
    batch_size: usize,

    /// Size of the database connection pool
    #[arg(long, default_value = "5")]
    max_connections: u32,

    /// How application status events are checked against the stored status
    #[arg(long, value_enum, default_value_t = TransitionPolicy::Unconditional)]
    transition_policy: TransitionPolicy,

    /// Accept application events without a job posting address
    #[arg(long)]
    allow_missing_job_posting_address: bool,
}

async fn run() -> Result<()> {
    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let store = PgStore::connect(&database_url, args.max_connections)
        .context("failed to connect to the database")?;

    info!("Applying pending migrations");
    store.run_pending_migrations().await?;

    let config = ProjectorConfig {
        transition_policy: args.transition_policy,
        require_job_posting_address: !args.allow_missing_job_posting_address,
    };
    info!(?config, schema_version = EVENT_SCHEMA_VERSION, "starting projector");

    let gate = Arc::new(IngestionGate::new(Arc::new(store), config));

    tokio::select! {
        res = event_loop(gate, args.batch_size, Duration::from_millis(args.poll_interval_ms)) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // seems messy, see if there is a better way
    let mut filter = EnvFilter::new("info");
    if let Ok(var) = std::env::var("RUST_LOG") {
        filter = filter.add_directive(var.parse()?);
    }
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_env_filter(filter)
        .init();

    let _ = run().await.inspect_err(|e| error!(?e, "run error"));

    Ok(())
}
