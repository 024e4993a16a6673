use std::sync::Arc;

use anyhow::{Context, Result, bail};
use bracket::BracketEngine;
use clap::Parser;
use storage::Database;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "close-expired")]
#[command(about = "Complete every match whose voting window has elapsed", long_about = None)]
struct Cli {
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Only sweep matches of this competition
    #[arg(long)]
    competition_id: Option<i64>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = Database::new(&cli.database_url)
        .await
        .context("Failed to connect to database")?;

    let engine = BracketEngine::new(Arc::new(db.clone()), Arc::new(db));
    let summary = engine
        .close_expired(cli.competition_id)
        .await
        .context("Failed to sweep expired matches")?;

    tracing::info!(
        closed = summary.closed.len(),
        ties = summary.ties.len(),
        failures = summary.failures.len(),
        "Sweep finished"
    );
    for match_id in &summary.ties {
        tracing::warn!(match_id, "Voting ended in a tie; complete it with an explicit winner");
    }
    for failure in &summary.failures {
        tracing::error!(match_id = failure.match_id, error = %failure.error, "Failed to close match");
    }

    if !summary.failures.is_empty() {
        bail!("{} match(es) could not be closed", summary.failures.len());
    }

    Ok(())
}
