//! Tagscan - keeps the Librarian catalog in sync with embedded file tags
//!
//! Runs a single scan (`--once`) or stays resident and rescans on a cron
//! schedule (`--daemon`, the default).

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tagscan::app_mode::RunMode;
use tagscan::cli::CliOptions;
use tagscan::config::Config;
use tagscan::db::{Database, database_url};
use tagscan::jobs;
use tagscan::services::{TracingFailureReporter, create_scanner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = CliOptions::from_args();
    let mut config = Config::from_env()?;
    if let Some(mode) = cli.run_mode_override {
        config.run_mode = mode;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tagscan=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!(run_mode = ?config.run_mode, "Starting tagscan");

    if !config.database_url.starts_with("sqlite:") {
        if let Some(parent) = std::path::Path::new(&config.database_url).parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let db = Database::connect(
        &database_url(&config.database_url),
        config.database_max_connections,
    )
    .await?;
    db.migrate().await?;
    tracing::info!("Database connected");

    let reporter = Arc::new(TracingFailureReporter::new());
    let scanner = create_scanner(db, reporter.clone());
    let state_logger = tokio::spawn(jobs::log_state_changes(scanner.observe_state()));

    match config.run_mode {
        RunMode::Once => {
            let outcome = scanner.scan().await;
            let counts = reporter.counts();
            tracing::info!(
                ?outcome,
                fatal_failures = counts.fatal,
                item_failures = counts.item,
                "Scan finished"
            );
        }
        RunMode::Daemon => {
            if config.scan_on_startup {
                scanner.trigger_scan();
            }
            let mut scheduler = jobs::start_scheduler(scanner.clone(), &config.scan_schedule).await?;

            tokio::signal::ctrl_c().await?;
            tracing::info!("Shutting down");
            scheduler.shutdown().await?;
        }
    }

    state_logger.abort();
    Ok(())
}
