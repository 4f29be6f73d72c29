//! Headless host binary speaking newline-delimited JSON over stdin/stdout.
//!
//! Reads `CommandEnvelope` lines from stdin and writes responses and events
//! to stdout. All tracing output goes to stderr so stdout stays a clean
//! protocol channel.
//!
//! The config file defaults to `<config_dir>/config.toml`; set
//! `DAYPLAN_CONFIG` to use another path.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use dayplan::calendar::now_epoch_millis;
use dayplan::host::stdio::run_stdio_bridge;
use dayplan::{
    PlannerConfig, SqliteTaskStore, SystemClock, TaskViewProjector, TokioReminderScheduler,
    mutation_channel,
};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::var_os("DAYPLAN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(PlannerConfig::default_config_path);
    let config = PlannerConfig::load_or_default(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let db_path = config.store.resolved_db_path();
    let store = SqliteTaskStore::open(&db_path)
        .with_context(|| format!("opening task store at {}", db_path.display()))?;
    if config.store.seed_sample_task {
        if let Some(id) = store.seed_sample_task(now_epoch_millis())? {
            tracing::info!(task_id = %id, "seeded sample task");
        }
    }
    let schema_version = store.schema_version()?;
    tracing::info!(
        db = %db_path.display(),
        schema_version = ?schema_version,
        "dayplan-host starting"
    );

    let (fired_tx, fired_rx) = mpsc::unbounded_channel();
    let scheduler = TokioReminderScheduler::new(fired_tx)?;

    let (client, coordinator) = mutation_channel(
        &config.coordinator,
        TaskViewProjector::new(config.timeline.hide_completed),
        Arc::new(store),
        Arc::new(scheduler),
        Arc::new(SystemClock),
    )?;
    let coordinator_handle = coordinator.spawn();

    // The bridge owns the only client; the coordinator exits once it returns.
    run_stdio_bridge(client, Some(fired_rx)).await.map_err(|e| {
        tracing::error!(error = %e, "dayplan-host exited with error");
        anyhow::anyhow!("dayplan-host failed: {e}")
    })?;
    let _ = coordinator_handle.await;

    tracing::info!("dayplan-host shut down cleanly");
    Ok(())
}
