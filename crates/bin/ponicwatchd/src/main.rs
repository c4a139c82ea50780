//! `ponicwatchd` is the composition root of the controller: it loads the
//! configuration, opens the SQLite database, registers the driver catalog and
//! runs the supervisor until the process receives an interrupt signal.

mod config;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ponicwatch_adapter_storage_sqlite_sqlx::{
    Config as DatabaseConfig, SqliteEntityStore, SqliteLogSink,
};
use ponicwatch_app::orchestrator::Orchestrator;
use ponicwatch_app::ports::{EntityStore, LogSink, Notifier};
use ponicwatch_domain::error::PwError;

use crate::config::Config;

/// Delivers alerts into the process log. Stands in until a real mail
/// transport is wired into the daemon.
struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(
        &self,
        subject: &str,
        html_body: &str,
        attachments: &[String],
    ) -> Result<(), PwError> {
        tracing::warn!(subject, body = html_body, ?attachments, "notification");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_new(
            &config.logging.filter,
        )?)
        .init();

    tracing::info!(database = %config.database.url, "starting ponicwatchd");

    let database = DatabaseConfig {
        database_url: config.database.url.clone(),
    }
    .build()
    .await?;
    let pool = database.pool().clone();
    let store: Arc<dyn EntityStore> = Arc::new(SqliteEntityStore::new(pool.clone()));
    let log: Arc<dyn LogSink> = Arc::new(SqliteLogSink::new(pool));
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);

    let catalog = ponicwatch_adapter_sim::catalog();
    let mut orchestrator = Orchestrator::build(store, &catalog, log, notifier).await?;
    tracing::info!(jobs = orchestrator.job_count(), "entities wired");

    orchestrator.start().await;

    tokio::signal::ctrl_c().await?;
    orchestrator
        .shutdown(Duration::from_secs(config.shutdown.grace_seconds))
        .await;
    Ok(())
}
