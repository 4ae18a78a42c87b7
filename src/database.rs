use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::Retry;
use tracing::{info, warn};

use crate::config::Config;

static MAX_RETRIES: usize = 5;
static DELAY: u64 = 100;

/// Connects the read pool. The schema is owned by the scheduler that writes
/// it; this service never migrates.
pub async fn setup_database(config: &Config) -> Result<PgPool> {
  let options = PgPoolOptions::new()
    .max_connections(config.max_connections)
    .acquire_timeout(config.request_timeout);

  let url = config.database_url.as_str();
  let pool = Retry::spawn(ExponentialBackoff::from_millis(DELAY).take(MAX_RETRIES), || {
    let attempt = options.clone().connect(url);
    async move {
      attempt.await.inspect_err(|e| warn!("Database connection attempt failed: {}", e))
    }
  })
    .await
    .context("Failed to connect to database")?;

  info!("Database pool ready (max {} connections)", config.max_connections);
  Ok(pool)
}
