use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use taskscope::{
  config::Config,
  database::setup_database,
  engine::TaskQueryEngine,
  routes::api,
  store::PgStorage,
};

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt::init();
  let config = Config::from_env()?;
  let db_pool = setup_database(&config).await?;

  let engine = Arc::new(TaskQueryEngine::new(PgStorage::new(db_pool), config.request_timeout));

  info!("Serving task API on port {}", config.server_port);
  warp::serve(api(engine, config.cors_origins.clone()))
    .run(([0, 0, 0, 0], config.server_port))
    .await;
  Ok(())
}
