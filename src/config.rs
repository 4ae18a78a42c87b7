use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost,http://localhost:8080,http://localhost:8000";

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub server_port: u16,
  pub request_timeout: Duration,
  pub max_connections: u32,
  pub cors_origins: Vec<String>,
}

impl Config {
  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|name| env::var(name).ok())
  }

  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;
    let server_port = parse_or(&lookup, "SERVER_PORT", DEFAULT_PORT)?;
    let timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
    let max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
    let cors_origins = parse_origins(&lookup("CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.into()))?;

    if timeout_secs == 0 {
      bail!("REQUEST_TIMEOUT_SECS must be greater than zero");
    }

    Ok(Self {
      database_url,
      server_port,
      request_timeout: Duration::from_secs(timeout_secs),
      max_connections,
      cors_origins,
    })
  }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
  T: std::str::FromStr,
  T::Err: std::error::Error + Send + Sync + 'static,
{
  match lookup(name) {
    Some(raw) => raw.trim().parse().with_context(|| format!("{} has an invalid value '{}'", name, raw)),
    None => Ok(default),
  }
}

fn parse_origins(raw: &str) -> Result<Vec<String>> {
  let origins: Vec<String> = raw
    .split(',')
    .map(str::trim)
    .filter(|origin| !origin.is_empty())
    .map(String::from)
    .collect();
  for origin in &origins {
    if !(origin.starts_with("http://") || origin.starts_with("https://")) {
      bail!("CORS origin '{}' must start with http:// or https://", origin);
    }
  }
  Ok(origins)
}
