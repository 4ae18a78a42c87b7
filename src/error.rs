use std::time::Duration;

use thiserror::Error;
use warp::http::StatusCode;

#[derive(Error, Debug)]
pub enum QueryError {
  #[error("{0} not found")]
  NotFound(&'static str),

  #[error("Unsupported search key: {0}")]
  UnsupportedFilterKey(String),

  #[error("Invalid date range: {0}")]
  InvalidDateRange(String),

  #[error("Invalid pagination: {0}")]
  InvalidPagination(String),

  #[error("Request timed out after {0:?}")]
  Timeout(Duration),

  #[error("Unknown result type code: {0}")]
  InvalidResultType(i32),

  #[error("Query failed: {0}")]
  Storage(#[from] sqlx::Error),
}

impl QueryError {
  pub fn status(&self) -> StatusCode {
    match self {
      QueryError::NotFound(_) => StatusCode::NOT_FOUND,
      QueryError::UnsupportedFilterKey(_)
      | QueryError::InvalidDateRange(_)
      | QueryError::InvalidPagination(_) => StatusCode::BAD_REQUEST,
      QueryError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
      QueryError::InvalidResultType(_) | QueryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  /// Message safe to hand back to the caller. Storage internals stay in the logs.
  pub fn public_message(&self) -> String {
    match self {
      QueryError::Storage(_) | QueryError::InvalidResultType(_) => "Internal server error".to_string(),
      other => other.to_string(),
    }
  }
}

impl warp::reject::Reject for QueryError {}
