use std::convert::Infallible;

use serde::Serialize;
use tracing::{debug, error};
use warp::http::StatusCode;
use warp::Rejection;

use crate::error::QueryError;

#[derive(Debug, Serialize)]
struct ErrorBody {
  detail: String,
}

pub async fn handle_rejection(err: Rejection) -> Result<impl warp::Reply, Infallible> {
  let (status, detail) = if let Some(query_err) = err.find::<QueryError>() {
    if query_err.status().is_server_error() {
      error!("Request failed: {}", query_err);
    } else {
      debug!("Request rejected: {}", query_err);
    }
    (query_err.status(), query_err.public_message())
  } else if err.is_not_found() {
    (StatusCode::NOT_FOUND, "Not Found".to_string())
  } else if let Some(invalid) = err.find::<warp::reject::InvalidQuery>() {
    (StatusCode::BAD_REQUEST, invalid.to_string())
  } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
    (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string())
  } else {
    error!("Unhandled rejection: {:?}", err);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
  };

  Ok(warp::reply::with_status(warp::reply::json(&ErrorBody { detail }), status))
}
