use std::convert::Infallible;
use std::sync::Arc;

use warp::http::Method;
use warp::Filter;

use crate::engine::TaskQueryEngine;
use crate::store::Storage;

pub mod rejection;
pub mod schedules;
pub mod tasks;

pub type SharedEngine<S> = Arc<TaskQueryEngine<S>>;

pub(crate) fn with_engine<S: Storage>(
  engine: SharedEngine<S>,
) -> impl Filter<Extract = (SharedEngine<S>,), Error = Infallible> + Clone {
  warp::any().map(move || engine.clone())
}

pub fn routes<S: Storage>(
  engine: SharedEngine<S>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
  schedules::schedule_routes(engine.clone())
    .or(tasks::task_routes(engine))
}

pub fn cors(origins: &[String]) -> warp::cors::Builder {
  warp::cors()
    .allow_origins(origins.iter().map(String::as_str))
    .allow_credentials(true)
    .allow_methods(vec![Method::GET, Method::OPTIONS])
    .allow_headers(vec!["content-type", "accept", "authorization"])
}

/// The full API: routes, error rendering, CORS and request tracing.
pub fn api<S: Storage>(
  engine: SharedEngine<S>,
  origins: Vec<String>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
  routes(engine)
    .recover(rejection::handle_rejection)
    .with(cors(&origins))
    .with(warp::trace::request())
}
