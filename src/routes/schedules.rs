use warp::Filter;
use tracing::info;

use crate::routes::{with_engine, SharedEngine};
use crate::store::Storage;

pub fn schedule_routes<S: Storage>(
  engine: SharedEngine<S>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
  let list = warp::path("schedules")
    .and(warp::path::end())
    .and(warp::get())
    .and(with_engine(engine.clone()))
    .and_then(handle_list_schedules);

  let one = warp::path!("schedules" / i32)
    .and(warp::get())
    .and(with_engine(engine))
    .and_then(handle_get_schedule);

  list.or(one)
}

async fn handle_list_schedules<S: Storage>(engine: SharedEngine<S>) -> Result<impl warp::Reply, warp::Rejection> {
  let schedules = engine.schedules().await.map_err(warp::reject::custom)?;
  info!("Listed {} schedules", schedules.len());
  Ok(warp::reply::json(&schedules))
}

async fn handle_get_schedule<S: Storage>(
  schedule_id: i32,
  engine: SharedEngine<S>,
) -> Result<impl warp::Reply, warp::Rejection> {
  let schedule = engine.schedule(schedule_id).await.map_err(warp::reject::custom)?;
  Ok(warp::reply::json(&schedule))
}
