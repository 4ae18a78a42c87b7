use serde::Deserialize;
use tracing::info;
use warp::Filter;

use crate::engine::{ResultParams, SearchParams};
use crate::query::pager::{DEFAULT_LIMIT, DEFAULT_PAGE};
use crate::query::PageRequest;
use crate::routes::{with_engine, SharedEngine};
use crate::store::Storage;

fn default_page() -> u32 {
  DEFAULT_PAGE
}

fn default_limit() -> u32 {
  DEFAULT_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
  pub page: Option<u32>,
  pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
  #[serde(default = "default_page")]
  pub page: u32,
  #[serde(default = "default_limit")]
  pub limit: u32,
  pub key: Option<String>,
  pub content: Option<String>,
  pub startdate: Option<String>,
  pub enddate: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResultQuery {
  #[serde(default = "default_page")]
  pub page: u32,
  #[serde(default = "default_limit")]
  pub limit: u32,
  pub key: Option<String>,
  pub startdate: Option<String>,
  pub enddate: Option<String>,
}

pub fn task_routes<S: Storage>(
  engine: SharedEngine<S>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
  let list = warp::path("tasks")
    .and(warp::path::end())
    .and(warp::get())
    .and(warp::query::<ListQuery>())
    .and(with_engine(engine.clone()))
    .and_then(handle_list_tasks);

  let search = warp::path!("tasks" / "search")
    .and(warp::get())
    .and(warp::query::<SearchQuery>())
    .and(with_engine(engine.clone()))
    .and_then(handle_search_tasks);

  let results = warp::path!("tasks" / i32)
    .and(warp::get())
    .and(warp::query::<ResultQuery>())
    .and(with_engine(engine.clone()))
    .and_then(handle_task_results);

  let detail = warp::path!("tasks" / i32 / "detail")
    .and(warp::get())
    .and(with_engine(engine))
    .and_then(handle_task_detail);

  list.or(search).or(results).or(detail)
}

async fn handle_list_tasks<S: Storage>(
  query: ListQuery,
  engine: SharedEngine<S>,
) -> Result<impl warp::Reply, warp::Rejection> {
  let page = match (query.page, query.limit) {
    (None, None) => None,
    (page, limit) => Some(
      PageRequest::new(page.unwrap_or(DEFAULT_PAGE), limit.unwrap_or(DEFAULT_LIMIT))
        .map_err(warp::reject::custom)?,
    ),
  };
  let tasks = engine.tasks(page).await.map_err(warp::reject::custom)?;
  Ok(warp::reply::json(&tasks))
}

async fn handle_search_tasks<S: Storage>(
  query: SearchQuery,
  engine: SharedEngine<S>,
) -> Result<impl warp::Reply, warp::Rejection> {
  let page = PageRequest::new(query.page, query.limit).map_err(warp::reject::custom)?;
  let params = SearchParams {
    key: query.key,
    content: query.content,
    startdate: query.startdate,
    enddate: query.enddate,
  };
  let paged = engine.search_tasks(page, &params).await.map_err(warp::reject::custom)?;
  info!(
    "Search key={:?} page={} matched {} tasks",
    params.key, paged.pagination.now_page, paged.pagination.total
  );
  Ok(warp::reply::json(&paged))
}

async fn handle_task_results<S: Storage>(
  task_id: i32,
  query: ResultQuery,
  engine: SharedEngine<S>,
) -> Result<impl warp::Reply, warp::Rejection> {
  let page = PageRequest::new(query.page, query.limit).map_err(warp::reject::custom)?;
  let params = ResultParams {
    key: query.key,
    startdate: query.startdate,
    enddate: query.enddate,
  };
  let paged = engine.task_results(task_id, page, &params).await.map_err(warp::reject::custom)?;
  Ok(warp::reply::json(&paged))
}

async fn handle_task_detail<S: Storage>(
  task_id: i32,
  engine: SharedEngine<S>,
) -> Result<impl warp::Reply, warp::Rejection> {
  let detail = engine.task_detail(task_id).await.map_err(warp::reject::custom)?;
  Ok(warp::reply::json(&detail))
}
