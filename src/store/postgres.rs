use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use tracing::debug;

use crate::error::QueryError;
use crate::models::{Schedule, Task, TaskLog, TaskResult, TaskSummary};
use crate::query::latest::LATEST_RESULTS_SQL;
use crate::query::{Predicate, ResultFilter, Slice};
use crate::store::{Session, Storage};

const SCHEDULE_COLUMNS: &str = "schedule_id, schedule_name, start_time, cycle_type, everyhour_info, daily_info, \
   weekly_info, monthly_info, option, reg_date";

const TASK_COLUMNS: &str = "t.task_id, t.schedule_id, t.task_name, t.task_type, t.workflow_name_info, t.is_using, \
   t.next_runtime, t.created_at, t.updated_at, t.deleted_at, t.reg_date";

const RESULT_COLUMNS: &str = "result_id, task_id, result_type, error, start_time, end_time, reg_date";

#[derive(Clone)]
pub struct PgStorage {
  pool: PgPool,
}

impl PgStorage {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl Storage for PgStorage {
  type Session = PgSession;

  async fn session(&self) -> Result<PgSession, QueryError> {
    let conn = self.pool.acquire().await?;
    Ok(PgSession { conn })
  }
}

/// A pooled connection held for the lifetime of one request.
pub struct PgSession {
  conn: PoolConnection<Postgres>,
}

fn bind_i64(value: u64) -> i64 {
  i64::try_from(value).unwrap_or(i64::MAX)
}

fn push_slice(qb: &mut QueryBuilder<'static, Postgres>, slice: Slice) {
  qb.push(" LIMIT ").push_bind(bind_i64(slice.limit));
  qb.push(" OFFSET ").push_bind(bind_i64(slice.offset));
}

fn push_predicate(qb: &mut QueryBuilder<'static, Postgres>, predicate: &Predicate) {
  match predicate {
    Predicate::Any => {}
    Predicate::WorkflowNameContains(content) => {
      qb.push(" AND strpos(t.workflow_name_info -> 0 ->> 'WorkflowName', ")
        .push_bind(content.clone())
        .push(") > 0");
    }
    Predicate::TaskNameContains(content) => {
      qb.push(" AND strpos(t.task_name, ").push_bind(content.clone()).push(") > 0");
    }
    Predicate::EndTimeBetween(range) => {
      qb.push(" AND latest.max_end_time BETWEEN ")
        .push_bind(range.start)
        .push(" AND ")
        .push_bind(range.end);
    }
    Predicate::ResultTypeIn(codes) => {
      let codes: Vec<i32> = codes.iter().map(|code| code.code()).collect();
      qb.push(" AND latest.result_type = ANY(").push_bind(codes).push(")");
    }
  }
}

/// Non-deleted tasks inner-joined to their latest result, with `predicate` applied.
pub(crate) fn search_query(select: &str, predicate: &Predicate) -> QueryBuilder<'static, Postgres> {
  let mut qb = QueryBuilder::new("WITH latest AS (");
  qb.push(LATEST_RESULTS_SQL);
  qb.push(") SELECT ");
  qb.push(select);
  qb.push(" FROM task t JOIN latest ON latest.task_id = t.task_id WHERE t.deleted_at IS NULL");
  push_predicate(&mut qb, predicate);
  qb
}

pub(crate) fn task_results_query(select: &str, task_id: i32, filter: &ResultFilter) -> QueryBuilder<'static, Postgres> {
  let mut qb = QueryBuilder::new("SELECT ");
  qb.push(select);
  qb.push(" FROM task_result WHERE task_id = ").push_bind(task_id);
  if let Some(statuses) = &filter.statuses {
    let codes: Vec<i32> = statuses.iter().map(|code| code.code()).collect();
    qb.push(" AND result_type = ANY(").push_bind(codes).push(")");
  }
  if let Some(range) = &filter.range {
    qb.push(" AND end_time BETWEEN ")
      .push_bind(range.start)
      .push(" AND ")
      .push_bind(range.end);
  }
  qb
}

/// Window count evaluated before LIMIT/OFFSET, so every page row carries the
/// match total from the same snapshot as the page itself.
const TOTAL_COUNT: &str = "COUNT(*) OVER () AS total_count";

/// One statement returning a page of search hits and the match total.
pub(crate) fn search_page_query(predicate: &Predicate, slice: Slice) -> QueryBuilder<'static, Postgres> {
  let select = format!(
    "{}, latest.result_type AS latest_result_type, latest.max_end_time AS latest_end_time, {}",
    TASK_COLUMNS, TOTAL_COUNT
  );
  let mut qb = search_query(&select, predicate);
  qb.push(" ORDER BY t.task_id DESC");
  push_slice(&mut qb, slice);
  qb
}

/// One statement returning a page of a task's results and the match total.
pub(crate) fn task_results_page_query(
  task_id: i32,
  filter: &ResultFilter,
  slice: Option<Slice>,
) -> QueryBuilder<'static, Postgres> {
  let select = format!("{}, {}", RESULT_COLUMNS, TOTAL_COUNT);
  let mut qb = task_results_query(&select, task_id, filter);
  qb.push(" ORDER BY end_time DESC NULLS LAST, result_id DESC");
  if let Some(slice) = slice {
    push_slice(&mut qb, slice);
  }
  qb
}

impl PgSession {
  /// Runs a page query built with [`TOTAL_COUNT`]. The total is `None` when the
  /// page came back empty, since there is then no row to read it from.
  async fn fetch_counted<T>(&mut self, mut qb: QueryBuilder<'static, Postgres>) -> Result<(Vec<T>, Option<u64>), QueryError>
  where
    T: for<'r> FromRow<'r, PgRow>,
  {
    let rows = qb.build().fetch_all(&mut *self.conn).await?;
    let total = match rows.first() {
      Some(row) => Some(u64::try_from(row.try_get::<i64, _>("total_count")?).unwrap_or_default()),
      None => None,
    };
    let items = rows.iter().map(T::from_row).collect::<Result<Vec<T>, _>>()?;
    Ok((items, total))
  }

  async fn count(&mut self, mut qb: QueryBuilder<'static, Postgres>) -> Result<u64, QueryError> {
    let row = qb.build().fetch_one(&mut *self.conn).await?;
    let total: i64 = row.try_get(0)?;
    Ok(u64::try_from(total).unwrap_or_default())
  }
}

#[async_trait]
impl Session for PgSession {
  async fn schedules(&mut self) -> Result<Vec<Schedule>, QueryError> {
    let sql = format!("SELECT {} FROM schedule ORDER BY schedule_id", SCHEDULE_COLUMNS);
    let schedules = sqlx::query_as::<_, Schedule>(&sql).fetch_all(&mut *self.conn).await?;
    Ok(schedules)
  }

  async fn schedule(&mut self, schedule_id: i32) -> Result<Option<Schedule>, QueryError> {
    let sql = format!("SELECT {} FROM schedule WHERE schedule_id = $1", SCHEDULE_COLUMNS);
    let schedule = sqlx::query_as::<_, Schedule>(&sql)
      .bind(schedule_id)
      .fetch_optional(&mut *self.conn)
      .await?;
    Ok(schedule)
  }

  async fn tasks(&mut self, slice: Option<Slice>) -> Result<Vec<Task>, QueryError> {
    let mut qb: QueryBuilder<'static, Postgres> = QueryBuilder::new("SELECT ");
    qb.push(TASK_COLUMNS);
    qb.push(" FROM task t ORDER BY t.task_id DESC");
    if let Some(slice) = slice {
      push_slice(&mut qb, slice);
    }
    let tasks = qb.build_query_as::<Task>().fetch_all(&mut *self.conn).await?;
    Ok(tasks)
  }

  async fn task(&mut self, task_id: i32) -> Result<Option<Task>, QueryError> {
    let sql = format!("SELECT {} FROM task t WHERE t.task_id = $1", TASK_COLUMNS);
    let task = sqlx::query_as::<_, Task>(&sql)
      .bind(task_id)
      .fetch_optional(&mut *self.conn)
      .await?;
    Ok(task)
  }

  async fn task_logs(&mut self, task_id: i32) -> Result<Vec<TaskLog>, QueryError> {
    let logs = sqlx::query_as::<_, TaskLog>(
      "SELECT log_id, task_id, log_type, changes, reg_date FROM task_log WHERE task_id = $1 ORDER BY log_id DESC",
    )
      .bind(task_id)
      .fetch_all(&mut *self.conn)
      .await?;
    Ok(logs)
  }

  async fn search_tasks(&mut self, predicate: &Predicate, slice: Slice) -> Result<(Vec<TaskSummary>, u64), QueryError> {
    let (rows, total) = self.fetch_counted::<TaskSummary>(search_page_query(predicate, slice)).await?;
    let total = match total {
      Some(total) => total,
      None if slice.offset == 0 => 0,
      // past the last page: nothing on the page can disagree with a fresh count
      None => self.count(search_query("COUNT(*)", predicate)).await?,
    };
    debug!("Search matched {} tasks, {} at offset {}", total, rows.len(), slice.offset);
    Ok((rows, total))
  }

  async fn task_results(
    &mut self,
    task_id: i32,
    filter: &ResultFilter,
    slice: Option<Slice>,
  ) -> Result<(Vec<TaskResult>, u64), QueryError> {
    let (rows, total) = self
      .fetch_counted::<TaskResult>(task_results_page_query(task_id, filter, slice))
      .await?;
    let total = match (total, slice) {
      (Some(total), _) => total,
      (None, Some(slice)) if slice.offset > 0 => self.count(task_results_query("COUNT(*)", task_id, filter)).await?,
      (None, _) => 0,
    };
    Ok((rows, total))
  }
}
