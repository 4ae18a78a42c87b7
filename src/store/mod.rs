//! Storage seam for the query engine.
//!
//! A [`Storage`] hands out one [`Session`] per request; the session owns
//! whatever the backend needs to answer queries (a pooled connection, a data
//! snapshot) and releases it when dropped.

use async_trait::async_trait;

use crate::error::QueryError;
use crate::models::{Schedule, Task, TaskLog, TaskResult, TaskSummary};
use crate::query::{Predicate, ResultFilter, Slice};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

#[async_trait]
pub trait Storage: Send + Sync + 'static {
  type Session: Session;

  async fn session(&self) -> Result<Self::Session, QueryError>;
}

#[async_trait]
pub trait Session: Send {
  async fn schedules(&mut self) -> Result<Vec<Schedule>, QueryError>;

  async fn schedule(&mut self, schedule_id: i32) -> Result<Option<Schedule>, QueryError>;

  /// All tasks, newest first, optionally restricted to one page.
  async fn tasks(&mut self, slice: Option<Slice>) -> Result<Vec<Task>, QueryError>;

  async fn task(&mut self, task_id: i32) -> Result<Option<Task>, QueryError>;

  async fn task_logs(&mut self, task_id: i32) -> Result<Vec<TaskLog>, QueryError>;

  /// Non-deleted tasks joined to their latest result, filtered by `predicate`.
  /// Returns the requested page and the total number of matches.
  async fn search_tasks(&mut self, predicate: &Predicate, slice: Slice) -> Result<(Vec<TaskSummary>, u64), QueryError>;

  /// One task's results, most recent first. `slice: None` returns every match.
  async fn task_results(
    &mut self,
    task_id: i32,
    filter: &ResultFilter,
    slice: Option<Slice>,
  ) -> Result<(Vec<TaskResult>, u64), QueryError>;
}
