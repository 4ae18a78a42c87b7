use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

use crate::error::QueryError;

/// Execution status recorded on a task result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultType {
  NotStarted,
  Failed,
  Success,
  InProgress,
}

impl ResultType {
  pub fn code(self) -> i32 {
    match self {
      ResultType::NotStarted => -1,
      ResultType::Failed => 0,
      ResultType::Success => 1,
      ResultType::InProgress => 2,
    }
  }
}

impl TryFrom<i32> for ResultType {
  type Error = QueryError;

  fn try_from(code: i32) -> Result<Self, Self::Error> {
    match code {
      -1 => Ok(ResultType::NotStarted),
      0 => Ok(ResultType::Failed),
      1 => Ok(ResultType::Success),
      2 => Ok(ResultType::InProgress),
      other => Err(QueryError::InvalidResultType(other)),
    }
  }
}

impl Serialize for ResultType {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i32(self.code())
  }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Schedule {
  pub schedule_id: i32,
  pub schedule_name: String,
  pub start_time: String,
  pub cycle_type: i32,
  pub everyhour_info: Option<String>,
  pub daily_info: Option<String>,
  pub weekly_info: Option<String>,
  pub monthly_info: Option<String>,
  pub option: serde_json::Value,
  pub reg_date: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Task {
  pub task_id: i32,
  pub schedule_id: Option<i32>,
  pub task_name: String,
  pub task_type: i32,
  pub workflow_name_info: serde_json::Value,
  pub is_using: bool,
  pub next_runtime: Option<NaiveDateTime>,
  pub created_at: NaiveDateTime,
  pub updated_at: Option<NaiveDateTime>,
  pub deleted_at: Option<NaiveDateTime>,
  pub reg_date: NaiveDateTime,
}

impl Task {
  /// `WorkflowName` of the first entry in `workflow_name_info`, if the blob has that shape.
  pub fn workflow_name(&self) -> Option<&str> {
    self.workflow_name_info
      .get(0)
      .and_then(|entry| entry.get("WorkflowName"))
      .and_then(|name| name.as_str())
  }

  pub fn is_deleted(&self) -> bool {
    self.deleted_at.is_some()
  }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TaskResult {
  pub result_id: i32,
  pub task_id: i32,
  #[sqlx(try_from = "i32")]
  pub result_type: ResultType,
  pub error: Option<String>,
  pub start_time: Option<NaiveDateTime>,
  pub end_time: Option<NaiveDateTime>,
  pub reg_date: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TaskLog {
  pub log_id: i32,
  pub task_id: i32,
  pub log_type: String,
  pub changes: Option<serde_json::Value>,
  pub reg_date: NaiveDateTime,
}

/// A search hit: the task plus the status of its most recent result.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TaskSummary {
  #[serde(flatten)]
  #[sqlx(flatten)]
  pub task: Task,
  #[sqlx(try_from = "i32")]
  pub latest_result_type: ResultType,
  pub latest_end_time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
  #[serde(flatten)]
  pub task: Task,
  pub task_logs: Vec<TaskLog>,
  pub task_results: Vec<TaskResult>,
}
