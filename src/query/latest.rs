use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::models::{ResultType, TaskResult};

/// The current status of a task: the result with the greatest `end_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestResult {
  pub task_id: i32,
  pub result_id: i32,
  pub result_type: ResultType,
  pub end_time: Option<NaiveDateTime>,
}

impl LatestResult {
  fn from_result(result: &TaskResult) -> Self {
    Self {
      task_id: result.task_id,
      result_id: result.result_id,
      result_type: result.result_type,
      end_time: result.end_time,
    }
  }

  // Missing end times rank below any timestamp; equal end times go to the newer row.
  fn rank(&self) -> (Option<NaiveDateTime>, i32) {
    (self.end_time, self.result_id)
  }
}

/// Postgres rendering of [`latest_results`], used as a CTE named `latest`.
pub const LATEST_RESULTS_SQL: &str = "SELECT DISTINCT ON (task_id) task_id, result_type, end_time AS max_end_time \
   FROM task_result \
   ORDER BY task_id, end_time DESC NULLS LAST, result_id DESC";

pub fn latest_results<'a, I>(results: I) -> HashMap<i32, LatestResult>
where
  I: IntoIterator<Item = &'a TaskResult>,
{
  let mut latest: HashMap<i32, LatestResult> = HashMap::new();
  for result in results {
    let candidate = LatestResult::from_result(result);
    latest
      .entry(result.task_id)
      .and_modify(|current| {
        if candidate.rank() > current.rank() {
          *current = candidate;
        }
      })
      .or_insert(candidate);
  }
  latest
}
