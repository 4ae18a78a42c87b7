use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::RwLock;

use crate::error::QueryError;
use crate::models::{Schedule, Task, TaskLog, TaskResult, TaskSummary};
use crate::query::{latest_results, Predicate, ResultFilter, Slice};
use crate::store::{Session, Storage};

#[derive(Debug, Clone, Default)]
pub struct Dataset {
  pub schedules: Vec<Schedule>,
  pub tasks: Vec<Task>,
  pub results: Vec<TaskResult>,
  pub logs: Vec<TaskLog>,
}

/// In-process storage. Predicates are evaluated at the application layer and
/// every session reads from an immutable snapshot taken when it was opened.
#[derive(Clone, Default)]
pub struct MemoryStorage {
  data: Arc<RwLock<Arc<Dataset>>>,
}

impl MemoryStorage {
  pub fn new(dataset: Dataset) -> Self {
    Self { data: Arc::new(RwLock::new(Arc::new(dataset))) }
  }

  async fn update(&self, apply: impl FnOnce(&mut Dataset)) {
    let mut guard = self.data.write().await;
    apply(Arc::make_mut(&mut guard));
  }

  pub async fn insert_schedule(&self, schedule: Schedule) {
    self.update(|data| data.schedules.push(schedule)).await;
  }

  pub async fn insert_task(&self, task: Task) {
    self.update(|data| data.tasks.push(task)).await;
  }

  pub async fn insert_result(&self, result: TaskResult) {
    self.update(|data| data.results.push(result)).await;
  }

  pub async fn insert_log(&self, log: TaskLog) {
    self.update(|data| data.logs.push(log)).await;
  }

  /// Marks a task deleted. Returns false when no such task exists.
  pub async fn soft_delete_task(&self, task_id: i32, at: NaiveDateTime) -> bool {
    let mut found = false;
    self
      .update(|data| {
        if let Some(task) = data.tasks.iter_mut().find(|t| t.task_id == task_id) {
          task.deleted_at = Some(at);
          found = true;
        }
      })
      .await;
    found
  }
}

#[async_trait]
impl Storage for MemoryStorage {
  type Session = MemorySession;

  async fn session(&self) -> Result<MemorySession, QueryError> {
    let snapshot = self.data.read().await.clone();
    Ok(MemorySession { data: snapshot })
  }
}

pub struct MemorySession {
  data: Arc<Dataset>,
}

fn newest_first(tasks: &[Task]) -> Vec<&Task> {
  let mut tasks: Vec<&Task> = tasks.iter().collect();
  tasks.sort_by(|a, b| b.task_id.cmp(&a.task_id));
  tasks
}

#[async_trait]
impl Session for MemorySession {
  async fn schedules(&mut self) -> Result<Vec<Schedule>, QueryError> {
    let mut schedules = self.data.schedules.clone();
    schedules.sort_by_key(|s| s.schedule_id);
    Ok(schedules)
  }

  async fn schedule(&mut self, schedule_id: i32) -> Result<Option<Schedule>, QueryError> {
    Ok(self.data.schedules.iter().find(|s| s.schedule_id == schedule_id).cloned())
  }

  async fn tasks(&mut self, slice: Option<Slice>) -> Result<Vec<Task>, QueryError> {
    let tasks: Vec<Task> = newest_first(&self.data.tasks).into_iter().cloned().collect();
    Ok(match slice {
      Some(slice) => slice.apply(tasks),
      None => tasks,
    })
  }

  async fn task(&mut self, task_id: i32) -> Result<Option<Task>, QueryError> {
    Ok(self.data.tasks.iter().find(|t| t.task_id == task_id).cloned())
  }

  async fn task_logs(&mut self, task_id: i32) -> Result<Vec<TaskLog>, QueryError> {
    let mut logs: Vec<TaskLog> = self.data.logs.iter().filter(|l| l.task_id == task_id).cloned().collect();
    logs.sort_by(|a, b| b.log_id.cmp(&a.log_id));
    Ok(logs)
  }

  async fn search_tasks(&mut self, predicate: &Predicate, slice: Slice) -> Result<(Vec<TaskSummary>, u64), QueryError> {
    let latest = latest_results(&self.data.results);
    let matches: Vec<TaskSummary> = newest_first(&self.data.tasks)
      .into_iter()
      .filter(|task| !task.is_deleted())
      .filter_map(|task| {
        let current = latest.get(&task.task_id)?;
        predicate.matches(task, current).then(|| TaskSummary {
          task: task.clone(),
          latest_result_type: current.result_type,
          latest_end_time: current.end_time,
        })
      })
      .collect();
    let total = matches.len() as u64;
    Ok((slice.apply(matches), total))
  }

  async fn task_results(
    &mut self,
    task_id: i32,
    filter: &ResultFilter,
    slice: Option<Slice>,
  ) -> Result<(Vec<TaskResult>, u64), QueryError> {
    let mut results: Vec<TaskResult> = self
      .data
      .results
      .iter()
      .filter(|r| r.task_id == task_id && filter.matches(r))
      .cloned()
      .collect();
    results.sort_by(|a, b| b.end_time.cmp(&a.end_time).then(b.result_id.cmp(&a.result_id)));
    let total = results.len() as u64;
    Ok(match slice {
      Some(slice) => (slice.apply(results), total),
      None => (results, total),
    })
  }
}
