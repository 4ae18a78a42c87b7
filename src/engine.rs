use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::QueryError;
use crate::models::{Schedule, Task, TaskDetail, TaskResult, TaskSummary};
use crate::query::{
  resolve, resolve_result_filter, LastPagePolicy, PageRequest, Paged, Resolution, ResultFilter,
};
use crate::store::{Session, Storage};

/// Raw search parameters as they arrive on `/tasks/search`.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
  pub key: Option<String>,
  pub content: Option<String>,
  pub startdate: Option<String>,
  pub enddate: Option<String>,
}

/// Raw filter parameters for one task's results.
#[derive(Debug, Clone, Default)]
pub struct ResultParams {
  pub key: Option<String>,
  pub startdate: Option<String>,
  pub enddate: Option<String>,
}

pub struct TaskQueryEngine<S> {
  storage: S,
  timeout: Duration,
}

impl<S: Storage> TaskQueryEngine<S> {
  pub fn new(storage: S, timeout: Duration) -> Self {
    Self { storage, timeout }
  }

  /// Runs one operation under the request deadline. Sessions opened inside
  /// `operation` are dropped when it completes, fails or is cut off.
  async fn within_deadline<T>(&self, operation: impl Future<Output = Result<T, QueryError>>) -> Result<T, QueryError> {
    match tokio::time::timeout(self.timeout, operation).await {
      Ok(result) => result,
      Err(_) => {
        warn!("Query exceeded deadline of {:?}", self.timeout);
        Err(QueryError::Timeout(self.timeout))
      }
    }
  }

  pub async fn schedules(&self) -> Result<Vec<Schedule>, QueryError> {
    self
      .within_deadline(async {
        let mut session = self.storage.session().await?;
        session.schedules().await
      })
      .await
  }

  pub async fn schedule(&self, schedule_id: i32) -> Result<Schedule, QueryError> {
    self
      .within_deadline(async {
        let mut session = self.storage.session().await?;
        session.schedule(schedule_id).await
      })
      .await?
      .ok_or(QueryError::NotFound("Schedule"))
  }

  pub async fn tasks(&self, page: Option<PageRequest>) -> Result<Vec<Task>, QueryError> {
    self
      .within_deadline(async {
        let mut session = self.storage.session().await?;
        session.tasks(page.map(|p| p.slice())).await
      })
      .await
  }

  pub async fn search_tasks(&self, page: PageRequest, params: &SearchParams) -> Result<Paged<TaskSummary>, QueryError> {
    let predicate = match resolve(
      params.key.as_deref(),
      params.content.as_deref(),
      params.startdate.as_deref(),
      params.enddate.as_deref(),
    )? {
      Resolution::Match(predicate) => predicate,
      Resolution::Empty => {
        debug!("No status label matches {:?}; skipping query", params.content);
        return Ok(Paged::empty(page, LastPagePolicy::ZeroWhenEmpty));
      }
    };
    debug!("Searching tasks with {:?}, page {}", predicate, page.page());

    let (rows, total) = self
      .within_deadline(async {
        let mut session = self.storage.session().await?;
        session.search_tasks(&predicate, page.slice()).await
      })
      .await?;
    Ok(Paged::new(rows, page, total, LastPagePolicy::ZeroWhenEmpty))
  }

  /// Paginated results of one task. Unknown task ids are `NotFound` even when
  /// the filter could never match.
  pub async fn task_results(
    &self,
    task_id: i32,
    page: PageRequest,
    params: &ResultParams,
  ) -> Result<Paged<TaskResult>, QueryError> {
    let resolution = resolve_result_filter(
      params.key.as_deref(),
      params.startdate.as_deref(),
      params.enddate.as_deref(),
    )?;

    let (rows, total) = self
      .within_deadline(async {
        let mut session = self.storage.session().await?;
        if session.task(task_id).await?.is_none() {
          return Err(QueryError::NotFound("Task"));
        }
        match &resolution {
          Resolution::Match(filter) => session.task_results(task_id, filter, Some(page.slice())).await,
          Resolution::Empty => Ok((Vec::new(), 0)),
        }
      })
      .await?;
    Ok(Paged::new(rows, page, total, LastPagePolicy::AtLeastOne))
  }

  pub async fn task_detail(&self, task_id: i32) -> Result<TaskDetail, QueryError> {
    self
      .within_deadline(async {
        let mut session = self.storage.session().await?;
        let task = session.task(task_id).await?.ok_or(QueryError::NotFound("Task"))?;
        let task_logs = session.task_logs(task_id).await?;
        let (task_results, _) = session.task_results(task_id, &ResultFilter::default(), None).await?;
        Ok(TaskDetail { task, task_logs, task_results })
      })
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use crate::models::{ResultType, TaskLog};
  use crate::query::{Predicate, Slice};
  use crate::store::MemoryStorage;
  use crate::testing::{log, result, schedule, task, ts};
  use tokio_test::assert_ok;

  async fn seeded(task_count: i32) -> MemoryStorage {
    let storage = MemoryStorage::default();
    storage.insert_schedule(schedule(1, "daily")).await;
    for id in 1..=task_count {
      storage.insert_task(task(id, &format!("작업 {}", id), &format!("flow_{}", id))).await;
      let kind = if id % 2 == 0 { ResultType::Success } else { ResultType::Failed };
      storage.insert_result(result(id * 10, id, kind, ts(2024, 1, 1 + (id % 28) as u32, 9))).await;
    }
    storage.insert_log(log(1, 1)).await;
    storage
  }

  fn engine(storage: MemoryStorage) -> TaskQueryEngine<MemoryStorage> {
    TaskQueryEngine::new(storage, Duration::from_secs(5))
  }

  fn params(key: &str, content: &str) -> SearchParams {
    SearchParams { key: Some(key.into()), content: Some(content.into()), ..Default::default() }
  }

  #[tokio::test]
  async fn search_pages_newest_first() {
    let engine = engine(seeded(25).await);
    let page = PageRequest::new(3, 10).unwrap();
    let paged = assert_ok!(engine.search_tasks(page, &SearchParams::default()).await);
    let ids: Vec<i32> = paged.data.iter().map(|s| s.task.task_id).collect();
    assert_eq!(ids, vec![5, 4, 3, 2, 1]);
    assert_eq!(paged.pagination.total, 25);
    assert_eq!(paged.pagination.last_page, 3);
    assert_eq!((paged.pagination.start_page, paged.pagination.end_page), (1, 3));
  }

  #[tokio::test]
  async fn search_filters_by_current_status() {
    let engine = engine(seeded(6).await);
    let paged = assert_ok!(engine.search_tasks(PageRequest::default(), &params("selWorkflowState", "성공")).await);
    assert!(paged.data.iter().all(|s| s.latest_result_type == ResultType::Success));
    assert_eq!(paged.pagination.total, 3);
  }

  #[tokio::test]
  async fn empty_search_reports_zero_pages() {
    let engine = engine(seeded(3).await);
    let paged = assert_ok!(engine.search_tasks(PageRequest::default(), &params("selTableNmEng", "missing")).await);
    assert!(paged.data.is_empty());
    assert_eq!(paged.pagination.last_page, 0);
    assert_eq!(paged.pagination.end_page, 0);
  }

  #[tokio::test]
  async fn unknown_search_key_is_rejected() {
    let engine = engine(seeded(1).await);
    let err = engine.search_tasks(PageRequest::default(), &params("selOwner", "x")).await.unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedFilterKey(_)));
  }

  #[tokio::test]
  async fn task_results_keep_at_least_one_page() {
    let engine = engine(seeded(2).await);
    let none = ResultParams { key: Some("보류".into()), ..Default::default() };
    let paged = assert_ok!(engine.task_results(1, PageRequest::default(), &none).await);
    assert!(paged.data.is_empty());
    assert_eq!(paged.pagination.last_page, 1);

    let failed = ResultParams { key: Some("실패".into()), ..Default::default() };
    let paged = assert_ok!(engine.task_results(1, PageRequest::default(), &failed).await);
    assert_eq!(paged.data.len(), 1);
  }

  #[tokio::test]
  async fn missing_entities_are_not_found() {
    let engine = engine(seeded(1).await);
    assert!(matches!(engine.schedule(42).await, Err(QueryError::NotFound("Schedule"))));
    assert!(matches!(engine.task_detail(42).await, Err(QueryError::NotFound("Task"))));
    let unmatched = ResultParams { key: Some("보류".into()), ..Default::default() };
    assert!(matches!(
      engine.task_results(42, PageRequest::default(), &unmatched).await,
      Err(QueryError::NotFound("Task"))
    ));
  }

  #[tokio::test]
  async fn task_detail_nests_logs_and_results() {
    let engine = engine(seeded(1).await);
    let detail = assert_ok!(engine.task_detail(1).await);
    assert_eq!(detail.task_logs.len(), 1);
    assert_eq!(detail.task_results.len(), 1);
  }

  #[tokio::test]
  async fn task_list_is_optionally_paged() {
    let engine = engine(seeded(12).await);
    assert_eq!(assert_ok!(engine.tasks(None).await).len(), 12);
    let second = assert_ok!(engine.tasks(Some(PageRequest::new(2, 5).unwrap())).await);
    assert_eq!(second.iter().map(|t| t.task_id).collect::<Vec<_>>(), vec![7, 6, 5, 4, 3]);
  }

  struct SlowStorage;
  struct SlowSession;

  #[async_trait]
  impl Storage for SlowStorage {
    type Session = SlowSession;

    async fn session(&self) -> Result<SlowSession, QueryError> {
      tokio::time::sleep(Duration::from_secs(60)).await;
      Ok(SlowSession)
    }
  }

  #[async_trait]
  impl Session for SlowSession {
    async fn schedules(&mut self) -> Result<Vec<Schedule>, QueryError> {
      Ok(Vec::new())
    }
    async fn schedule(&mut self, _: i32) -> Result<Option<Schedule>, QueryError> {
      Ok(None)
    }
    async fn tasks(&mut self, _: Option<Slice>) -> Result<Vec<Task>, QueryError> {
      Ok(Vec::new())
    }
    async fn task(&mut self, _: i32) -> Result<Option<Task>, QueryError> {
      Ok(None)
    }
    async fn task_logs(&mut self, _: i32) -> Result<Vec<TaskLog>, QueryError> {
      Ok(Vec::new())
    }
    async fn search_tasks(&mut self, _: &Predicate, _: Slice) -> Result<(Vec<TaskSummary>, u64), QueryError> {
      Ok((Vec::new(), 0))
    }
    async fn task_results(
      &mut self,
      _: i32,
      _: &ResultFilter,
      _: Option<Slice>,
    ) -> Result<(Vec<TaskResult>, u64), QueryError> {
      Ok((Vec::new(), 0))
    }
  }

  #[tokio::test(start_paused = true)]
  async fn slow_storage_hits_the_deadline() {
    let engine = TaskQueryEngine::new(SlowStorage, Duration::from_millis(50));
    assert!(matches!(engine.schedules().await, Err(QueryError::Timeout(_))));
  }

  #[tokio::test]
  async fn empty_workflow_state_never_opens_a_session() {
    // SlowStorage would time out if a session were requested.
    let engine = TaskQueryEngine::new(SlowStorage, Duration::from_millis(50));
    let paged = assert_ok!(engine.search_tasks(PageRequest::default(), &params("selWorkflowState", "보류")).await);
    assert_eq!(paged.pagination.last_page, 0);
  }
}
