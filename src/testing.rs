//! Fixture builders shared by unit tests.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;

use crate::models::{ResultType, Schedule, Task, TaskLog, TaskResult};

pub fn ts(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
  NaiveDate::from_ymd_opt(year, month, day)
    .and_then(|date| date.and_hms_opt(hour, 0, 0))
    .expect("valid fixture timestamp")
}

pub fn task(task_id: i32, task_name: &str, workflow_name: &str) -> Task {
  Task {
    task_id,
    schedule_id: Some(1),
    task_name: task_name.to_string(),
    task_type: 1,
    workflow_name_info: json!([{ "WorkflowName": workflow_name }]),
    is_using: true,
    next_runtime: None,
    created_at: ts(2023, 12, 1, 0),
    updated_at: None,
    deleted_at: None,
    reg_date: ts(2023, 12, 1, 0),
  }
}

pub fn result(result_id: i32, task_id: i32, result_type: ResultType, end_time: impl Into<Option<NaiveDateTime>>) -> TaskResult {
  let end_time = end_time.into();
  TaskResult {
    result_id,
    task_id,
    result_type,
    error: (result_type == ResultType::Failed).then(|| "exit code 1".to_string()),
    start_time: end_time,
    end_time,
    reg_date: ts(2023, 12, 1, 0),
  }
}

pub fn log(log_id: i32, task_id: i32) -> TaskLog {
  TaskLog {
    log_id,
    task_id,
    log_type: "UPDATE".to_string(),
    changes: Some(json!({ "is_using": [0, 1] })),
    reg_date: ts(2023, 12, 2, 0),
  }
}

pub fn schedule(schedule_id: i32, schedule_name: &str) -> Schedule {
  Schedule {
    schedule_id,
    schedule_name: schedule_name.to_string(),
    start_time: "09:00".to_string(),
    cycle_type: 2,
    everyhour_info: None,
    daily_info: Some("1".to_string()),
    weekly_info: None,
    monthly_info: None,
    option: json!({ "retry": 0 }),
    reg_date: ts(2023, 11, 1, 0),
  }
}
