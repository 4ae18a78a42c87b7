//! Translates raw search parameters into predicates over tasks and their latest result.
//!
//! An earlier revision of the date filter took a single `content` string and
//! truncated the match to year, year-month or day by its length (4, 6 or 8
//! characters). Only the explicit `startdate`/`enddate` range is supported now.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::QueryError;
use crate::models::{ResultType, Task};
use crate::query::latest::LatestResult;

/// Status labels as shown in the UI. `content` is matched as a substring of each label.
pub const STATUS_LABELS: &[(&str, ResultType)] = &[
  ("실패", ResultType::Failed),
  ("성공", ResultType::Success),
  ("작업 중", ResultType::InProgress),
  ("작업 시작 전", ResultType::NotStarted),
  ("failed", ResultType::Failed),
  ("success", ResultType::Success),
  ("in-progress", ResultType::InProgress),
  ("not-started", ResultType::NotStarted),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKey {
  All,
  NameEnglish,
  NameKorean,
  ModifyDate,
  WorkflowState,
}

impl FromStr for FilterKey {
  type Err = QueryError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "" | "all" => Ok(FilterKey::All),
      "selTableNmEng" | "name-english" => Ok(FilterKey::NameEnglish),
      "selTableNmKor" | "name-korean" => Ok(FilterKey::NameKorean),
      "selModifyDate" | "modify-date" => Ok(FilterKey::ModifyDate),
      "selWorkflowState" | "workflow-state" => Ok(FilterKey::WorkflowState),
      other => Err(QueryError::UnsupportedFilterKey(other.to_string())),
    }
  }
}

/// Inclusive timestamp range covering whole calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
  pub start: NaiveDateTime,
  pub end: NaiveDateTime,
}

impl DateRange {
  pub fn parse(startdate: Option<&str>, enddate: Option<&str>) -> Result<Self, QueryError> {
    let (Some(start), Some(end)) = (non_empty(startdate), non_empty(enddate)) else {
      return Err(QueryError::InvalidDateRange("both startdate and enddate are required".into()));
    };
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    if start > end {
      return Err(QueryError::InvalidDateRange(format!("startdate {} is after enddate {}", start, end)));
    }
    Ok(Self {
      start: start.and_time(NaiveTime::MIN),
      end: end_of_day(end)?,
    })
  }

  /// Optional variant: both or neither endpoint.
  pub fn parse_optional(startdate: Option<&str>, enddate: Option<&str>) -> Result<Option<Self>, QueryError> {
    match (non_empty(startdate), non_empty(enddate)) {
      (None, None) => Ok(None),
      _ => Self::parse(startdate, enddate).map(Some),
    }
  }

  pub fn contains(&self, at: NaiveDateTime) -> bool {
    self.start <= at && at <= self.end
  }
}

/// Last whole second of `date`; the range is inclusive to `23:59:59`.
fn end_of_day(date: NaiveDate) -> Result<NaiveDateTime, QueryError> {
  date
    .and_hms_opt(23, 59, 59)
    .ok_or_else(|| QueryError::InvalidDateRange(format!("no end of day for {}", date)))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
  value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(raw: &str) -> Result<NaiveDate, QueryError> {
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
    .map_err(|_| QueryError::InvalidDateRange(format!("'{}' is not a YYYY-MM-DD date", raw)))
}

/// Codes of every status label that contains `content`, without duplicates.
pub fn status_codes(content: &str) -> Vec<ResultType> {
  let mut codes = Vec::new();
  for (label, code) in STATUS_LABELS {
    if label.contains(content) && !codes.contains(code) {
      codes.push(*code);
    }
  }
  codes
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
  Any,
  WorkflowNameContains(String),
  TaskNameContains(String),
  EndTimeBetween(DateRange),
  ResultTypeIn(Vec<ResultType>),
}

impl Predicate {
  /// Application-layer evaluation against a task and its latest result.
  pub fn matches(&self, task: &Task, latest: &LatestResult) -> bool {
    match self {
      Predicate::Any => true,
      Predicate::WorkflowNameContains(content) => task
        .workflow_name()
        .is_some_and(|name| name.contains(content.as_str())),
      Predicate::TaskNameContains(content) => task.task_name.contains(content.as_str()),
      Predicate::EndTimeBetween(range) => latest.end_time.is_some_and(|at| range.contains(at)),
      Predicate::ResultTypeIn(codes) => codes.contains(&latest.result_type),
    }
  }
}

/// Outcome of resolving a filter: either something to query, or a known-empty result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
  Match(T),
  Empty,
}

pub fn resolve(
  key: Option<&str>,
  content: Option<&str>,
  startdate: Option<&str>,
  enddate: Option<&str>,
) -> Result<Resolution<Predicate>, QueryError> {
  let key = match key {
    Some(raw) => raw.trim().parse()?,
    None => FilterKey::All,
  };
  let content = content.unwrap_or_default().to_string();

  let predicate = match key {
    FilterKey::All => Predicate::Any,
    FilterKey::NameEnglish => Predicate::WorkflowNameContains(content),
    FilterKey::NameKorean => Predicate::TaskNameContains(content),
    FilterKey::ModifyDate => Predicate::EndTimeBetween(DateRange::parse(startdate, enddate)?),
    FilterKey::WorkflowState => {
      let codes = status_codes(&content);
      if codes.is_empty() {
        return Ok(Resolution::Empty);
      }
      Predicate::ResultTypeIn(codes)
    }
  };
  Ok(Resolution::Match(predicate))
}

/// Filter over one task's own results, used by the task detail listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultFilter {
  pub statuses: Option<Vec<ResultType>>,
  pub range: Option<DateRange>,
}

impl ResultFilter {
  pub fn matches(&self, result: &crate::models::TaskResult) -> bool {
    let status_ok = self
      .statuses
      .as_ref()
      .is_none_or(|codes| codes.contains(&result.result_type));
    let range_ok = match &self.range {
      Some(range) => result.end_time.is_some_and(|at| range.contains(at)),
      None => true,
    };
    status_ok && range_ok
  }
}

pub fn resolve_result_filter(
  key: Option<&str>,
  startdate: Option<&str>,
  enddate: Option<&str>,
) -> Result<Resolution<ResultFilter>, QueryError> {
  let statuses = match non_empty(key) {
    Some(label) => {
      let codes = status_codes(label);
      if codes.is_empty() {
        return Ok(Resolution::Empty);
      }
      Some(codes)
    }
    None => None,
  };
  let range = DateRange::parse_optional(startdate, enddate)?;
  Ok(Resolution::Match(ResultFilter { statuses, range }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio_test::{assert_err, assert_ok};

  fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, s).unwrap()
  }

  #[test]
  fn absent_and_all_keys_match_everything() {
    assert_eq!(assert_ok!(resolve(None, Some("x"), None, None)), Resolution::Match(Predicate::Any));
    assert_eq!(assert_ok!(resolve(Some("all"), None, None, None)), Resolution::Match(Predicate::Any));
    assert_eq!(assert_ok!(resolve(Some(""), None, None, None)), Resolution::Match(Predicate::Any));
  }

  #[test]
  fn name_keys_accept_wire_names_and_aliases() {
    assert_eq!(
      assert_ok!(resolve(Some("selTableNmEng"), Some("load"), None, None)),
      Resolution::Match(Predicate::WorkflowNameContains("load".into()))
    );
    assert_eq!(
      assert_ok!(resolve(Some("name-korean"), Some("적재"), None, None)),
      Resolution::Match(Predicate::TaskNameContains("적재".into()))
    );
  }

  #[test]
  fn unknown_key_is_rejected() {
    let err = assert_err!(resolve(Some("selOwner"), Some("x"), None, None));
    assert!(matches!(err, QueryError::UnsupportedFilterKey(key) if key == "selOwner"));
  }

  #[test]
  fn modify_date_builds_inclusive_day_range() {
    let resolved = assert_ok!(resolve(Some("selModifyDate"), Some("ignored"), Some("20240101"), Some("2024-01-31")));
    let Resolution::Match(Predicate::EndTimeBetween(range)) = resolved else {
      panic!("expected a date range, got {:?}", resolved);
    };
    assert_eq!(range.start, at(2024, 1, 1, 0, 0, 0));
    assert_eq!(range.end, at(2024, 1, 31, 23, 59, 59));
    assert!(range.contains(at(2024, 1, 31, 23, 59, 59)));
    assert!(!range.contains(at(2024, 2, 1, 0, 0, 0)));
  }

  #[test]
  fn single_day_range_ends_one_second_before_midnight() {
    let range = assert_ok!(DateRange::parse(Some("2024-02-29"), Some("2024-02-29")));
    assert_eq!(range.end, at(2024, 2, 29, 23, 59, 59));
    assert_eq!((range.end - range.start).num_seconds(), 86_399);
    assert_ne!(range.end, range.start);

    let last = assert_ok!(end_of_day(NaiveDate::MAX));
    assert_eq!(last.date(), NaiveDate::MAX);
    assert_eq!(last.time(), NaiveTime::from_hms_opt(23, 59, 59).unwrap());
  }

  #[test]
  fn modify_date_needs_both_valid_endpoints() {
    assert!(matches!(
      resolve(Some("modify-date"), None, Some("2024-01-01"), None),
      Err(QueryError::InvalidDateRange(_))
    ));
    assert!(matches!(
      resolve(Some("modify-date"), None, Some("2024-13-01"), Some("2024-12-01")),
      Err(QueryError::InvalidDateRange(_))
    ));
    assert!(matches!(
      resolve(Some("modify-date"), None, Some("2024-02-01"), Some("2024-01-01")),
      Err(QueryError::InvalidDateRange(_))
    ));
  }

  #[test]
  fn workflow_state_maps_labels_to_codes() {
    assert_eq!(
      assert_ok!(resolve(Some("selWorkflowState"), Some("성공"), None, None)),
      Resolution::Match(Predicate::ResultTypeIn(vec![ResultType::Success]))
    );
    assert_eq!(
      assert_ok!(resolve(Some("selWorkflowState"), Some("작업"), None, None)),
      Resolution::Match(Predicate::ResultTypeIn(vec![ResultType::InProgress, ResultType::NotStarted]))
    );
  }

  #[test]
  fn workflow_state_without_label_match_is_empty() {
    assert_eq!(assert_ok!(resolve(Some("selWorkflowState"), Some("보류"), None, None)), Resolution::Empty);
  }

  #[test]
  fn status_codes_deduplicate_across_languages() {
    assert_eq!(status_codes("s"), vec![ResultType::Success, ResultType::InProgress, ResultType::NotStarted]);
    assert_eq!(status_codes("").len(), 4);
  }

  #[test]
  fn result_filter_requires_paired_dates() {
    assert_eq!(assert_ok!(resolve_result_filter(None, None, None)), Resolution::Match(ResultFilter::default()));
    assert!(matches!(resolve_result_filter(None, None, Some("2024-01-01")), Err(QueryError::InvalidDateRange(_))));
    assert_eq!(assert_ok!(resolve_result_filter(Some("nope"), None, None)), Resolution::Empty);
  }
}
