//! Offset pagination and the banded page window shown by the UI.
//!
//! Pages are grouped in bands of [`PAGE_BAND`]; the window always covers the
//! band the current page falls in. (A centered `[page-5, page+5]` window was
//! used before the banded form replaced it.)

use serde::Serialize;

use crate::error::QueryError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 1000;
pub const PAGE_BAND: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  page: u32,
  limit: u32,
}

impl Default for PageRequest {
  fn default() -> Self {
    Self { page: DEFAULT_PAGE, limit: DEFAULT_LIMIT }
  }
}

impl PageRequest {
  pub fn new(page: u32, limit: u32) -> Result<Self, QueryError> {
    if page == 0 {
      return Err(QueryError::InvalidPagination("page must be at least 1".into()));
    }
    if limit == 0 || limit > MAX_LIMIT {
      return Err(QueryError::InvalidPagination(format!("limit must be between 1 and {}", MAX_LIMIT)));
    }
    Ok(Self { page, limit })
  }

  pub fn page(&self) -> u32 {
    self.page
  }

  pub fn limit(&self) -> u32 {
    self.limit
  }

  pub fn slice(&self) -> Slice {
    Slice {
      offset: u64::from(self.page - 1) * u64::from(self.limit),
      limit: u64::from(self.limit),
    }
  }
}

/// Row window handed to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
  pub offset: u64,
  pub limit: u64,
}

impl Slice {
  pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
    let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
    items.into_iter().skip(offset).take(limit).collect()
  }
}

/// How the last page is reported when nothing matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastPagePolicy {
  /// Task search: an empty match has no pages.
  ZeroWhenEmpty,
  /// Task detail results: always at least one (empty) page.
  AtLeastOne,
}

pub fn last_page(total: u64, limit: u32, policy: LastPagePolicy) -> u64 {
  let pages = total.div_ceil(u64::from(limit.max(1)));
  match policy {
    LastPagePolicy::ZeroWhenEmpty => pages,
    LastPagePolicy::AtLeastOne => pages.max(1),
  }
}

/// First and last page number of the band containing `page`.
pub fn page_window(page: u32, last_page: u64) -> (u64, u64) {
  let band = (u64::from(page.max(1)) - 1) / PAGE_BAND;
  let start_page = band * PAGE_BAND + 1;
  let end_page = (start_page + PAGE_BAND - 1).min(last_page);
  (start_page, end_page)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
  pub now_page: u32,
  pub start_page: u64,
  pub end_page: u64,
  pub total: u64,
  pub cnt_per_page: u32,
  pub last_page: u64,
}

impl Pagination {
  pub fn new(request: PageRequest, total: u64, policy: LastPagePolicy) -> Self {
    let last_page = last_page(total, request.limit, policy);
    let (start_page, end_page) = page_window(request.page, last_page);
    Self {
      now_page: request.page,
      start_page,
      end_page,
      total,
      cnt_per_page: request.limit,
      last_page,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Paged<T> {
  pub pagination: Pagination,
  pub data: Vec<T>,
}

impl<T> Paged<T> {
  pub fn new(data: Vec<T>, request: PageRequest, total: u64, policy: LastPagePolicy) -> Self {
    Self { pagination: Pagination::new(request, total, policy), data }
  }

  pub fn empty(request: PageRequest, policy: LastPagePolicy) -> Self {
    Self::new(Vec::new(), request, 0, policy)
  }
}

/// Paginates an already materialised result set.
pub fn paginate<T>(items: Vec<T>, request: PageRequest, policy: LastPagePolicy) -> Paged<T> {
  let total = items.len() as u64;
  Paged::new(request.slice().apply(items), request, total, policy)
}
