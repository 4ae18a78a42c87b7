pub mod filter;
pub mod latest;
pub mod pager;

pub use filter::{resolve, resolve_result_filter, DateRange, FilterKey, Predicate, Resolution, ResultFilter};
pub use latest::{latest_results, LatestResult};
pub use pager::{paginate, LastPagePolicy, PageRequest, Paged, Pagination, Slice};
