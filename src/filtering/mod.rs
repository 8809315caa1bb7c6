//! # Filtering, Sorting, Search & Pagination
//!
//! Translation of a parsed [`GridRequest`](crate::GridRequest) into
//! `sea_query` predicates and ORDER BY keys. Every column is resolved through
//! the grid's [`ColumnRegistry`](crate::registry::ColumnRegistry) first, so no
//! caller-supplied name ever reaches SQL.
//!
//! ## Filter shape
//!
//! A filter is a list of AND-groups, each an OR of conditions:
//!
//! ```rust,ignore
//! // (status = 'open' OR status = 'pending') AND total >= 100
//! [
//!     [{"column": "status", "operator": "EQ", "value": ["open", "pending"]}],
//!     [{"column": "total", "operator": "GTE", "value": 100}]
//! ]
//! ```
//!
//! ## Operators
//!
//! `EQ`, `NEQ` (arrays become `IN` / `NOT IN`), `GT`, `GTE`, `LT`, `LTE`,
//! `LIKE`, `STARTS`, `ENDS`, `EMPTY`, `NEMPTY` (no value), `BETWEEN` and
//! `NBETWEEN` (two-element arrays).
//!
//! ## Search
//!
//! A search term expands to `LIKE %term%` over every searchable column,
//! joined with OR and ANDed with the filter.

pub mod conditions;
pub mod pagination;
pub mod search;
pub mod sort;

pub use conditions::{apply_condition, apply_filters, build_condition};
pub use pagination::{
    MAX_ROW_BOUND, calculate_content_range, calculate_offset, header_params_to_headers,
};
pub use search::build_search_condition;
pub use sort::apply_sort;
