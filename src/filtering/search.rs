use sea_orm::{Condition, sea_query::SelectStatement};

use super::conditions::apply_condition;
use crate::{
    errors::GridError,
    models::{FilterValue, Operator},
    registry::ColumnRegistry,
};

// Basic safety limit
const MAX_SEARCH_QUERY_LENGTH: usize = 10_000;

/// Clip a search term to the maximum accepted length on a char boundary.
fn clip(term: &str) -> &str {
    match term.char_indices().nth(MAX_SEARCH_QUERY_LENGTH) {
        Some((idx, _)) => &term[..idx],
        None => term,
    }
}

/// Build the free-text search predicate: an OR of `LIKE %term%` over every
/// searchable column. Columns with a callback receive the term with
/// [`Operator::Like`] and decide themselves.
///
/// # Errors
///
/// `GridError::SearchColumn` when no searchable columns are defined or one of
/// them is not filterable.
pub fn build_search_condition(
    query: &mut SelectStatement,
    registry: &ColumnRegistry,
    term: &str,
) -> Result<Condition, GridError> {
    registry.validate_searchable_columns(true)?;

    let value = FilterValue::from(clip(term));
    let mut any = Condition::any();
    for (_, resolution) in registry.searchable_resolutions()? {
        any = apply_condition(query, resolution, Some(&value), Operator::Like, any)?;
    }

    Ok(any)
}
