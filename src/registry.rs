//! Column whitelists of a grid.
//!
//! The registry is built once from a [`GridFilter`](crate::GridFilter)
//! definition and is read-only afterwards, so one instance can serve any
//! number of concurrent requests.

use sea_orm::{
    Condition,
    sea_query::{SelectStatement, SimpleExpr},
};
use std::{fmt, sync::Arc};

use crate::{
    errors::GridError,
    models::{FilterValue, Operator},
};

/// Custom predicate builder for a computed or derived column.
///
/// Arguments: the query being assembled (so the callback may add joins), the
/// filter value (`None` for `EMPTY`/`NEMPTY`), the internal column expression,
/// the OR-group under construction, and the operator. The callback returns
/// the OR-group with whatever it decided to add.
pub type ColumnCallback = Arc<
    dyn Fn(&mut SelectStatement, Option<&FilterValue>, &SimpleExpr, Condition, Operator) -> Condition
        + Send
        + Sync,
>;

/// Wrap a closure as a [`ColumnCallback`].
pub fn column_callback<F>(callback: F) -> ColumnCallback
where
    F: Fn(&mut SelectStatement, Option<&FilterValue>, &SimpleExpr, Condition, Operator) -> Condition
        + Send
        + Sync
        + 'static,
{
    Arc::new(callback)
}

/// How an external filter column turns into a predicate.
#[derive(Clone)]
pub enum ColumnResolution {
    /// Default operator mapping on the given expression.
    Direct(SimpleExpr),
    /// The callback builds the predicate for the expression.
    Callback {
        column: SimpleExpr,
        callback: ColumnCallback,
    },
}

impl ColumnResolution {
    #[must_use]
    pub fn expression(&self) -> &SimpleExpr {
        match self {
            Self::Direct(column) | Self::Callback { column, .. } => column,
        }
    }
}

impl fmt::Debug for ColumnResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(column) => f.debug_tuple("Direct").field(column).finish(),
            Self::Callback { column, .. } => f
                .debug_struct("Callback")
                .field("column", column)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColumnRegistry {
    grid: String,
    filter: Vec<(String, ColumnResolution)>,
    order: Vec<(String, SimpleExpr)>,
    searchable: Vec<String>,
}

impl ColumnRegistry {
    /// Build the registry. Callbacks for names that are not filter columns
    /// are ignored; searchable names are only checked lazily.
    #[must_use]
    pub fn new(
        grid: impl Into<String>,
        filter_columns: Vec<(&str, SimpleExpr)>,
        order_columns: Vec<(&str, SimpleExpr)>,
        searchable_columns: Vec<&str>,
        mut callbacks: Vec<(&str, ColumnCallback)>,
    ) -> Self {
        let filter = filter_columns
            .into_iter()
            .map(|(name, column)| {
                let resolution = match callbacks.iter().position(|(cb_name, _)| *cb_name == name) {
                    Some(idx) => ColumnResolution::Callback {
                        column,
                        callback: callbacks.swap_remove(idx).1,
                    },
                    None => ColumnResolution::Direct(column),
                };
                (name.to_string(), resolution)
            })
            .collect();

        Self {
            grid: grid.into(),
            filter,
            order: order_columns
                .into_iter()
                .map(|(name, column)| (name.to_string(), column))
                .collect(),
            searchable: searchable_columns.into_iter().map(str::to_string).collect(),
        }
    }

    /// Name of the grid the registry belongs to, used in error messages.
    #[must_use]
    pub fn grid(&self) -> &str {
        &self.grid
    }

    /// # Errors
    ///
    /// `GridError::FilterColumn` if `name` is not filterable.
    pub fn resolve_filter_column(&self, name: &str) -> Result<&ColumnResolution, GridError> {
        self.filter
            .iter()
            .find(|(col_name, _)| col_name == name)
            .map(|(_, resolution)| resolution)
            .ok_or_else(|| GridError::filter_column(name, &self.grid))
    }

    /// # Errors
    ///
    /// `GridError::SortColumn` if `name` is not sortable.
    pub fn resolve_order_column(&self, name: &str) -> Result<&SimpleExpr, GridError> {
        self.order
            .iter()
            .find(|(col_name, _)| col_name == name)
            .map(|(_, column)| column)
            .ok_or_else(|| GridError::sort_column(name, &self.grid))
    }

    /// Check the searchable set: every name must be filterable, and the set
    /// must not be empty when a search term is present.
    ///
    /// # Errors
    ///
    /// `GridError::SearchColumn` on either violation.
    pub fn validate_searchable_columns(&self, search_present: bool) -> Result<(), GridError> {
        if let Some(missing) = self
            .searchable
            .iter()
            .find(|name| !self.filter.iter().any(|(col_name, _)| col_name == *name))
        {
            return Err(GridError::search_column(format!(
                "Column '{missing}' from '{grid}::searchable_columns' is not defined in '{grid}::filter_columns'",
                grid = self.grid
            )));
        }

        if search_present && self.searchable.is_empty() {
            return Err(GridError::search_column(format!(
                "Search is not supported by '{}': no searchable columns are defined",
                self.grid
            )));
        }

        Ok(())
    }

    /// Searchable columns with their resolutions, in declaration order.
    ///
    /// # Errors
    ///
    /// `GridError::SearchColumn` if a searchable name is not filterable.
    pub fn searchable_resolutions(&self) -> Result<Vec<(&str, &ColumnResolution)>, GridError> {
        self.validate_searchable_columns(false)?;
        Ok(self
            .searchable
            .iter()
            .filter_map(|name| {
                self.filter
                    .iter()
                    .find(|(col_name, _)| col_name == name)
                    .map(|(col_name, resolution)| (col_name.as_str(), resolution))
            })
            .collect())
    }

    #[must_use]
    pub fn filter_names(&self) -> Vec<String> {
        self.filter.iter().map(|(name, _)| name.clone()).collect()
    }

    #[must_use]
    pub fn order_names(&self) -> Vec<String> {
        self.order.iter().map(|(name, _)| name.clone()).collect()
    }

    #[must_use]
    pub fn searchable_names(&self) -> &[String] {
        &self.searchable
    }
}
