use sea_orm::sea_query::{SelectStatement, SimpleExpr};

use crate::registry::ColumnCallback;

/// Definition of one data grid.
///
/// Implementors describe the query a grid lists from and which of its
/// columns callers may filter, sort and search on. External names (the keys)
/// are what clients send; the expressions are what ends up in SQL.
///
/// ```rust,ignore
/// struct UserGrid;
///
/// impl GridFilter for UserGrid {
///     const GRID_NAME: &'static str = "UserGrid";
///
///     fn base_query() -> Option<SelectStatement> {
///         Some(Query::select().columns([user::Column::Id, user::Column::Email]).from(user::Entity).to_owned())
///     }
///
///     fn filter_columns() -> Vec<(&'static str, SimpleExpr)> {
///         vec![("email", Expr::col(user::Column::Email).into())]
///     }
///
///     fn order_columns() -> Vec<(&'static str, SimpleExpr)> {
///         vec![("id", Expr::col(user::Column::Id).into())]
///     }
/// }
/// ```
pub trait GridFilter: Send + Sync {
    /// Name used in error messages.
    const GRID_NAME: &'static str;

    /// Query the grid lists from. `None` makes every data call fail with
    /// `GridError::Configuration`.
    fn base_query() -> Option<SelectStatement>;

    /// Filter whitelist: external name to internal expression.
    fn filter_columns() -> Vec<(&'static str, SimpleExpr)>;

    /// Sort whitelist: external name to internal expression.
    fn order_columns() -> Vec<(&'static str, SimpleExpr)>;

    /// Columns searched by the free-text term. Each must also be a filter
    /// column.
    fn searchable_columns() -> Vec<&'static str> {
        Vec::new()
    }

    /// Custom predicate builders for filter columns that need more than the
    /// default operator mapping.
    fn column_callbacks() -> Vec<(&'static str, ColumnCallback)> {
        Vec::new()
    }

    /// Dedicated query for the total, typically a cheaper `COUNT` over the
    /// same joins. It must select the count as its first column. When
    /// absent the total is counted over the filtered base query.
    fn count_query() -> Option<SelectStatement> {
        None
    }
}
