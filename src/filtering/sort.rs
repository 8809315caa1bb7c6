use sea_orm::sea_query::SelectStatement;

use crate::{errors::GridError, models::SortEntry, registry::ColumnRegistry};

/// Append one ORDER BY key per sorter entry, in the order given.
///
/// All entries are resolved before the query is touched.
///
/// # Errors
///
/// `GridError::SortColumn` for a column outside the order whitelist.
pub fn apply_sort(
    query: &mut SelectStatement,
    registry: &ColumnRegistry,
    sorter: &[SortEntry],
) -> Result<(), GridError> {
    let resolved = sorter
        .iter()
        .map(|entry| {
            registry
                .resolve_order_column(&entry.column)
                .map(|column| (column.clone(), entry.direction.to_order()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (column, order) in resolved {
        query.order_by_expr(column, order);
    }

    Ok(())
}
