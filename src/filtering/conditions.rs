use sea_orm::{
    Condition, Value,
    sea_query::{Expr, SelectStatement, SimpleExpr},
};

use crate::{
    errors::GridError,
    models::{FilterClause, FilterValue, Operator, Scalar},
    registry::{ColumnRegistry, ColumnResolution},
};

fn require_value<'a>(
    value: Option<&'a FilterValue>,
    operator: Operator,
) -> Result<&'a FilterValue, GridError> {
    value.ok_or_else(|| {
        GridError::filter_format(format!("Operator '{operator:?}' requires a value"))
    })
}

fn require_scalar(value: &FilterValue, operator: Operator) -> Result<&Scalar, GridError> {
    value.first().ok_or_else(|| {
        GridError::filter_format(format!("Operator '{operator:?}' requires a non-empty value"))
    })
}

fn first_value(value: Option<&FilterValue>, operator: Operator) -> Result<Value, GridError> {
    Ok(require_scalar(require_value(value, operator)?, operator)?.to_value())
}

fn first_text(value: Option<&FilterValue>, operator: Operator) -> Result<String, GridError> {
    Ok(require_scalar(require_value(value, operator)?, operator)?.as_text())
}

fn bind_all(values: &[Scalar]) -> Vec<Value> {
    values.iter().map(Scalar::to_value).collect()
}

/// Equality or set membership. One-element arrays behave like the scalar.
fn build_equality(column: &SimpleExpr, value: &FilterValue, negated: bool) -> SimpleExpr {
    let column = Expr::expr(column.clone());
    match value {
        FilterValue::List(items) if items.len() != 1 => {
            if negated {
                column.is_not_in(bind_all(items))
            } else {
                column.is_in(bind_all(items))
            }
        }
        FilterValue::List(items) => {
            let bound = items[0].to_value();
            if negated { column.ne(bound) } else { column.eq(bound) }
        }
        FilterValue::Scalar(scalar) => {
            if negated {
                column.ne(scalar.to_value())
            } else {
                column.eq(scalar.to_value())
            }
        }
    }
}

/// Translate one `(column, value, operator)` triple into a predicate.
///
/// Values are always bound as parameters.
///
/// # Errors
///
/// `GridError::FilterFormat` if the operator needs a value and none (or an
/// empty array) was given.
pub fn build_condition(
    column: &SimpleExpr,
    value: Option<&FilterValue>,
    operator: Operator,
) -> Result<SimpleExpr, GridError> {
    let expr = || Expr::expr(column.clone());

    let condition = match operator {
        Operator::Empty => expr().is_null(),
        Operator::Nempty => expr().is_not_null(),
        Operator::Eq => build_equality(column, require_value(value, operator)?, false),
        Operator::Neq => build_equality(column, require_value(value, operator)?, true),
        Operator::Gt => expr().gt(first_value(value, operator)?),
        Operator::Gte => expr().gte(first_value(value, operator)?),
        Operator::Lt => expr().lt(first_value(value, operator)?),
        Operator::Lte => expr().lte(first_value(value, operator)?),
        Operator::Like => expr().like(format!("%{}%", first_text(value, operator)?)),
        Operator::Starts => expr().like(format!("{}%", first_text(value, operator)?)),
        Operator::Ends => expr().like(format!("%{}", first_text(value, operator)?)),
        Operator::Between => match require_value(value, operator)? {
            FilterValue::List(items) if items.len() >= 2 => {
                expr().between(items[0].to_value(), items[1].to_value())
            }
            other => expr().eq(require_scalar(other, operator)?.to_value()),
        },
        // Bounds are inclusive on both sides, so v0 and v1 also match BETWEEN.
        Operator::Nbetween => match require_value(value, operator)? {
            FilterValue::List(items) if items.len() >= 2 => expr()
                .lte(items[0].to_value())
                .or(expr().gte(items[1].to_value())),
            other => expr().ne(require_scalar(other, operator)?.to_value()),
        },
    };

    Ok(condition)
}

/// Add the predicate for one OR-condition to `group`, delegating to the
/// column callback when the column has one.
///
/// # Errors
///
/// See [`build_condition`].
pub fn apply_condition(
    query: &mut SelectStatement,
    resolution: &ColumnResolution,
    value: Option<&FilterValue>,
    operator: Operator,
    group: Condition,
) -> Result<Condition, GridError> {
    match resolution {
        ColumnResolution::Direct(column) => {
            Ok(group.add(build_condition(column, value, operator)?))
        }
        ColumnResolution::Callback { column, callback } => {
            Ok(callback(query, value, column, group, operator))
        }
    }
}

/// Build the AND of all filter groups, each group an OR of its conditions.
///
/// Empty groups are skipped. Every column is resolved against the registry
/// before anything is returned, so an unknown column never yields a partial
/// predicate.
///
/// # Errors
///
/// `GridError::FilterColumn` for columns outside the whitelist, or any error
/// of [`build_condition`].
pub fn apply_filters(
    query: &mut SelectStatement,
    registry: &ColumnRegistry,
    clause: &FilterClause,
) -> Result<Condition, GridError> {
    let mut filter = Condition::all();

    for group in clause.groups().iter().filter(|group| !group.is_empty()) {
        let mut any = Condition::any();
        for condition in group {
            let resolution = registry.resolve_filter_column(&condition.column)?;
            any = apply_condition(
                query,
                resolution,
                condition.value.as_ref(),
                condition.operator,
                any,
            )?;
        }
        filter = filter.add(any);
    }

    Ok(filter)
}
