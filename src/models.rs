use sea_orm::{Value, sea_query::Order};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::errors::GridError;

/// Query parameters understood by the grid extractor.
///
/// Every parameter may also be sent as a request header of the same name
/// (case-insensitive). Query parameters win over headers.
///
/// # Filtering
/// `filter` is a JSON array of AND-groups, each group a JSON array of
/// OR-conditions:
/// ```json
/// [[{"column": "status", "operator": "EQ", "value": ["open", "pending"]}],
///  [{"column": "total", "operator": "GTE", "value": 100},
///   {"column": "vip", "operator": "EQ", "value": true}]]
/// ```
/// `EMPTY` and `NEMPTY` take no `value`.
///
/// # Sorting
/// `sorter` is a JSON array of `{"column": ..., "direction": "ASC" | "DESC"}`
/// entries, applied in order.
///
/// # Pagination
/// `page` is 1-based (default 1), `itemsPerPage` defaults to 10.
#[derive(Debug, Deserialize, IntoParams, ToSchema, Default)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct GridQuery {
    /// JSON-encoded AND-of-OR filter groups.
    #[param(example = r#"[[{"column":"int","operator":"GTE","value":[8]}]]"#)]
    pub filter: Option<String>,
    /// JSON-encoded list of sort keys.
    #[param(example = r#"[{"column":"id","direction":"DESC"}]"#)]
    pub sorter: Option<String>,
    /// 1-based page number.
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Page size.
    #[param(example = 10)]
    pub items_per_page: Option<u64>,
    /// Free-text search across the searchable columns.
    #[param(example = "String 9")]
    pub search: Option<String>,
}

/// Comparison operators of the condition algebra.
///
/// Unknown or missing operators fall back to [`Operator::Eq`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    #[default]
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Starts,
    Ends,
    Empty,
    Nempty,
    Between,
    Nbetween,
}

impl Operator {
    /// Parse an operator token. Anything unknown is treated as `EQ`.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_uppercase().as_str() {
            "NEQ" => Self::Neq,
            "GT" => Self::Gt,
            "GTE" => Self::Gte,
            "LT" => Self::Lt,
            "LTE" => Self::Lte,
            "LIKE" => Self::Like,
            "STARTS" => Self::Starts,
            "ENDS" => Self::Ends,
            "EMPTY" => Self::Empty,
            "NEMPTY" => Self::Nempty,
            "BETWEEN" => Self::Between,
            "NBETWEEN" => Self::Nbetween,
            _ => Self::Eq,
        }
    }

    /// `EMPTY` and `NEMPTY` are unary null checks.
    #[must_use]
    pub const fn requires_value(self) -> bool {
        !matches!(self, Self::Empty | Self::Nempty)
    }
}

/// A single filter value as sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    fn from_json(value: &serde_json::Value) -> Result<Self, GridError> {
        match value {
            serde_json::Value::Null => Ok(Self::Null),
            serde_json::Value::Bool(b) => Ok(Self::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .ok_or_else(|| GridError::filter_format(format!("Unsupported number '{n}'"))),
            serde_json::Value::String(s) => Ok(Self::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Err(
                GridError::filter_format("Filter values must be scalars or arrays of scalars"),
            ),
        }
    }

    /// Bind value with the semantic coercion of the grid: numeric-looking
    /// strings bind as numbers, UUIDs as UUIDs and null as an empty string.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::from(String::new()),
            Self::Bool(b) => Value::from(*b),
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::String(s) => coerce_string(s),
        }
    }

    /// Textual form used for LIKE patterns.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s.clone(),
        }
    }
}

fn is_numeric(value: &str) -> bool {
    !value.is_empty()
        && value.chars().any(|c| c.is_ascii_digit())
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}

fn coerce_string(raw: &str) -> Value {
    let trimmed = raw.trim();
    if is_numeric(trimmed) {
        if let Ok(int) = trimmed.parse::<i64>() {
            return Value::from(int);
        }
        if let Ok(float) = trimmed.parse::<f64>() {
            if float.is_finite() {
                return Value::from(float);
            }
        }
    }
    if let Ok(uuid) = Uuid::parse_str(trimmed) {
        return Value::from(uuid);
    }
    Value::from(raw.to_string())
}

/// Value of an OR-condition: a scalar or an array of scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl FilterValue {
    /// Parse a JSON value into a filter value.
    ///
    /// # Errors
    ///
    /// Returns `GridError::FilterFormat` for objects or nested arrays.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, GridError> {
        match value {
            serde_json::Value::Array(items) => items
                .iter()
                .map(Scalar::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
            other => Scalar::from_json(other).map(Self::Scalar),
        }
    }

    /// The scalar itself, or the first element of an array.
    #[must_use]
    pub fn first(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(scalar) => Some(scalar),
            Self::List(items) => items.first(),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Scalar(Scalar::String(value.to_string()))
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Scalar(Scalar::Int(value))
    }
}

impl From<Vec<i64>> for FilterValue {
    fn from(values: Vec<i64>) -> Self {
        Self::List(values.into_iter().map(Scalar::Int).collect())
    }
}

/// One OR-condition of an AND-group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub column: String,
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FilterValue>,
}

impl FilterCondition {
    pub fn new(column: impl Into<String>, operator: Operator, value: Option<FilterValue>) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
        }
    }
}

/// AND-groups of OR-conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterClause {
    groups: Vec<Vec<FilterCondition>>,
}

impl FilterClause {
    #[must_use]
    pub fn new(groups: Vec<Vec<FilterCondition>>) -> Self {
        Self { groups }
    }

    #[must_use]
    pub fn groups(&self) -> &[Vec<FilterCondition>] {
        &self.groups
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(Vec::is_empty)
    }

    /// Append groups after the existing ones; they are ANDed with them.
    pub fn extend(&mut self, other: FilterClause) {
        self.groups.extend(other.groups);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl SortDirection {
    /// Exact, case-sensitive parse.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_order(self) -> Order {
        match self {
            Self::Asc => Order::Asc,
            Self::Desc => Order::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortEntry {
    pub column: String,
    pub direction: SortDirection,
}

/// Grid state echoed back to the client, typically as response headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeaderParams {
    /// JSON-encoded filter groups, additional filters included.
    pub filter: String,
    pub page: u64,
    pub items_per_page: u64,
    /// Total number of rows matching filter and search.
    pub total: u64,
    pub search: Option<String>,
    /// JSON-encoded sorter, `None` when the request had none.
    pub sorter: Option<String>,
}

/// External column names a grid accepts, per role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct GridColumns {
    pub filter: Vec<String>,
    pub order: Vec<String>,
    pub search: Vec<String>,
}
