//! Incoming grid state: filter, sorter, paging and search.
//!
//! The request is built from a loosely typed key-value bag (request headers,
//! query string, or any JSON object). Keys are case-insensitive. Each value
//! may be structured JSON or a JSON-encoded string, which is how it arrives
//! over headers.

use serde::Deserialize;
use serde_json::{Map, Value};
use serde_with::{DisplayFromStr, PickFirst, serde_as};

use crate::{
    errors::GridError,
    filtering::MAX_ROW_BOUND,
    models::{
        FilterClause, FilterCondition, FilterValue, GridQuery, HeaderParams, Operator,
        SortDirection, SortEntry,
    },
};

const FILTER: &str = "filter";
const SORTER: &str = "sorter";
const PAGING: &str = "paging";
const SEARCH: &str = "search";
const PAGING_KEYS: [&str; 3] = ["page", "itemsperpage", "limit"];

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Paging {
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    page: Option<u64>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(alias = "itemsperpage", alias = "limit")]
    items_per_page: Option<u64>,
}

impl Paging {
    fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_else(|err| {
            tracing::debug!(error = %err, "Ignoring malformed paging, using defaults");
            Self::default()
        })
    }
}

/// Parsed view over a grid request bag.
#[derive(Debug, Clone, Default)]
pub struct GridRequest {
    bag: Map<String, Value>,
    additional_filters: FilterClause,
    items_per_page: Option<u64>,
    total: u64,
}

impl GridRequest {
    pub const DEFAULT_PAGE: u64 = 1;
    pub const DEFAULT_ITEMS_PER_PAGE: u64 = 10;
    /// Larger page sizes are clamped to this.
    pub const MAX_ITEMS_PER_PAGE: u64 = MAX_ROW_BOUND;

    /// Normalize a key-value bag: keys are lower-cased and an array whose
    /// first element is a string (the shape of multi-valued headers) is
    /// reduced to that string.
    pub fn new<I, K, V>(bag: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let bag = bag
            .into_iter()
            .map(|(key, value)| {
                let value = match value.into() {
                    Value::Array(mut items) if matches!(items.first(), Some(Value::String(_))) => {
                        items.swap_remove(0)
                    }
                    other => other,
                };
                (key.as_ref().to_ascii_lowercase(), value)
            })
            .collect();

        Self {
            bag,
            ..Self::default()
        }
    }

    /// Server-side filters, ANDed after the user's groups.
    #[must_use]
    pub fn with_additional_filters(mut self, filters: FilterClause) -> Self {
        self.additional_filters.extend(filters);
        self
    }

    /// Fixed page size, taking precedence over whatever the bag says.
    /// Zero is ignored.
    #[must_use]
    pub fn with_items_per_page(mut self, items_per_page: u64) -> Self {
        self.items_per_page = (items_per_page > 0).then_some(items_per_page);
        self
    }

    /// Raw section, with JSON-encoded strings decoded. Blank strings and
    /// `null` count as absent.
    fn section(
        &self,
        key: &str,
        error: fn(String) -> GridError,
    ) -> Result<Option<Value>, GridError> {
        match self.bag.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(raw)) if raw.trim().is_empty() => Ok(None),
            Some(Value::String(raw)) => serde_json::from_str(raw)
                .map(|value: Value| (!value.is_null()).then_some(value))
                .map_err(|err| error(format!("'{key}' is not valid JSON: {err}"))),
            Some(value) => Ok(Some(value.clone())),
        }
    }

    fn parse_filter(&self, validate: bool) -> Result<FilterClause, GridError> {
        let Some(raw) = self.section(FILTER, GridError::filter_format)? else {
            return Ok(FilterClause::default());
        };
        let Value::Array(groups) = raw else {
            return Err(GridError::filter_format(
                "Filter must be an array of AND-groups",
            ));
        };

        let mut clause = Vec::with_capacity(groups.len());
        for group in groups {
            let Value::Array(conditions) = group else {
                return Err(GridError::filter_format(
                    "Each filter group must be an array of conditions",
                ));
            };

            let mut parsed = Vec::with_capacity(conditions.len());
            for condition in conditions {
                if let Some(condition) = parse_condition(condition, validate)? {
                    parsed.push(condition);
                }
            }
            clause.push(parsed);
        }

        Ok(FilterClause::new(clause))
    }

    /// User filter groups followed by the additional filters.
    ///
    /// # Errors
    ///
    /// `GridError::FilterFormat` if the filter is not valid JSON, is not an
    /// array of arrays of objects, or a condition lacks its column, operator
    /// or (for operators other than `EMPTY`/`NEMPTY`) its value.
    pub fn filter(&self) -> Result<FilterClause, GridError> {
        let mut clause = self.parse_filter(true)?;
        clause.extend(self.additional_filters.clone());
        Ok(clause)
    }

    /// Lenient variant of [`filter`](Self::filter): conditions without a
    /// column are dropped and a missing operator means `EQ`.
    ///
    /// # Errors
    ///
    /// `GridError::FilterFormat` if the overall structure is not an array
    /// of arrays of objects.
    pub fn filter_unchecked(&self) -> Result<FilterClause, GridError> {
        let mut clause = self.parse_filter(false)?;
        clause.extend(self.additional_filters.clone());
        Ok(clause)
    }

    /// # Errors
    ///
    /// `GridError::SortFormat` if the sorter is not an array of
    /// `{column, direction}` objects with direction exactly `ASC` or `DESC`.
    pub fn sorter(&self) -> Result<Vec<SortEntry>, GridError> {
        let Some(raw) = self.section(SORTER, GridError::sort_format)? else {
            return Ok(Vec::new());
        };
        let Value::Array(entries) = raw else {
            return Err(GridError::sort_format("Sorter must be an array"));
        };

        entries
            .iter()
            .map(|entry| {
                let column = entry
                    .get("column")
                    .and_then(Value::as_str)
                    .ok_or_else(|| GridError::sort_format("Sorter entry is missing 'column'"))?;
                let direction = entry
                    .get("direction")
                    .and_then(Value::as_str)
                    .and_then(SortDirection::parse)
                    .ok_or_else(|| {
                        GridError::sort_format(format!(
                            "Sorter entry for '{column}' needs 'direction' ASC or DESC"
                        ))
                    })?;
                Ok(SortEntry {
                    column: column.to_string(),
                    direction,
                })
            })
            .collect()
    }

    /// The `paging` object, with flat `page` / `itemsPerPage` / `limit` keys
    /// filling whatever it leaves out.
    fn paging(&self) -> Paging {
        let nested = match self.section(PAGING, GridError::filter_format) {
            Ok(Some(value)) => Paging::from_value(value),
            Ok(None) => Paging::default(),
            Err(err) => {
                tracing::debug!(error = %err, "Ignoring malformed paging, using defaults");
                Paging::default()
            }
        };

        let flat: Map<String, Value> = PAGING_KEYS
            .iter()
            .filter_map(|key| self.bag.get(*key).map(|value| ((*key).to_string(), value.clone())))
            .collect();
        let flat = Paging::from_value(Value::Object(flat));

        Paging {
            page: nested.page.or(flat.page),
            items_per_page: nested.items_per_page.or(flat.items_per_page),
        }
    }

    /// 1-based page, never below 1.
    #[must_use]
    pub fn page(&self) -> u64 {
        self.paging()
            .page
            .filter(|page| *page >= 1)
            .unwrap_or(Self::DEFAULT_PAGE)
    }

    /// Page size, at least 1 and at most [`Self::MAX_ITEMS_PER_PAGE`].
    #[must_use]
    pub fn items_per_page(&self) -> u64 {
        self.items_per_page
            .or_else(|| self.paging().items_per_page.filter(|n| *n > 0))
            .unwrap_or(Self::DEFAULT_ITEMS_PER_PAGE)
            .min(Self::MAX_ITEMS_PER_PAGE)
    }

    /// Search term, `None` when absent or blank.
    #[must_use]
    pub fn search(&self) -> Option<String> {
        match self.bag.get(SEARCH)? {
            Value::String(term) if !term.trim().is_empty() => Some(term.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }

    pub fn set_total(&mut self, total: u64) {
        self.total = total;
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Current state for echoing back to the client.
    ///
    /// The filter is the user's JSON followed by the additional filters; a
    /// filter that does not parse is echoed as `[]` plus the additional
    /// filters. The sorter is echoed as sent.
    #[must_use]
    pub fn header_params(&self) -> HeaderParams {
        let mut groups = match self.section(FILTER, GridError::filter_format) {
            Ok(Some(Value::Array(groups))) => groups,
            _ => Vec::new(),
        };
        if let Ok(Value::Array(additional)) = serde_json::to_value(&self.additional_filters) {
            groups.extend(additional);
        }

        let sorter = match self.bag.get(SORTER) {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) => Some(raw.clone()),
            Some(value) => Some(value.to_string()),
        };

        HeaderParams {
            filter: Value::Array(groups).to_string(),
            page: self.page(),
            items_per_page: self.items_per_page(),
            total: self.total,
            search: self.search(),
            sorter,
        }
    }
}

impl From<GridQuery> for GridRequest {
    fn from(query: GridQuery) -> Self {
        let entries = [
            (FILTER, query.filter.map(Value::from)),
            (SORTER, query.sorter.map(Value::from)),
            ("page", query.page.map(Value::from)),
            ("itemsperpage", query.items_per_page.map(Value::from)),
            (SEARCH, query.search.map(Value::from)),
        ];
        Self::new(entries.into_iter().filter_map(|(key, value)| value.map(|value| (key, value))))
    }
}

fn parse_condition(raw: Value, validate: bool) -> Result<Option<FilterCondition>, GridError> {
    let Value::Object(object) = raw else {
        return Err(GridError::filter_format("Filter conditions must be objects"));
    };

    let Some(column) = object.get("column").and_then(Value::as_str) else {
        if validate {
            return Err(GridError::filter_format("Filter condition is missing 'column'"));
        }
        return Ok(None);
    };

    let operator = match object.get("operator").and_then(Value::as_str) {
        Some(token) => Operator::parse(token),
        None if validate => {
            return Err(GridError::filter_format(format!(
                "Filter condition for '{column}' is missing 'operator'"
            )));
        }
        None => Operator::Eq,
    };

    let value = match object.get("value") {
        None | Some(Value::Null) => None,
        Some(value) => Some(FilterValue::from_json(value)?),
    };

    if validate && value.is_none() && operator.requires_value() {
        return Err(GridError::filter_format(format!(
            "Filter condition for '{column}' is missing 'value'"
        )));
    }

    Ok(Some(FilterCondition::new(column, operator, value)))
}
