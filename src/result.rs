use chrono::{DateTime, NaiveDate, NaiveDateTime};
use sea_orm::{ConnectionTrait, DatabaseBackend, FromQueryResult, sea_query::SelectStatement};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::GridError;

/// Canonical rendering of date/time fields.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATE_TIME_INPUTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A row as a flat map of column alias to JSON value.
pub type Row = Map<String, Value>;

/// One page of a grid together with the total across all pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultPage<T> {
    pub rows: Vec<T>,
    pub total: u64,
}

/// Render a date or date-time string as `YYYY-MM-DD HH:MM:SS`.
///
/// Returns `None` for strings that are neither.
#[must_use]
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_local().format(DATE_TIME_FORMAT).to_string());
    }
    DATE_TIME_INPUTS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|parsed| parsed.format(DATE_TIME_FORMAT).to_string())
}

/// Normalize the given fields of a row in place. Missing fields, non-string
/// values and unparseable strings are left alone.
pub fn normalize_dates(row: &mut Row, date_fields: &[&str]) {
    for field in date_fields {
        if let Some(Value::String(raw)) = row.get_mut(*field) {
            if let Some(normalized) = normalize_date(raw) {
                *raw = normalized;
            }
        }
    }
}

/// An assembled page query and the total it was counted against.
///
/// Rows are fetched lazily and at most once. A page that starts at or past
/// the total is known to be empty and never reaches the database.
#[derive(Debug, Clone)]
pub struct ResultData {
    statement: SelectStatement,
    backend: DatabaseBackend,
    offset: u64,
    total: u64,
    rows: Option<Vec<Row>>,
}

impl ResultData {
    #[must_use]
    pub fn new(statement: SelectStatement, backend: DatabaseBackend, offset: u64, total: u64) -> Self {
        Self {
            statement,
            backend,
            offset,
            total,
            rows: None,
        }
    }

    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.total
    }

    /// `true` when the page offset lies beyond the matching rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total <= self.offset
    }

    /// Rows as JSON maps, with `date_fields` normalized.
    ///
    /// The first call runs the query; later calls return the cached rows and
    /// ignore `date_fields`.
    ///
    /// # Errors
    ///
    /// `GridError::Execution` if the query fails.
    pub async fn rows<C>(&mut self, db: &C, date_fields: &[&str]) -> Result<&[Row], GridError>
    where
        C: ConnectionTrait,
    {
        if self.rows.is_none() {
            let rows = if self.is_empty() {
                Vec::new()
            } else {
                tracing::debug!(offset = self.offset, "Fetching grid rows");
                Value::find_by_statement(self.backend.build(&self.statement))
                    .all(db)
                    .await?
                    .into_iter()
                    .map(|value| {
                        let mut row = match value {
                            Value::Object(row) => row,
                            _ => Row::new(),
                        };
                        normalize_dates(&mut row, date_fields);
                        row
                    })
                    .collect()
            };
            self.rows = Some(rows);
        }

        Ok(self.rows.as_deref().unwrap_or_default())
    }

    /// Rows hydrated into a typed model. Not cached.
    ///
    /// # Errors
    ///
    /// `GridError::Execution` if the query fails or a row does not fit `M`.
    pub async fn fetch_as<M, C>(&self, db: &C) -> Result<Vec<M>, GridError>
    where
        M: FromQueryResult,
        C: ConnectionTrait,
    {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(offset = self.offset, "Fetching typed grid rows");
        Ok(M::find_by_statement(self.backend.build(&self.statement))
            .all(db)
            .await?)
    }
}
