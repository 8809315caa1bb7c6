//! # Error Handling for Grid Queries
//!
//! Every failure in this crate is a [`GridError`]. Errors are fail-fast: a
//! structurally invalid request is rejected while the [`GridRequest`](crate::GridRequest)
//! is parsed, and a column outside the whitelist is rejected while the query is
//! assembled, before anything reaches the database.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gridcrate::{Grid, GridError, GridRequest};
//!
//! async fn list(
//!     State(db): State<DatabaseConnection>,
//!     mut request: GridRequest,
//! ) -> Result<Json<Vec<Row>>, GridError> {
//!     let page = Grid::new::<UserGrid>().get_data(&db, &mut request, &["created_at"]).await?;
//!     Ok(Json(page.rows))
//! }
//! ```
//!
//! ## Logging
//!
//! Execution errors keep the underlying `DbErr` and log it through `tracing`
//! when rendered as a response. The response body only carries a generic
//! message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use std::fmt;

/// Errors raised while parsing a grid request, assembling its query, or
/// executing it.
#[derive(Debug)]
pub enum GridError {
    /// A filter clause is structurally invalid (missing column, operator or value).
    FilterFormat {
        /// Description of the offending part of the filter
        message: String,
    },

    /// A sorter entry is structurally invalid or carries an unknown direction.
    SortFormat {
        /// Description of the offending part of the sorter
        message: String,
    },

    /// The filter references a column outside the filter whitelist.
    FilterColumn {
        /// External column name as sent by the caller
        column: String,
        /// Grid that rejected the column
        grid: String,
    },

    /// The sorter references a column outside the order whitelist.
    SortColumn {
        /// External column name as sent by the caller
        column: String,
        /// Grid that rejected the column
        grid: String,
    },

    /// Search was requested without usable searchable columns.
    SearchColumn {
        /// Description of the configuration problem
        message: String,
    },

    /// The grid definition is incomplete (e.g. no base query).
    Configuration {
        /// Description of the missing piece
        message: String,
    },

    /// The execution engine failed. Details are logged, never sent to clients.
    Execution(DbErr),
}

impl GridError {
    pub fn filter_format(message: impl Into<String>) -> Self {
        Self::FilterFormat {
            message: message.into(),
        }
    }

    pub fn sort_format(message: impl Into<String>) -> Self {
        Self::SortFormat {
            message: message.into(),
        }
    }

    pub fn filter_column(column: impl Into<String>, grid: impl Into<String>) -> Self {
        Self::FilterColumn {
            column: column.into(),
            grid: grid.into(),
        }
    }

    pub fn sort_column(column: impl Into<String>, grid: impl Into<String>) -> Self {
        Self::SortColumn {
            column: column.into(),
            grid: grid.into(),
        }
    }

    pub fn search_column(message: impl Into<String>) -> Self {
        Self::SearchColumn {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Stable numeric code, usable by clients that cannot match on variants.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::Execution(_) => 1,
            Self::SearchColumn { .. } => 6,
            Self::Configuration { .. } => 7,
            Self::SortColumn { .. } => 8,
            Self::FilterColumn { .. } => 9,
            Self::FilterFormat { .. } => 10,
            Self::SortFormat { .. } => 11,
        }
    }

    /// HTTP status a handler should answer with.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::FilterFormat { .. }
            | Self::SortFormat { .. }
            | Self::FilterColumn { .. }
            | Self::SortColumn { .. }
            | Self::SearchColumn { .. } => StatusCode::BAD_REQUEST,
            Self::Configuration { .. } | Self::Execution(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message that is safe to show to API users.
    fn user_message(&self) -> String {
        match self {
            Self::FilterFormat { message } | Self::SortFormat { message } => message.clone(),
            Self::FilterColumn { column, grid } => format!(
                "Column '{column}' cannot be used for filtering! Have you forgotten add it to '{grid}::filter_columns'?"
            ),
            Self::SortColumn { column, grid } => format!(
                "Column '{column}' cannot be used for sorting! Have you forgotten add it to '{grid}::order_columns'?"
            ),
            Self::SearchColumn { message } | Self::Configuration { message } => message.clone(),
            Self::Execution(_) => "A database error occurred".to_string(),
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Execution(internal) => {
                tracing::error!(error = ?internal, code = self.code(), "Grid query execution failed");
            }
            Self::Configuration { message } => {
                tracing::error!(details = %message, code = self.code(), "Grid is misconfigured");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    code = self.code(),
                    "Grid request rejected"
                );
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for GridError {
    fn into_response(self) -> Response {
        self.log_internal();

        let body = ErrorResponse {
            error: self.user_message(),
            code: self.code(),
        };

        (self.status_code(), Json(body)).into_response()
    }
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Execution(err) => write!(f, "{}: {err}", self.user_message()),
            _ => write!(f, "{}", self.user_message()),
        }
    }
}

impl std::error::Error for GridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Execution(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbErr> for GridError {
    fn from(err: DbErr) -> Self {
        Self::Execution(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_column_message_names_column_and_grid() {
        let err = GridError::sort_column("Unknown", "EntityGrid");
        assert_eq!(
            err.to_string(),
            "Column 'Unknown' cannot be used for sorting! Have you forgotten add it to 'EntityGrid::order_columns'?"
        );
        assert_eq!(err.code(), 8);
    }

    #[test]
    fn test_filter_column_message_names_column() {
        let err = GridError::filter_column("secret", "EntityGrid");
        assert!(err.to_string().contains("'secret'"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_execution_error_is_sanitized_for_users() {
        let err = GridError::from(DbErr::Custom("connection refused".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "A database error occurred");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_all_status_codes() {
        let cases = vec![
            (GridError::filter_format("x"), StatusCode::BAD_REQUEST),
            (GridError::sort_format("x"), StatusCode::BAD_REQUEST),
            (GridError::filter_column("a", "G"), StatusCode::BAD_REQUEST),
            (GridError::sort_column("a", "G"), StatusCode::BAD_REQUEST),
            (GridError::search_column("x"), StatusCode::BAD_REQUEST),
            (GridError::configuration("x"), StatusCode::INTERNAL_SERVER_ERROR),
            (
                GridError::Execution(DbErr::Custom("x".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status_code(), expected, "{err:?}");
        }
    }

    #[test]
    fn test_into_response_uses_status_code() {
        let response = GridError::filter_format("Filter must be an array").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
