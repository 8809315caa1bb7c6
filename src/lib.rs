//! Request-driven data grids on top of Sea-ORM: whitelisted filtering,
//! sorting, free-text search and pagination, with an Axum extractor for the
//! request state.
//!
//! ```rust,ignore
//! async fn list_users(
//!     State(state): State<AppState>,
//!     request: GridRequest,
//! ) -> Result<impl IntoResponse, GridError> {
//!     grid_response(&state.users, &state.db, request, &["created_at"]).await
//! }
//! ```

pub mod errors;
pub mod filtering;
pub mod grid;
pub mod handler;
pub mod models;
pub mod registry;
pub mod request;
pub mod result;
pub mod traits;

pub use errors::GridError;
pub use grid::{Grid, QueryPlan};
pub use handler::grid_response;
pub use models::{FilterClause, FilterCondition, FilterValue, HeaderParams, Operator, Scalar};
pub use registry::{ColumnCallback, column_callback};
pub use request::GridRequest;
pub use result::{ResultData, ResultPage, Row};
pub use serde_with;
pub use traits::GridFilter;
