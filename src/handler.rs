//! Axum glue: a [`GridRequest`] extractor and a response helper that echoes
//! the grid state as headers.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{FromRequestParts, Query},
    http::{HeaderMap, Uri, request::Parts},
};
use sea_orm::ConnectionTrait;
use serde_json::Value;

use crate::{
    errors::GridError,
    filtering::{calculate_content_range, calculate_offset, header_params_to_headers},
    grid::Grid,
    request::GridRequest,
    result::Row,
};

const GRID_KEYS: [&str; 7] = ["filter", "sorter", "paging", "search", "page", "itemsperpage", "limit"];

fn is_grid_key(key: &str) -> bool {
    GRID_KEYS.iter().any(|known| known.eq_ignore_ascii_case(key))
}

impl GridRequest {
    /// Bag from request headers and the query string. Query parameters win
    /// over headers of the same name.
    ///
    /// # Errors
    ///
    /// `GridError::FilterFormat` if the query string cannot be decoded.
    pub fn from_http(headers: &HeaderMap, uri: &Uri) -> Result<Self, GridError> {
        let mut bag: HashMap<String, Value> = headers
            .iter()
            .filter(|(name, _)| is_grid_key(name.as_str()))
            .filter_map(|(name, value)| match value.to_str() {
                Ok(text) => Some((name.as_str().to_ascii_lowercase(), Value::from(text))),
                Err(_) => {
                    tracing::debug!(header = %name, "Ignoring non-ASCII grid header");
                    None
                }
            })
            .collect();

        let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri)
            .map_err(|err| GridError::filter_format(format!("Invalid query string: {err}")))?;
        bag.extend(
            params
                .into_iter()
                .filter(|(key, _)| is_grid_key(key))
                .map(|(key, value)| (key.to_ascii_lowercase(), Value::from(value))),
        );

        Ok(Self::new(bag))
    }
}

impl<S> FromRequestParts<S> for GridRequest
where
    S: Send + Sync,
{
    type Rejection = GridError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_http(&parts.headers, &parts.uri)
    }
}

/// Run `grid` for `request` and answer with the rows as a JSON array. The
/// grid state goes into `filter`, `page`, `itemsPerPage`, `total`, `search`
/// and `sorter` headers next to a `Content-Range`.
///
/// # Errors
///
/// Any [`GridError`] raised while planning or executing.
pub async fn grid_response<C>(
    grid: &Grid,
    db: &C,
    mut request: GridRequest,
    date_fields: &[&str],
) -> Result<(HeaderMap, Json<Vec<Row>>), GridError>
where
    C: ConnectionTrait,
{
    let page = grid.get_data(db, &mut request, date_fields).await?;
    let params = request.header_params();

    let offset = calculate_offset(params.page, params.items_per_page);
    let mut headers = calculate_content_range(offset, params.items_per_page, page.total, grid.name());
    headers.extend(header_params_to_headers(&params));

    Ok((headers, Json(page.rows)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_query_string_wins_over_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("search", HeaderValue::from_static("from-header"));
        headers.insert("page", HeaderValue::from_static("4"));
        headers.insert("accept", HeaderValue::from_static("application/json"));

        let uri: Uri = "/items?search=from-query&itemsPerPage=3".parse().unwrap();
        let request = GridRequest::from_http(&headers, &uri).unwrap();

        assert_eq!(request.search().as_deref(), Some("from-query"));
        assert_eq!(request.page(), 4);
        assert_eq!(request.items_per_page(), 3);
    }

    #[test]
    fn test_encoded_filter_in_query_string() {
        let uri: Uri = "/items?filter=%5B%5B%7B%22column%22%3A%22int%22%2C%22operator%22%3A%22EMPTY%22%7D%5D%5D"
            .parse()
            .unwrap();
        let request = GridRequest::from_http(&HeaderMap::new(), &uri).unwrap();
        assert_eq!(request.filter().unwrap().groups()[0][0].column, "int");
    }
}
