use axum::http::header::{CONTENT_RANGE, HeaderMap, HeaderName, HeaderValue};

use crate::models::HeaderParams;

/// Largest LIMIT or OFFSET handed to the database. Drivers bind these as
/// signed 64-bit integers.
pub const MAX_ROW_BOUND: u64 = i64::MAX.unsigned_abs();

/// Zero-based row offset of a 1-based page, capped at [`MAX_ROW_BOUND`].
#[must_use]
pub fn calculate_offset(page: u64, items_per_page: u64) -> u64 {
    page.saturating_sub(1)
        .saturating_mul(items_per_page)
        .min(MAX_ROW_BOUND)
}

/// Sanitize resource name by removing control characters for HTTP headers
fn sanitize_resource_name(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii() && !c.is_ascii_control()).collect()
}

/// Build the Content-Range header for a page of rows.
///
/// # Arguments
///
/// * `offset` - Zero-based index of the first row of the page.
/// * `limit` - Page size.
/// * `total_count` - Number of rows matching filter and search.
/// * `resource_name` - Unit of the range, sanitized for header use.
///
/// A page beyond the data is reported as an unsatisfied range (`*/total`).
#[must_use]
pub fn calculate_content_range(
    offset: u64,
    limit: u64,
    total_count: u64,
    resource_name: &str,
) -> HeaderMap {
    let mut safe_name = sanitize_resource_name(resource_name);
    if safe_name.trim().is_empty() {
        safe_name = "items".to_string();
    }

    let content_range = if limit == 0 || offset >= total_count {
        format!("{safe_name} */{total_count}")
    } else {
        let last = offset.saturating_add(limit).min(total_count) - 1;
        format!("{safe_name} {offset}-{last}/{total_count}")
    };

    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(&content_range) {
        Ok(value) => {
            headers.insert(CONTENT_RANGE, value);
        }
        Err(err) => {
            tracing::warn!(%content_range, error = %err, "Skipping unencodable Content-Range header");
        }
    }
    headers
}

/// Render the echoed grid state as response headers.
///
/// Values that cannot be carried in a header are skipped with a warning.
#[must_use]
pub fn header_params_to_headers(params: &HeaderParams) -> HeaderMap {
    let entries = [
        ("filter", Some(params.filter.clone())),
        ("page", Some(params.page.to_string())),
        ("itemsperpage", Some(params.items_per_page.to_string())),
        ("total", Some(params.total.to_string())),
        ("search", params.search.clone()),
        ("sorter", params.sorter.clone()),
    ];

    let mut headers = HeaderMap::new();
    for (name, value) in entries {
        let Some(value) = value else { continue };
        match HeaderValue::from_str(&value) {
            Ok(header_value) => {
                headers.insert(HeaderName::from_static(name), header_value);
            }
            Err(err) => {
                tracing::warn!(header = name, error = %err, "Skipping unencodable grid header");
            }
        }
    }
    headers
}
