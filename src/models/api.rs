use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Query parameters for `GET /products`.
///
/// `page` and `limit` arrive as raw strings and are parsed explicitly by
/// [`crate::validation::parse_pagination`], which names the offending
/// parameter in its 400. Malformed query strings are rejected earlier by
/// [`crate::handlers::CatalogQuery`].
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Exact category match (empty = no filter)
    pub category: Option<String>,
    /// 1-indexed page number
    pub page: Option<String>,
    /// Page size
    pub limit: Option<String>,
}

/// Query parameters for `GET /products/search/name`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Case-insensitive substring to look for in product names
    pub name: Option<String>,
}

/// A validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-indexed page number (always >= 1)
    pub page: usize,
    /// Page size (always >= 1)
    pub limit: usize,
}

impl Pagination {
    /// Index of the first record on this page.
    ///
    /// Saturates instead of overflowing; a saturated offset simply yields an
    /// empty page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// Listing filter handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub pagination: Pagination,
}

/// Category name to number of products in it.
pub type CategoryCounts = BTreeMap<String, usize>;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service health status
    pub status: String,
    /// Number of products currently held
    pub product_count: usize,
    /// Service version
    pub version: String,
    /// Seconds since the server started
    pub uptime_seconds: u64,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
}
