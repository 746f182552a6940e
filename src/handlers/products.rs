//! Product catalog handlers.
//!
//! # Endpoints
//!
//! - `GET /products` - List products (optional `category`, `page`, `limit`)
//! - `GET /products/{id}` - Fetch one product
//! - `POST /products` - Create a product (API key + validation)
//! - `PUT /products/{id}` - Merge fields into a product (API key + validation)
//! - `DELETE /products/{id}` - Remove a product (API key)
//! - `GET /products/search/name?name=` - Case-insensitive name search
//! - `GET /products/stats/category-count` - Products per category
//!
//! The API key gate runs as middleware before any of these handlers, so a
//! rejected write never reaches the validator or the store.

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use serde_json::Value;
use tracing::{info, instrument};

use super::CatalogQuery;
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{CategoryCounts, ListQuery, Product, ProductFilter, SearchQuery};
use crate::state::AppState;
use crate::validation::{parse_pagination, validate_product, validate_search_term};

/// List products, optionally filtered by category, one page at a time.
///
/// Defaults: `page=1`, `limit` from `DEFAULT_PAGE_LIMIT` (2).
#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    CatalogQuery(query): CatalogQuery<ListQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let pagination = parse_pagination(
        query.page.as_deref(),
        query.limit.as_deref(),
        state.config.default_page_limit,
        state.config.max_page_limit,
    )?;

    let filter = ProductFilter {
        category: query.category,
        pagination,
    };

    Ok(Json(state.store.query(&filter).await))
}

/// Get a product by id.
#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    Ok(Json(state.store.find_by_id(&id).await?))
}

/// Create a product.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Desk Lamp",
///   "description": "LED",
///   "price": 35.5,
///   "category": "home",
///   "inStock": true
/// }
/// ```
///
/// The server assigns the `id`; one sent by the client is ignored.
#[instrument(skip_all)]
pub async fn create_product(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let body = body?;
    let input = validate_product(&parse_body(&body)?)?;

    let product = state
        .store
        .create(input)
        .await
        .inspect_err(|e| metrics::record_mutation("create", outcome(e)))?;

    metrics::record_mutation("create", "ok");
    metrics::set_product_count(state.store.len().await);
    info!(id = %product.id, name = %product.name, "Product created");

    Ok((StatusCode::CREATED, Json(product)))
}

/// Merge the payload into an existing product.
///
/// The payload is validated exactly like a create. `description` and
/// `inStock` only change when present.
#[instrument(skip(state, body))]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<Json<Product>> {
    let body = body?;
    let patch = validate_product(&parse_body(&body)?)?;

    let product = state
        .store
        .update(&id, patch)
        .await
        .inspect_err(|e| metrics::record_mutation("update", outcome(e)))?;

    metrics::record_mutation("update", "ok");
    info!(id = %product.id, "Product updated");

    Ok(Json(product))
}

/// Delete a product.
#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let removed = state
        .store
        .remove(&id)
        .await
        .inspect_err(|e| metrics::record_mutation("delete", outcome(e)))?;

    metrics::record_mutation("delete", "ok");
    metrics::set_product_count(state.store.len().await);
    info!(id = %removed.id, "Product deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Case-insensitive substring search on product names.
#[instrument(skip(state))]
pub async fn search_by_name(
    State(state): State<AppState>,
    CatalogQuery(query): CatalogQuery<SearchQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let term = validate_search_term(query.name.as_deref())?;
    Ok(Json(state.store.search_by_name(term).await))
}

/// Number of products in each category.
#[instrument(skip(state))]
pub async fn category_count(State(state): State<AppState>) -> Json<CategoryCounts> {
    Json(state.store.category_counts().await)
}

/// Fallback for paths no route matches.
pub async fn route_not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

fn parse_body(body: &Bytes) -> AppResult<Value> {
    Ok(serde_json::from_slice(body)?)
}

fn outcome(err: &AppError) -> &'static str {
    match err {
        AppError::NotFound(_) => "not_found",
        AppError::Conflict(_) => "conflict",
        _ => "error",
    }
}
