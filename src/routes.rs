//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (outermost first)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │  Set Request ID  │ ← Generates X-Request-Id when absent
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response span with request id
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │ Propagate Req ID │ ← Copies X-Request-Id onto the response
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │       CORS       │ ← Also decorates auth rejections
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  Authentication  │ ← 401/429 for writes without a valid key
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │    Body Limit    │
//! └────────┬─────────┘
//!          ▼
//!   Metrics → Handler
//! ```
//!
//! # Route Matching
//!
//! `/products/search/name` and `/products/stats/category-count` are two
//! segments deep while `/products/{id}` captures exactly one, and the
//! matcher prefers static segments over captures anyway, so `search` and
//! `stats` are never read as product ids.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, Request};
use axum::middleware;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span};

use crate::handlers;
use crate::metrics;
use crate::middleware::{ApiKeyAuth, TrustedProxies};
use crate::state::AppState;

/// Header name for request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the application router with all routes and middleware configured.
///
/// # Arguments
///
/// * `state` - Application state containing the store and config
///
/// # Returns
///
/// Fully configured Axum router ready to be served.
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    // =========================================================================
    // Routes
    // =========================================================================
    let mut router = Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/products/search/name", get(handlers::search_by_name))
        .route(
            "/products/stats/category-count",
            get(handlers::category_count),
        )
        .route(
            "/products/{id}",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        // route_layer so MatchedPath is available for metric labels
        .route_layer(middleware::from_fn(metrics::track_requests))
        .fallback(handlers::route_not_found);

    // =========================================================================
    // Apply Middleware Stack (order matters - applied bottom to top)
    // =========================================================================

    // 1. Request body size limit
    info!(
        max_bytes = config.max_request_body_size,
        "Request body size limit configured"
    );
    router = router.layer(DefaultBodyLimit::max(config.max_request_body_size));

    // 2. Authentication for mutating methods
    let trusted_proxies = TrustedProxies::new(&config.trusted_proxies);
    if trusted_proxies.is_enabled() {
        info!(
            proxies = ?config.trusted_proxies,
            "Forwarding headers trusted from configured proxies"
        );
    }
    let auth_layer = ApiKeyAuth::new(config.api_key.clone(), config.auth_failure_limit)
        .with_trusted_proxies(trusted_proxies);
    if auth_layer.lockout_enabled() {
        info!(
            failures_per_minute = config.auth_failure_limit,
            "API key authentication enabled with failure lockout"
        );
    } else {
        info!("API key authentication enabled (lockout disabled)");
    }
    router = router.layer(auth_layer);

    // 3. CORS, outside auth so rejections stay readable from browsers
    router = router.layer(build_cors_layer(&config.cors_allowed_origins));

    // 4. Request ID propagation, tracing, and generation
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);
    router = router
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
                let request_id = req
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid));

    router.with_state(state)
}

/// Build CORS layer from configuration.
///
/// Using `*` (any origin) is convenient for development but should be
/// avoided in production. Specify explicit origins instead.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_any = allowed_origins.iter().any(|o| o == "*");

    if allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::{Body, to_bytes};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = Config {
            api_key: "test-key".to_string(),
            auth_failure_limit: 0,
            ..Config::default()
        };
        build_router(AppState::new(config))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_build_cors_layer_any() {
        let _layer = build_cors_layer(&["*".to_string()]);
    }

    #[test]
    fn test_build_cors_layer_specific() {
        let origins = vec![
            "https://example.com".to_string(),
            "https://app.example.com".to_string(),
        ];
        let _layer = build_cors_layer(&origins);
    }

    #[tokio::test]
    async fn test_static_routes_win_over_id() {
        let (status, body) = get_json(app(), "/products/stats/category-count").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["electronics"], 2);

        let (status, body) = get_json(app(), "/products/search/name?name=top").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "Laptop");
    }

    #[tokio::test]
    async fn test_single_segment_is_an_id() {
        let (status, body) = get_json(app(), "/products/search").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (status, body) = get_json(app(), "/nowhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_request_id_generated() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let id = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert!(uuid::Uuid::parse_str(id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_request_id_propagated() {
        let response = app()
            .oneshot(
                Request::get("/health")
                    .header(REQUEST_ID_HEADER, "corr-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "corr-123");
    }

    #[tokio::test]
    async fn test_auth_rejection_carries_cors_headers() {
        let response = app()
            .oneshot(
                Request::post("/products")
                    .header("origin", "https://shop.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_duplicate_query_param_is_json_400() {
        let (status, body) = get_json(app(), "/products?page=1&page=2").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
        assert!(body["message"].as_str().unwrap().contains("page"));
    }

    #[tokio::test]
    async fn test_oversized_body_is_json_413() {
        let config = Config {
            api_key: "test-key".to_string(),
            auth_failure_limit: 0,
            max_request_body_size: 16,
            ..Config::default()
        };
        let payload = r#"{"name":"Desk Lamp","price":35.5,"category":"home"}"#;

        let response = build_router(AppState::new(config))
            .oneshot(
                Request::post("/products")
                    .header("x-api-key", "test-key")
                    .header("content-type", "application/json")
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "payload_too_large");
    }
}
