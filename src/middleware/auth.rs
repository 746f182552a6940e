//! API key authentication middleware.
//!
//! # Security Features
//!
//! - **Constant-time comparison**: Prevents timing attacks on API key validation
//! - **Write-only gate**: Only mutating methods (POST, PUT, PATCH, DELETE) need a key
//! - **Brute force protection**: Clients that keep sending bad keys are locked out
//! - **Spoof-resistant client keys**: Forwarding headers only count when the
//!   peer is a configured trusted proxy (see [`super::ip`])
//!
//! # Usage
//!
//! Set the `API_KEY` environment variable:
//!
//! ```bash
//! API_KEY=your-secret-key cargo run
//! ```
//!
//! Clients then send the key with every mutating request:
//!
//! ```bash
//! curl -X DELETE -H "X-API-Key: your-secret-key" http://localhost:3000/products/1
//! ```
//!
//! Reads (`GET`, `HEAD`, `OPTIONS`) never require the key.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::response::IntoResponse;
use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use subtle::ConstantTimeEq;
use tower::{Layer, Service};
use tracing::{debug, error, warn};

use super::ip::{TrustedProxies, extract_client_ip};
use crate::error::AppError;
use crate::metrics;

/// Header name for API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Shortest lockout handed out, so `Retry-After` is never zero.
const MIN_LOCKOUT: Duration = Duration::from_secs(1);

/// Tracked clients above which idle limiter state is dropped.
const PRUNE_THRESHOLD: usize = 1024;

/// Type alias for auth failure rate limiter (per-IP).
type AuthFailureLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Per-client auth failure bookkeeping.
///
/// The governor limiter only counts failures; once a client exhausts its
/// quota the lockout deadline is remembered separately so that later
/// requests (including ones with the right key) are refused without
/// consuming more quota.
struct FailureTracker {
    limiter: AuthFailureLimiter,
    locked_until: Mutex<HashMap<String, Instant>>,
}

impl FailureTracker {
    fn new(failures_per_minute: NonZeroU32) -> Self {
        let burst = NonZeroU32::new(failures_per_minute.get() / 2).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_minute(failures_per_minute).allow_burst(burst);

        Self {
            limiter: RateLimiter::keyed(quota),
            locked_until: Mutex::new(HashMap::new()),
        }
    }

    /// Remaining lockout for `client`, if it is currently locked out.
    fn lockout_remaining(&self, client: &str) -> Option<Duration> {
        let mut locked = self
            .locked_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        match locked.get(client) {
            Some(until) if *until > now => Some(*until - now),
            Some(_) => {
                locked.remove(client);
                None
            }
            None => None,
        }
    }

    /// Count one failure. Returns the lockout duration if this failure
    /// exhausted the client's quota.
    fn record_failure(&self, client: &str) -> Option<Duration> {
        if self.limiter.len() >= PRUNE_THRESHOLD {
            self.prune();
        }

        let not_until = self.limiter.check_key(&client.to_string()).err()?;
        let wait = not_until
            .wait_time_from(DefaultClock::default().now())
            .max(MIN_LOCKOUT);

        let mut locked = self
            .locked_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        locked.retain(|_, until| *until > now);
        locked.insert(client.to_string(), now + wait);

        Some(wait)
    }

    /// Forget clients whose failure quota has fully replenished.
    fn prune(&self) {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        debug!(
            before,
            after = self.limiter.len(),
            "Pruned idle auth failure state"
        );
    }
}

/// API key authentication layer.
#[derive(Clone)]
pub struct ApiKeyAuth {
    /// Expected API key
    expected_key: Arc<String>,
    /// Failure tracking (None = lockout disabled)
    failures: Option<Arc<FailureTracker>>,
    /// Proxies whose forwarding headers identify the client
    trusted_proxies: Arc<TrustedProxies>,
}

impl ApiKeyAuth {
    /// Create a new API key auth layer.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Expected value of the `X-API-Key` header
    /// * `failures_per_minute` - Bad attempts a client may make per minute
    ///   before being locked out; `0` disables the lockout
    pub fn new(api_key: String, failures_per_minute: u32) -> Self {
        Self {
            expected_key: Arc::new(api_key),
            failures: NonZeroU32::new(failures_per_minute)
                .map(|limit| Arc::new(FailureTracker::new(limit))),
            trusted_proxies: Arc::new(TrustedProxies::default()),
        }
    }

    /// Honour forwarding headers from these proxies when keying failures.
    pub fn with_trusted_proxies(mut self, trusted_proxies: TrustedProxies) -> Self {
        self.trusted_proxies = Arc::new(trusted_proxies);
        self
    }

    /// Check if brute force lockout is enabled.
    pub fn lockout_enabled(&self) -> bool {
        self.failures.is_some()
    }
}

impl<S> Layer<S> for ApiKeyAuth {
    type Service = ApiKeyAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiKeyAuthService {
            inner,
            expected_key: self.expected_key.clone(),
            failures: self.failures.clone(),
            trusted_proxies: self.trusted_proxies.clone(),
        }
    }
}

/// API key authentication service wrapper.
#[derive(Clone)]
pub struct ApiKeyAuthService<S> {
    inner: S,
    expected_key: Arc<String>,
    failures: Option<Arc<FailureTracker>>,
    trusted_proxies: Arc<TrustedProxies>,
}

impl<S> Service<Request<Body>> for ApiKeyAuthService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let expected = self.expected_key.clone();
        let failures = self.failures.clone();
        let trusted_proxies = self.trusted_proxies.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if !requires_auth(req.method()) {
                return inner.call(req).await;
            }

            let client_ip = extract_client_ip(&req, &trusted_proxies).into_owned();

            if let Some(ref tracker) = failures
                && let Some(remaining) = tracker.lockout_remaining(&client_ip)
            {
                metrics::record_auth_failure("locked_out");
                error!(
                    client_ip = %client_ip,
                    retry_after_secs = remaining.as_secs().max(1),
                    "Client locked out after repeated auth failures"
                );
                return Ok(locked_out_response(remaining));
            }

            let rejection = match extract_api_key(&req) {
                Some(provided) if constant_time_eq(provided, &expected) => None,
                Some(_) => Some(("invalid", "Invalid API key")),
                None => Some(("missing", "API key required")),
            };

            let Some((reason, message)) = rejection else {
                debug!(method = %req.method(), path = %req.uri().path(), "API key accepted");
                return inner.call(req).await;
            };

            metrics::record_auth_failure(reason);
            warn!(
                method = %req.method(),
                path = %req.uri().path(),
                client_ip = %client_ip,
                reason,
                "Rejected API key"
            );

            if let Some(ref tracker) = failures
                && let Some(lockout) = tracker.record_failure(&client_ip)
            {
                error!(client_ip = %client_ip, "Auth failure limit reached, locking out client");
                return Ok(locked_out_response(lockout));
            }

            Ok(AppError::Unauthorized(message.to_string()).into_response())
        })
    }
}

/// Whether requests with this method must carry the API key.
///
/// Safe methods (GET, HEAD, OPTIONS, TRACE) only read the catalog.
fn requires_auth(method: &Method) -> bool {
    !method.is_safe()
}

/// Extract the API key from the `X-API-Key` header.
fn extract_api_key<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
}

/// Perform constant-time comparison of two strings.
///
/// This prevents timing attacks where an attacker could determine
/// the correct API key by measuring response times.
fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn locked_out_response(remaining: Duration) -> Response<Body> {
    AppError::TooManyRequests {
        retry_after_secs: remaining.as_secs().max(1),
    }
    .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::convert::Infallible;
    use tower::ServiceExt;
    use tower::service_fn;

    async fn ok_handler(_req: Request<Body>) -> Result<Response<Body>, Infallible> {
        Ok(Response::new(Body::empty()))
    }

    fn request(method: Method, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri("/products")
            .header("x-forwarded-for", "192.0.2.10");
        if let Some(key) = key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn request_from(
        peer: [u8; 4],
        forwarded_for: Option<&str>,
        key: Option<&str>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(Method::POST).uri("/products");
        if let Some(forwarded_for) = forwarded_for {
            builder = builder.header("x-forwarded-for", forwarded_for);
        }
        if let Some(key) = key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        let mut req = builder.body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(axum::extract::ConnectInfo(std::net::SocketAddr::from((peer, 5000))));
        req
    }

    async fn status(auth: &ApiKeyAuth, req: Request<Body>) -> StatusCode {
        auth.layer(service_fn(ok_handler))
            .oneshot(req)
            .await
            .unwrap()
            .status()
    }

    #[test]
    fn test_requires_auth() {
        assert!(requires_auth(&Method::POST));
        assert!(requires_auth(&Method::PUT));
        assert!(requires_auth(&Method::PATCH));
        assert!(requires_auth(&Method::DELETE));
        assert!(!requires_auth(&Method::GET));
        assert!(!requires_auth(&Method::HEAD));
        assert!(!requires_auth(&Method::OPTIONS));
    }

    #[test]
    fn test_extract_api_key_from_header() {
        let req = request(Method::POST, Some("my-secret-key"));
        assert_eq!(extract_api_key(&req), Some("my-secret-key"));
    }

    #[test]
    fn test_extract_api_key_none() {
        let req = request(Method::POST, None);
        assert!(extract_api_key(&req).is_none());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("secret123", "secret123"));
        assert!(!constant_time_eq("secret123", "secret456"));
        assert!(!constant_time_eq("short", "much-longer-string"));
        assert!(!constant_time_eq("", "secret"));
    }

    #[test]
    fn test_lockout_toggle() {
        assert!(ApiKeyAuth::new("k".into(), 10).lockout_enabled());
        assert!(!ApiKeyAuth::new("k".into(), 0).lockout_enabled());
    }

    #[tokio::test]
    async fn test_reads_pass_without_key() {
        let auth = ApiKeyAuth::new("secret".into(), 0);
        assert_eq!(status(&auth, request(Method::GET, None)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_writes_need_matching_key() {
        let auth = ApiKeyAuth::new("secret".into(), 0);

        assert_eq!(
            status(&auth, request(Method::POST, None)).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(&auth, request(Method::DELETE, Some("wrong"))).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(&auth, request(Method::PUT, Some("secret"))).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_disabled_lockout_never_blocks() {
        let auth = ApiKeyAuth::new("secret".into(), 0);

        for _ in 0..50 {
            assert_eq!(
                status(&auth, request(Method::POST, Some("wrong"))).await,
                StatusCode::UNAUTHORIZED
            );
        }
    }

    #[tokio::test]
    async fn test_lockout_after_repeated_failures() {
        // Two failures per minute -> burst of one
        let auth = ApiKeyAuth::new("secret".into(), 2);

        assert_eq!(
            status(&auth, request(Method::POST, Some("wrong"))).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(&auth, request(Method::POST, Some("wrong"))).await,
            StatusCode::TOO_MANY_REQUESTS
        );
        // Locked out clients are refused even with the right key
        assert_eq!(
            status(&auth, request(Method::POST, Some("secret"))).await,
            StatusCode::TOO_MANY_REQUESTS
        );
        // Reads are unaffected
        assert_eq!(status(&auth, request(Method::GET, None)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_forged_forwarded_for_cannot_lock_out_another_client() {
        let auth = ApiKeyAuth::new("secret".into(), 2);
        let victim = [203, 0, 113, 5];
        let attacker = [198, 51, 100, 66];

        for _ in 0..2 {
            let req = request_from(attacker, Some("203.0.113.5"), Some("wrong"));
            status(&auth, req).await;
        }

        // The attacker locked itself out, not the address it claimed
        assert_eq!(
            status(&auth, request_from(attacker, None, Some("secret"))).await,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status(&auth, request_from(victim, None, Some("secret"))).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_trusted_proxy_clients_tracked_separately() {
        let auth = ApiKeyAuth::new("secret".into(), 2)
            .with_trusted_proxies(TrustedProxies::new(&["10.0.0.0/8".to_string()]));
        let proxy = [10, 0, 0, 1];

        for _ in 0..2 {
            let req = request_from(proxy, Some("198.51.100.66"), Some("wrong"));
            status(&auth, req).await;
        }

        assert_eq!(
            status(&auth, request_from(proxy, Some("198.51.100.66"), Some("secret"))).await,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status(&auth, request_from(proxy, Some("203.0.113.5"), Some("secret"))).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_prune_drops_replenished_clients() {
        // 60k per minute replenishes one failure every millisecond
        let tracker = FailureTracker::new(NonZeroU32::new(60_000).unwrap());

        for i in 0..5 {
            assert!(tracker.record_failure(&format!("192.0.2.{i}")).is_none());
        }
        assert_eq!(tracker.limiter.len(), 5);

        tokio::time::sleep(Duration::from_millis(50)).await;
        tracker.prune();

        assert_eq!(tracker.limiter.len(), 0);
    }
}
