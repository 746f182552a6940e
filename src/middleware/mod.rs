//! HTTP middleware for authentication and client identification.
//!
//! - **API Key Authentication**: Constant-time comparison, writes only
//! - **Auth Failure Lockout**: Per-client brute force protection
//! - **Client IP**: Socket peer address, or forwarding headers from trusted proxies
//!
//! # Architecture
//!
//! ```text
//! Request → Request ID → Trace → Auth → Handler → Response
//!               ↓                  ↓
//!        X-Request-Id header   401 Unauthorized / 429 Locked out
//! ```
//!
//! Request IDs come from `tower_http::request_id`; see `routes`.

pub mod auth;
pub mod ip;

pub use auth::{API_KEY_HEADER, ApiKeyAuth};
pub use ip::{CidrRange, TrustedProxies, UNKNOWN_IP, extract_client_ip};
