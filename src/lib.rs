//! # Product Catalog
//!
//! A small HTTP resource server over an in-memory product collection,
//! featuring:
//!
//! - **CRUD**: Create, read, update (merge), and delete products
//! - **Queries**: Category filter with pagination, name search, category counts
//! - **Security**: API key on every write, constant-time comparison, failure lockout
//! - **Observability**: Request IDs, structured logging, Prometheus metrics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Request ID → Trace → CORS → Auth → Body Limit) │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (products, health) + Field Validation             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ProductStore (RwLock<Vec<Product>>)                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use product_catalog::{AppState, Config, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let state = AppState::new(config.clone());
//!     let app = build_router(state);
//!
//!     let listener = tokio::net::TcpListener::bind(config.server_addr()).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Security Configuration
//!
//! ```bash
//! API_KEY=your-secret-key AUTH_FAILURE_LIMIT=10 cargo run
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Product, ProductInput};
pub use routes::build_router;
pub use state::AppState;
pub use store::ProductStore;
