//! Extractors whose rejections use the JSON error body.

use axum::extract::{FromRequestParts, Query};

use crate::error::AppError;

/// `Query` whose deserialization failures become [`AppError::BadRequest`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct CatalogQuery<T>(pub T);
