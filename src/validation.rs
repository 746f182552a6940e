use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::models::{Pagination, ProductInput};

// =============================================================================
// Validation Constants
// =============================================================================

/// Maximum length for product names, in characters.
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum length for category names, in characters.
pub const MAX_CATEGORY_LENGTH: usize = 100;

/// Maximum length for product descriptions, in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

/// Largest accepted price.
///
/// Anything above this is almost certainly a unit mistake (cents vs dollars).
pub const MAX_PRICE: u64 = 1_000_000_000;

/// Validate a create/update payload and turn it into a [`ProductInput`].
///
/// Rules:
/// - The body must be a JSON object
/// - `name`: required non-blank string, at most 255 characters
/// - `category`: required non-blank string, at most 100 characters
/// - `price`: required number, `0 <= price <= 1_000_000_000`
/// - `description`: optional string, at most 2000 characters
/// - `inStock`: optional boolean
///
/// Unknown fields, including any client-supplied `id`, are ignored.
pub fn validate_product(payload: &Value) -> AppResult<ProductInput> {
    let fields = payload.as_object().ok_or_else(|| {
        AppError::Validation("Request body must be a JSON object".to_string())
    })?;

    let name = required_string(fields, "name", MAX_NAME_LENGTH)?;
    let category = required_string(fields, "category", MAX_CATEGORY_LENGTH)?;
    let price = validate_price(fields.get("price"))?;

    let description = match fields.get("description") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            if s.chars().count() > MAX_DESCRIPTION_LENGTH {
                return Err(AppError::Validation(format!(
                    "description cannot exceed {MAX_DESCRIPTION_LENGTH} characters"
                )));
            }
            Some(s.clone())
        }
        Some(_) => {
            return Err(AppError::Validation(
                "description must be a string".to_string(),
            ));
        }
    };

    let in_stock = match fields.get("inStock") {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => {
            return Err(AppError::Validation(
                "inStock must be a boolean".to_string(),
            ));
        }
    };

    Ok(ProductInput {
        name,
        price,
        category,
        description,
        in_stock,
    })
}

fn required_string(fields: &Map<String, Value>, field: &str, max_len: usize) -> AppResult<String> {
    let value = match fields.get(field) {
        None | Some(Value::Null) => {
            return Err(AppError::Validation(format!("{field} is required")));
        }
        Some(Value::String(s)) => s,
        Some(_) => {
            return Err(AppError::Validation(format!("{field} must be a string")));
        }
    };

    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }

    if value.chars().count() > max_len {
        return Err(AppError::Validation(format!(
            "{field} cannot exceed {max_len} characters"
        )));
    }

    Ok(value.clone())
}

/// Validate the `price` field.
///
/// Only JSON numbers are accepted; numeric strings like `"12"` are rejected
/// rather than coerced.
pub fn validate_price(value: Option<&Value>) -> AppResult<Decimal> {
    let number = match value {
        None | Some(Value::Null) => {
            return Err(AppError::Validation("price is required".to_string()));
        }
        Some(Value::Number(n)) => n,
        Some(_) => {
            return Err(AppError::Validation("price must be a number".to_string()));
        }
    };

    let price = decimal_from_number(number).ok_or_else(|| {
        AppError::Validation("price is not a representable decimal".to_string())
    })?;

    if price.is_sign_negative() && !price.is_zero() {
        return Err(AppError::Validation(
            "price must be greater than or equal to 0".to_string(),
        ));
    }

    if price > Decimal::from(MAX_PRICE) {
        return Err(AppError::Validation(format!(
            "price cannot exceed {MAX_PRICE}"
        )));
    }

    Ok(price.normalize())
}

fn decimal_from_number(number: &serde_json::Number) -> Option<Decimal> {
    if let Some(i) = number.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = number.as_u64() {
        return Some(Decimal::from(u));
    }

    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Parse `page` and `limit` query parameters.
///
/// Both must be positive integers when present. Absent or blank values fall
/// back to page 1 and `default_limit`. A `limit` above `max_limit` is rejected.
pub fn parse_pagination(
    page: Option<&str>,
    limit: Option<&str>,
    default_limit: usize,
    max_limit: usize,
) -> AppResult<Pagination> {
    let page = parse_positive("page", page)?.unwrap_or(1);
    let limit = parse_positive("limit", limit)?.unwrap_or(default_limit);

    if limit > max_limit {
        return Err(AppError::BadRequest(format!(
            "limit cannot exceed {max_limit}"
        )));
    }

    Ok(Pagination { page, limit })
}

fn parse_positive(param: &str, raw: Option<&str>) -> AppResult<Option<usize>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let value: usize = raw.parse().map_err(|_| {
        AppError::BadRequest(format!("{param} must be a positive integer, got '{raw}'"))
    })?;

    if value == 0 {
        return Err(AppError::BadRequest(format!("{param} must be at least 1")));
    }

    Ok(Some(value))
}

/// Validate the `name` search parameter; absent or empty is a bad request.
pub fn validate_search_term(name: Option<&str>) -> AppResult<&str> {
    name.filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("Name query required".to_string()))
}
