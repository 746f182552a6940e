use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog record.
///
/// `id` is assigned by the server when the product is created and never
/// changes afterwards; every other field can be replaced by an update.
///
/// # Monetary Values
///
/// `price` is held as a `rust_decimal::Decimal` for exact arithmetic and is
/// written to JSON as a plain number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Opaque unique identifier
    pub id: String,
    /// Display name (never empty)
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Unit price (never negative)
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Category used for filtering and aggregation
    pub category: String,
    /// Availability flag
    pub in_stock: bool,
}

impl Product {
    /// Create a product from validated input with a fresh UUIDv4 id.
    pub fn create(input: ProductInput) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), input)
    }

    /// Create a product from validated input under a caller-chosen id.
    ///
    /// Missing `description` becomes an empty string and missing `inStock`
    /// becomes `false`.
    pub fn with_id(id: impl Into<String>, input: ProductInput) -> Self {
        Self {
            id: id.into(),
            name: input.name,
            description: input.description.unwrap_or_default(),
            price: input.price,
            category: input.category,
            in_stock: input.in_stock.unwrap_or(false),
        }
    }

    /// Shallow-merge `patch` over this record. The `id` is preserved.
    pub fn apply(&mut self, patch: ProductInput) {
        self.name = patch.name;
        self.price = patch.price;
        self.category = patch.category;
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(in_stock) = patch.in_stock {
            self.in_stock = in_stock;
        }
    }
}

/// Validated create/update payload.
///
/// Produced by [`crate::validation::validate_product`]; the required fields
/// are always present, the optional ones only when the client sent them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInput {
    pub name: String,
    pub price: Decimal,
    pub category: String,
    pub description: Option<String>,
    pub in_stock: Option<bool>,
}

impl ProductInput {
    /// Input with only the required fields set.
    pub fn new(name: impl Into<String>, price: Decimal, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price,
            category: category.into(),
            description: None,
            in_stock: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_in_stock(mut self, in_stock: bool) -> Self {
        self.in_stock = Some(in_stock);
        self
    }
}

/// The three records the store starts with.
pub fn sample_products() -> Vec<Product> {
    vec![
        Product::with_id(
            "1",
            ProductInput::new("Laptop", Decimal::from(1200), "electronics")
                .with_description("16GB RAM")
                .with_in_stock(true),
        ),
        Product::with_id(
            "2",
            ProductInput::new("Smartphone", Decimal::from(800), "electronics")
                .with_description("128GB")
                .with_in_stock(true),
        ),
        Product::with_id(
            "3",
            ProductInput::new("Coffee Maker", Decimal::from(50), "kitchen")
                .with_description("Timer")
                .with_in_stock(false),
        ),
    ]
}
