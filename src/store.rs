//! In-memory product store.
//!
//! Products live in an insertion-ordered `Vec` behind a single
//! `tokio::sync::RwLock`. Lookups are linear scans, which is fine for a
//! catalog measured in hundreds of records.
//!
//! # Locking
//!
//! Every operation takes the one lock for its full duration. Readers share
//! it; mutations hold it exclusively, so a mutation always runs to completion
//! before the next one starts. Nothing is awaited while the lock is held.
//!
//! # Copy Semantics
//!
//! All read operations return owned clones. Callers can never reach the
//! store's internal records through a returned value.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{CategoryCounts, Product, ProductFilter, ProductInput, sample_products};

/// Shared, clonable handle to the product collection.
#[derive(Debug, Clone, Default)]
pub struct ProductStore {
    products: Arc<RwLock<Vec<Product>>>,
}

impl ProductStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `products` in the given order.
    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products: Arc::new(RwLock::new(products)),
        }
    }

    /// Create a store pre-populated with the sample catalog.
    pub fn seeded() -> Self {
        Self::with_products(sample_products())
    }

    /// Number of products currently held.
    pub async fn len(&self) -> usize {
        self.products.read().await.len()
    }

    /// Whether the store holds no products.
    pub async fn is_empty(&self) -> bool {
        self.products.read().await.is_empty()
    }

    /// Snapshot of every product in insertion order.
    pub async fn list(&self) -> Vec<Product> {
        self.products.read().await.clone()
    }

    /// Look up a product by id.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Product> {
        self.products
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    /// Append a product whose id has already been assigned.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if a product with the same id exists.
    pub async fn insert(&self, product: Product) -> AppResult<Product> {
        let mut products = self.products.write().await;

        if products.iter().any(|p| p.id == product.id) {
            return Err(AppError::Conflict(format!(
                "Product with id '{}' already exists",
                product.id
            )));
        }

        products.push(product.clone());
        debug!(id = %product.id, total = products.len(), "Product inserted");

        Ok(product)
    }

    /// Create a product from validated input under a fresh id and append it.
    pub async fn create(&self, input: ProductInput) -> AppResult<Product> {
        self.insert(Product::create(input)).await
    }

    /// Merge `patch` into the product with `id`, returning the merged record.
    pub async fn update(&self, id: &str, patch: ProductInput) -> AppResult<Product> {
        let mut products = self.products.write().await;

        let product = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found(id))?;

        product.apply(patch);
        debug!(id, "Product updated");

        Ok(product.clone())
    }

    /// Remove the product with `id`, returning it.
    pub async fn remove(&self, id: &str) -> AppResult<Product> {
        let mut products = self.products.write().await;

        let index = products
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| not_found(id))?;

        let removed = products.remove(index);
        debug!(id, total = products.len(), "Product removed");

        Ok(removed)
    }

    /// Products matching `filter`, sliced to the requested page.
    ///
    /// The category filter is an exact, case-sensitive match. A page past the
    /// end of the result set is empty rather than an error.
    pub async fn query(&self, filter: &ProductFilter) -> Vec<Product> {
        let products = self.products.read().await;
        let category = filter.category.as_deref().filter(|c| !c.is_empty());

        products
            .iter()
            .filter(|p| category.is_none_or(|c| p.category == c))
            .skip(filter.pagination.offset())
            .take(filter.pagination.limit)
            .cloned()
            .collect()
    }

    /// Products whose name contains `term`, ignoring case.
    pub async fn search_by_name(&self, term: &str) -> Vec<Product> {
        let needle = term.to_lowercase();

        self.products
            .read()
            .await
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Count of products per category.
    pub async fn category_counts(&self) -> CategoryCounts {
        let products = self.products.read().await;

        let mut counts = CategoryCounts::new();
        for product in products.iter() {
            *counts.entry(product.category.clone()).or_insert(0) += 1;
        }
        counts
    }
}

fn not_found(id: &str) -> AppError {
    debug!(id, "Product lookup missed");
    AppError::NotFound("Product not found".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::Pagination;
    use rust_decimal::Decimal;

    fn filter(category: Option<&str>, page: usize, limit: usize) -> ProductFilter {
        ProductFilter {
            category: category.map(str::to_string),
            pagination: Pagination { page, limit },
        }
    }

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.name.as_str()).collect()
    }

    fn kettle() -> ProductInput {
        ProductInput::new("Kettle", Decimal::from(30), "kitchen")
    }

    #[tokio::test]
    async fn test_seeded_store() {
        let store = ProductStore::seeded();
        assert_eq!(store.len().await, 3);
        assert!(!store.is_empty().await);
        assert!(ProductStore::new().is_empty().await);
    }

    #[tokio::test]
    async fn test_list_returns_copy() {
        let store = ProductStore::seeded();

        let mut snapshot = store.list().await;
        snapshot[0].name = "Changed".to_string();
        snapshot.clear();

        assert_eq!(store.find_by_id("1").await.unwrap().name, "Laptop");
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_find_by_id_missing() {
        let store = ProductStore::seeded();
        let result = store.find_by_id("999").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_assigns_unique_id() {
        let store = ProductStore::seeded();

        let created = store.create(kettle()).await.unwrap();

        assert!(!created.id.is_empty());
        let ids: Vec<_> = store.list().await.into_iter().map(|p| p.id).collect();
        assert_eq!(ids.iter().filter(|id| **id == created.id).count(), 1);
        assert_eq!(store.find_by_id(&created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = ProductStore::seeded();

        let result = store.insert(Product::with_id("1", kettle())).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_update_merges_and_preserves_id() {
        let store = ProductStore::seeded();

        let updated = store
            .update("2", ProductInput::new("Phone", Decimal::from(700), "electronics"))
            .await
            .unwrap();

        assert_eq!(updated.id, "2");
        assert_eq!(updated.name, "Phone");
        assert_eq!(updated.description, "128GB");
        assert_eq!(store.find_by_id("2").await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_missing() {
        let store = ProductStore::seeded();
        let result = store.update("nope", kettle()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(store.list().await, sample_products());
    }

    #[tokio::test]
    async fn test_remove_then_find() {
        let store = ProductStore::seeded();

        let removed = store.remove("1").await.unwrap();

        assert_eq!(removed.name, "Laptop");
        assert!(matches!(
            store.find_by_id("1").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(store.remove("1").await, Err(AppError::NotFound(_))));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_query_pagination() {
        let store = ProductStore::seeded();

        let first = store.query(&filter(None, 1, 2)).await;
        assert_eq!(names(&first), ["Laptop", "Smartphone"]);

        let second = store.query(&filter(None, 2, 2)).await;
        assert_eq!(names(&second), ["Coffee Maker"]);

        let third = store.query(&filter(None, 3, 2)).await;
        assert!(third.is_empty());
    }

    #[tokio::test]
    async fn test_query_category_filter() {
        let store = ProductStore::seeded();

        let electronics = store.query(&filter(Some("electronics"), 1, 10)).await;
        assert_eq!(names(&electronics), ["Laptop", "Smartphone"]);

        let none = store.query(&filter(Some("Electronics"), 1, 10)).await;
        assert!(none.is_empty());

        let all = store.query(&filter(Some(""), 1, 10)).await;
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_query_huge_page_is_empty() {
        let store = ProductStore::seeded();
        let result = store.query(&filter(None, usize::MAX, usize::MAX)).await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let store = ProductStore::seeded();

        assert_eq!(names(&store.search_by_name("top").await), ["Laptop"]);
        assert_eq!(names(&store.search_by_name("TOP").await), ["Laptop"]);
        assert_eq!(
            names(&store.search_by_name("a").await),
            ["Laptop", "Smartphone", "Coffee Maker"]
        );
        assert!(store.search_by_name("toaster").await.is_empty());
    }

    #[tokio::test]
    async fn test_category_counts() {
        let store = ProductStore::seeded();

        let counts = store.category_counts().await;

        assert_eq!(counts.len(), 2);
        assert_eq!(counts["electronics"], 2);
        assert_eq!(counts["kitchen"], 1);
    }

    #[tokio::test]
    async fn test_concurrent_creates_keep_every_record() {
        let store = ProductStore::new();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.create(kettle()).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.len().await, 50);
    }
}
