mod api;
mod product;

pub use api::{CategoryCounts, HealthResponse, ListQuery, Pagination, ProductFilter, SearchQuery};
pub use product::{Product, ProductInput, sample_products};
