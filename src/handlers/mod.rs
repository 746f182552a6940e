mod extract;
mod health;
pub mod products;

pub use extract::CatalogQuery;
pub use health::health_check;
pub use products::{
    category_count, create_product, delete_product, get_product, list_products, route_not_found,
    search_by_name, update_product,
};
