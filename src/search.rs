//! Product search and product details
//!
//! Single-shot reads that embed related rows. Neither reports a separate
//! total nor subscribes to changes.

use crate::adapter::FilterSpec;
use crate::catalog::filters::text_search;
use crate::catalog::{CatalogTable, FilterKey, translate_keys};
use serde_json::json;
use store_object::{Embed, QueryBuilder, QueryFilter, RemoteStore, Row, SortOrder, StoreError};

/// Columns the free-text term is matched against
pub const SEARCH_COLUMNS: &[&str] = &["name", "description", "ingredients"];

/// Product filter keys that apply to search; status and search are fixed by it
const SEARCH_FILTER_KEYS: &[FilterKey] = &[
    FilterKey::Category,
    FilterKey::Brand,
    FilterKey::Gender,
    FilterKey::PriceRange,
    FilterKey::Featured,
];

const REVIEW_COLUMNS: &[&str] = &[
    "id",
    "rating",
    "title",
    "review_text",
    "customer_name",
    "verified_purchase",
    "created_at",
];

pub fn search_query(term: &str, filter: Option<&FilterSpec>) -> QueryBuilder {
    let products = CatalogTable::Products;
    let mut query = QueryBuilder::new(products.name())
        .embed(
            Embed::to_one(CatalogTable::Categories.name(), "category_id")
                .columns(&["name", "slug"])
                .inner(),
        )
        .embed(Embed::to_one(CatalogTable::Brands.name(), "brand_id").columns(&["name", "slug"]))
        .filter(QueryFilter::eq("status", json!("active")));

    let term = term.trim();
    if !term.is_empty() {
        query = query.filter(text_search(term, SEARCH_COLUMNS));
    }
    if let Some(filter) = filter {
        query = query.filters(translate_keys(products, filter, SEARCH_FILTER_KEYS));
    }

    query
        .order_by("featured", SortOrder::Desc)
        .order_by("created_at", SortOrder::Desc)
}

/// Active, categorised products matching `term` in name, description or
/// ingredients
pub async fn search_products(
    store: &dyn RemoteStore,
    term: &str,
    filter: Option<&FilterSpec>,
) -> Result<Vec<Row>, StoreError> {
    let selection = store.select(&search_query(term, filter)).await?;
    crate::debug_log!(term, hits = selection.rows.len(), "product search");
    Ok(selection.rows)
}

pub fn product_details_query(product_id: &str) -> QueryBuilder {
    QueryBuilder::new(CatalogTable::Products.name())
        .filter(QueryFilter::eq("id", json!(product_id)))
        .embed(
            Embed::to_one(CatalogTable::Categories.name(), "category_id")
                .columns(&["name", "slug", "description"]),
        )
        .embed(
            Embed::to_one(CatalogTable::Brands.name(), "brand_id")
                .columns(&["name", "slug", "description"]),
        )
        .embed(Embed::to_many(CatalogTable::ProductVariants.name(), "product_id"))
        .embed(
            Embed::to_many(CatalogTable::ProductReviews.name(), "product_id")
                .columns(REVIEW_COLUMNS)
                .filter(QueryFilter::eq("status", json!("approved"))),
        )
        .limit(1)
}

/// One product with its category, brand, variants and approved reviews
pub async fn product_details(store: &dyn RemoteStore, product_id: &str) -> Result<Row, StoreError> {
    let not_found = || StoreError::NotFound(format!("product {}", product_id));
    // A malformed id cannot match the uuid key
    if uuid::Uuid::parse_str(product_id).is_err() {
        return Err(not_found());
    }

    store
        .select(&product_details_query(product_id))
        .await?
        .rows
        .into_iter()
        .next()
        .ok_or_else(not_found)
}
