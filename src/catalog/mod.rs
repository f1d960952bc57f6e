//! Catalog tables
//!
//! The logical tables the storefront knows about, their default ordering,
//! their schemas and the filters each of them recognises.

pub mod filters;
pub mod schema;

pub use filters::{FilterKey, FilterRule, recognizes, rules_for, translate, translate_keys};
pub use schema::catalog_schemas;

use std::fmt;
use store_object::SortOrder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogTable {
    GenderCategories,
    Categories,
    Brands,
    Customers,
    Products,
    ProductVariants,
    ProductReviews,
    CartItems,
    Orders,
    OrderItems,
    InventoryLogs,
}

const PRODUCT_SORT: &[(&str, SortOrder)] = &[
    ("featured", SortOrder::Desc),
    ("created_at", SortOrder::Desc),
];
const CATALOG_SORT: &[(&str, SortOrder)] = &[
    ("sort_order", SortOrder::Asc),
    ("name", SortOrder::Asc),
];
const NAME_SORT: &[(&str, SortOrder)] = &[("name", SortOrder::Asc)];
const RECENT_SORT: &[(&str, SortOrder)] = &[("created_at", SortOrder::Desc)];

impl CatalogTable {
    /// Every table, parents before the tables referencing them
    pub const ALL: [CatalogTable; 11] = [
        CatalogTable::GenderCategories,
        CatalogTable::Categories,
        CatalogTable::Brands,
        CatalogTable::Customers,
        CatalogTable::Products,
        CatalogTable::ProductVariants,
        CatalogTable::ProductReviews,
        CatalogTable::CartItems,
        CatalogTable::Orders,
        CatalogTable::OrderItems,
        CatalogTable::InventoryLogs,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CatalogTable::GenderCategories => "gender_categories",
            CatalogTable::Categories => "enhanced_categories",
            CatalogTable::Brands => "enhanced_brands",
            CatalogTable::Customers => "customers",
            CatalogTable::Products => "enhanced_products",
            CatalogTable::ProductVariants => "product_variants",
            CatalogTable::ProductReviews => "product_reviews",
            CatalogTable::CartItems => "cart_items",
            CatalogTable::Orders => "enhanced_orders",
            CatalogTable::OrderItems => "order_items",
            CatalogTable::InventoryLogs => "inventory_logs",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|table| table.name() == name)
    }

    /// Ordering applied when the caller gives no explicit sort
    pub fn default_sort(&self) -> &'static [(&'static str, SortOrder)] {
        match self {
            CatalogTable::Products => PRODUCT_SORT,
            CatalogTable::Categories | CatalogTable::Brands => CATALOG_SORT,
            // No sort_order column
            CatalogTable::GenderCategories => NAME_SORT,
            _ => RECENT_SORT,
        }
    }
}

impl fmt::Display for CatalogTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
