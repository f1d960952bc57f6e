//! Filter translation
//!
//! Each `(table, key)` pair a table recognises maps to exactly one predicate
//! builder. Keys a table does not list are ignored for that table.

use super::CatalogTable;
use crate::adapter::FilterSpec;
use serde_json::{Value, json};
use store_object::QueryFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    Category,
    Brand,
    Gender,
    PriceRange,
    Featured,
    Status,
    Search,
    Customer,
}

impl FilterKey {
    pub const ALL: [FilterKey; 8] = [
        FilterKey::Category,
        FilterKey::Brand,
        FilterKey::Gender,
        FilterKey::PriceRange,
        FilterKey::Featured,
        FilterKey::Status,
        FilterKey::Search,
        FilterKey::Customer,
    ];
}

/// Builds the predicate for one key, or `None` when the key is absent
pub type PredicateBuilder = fn(&FilterSpec) -> Option<QueryFilter>;

#[derive(Debug, Clone, Copy)]
pub struct FilterRule {
    pub table: CatalogTable,
    pub key: FilterKey,
    pub build: PredicateBuilder,
}

const fn rule(table: CatalogTable, key: FilterKey, build: PredicateBuilder) -> FilterRule {
    FilterRule { table, key, build }
}

static FILTER_RULES: &[FilterRule] = &[
    rule(CatalogTable::Products, FilterKey::Category, category_id),
    rule(CatalogTable::Products, FilterKey::Brand, brand_id),
    rule(CatalogTable::Products, FilterKey::Gender, gender_category),
    rule(CatalogTable::Products, FilterKey::PriceRange, price_between),
    rule(CatalogTable::Products, FilterKey::Featured, featured),
    rule(CatalogTable::Products, FilterKey::Status, product_status),
    rule(CatalogTable::Products, FilterKey::Search, name_or_description),
    rule(CatalogTable::Categories, FilterKey::Status, active_flag),
    rule(CatalogTable::Categories, FilterKey::Search, name_or_description),
    rule(CatalogTable::Brands, FilterKey::Status, active_flag),
    rule(CatalogTable::Brands, FilterKey::Search, name_or_description),
    rule(CatalogTable::GenderCategories, FilterKey::Status, active_flag),
    rule(CatalogTable::GenderCategories, FilterKey::Search, name_or_description),
    rule(CatalogTable::Orders, FilterKey::Customer, customer_id),
];

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn category_id(spec: &FilterSpec) -> Option<QueryFilter> {
    present(&spec.category).map(|v| QueryFilter::eq("category_id", json!(v)))
}

fn brand_id(spec: &FilterSpec) -> Option<QueryFilter> {
    present(&spec.brand).map(|v| QueryFilter::eq("brand_id", json!(v)))
}

fn gender_category(spec: &FilterSpec) -> Option<QueryFilter> {
    present(&spec.gender).map(|v| QueryFilter::eq("gender_category", json!(v)))
}

fn price_between(spec: &FilterSpec) -> Option<QueryFilter> {
    spec.price_range.map(|(min, max)| {
        QueryFilter::and(vec![
            QueryFilter::gte("price", json!(min)),
            QueryFilter::lte("price", json!(max)),
        ])
    })
}

fn featured(spec: &FilterSpec) -> Option<QueryFilter> {
    spec.featured.map(|v| QueryFilter::eq("featured", Value::Bool(v)))
}

fn product_status(spec: &FilterSpec) -> Option<QueryFilter> {
    present(&spec.status).map(|v| QueryFilter::eq("status", json!(v)))
}

/// Catalog tables have no status column; "active" selects active rows and
/// any other status selects inactive ones
fn active_flag(spec: &FilterSpec) -> Option<QueryFilter> {
    spec.status
        .as_deref()
        .map(|v| QueryFilter::eq("active", Value::Bool(v == "active")))
}

fn name_or_description(spec: &FilterSpec) -> Option<QueryFilter> {
    present(&spec.search).map(|term| text_search(term, &["name", "description"]))
}

fn customer_id(spec: &FilterSpec) -> Option<QueryFilter> {
    present(&spec.customer).map(|v| QueryFilter::eq("customer_id", json!(v)))
}

/// Case-insensitive substring match of `term` against any of `columns`
pub fn text_search(term: &str, columns: &[&str]) -> QueryFilter {
    QueryFilter::or(
        columns
            .iter()
            .map(|column| QueryFilter::contains(column, term))
            .collect(),
    )
}

/// Every rule registered for `table`
pub fn rules_for(table: CatalogTable) -> impl Iterator<Item = &'static FilterRule> {
    FILTER_RULES.iter().filter(move |r| r.table == table)
}

pub fn recognizes(table: CatalogTable, key: FilterKey) -> bool {
    rules_for(table).any(|r| r.key == key)
}

/// Predicates for every key of `spec` that `table` recognises
pub fn translate(table: CatalogTable, spec: &FilterSpec) -> Vec<QueryFilter> {
    translate_keys(table, spec, &FilterKey::ALL)
}

/// Like `translate`, restricted to `keys`
pub fn translate_keys(table: CatalogTable, spec: &FilterSpec, keys: &[FilterKey]) -> Vec<QueryFilter> {
    rules_for(table)
        .filter(|r| keys.contains(&r.key))
        .filter_map(|r| (r.build)(spec))
        .collect()
}
