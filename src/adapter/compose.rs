//! Query composition
//!
//! Filter translation first, then ordering, then the limit. The count is
//! always exact and uses the same filters as the rows.

use super::options::QueryOptions;
use crate::catalog::{CatalogTable, translate};
use store_object::{CountMode, QueryBuilder, StoreError};

pub fn compose(table: &str, options: &QueryOptions) -> Result<QueryBuilder, StoreError> {
    if table.is_empty() {
        return Err(StoreError::Validation("Table name cannot be empty".to_string()));
    }

    // Unknown tables pass through so the store reports them
    let catalog = CatalogTable::from_name(table);
    let mut query = QueryBuilder::new(table).count(CountMode::Exact);

    if let (Some(catalog), Some(filter)) = (catalog, &options.filter) {
        query = query.filters(translate(catalog, filter));
    }

    match (&options.sort, catalog) {
        (Some(sort), _) => query = query.order_by(&sort.column, sort.order()),
        (None, Some(catalog)) => {
            for (column, order) in catalog.default_sort() {
                query = query.order_by(column, *order);
            }
        }
        (None, None) => {}
    }

    if let Some(limit) = options.effective_limit() {
        query = query.limit(i64::from(limit));
    }

    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{FilterSpec, SortSpec};
    use serde_json::json;
    use store_object::{QueryFilter, SortOrder};

    #[test]
    fn test_default_product_query() {
        let query = compose("enhanced_products", &QueryOptions::new()).unwrap();
        assert_eq!(query.count_mode(), CountMode::Exact);
        assert_eq!(
            query.ordering(),
            &[
                ("featured".to_string(), SortOrder::Desc),
                ("created_at".to_string(), SortOrder::Desc)
            ]
        );
        assert!(query.conditions().is_empty());
        assert_eq!(query.limit_value(), None);
    }

    #[test]
    fn test_explicit_sort_replaces_default() {
        let options = QueryOptions::new().sort(SortSpec::desc("price")).limit(10);
        let query = compose("enhanced_products", &options).unwrap();
        assert_eq!(query.ordering(), &[("price".to_string(), SortOrder::Desc)]);
        assert_eq!(query.limit_value(), Some(10));
    }

    #[test]
    fn test_unknown_table_gets_no_filters_or_default_sort() {
        let options = QueryOptions::new().filter(FilterSpec::default().status("active"));
        let query = compose("not_a_table", &options).unwrap();
        assert!(query.conditions().is_empty());
        assert!(query.ordering().is_empty());
    }

    #[test]
    fn test_catalog_status_filter() {
        let options = QueryOptions::new().filter(FilterSpec::default().status("active"));
        let query = compose("enhanced_brands", &options).unwrap();
        assert_eq!(query.conditions(), &[QueryFilter::eq("active", json!(true))]);
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(matches!(
            compose("", &QueryOptions::new()),
            Err(StoreError::Validation(_))
        ));
    }
}
