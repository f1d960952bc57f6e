//! Table presets
//!
//! Fixed table plus default options for the common screens. Presets only
//! supply configuration; filter translation stays in `catalog::filters`.

use super::options::{FilterSpec, QueryOptions, SortSpec};
use crate::catalog::CatalogTable;

#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub table: CatalogTable,
    pub options: QueryOptions,
}

impl Preset {
    fn realtime(table: CatalogTable) -> Self {
        Self {
            table,
            options: QueryOptions::new().realtime(true),
        }
    }

    fn active_only(table: CatalogTable, active_only: bool) -> Self {
        let mut preset = Self::realtime(table);
        if active_only {
            preset.options.filter = Some(FilterSpec::default().status("active"));
        }
        preset
    }
}

pub fn products(filter: Option<FilterSpec>, sort: Option<SortSpec>, limit: Option<u32>) -> Preset {
    let mut preset = Preset::realtime(CatalogTable::Products);
    preset.options.filter = filter;
    preset.options.sort = sort;
    preset.options.limit = limit;
    preset
}

pub fn categories(active_only: bool) -> Preset {
    Preset::active_only(CatalogTable::Categories, active_only)
}

pub fn brands(active_only: bool) -> Preset {
    Preset::active_only(CatalogTable::Brands, active_only)
}

pub fn gender_categories(active_only: bool) -> Preset {
    Preset::active_only(CatalogTable::GenderCategories, active_only)
}

/// Newest orders first, optionally for one customer
pub fn orders(customer_id: Option<&str>) -> Preset {
    let mut preset = Preset::realtime(CatalogTable::Orders);
    preset.options.filter = customer_id.map(|id| FilterSpec::default().customer(id));
    preset.options.sort = Some(SortSpec::desc("created_at"));
    preset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_realtime() {
        for preset in [
            products(None, None, None),
            categories(true),
            brands(false),
            gender_categories(true),
            orders(None),
        ] {
            assert!(preset.options.realtime, "{}", preset.table);
        }
    }

    #[test]
    fn test_active_only_sets_status() {
        assert_eq!(
            brands(true).options.filter,
            Some(FilterSpec::default().status("active"))
        );
        assert_eq!(brands(false).options.filter, None);
    }

    #[test]
    fn test_orders_preset() {
        let preset = orders(Some("c-1"));
        assert_eq!(preset.table, CatalogTable::Orders);
        assert_eq!(preset.options.sort, Some(SortSpec::desc("created_at")));
        assert_eq!(
            preset.options.filter.and_then(|f| f.customer),
            Some("c-1".to_string())
        );
    }
}
