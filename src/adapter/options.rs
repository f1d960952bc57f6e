//! Adapter configuration

use serde::{Deserialize, Serialize};
use store_object::SortOrder;

/// Optional constraints narrowing which rows a query returns.
///
/// Every key is independent; an absent key imposes no constraint. Which keys
/// apply depends on the table (see `catalog::filters`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    /// Inclusive `(min, max)`; the bounds are not checked against each other
    #[serde(default)]
    pub price_range: Option<(f64, f64)>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
}

impl FilterSpec {
    pub fn category(mut self, category_id: impl Into<String>) -> Self {
        self.category = Some(category_id.into());
        self
    }

    pub fn brand(mut self, brand_id: impl Into<String>) -> Self {
        self.brand = Some(brand_id.into());
        self
    }

    pub fn gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn price_range(mut self, min: f64, max: f64) -> Self {
        self.price_range = Some((min, max));
        self
    }

    pub fn featured(mut self, featured: bool) -> Self {
        self.featured = Some(featured);
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer = Some(customer_id.into());
        self
    }
}

fn ascending_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    #[serde(default = "ascending_default")]
    pub ascending: bool,
}

impl SortSpec {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }

    pub fn order(&self) -> SortOrder {
        SortOrder::from_ascending(self.ascending)
    }
}

/// Everything that shapes one adapter's query besides the table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    #[serde(default)]
    pub filter: Option<FilterSpec>,
    /// Overrides the table's default ordering
    #[serde(default)]
    pub sort: Option<SortSpec>,
    /// Caps the returned rows; never affects the total. Zero means no limit.
    #[serde(default)]
    pub limit: Option<u32>,
    /// Re-fetch whenever the table changes
    #[serde(default)]
    pub realtime: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: FilterSpec) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// The limit to apply, if any
    pub fn effective_limit(&self) -> Option<u32> {
        self.limit.filter(|limit| *limit > 0)
    }
}
