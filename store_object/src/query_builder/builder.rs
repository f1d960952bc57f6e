//! Query description
//!
//! A `QueryBuilder` names one table and describes which of its rows to return.
//! It carries no connection; a remote store executes it.

use crate::errors::StoreError;
use crate::query_builder::filter::QueryFilter;
use crate::query_builder::join::Embed;
use crate::query_builder::ordering::SortOrder;
use crate::query_builder::sql_generation::SqlGenerator;
use serde_json::Value;

/// Whether the store should also report the number of matching rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountMode {
    #[default]
    None,
    /// Count every row matching the filters, ignoring limit and offset
    Exact,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryBuilder {
    pub(crate) table: String,
    pub(crate) conditions: Vec<QueryFilter>,
    pub(crate) order_by: Vec<(String, SortOrder)>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
    pub(crate) count: CountMode,
    pub(crate) embeds: Vec<Embed>,
}

impl QueryBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            conditions: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            count: CountMode::None,
            embeds: Vec::new(),
        }
    }

    /// Add a filter condition
    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.conditions.push(filter);
        self
    }

    /// Add multiple filters (combined with AND)
    pub fn filters(mut self, filters: Vec<QueryFilter>) -> Self {
        self.conditions.extend(filters);
        self
    }

    pub fn order_by(mut self, field: &str, order: SortOrder) -> Self {
        self.order_by.push((field.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn count(mut self, mode: CountMode) -> Self {
        self.count = mode;
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn conditions(&self) -> &[QueryFilter] {
        &self.conditions
    }

    pub fn ordering(&self) -> &[(String, SortOrder)] {
        &self.order_by
    }

    pub fn limit_value(&self) -> Option<i64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<i64> {
        self.offset
    }

    pub fn count_mode(&self) -> CountMode {
        self.count
    }

    pub fn embeds(&self) -> &[Embed] {
        &self.embeds
    }

    /// Check every identifier and bound before the query reaches a store
    pub fn validate(&self) -> Result<(), StoreError> {
        SqlGenerator::validate(self)
    }

    /// Build the row statement and its parameters
    pub fn build_select(&self) -> Result<(String, Vec<Value>), StoreError> {
        SqlGenerator::build_select(self)
    }

    /// Build the count statement and its parameters
    pub fn build_count(&self) -> Result<(String, Vec<Value>), StoreError> {
        SqlGenerator::build_count(self)
    }
}
