//! Remote store trait definition
//!
//! A remote store owns persistence, query execution and change notification.
//! Callers describe what they want with a `QueryBuilder`; rows come back as
//! JSON objects.

use crate::errors::StoreError;
use crate::query_builder::QueryBuilder;
use async_trait::async_trait;
use serde_json::{Map, Value};
use signal_system::{ChangeCallback, SubscriptionHandle};
use type_mapping::PostgresValue;

/// One stored record, keyed by column name
pub type Row = Map<String, Value>;

/// Named arguments of a remote procedure call, in declaration order
pub type ProcedureArgs = Vec<(String, PostgresValue)>;

/// Rows returned by a select, with the exact match count when requested
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub rows: Vec<Row>,
    pub count: Option<u64>,
}

#[async_trait]
pub trait RemoteStore: Send + Sync + std::fmt::Debug {
    /// Run a query. With `CountMode::Exact` the count reflects every row
    /// matching the filters, regardless of limit and offset.
    async fn select(&self, query: &QueryBuilder) -> Result<Selection, StoreError>;

    /// Insert one row and return it as stored, server defaults included
    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError>;

    /// Apply `patch` to the row with `id`. Fails with `NotFound` when no row matches.
    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Row, StoreError>;

    /// Delete the row with `id`. Deleting a missing row succeeds.
    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError>;

    /// Deliver every insert, update and delete on `table` to `callback`
    /// until the returned handle is closed or dropped.
    async fn subscribe(
        &self,
        table: &str,
        callback: ChangeCallback,
    ) -> Result<SubscriptionHandle, StoreError>;

    /// Invoke a remote procedure with named arguments
    async fn call(&self, procedure: &str, args: &[(String, PostgresValue)])
        -> Result<Value, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;

    /// Stop change delivery and release connections
    async fn close(&self);
}
