//! In-memory remote store
//!
//! `MemoryRemoteStore` emulates the hosted database closely enough to run the
//! storefront without a server: schema-driven defaults and constraints,
//! PostgreSQL filter and ordering semantics, embeds, atomic procedures and a
//! synchronous change feed. It also supports failure and latency injection
//! for tests.

pub mod eval;
pub mod tables;

pub use tables::MemoryTables;

use crate::errors::StoreError;
use crate::query_builder::QueryBuilder;
use crate::schema::TableSchema;
use crate::traits::{RemoteStore, Row, Selection};
use async_trait::async_trait;
use serde_json::Value;
use signal_system::{ChangeCallback, ChangeEvent, SignalManager, SubscriptionHandle};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use type_mapping::PostgresValue;

/// Body of a procedure registered on a `MemoryRemoteStore`. Arguments arrive
/// by name; a null argument is omitted. The body runs atomically.
pub type MemoryProcedure =
    Arc<dyn Fn(&mut MemoryTables, &Row) -> Result<Value, StoreError> + Send + Sync>;

pub struct MemoryRemoteStore {
    tables: tokio::sync::RwLock<MemoryTables>,
    procedures: RwLock<HashMap<String, MemoryProcedure>>,
    signals: SignalManager,
    failure: Mutex<Option<String>>,
    select_delay: Mutex<Option<Duration>>,
    select_calls: AtomicUsize,
    closed: AtomicBool,
}

impl std::fmt::Debug for MemoryRemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRemoteStore")
            .field("signals", &self.signals)
            .field("select_calls", &self.select_calls())
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::with_tables(MemoryTables::new())
    }

    pub fn with_schemas(schemas: impl IntoIterator<Item = TableSchema>) -> Self {
        let mut tables = MemoryTables::new();
        for schema in schemas {
            tables.register(schema);
        }
        Self::with_tables(tables)
    }

    pub fn with_tables(tables: MemoryTables) -> Self {
        Self {
            tables: tokio::sync::RwLock::new(tables),
            procedures: RwLock::new(HashMap::new()),
            signals: SignalManager::new(),
            failure: Mutex::new(None),
            select_delay: Mutex::new(None),
            select_calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn register_procedure<F>(&self, name: &str, procedure: F)
    where
        F: Fn(&mut MemoryTables, &Row) -> Result<Value, StoreError> + Send + Sync + 'static,
    {
        if let Ok(mut procedures) = self.procedures.write() {
            procedures.insert(name.to_string(), Arc::new(procedure));
        }
    }

    /// Fail every following operation with `StoreError::Unavailable(message)`
    pub fn fail_with(&self, message: impl Into<String>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(message.into());
        }
    }

    pub fn recover(&self) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = None;
        }
    }

    /// Hold every following select for `delay` after it has read its rows
    pub fn set_select_delay(&self, delay: Option<Duration>) {
        if let Ok(mut current) = self.select_delay.lock() {
            *current = delay;
        }
    }

    /// Number of selects served so far
    pub fn select_calls(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }

    pub fn signals(&self) -> &SignalManager {
        &self.signals
    }

    /// Snapshot of every row in `table`
    pub async fn rows(&self, table: &str) -> Result<Vec<Row>, StoreError> {
        Ok(self.tables.read().await.rows(table)?.to_vec())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("store is closed".to_string()));
        }
        match self.failure.lock() {
            Ok(failure) => match failure.as_ref() {
                Some(message) => Err(StoreError::Unavailable(message.clone())),
                None => Ok(()),
            },
            Err(_) => Err(StoreError::Unavailable("failure switch poisoned".to_string())),
        }
    }

    /// Deliver queued change events. Runs after the table lock is released so
    /// callbacks may query the store.
    fn publish(&self, events: Vec<ChangeEvent>) {
        for event in &events {
            let delivered = self.signals.emit(event);
            tracing::trace!(table = %event.table, kind = event.kind.as_str(), delivered, "change published");
        }
    }

    async fn write<T>(
        &self,
        f: impl FnOnce(&mut MemoryTables) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.check_available()?;
        let (result, events) = {
            let mut tables = self.tables.write().await;
            let result = tables.atomically(f);
            (result, tables.take_events())
        };
        self.publish(events);
        result
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn select(&self, query: &QueryBuilder) -> Result<Selection, StoreError> {
        self.check_available()?;
        self.select_calls.fetch_add(1, Ordering::SeqCst);

        let selection = self.tables.read().await.select(query)?;

        let delay = self.select_delay.lock().ok().and_then(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(selection)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        self.write(|tables| tables.insert(table, row)).await
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Row, StoreError> {
        self.write(|tables| tables.update(table, id, patch)).await
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError> {
        self.write(|tables| tables.delete(table, id)).await
    }

    async fn subscribe(
        &self,
        table: &str,
        callback: ChangeCallback,
    ) -> Result<SubscriptionHandle, StoreError> {
        self.check_available()?;
        Ok(self.signals.subscribe_callback(table, callback)?)
    }

    async fn call(
        &self,
        procedure: &str,
        args: &[(String, PostgresValue)],
    ) -> Result<Value, StoreError> {
        let body = self
            .procedures
            .read()
            .ok()
            .and_then(|procedures| procedures.get(procedure).cloned())
            .ok_or_else(|| StoreError::procedure(procedure, "function does not exist"))?;

        let named: Row = args
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();

        self.write(|tables| body(tables, &named)).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.check_available()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.signals.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::CountMode;
    use crate::schema::ColumnDef;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use type_mapping::ColumnType;

    fn store() -> MemoryRemoteStore {
        MemoryRemoteStore::with_schemas([TableSchema::new("notes")
            .column(ColumnDef::new("body", ColumnType::Text).required())
            .timestamps()])
    }

    fn object(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[tokio::test]
    async fn test_mutations_notify_subscribers() {
        let store = store();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handle = store
            .subscribe(
                "notes",
                Arc::new(move |_event: &ChangeEvent| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .unwrap();

        let note = store.insert("notes", object(json!({"body": "hi"}))).await.unwrap();
        let id = note["id"].as_str().unwrap().to_string();
        store
            .update("notes", &id, object(json!({"body": "hello"})))
            .await
            .unwrap();
        store.delete("notes", &id).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        handle.close();
        store.insert("notes", object(json!({"body": "again"}))).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = store();
        store.fail_with("connection reset");
        let error = store
            .select(&QueryBuilder::new("notes"))
            .await
            .unwrap_err();
        assert_eq!(error, StoreError::Unavailable("connection reset".to_string()));
        assert!(store.health_check().await.is_err());

        store.recover();
        let selection = store
            .select(&QueryBuilder::new("notes").count(CountMode::Exact))
            .await
            .unwrap();
        assert_eq!(selection.count, Some(0));
        assert_eq!(store.select_calls(), 1);
    }

    #[tokio::test]
    async fn test_procedures_are_atomic() {
        let store = store();
        store.register_procedure("add_two", |tables, args| {
            let body = args.get("body").cloned().unwrap_or(Value::Null);
            tables.insert("notes", object(json!({"body": "first"})))?;
            tables.insert("notes", object(json!({"body": body})))?;
            Ok(json!({"inserted": 2}))
        });

        let result = store
            .call("add_two", &[("body".to_string(), PostgresValue::from("x"))])
            .await
            .unwrap();
        assert_eq!(result, json!({"inserted": 2}));
        assert_eq!(store.rows("notes").await.unwrap().len(), 2);

        // The second insert violates NOT NULL and takes the first one with it
        let failed = store
            .call("add_two", &[("body".to_string(), PostgresValue::Null)])
            .await;
        assert!(failed.unwrap_err().is_constraint());
        assert_eq!(store.rows("notes").await.unwrap().len(), 2);

        assert!(matches!(
            store.call("missing", &[]).await,
            Err(StoreError::Procedure { .. })
        ));
    }

    #[tokio::test]
    async fn test_closed_store_rejects_calls() {
        let store = store();
        store.close().await;
        assert!(matches!(
            store.insert("notes", object(json!({"body": "x"}))).await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
