//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use storefront::prelude::*;

pub fn memory_store() -> Arc<MemoryRemoteStore> {
    let store = MemoryRemoteStore::with_schemas(catalog_schemas());
    install_memory_procedures(&store);
    Arc::new(store)
}

pub fn storefront(store: &Arc<MemoryRemoteStore>) -> Storefront {
    Storefront::with_store(store.clone(), RealtimeConfig::default())
}

pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

pub fn id_of(row: &Row) -> String {
    row["id"].as_str().expect("row has an id").to_string()
}

pub async fn insert(store: &MemoryRemoteStore, table: CatalogTable, value: Value) -> Row {
    store
        .insert(table.name(), row(value))
        .await
        .unwrap_or_else(|e| panic!("seeding {} failed: {}", table, e))
}

pub async fn product(store: &MemoryRemoteStore, name: &str, extra: Value) -> Row {
    let mut fields = row(json!({
        "name": name,
        "slug": slugify(name),
        "price": 10.0,
    }));
    fields.extend(row(extra));
    store
        .insert(CatalogTable::Products.name(), fields)
        .await
        .unwrap_or_else(|e| panic!("seeding product {} failed: {}", name, e))
}

/// Wait until the adapter's result set satisfies `ready`
pub async fn settle(adapter: &QueryAdapter, ready: impl Fn(&ResultSet) -> bool) -> ResultSet {
    let mut rx = adapter.watch();
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            {
                let current = rx.borrow_and_update();
                if ready(&current) {
                    return current.clone();
                }
            }
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
        }
    })
    .await;
    waited.expect("result set did not settle in time")
}

/// Let queued notifications and their re-fetches run
pub async fn quiesce() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
