//! Integration tests for query adapters
//!
//! Covers result-set states, filtering, ordering, mutations and the realtime
//! subscription lifecycle against the in-memory store.

mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use storefront::prelude::*;

#[tokio::test]
async fn test_settled_fetch_has_rows_or_error() {
    let store = memory_store();
    product(&store, "Rose Oil", json!({})).await;
    let storefront = storefront(&store);

    let adapter = storefront.products(None, None, None).await.unwrap();
    let result = adapter.snapshot();
    assert!(!result.loading);
    assert!(result.error.is_none());
    assert_eq!(result.len(), 1);
    assert_eq!(result.total, 1);

    store.fail_with("connection reset");
    let result = adapter.refetch().await;
    assert!(!result.loading);
    assert!(result.is_empty());
    assert_eq!(result.total, 0);
    assert!(result.error.as_deref().unwrap().contains("connection reset"));

    store.recover();
    let result = adapter.refetch().await;
    assert!(result.is_settled());
    assert!(result.error.is_none());
    assert_eq!(result.len(), 1);
}

#[tokio::test]
async fn test_empty_table_is_a_settled_result() {
    let store = memory_store();
    let storefront = storefront(&store);

    let adapter = storefront.brands(false).await.unwrap();
    let result = adapter.snapshot();
    assert!(!result.loading);
    assert!(result.error.is_none());
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_limit_never_changes_total() {
    let store = memory_store();
    for i in 0..5 {
        product(&store, &format!("Serum {}", i), json!({})).await;
    }
    let storefront = storefront(&store);

    let limited = storefront.products(None, None, Some(2)).await.unwrap();
    let unlimited = storefront.products(None, None, None).await.unwrap();

    assert_eq!(limited.snapshot().len(), 2);
    assert_eq!(limited.snapshot().total, 5);
    assert_eq!(unlimited.snapshot().len(), 5);
    assert_eq!(unlimited.snapshot().total, 5);
}

#[tokio::test]
async fn test_active_only_is_a_subset() {
    let store = memory_store();
    for (name, active) in [("Face", true), ("Body", true), ("Archive", false)] {
        insert(
            &store,
            CatalogTable::Categories,
            json!({"name": name, "slug": slugify(name), "active": active}),
        )
        .await;
    }
    let storefront = storefront(&store);

    let all = storefront.categories(false).await.unwrap().snapshot();
    let active = storefront.categories(true).await.unwrap().snapshot();

    assert_eq!(all.len(), 3);
    assert_eq!(active.len(), 2);
    let all_ids = all.ids();
    assert!(active.ids().iter().all(|id| all_ids.contains(id)));
    assert!(active.rows.iter().all(|r| r["active"] == json!(true)));
}

#[tokio::test]
async fn test_search_filter_matches_name_or_description() {
    let store = memory_store();
    product(&store, "Lavender Mist", json!({"description": "Calming spray"})).await;
    product(&store, "Night Cream", json!({"description": "Rich LAVENDER blend"})).await;
    product(&store, "Day Cream", json!({"description": "Light and fresh"})).await;
    let storefront = storefront(&store);

    let filter = FilterSpec::default().search("lavender");
    let adapter = storefront.products(Some(filter), None, None).await.unwrap();
    let mut names: Vec<String> = adapter
        .snapshot()
        .rows
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Lavender Mist", "Night Cream"]);
}

#[tokio::test]
async fn test_price_range_is_inclusive() {
    let store = memory_store();
    for (name, price) in [
        ("Just Under", 19.99),
        ("Floor", 20.0),
        ("Ceiling", 40.0),
        ("Just Over", 40.01),
    ] {
        product(&store, name, json!({"price": price})).await;
    }
    let storefront = storefront(&store);

    let filter = FilterSpec::default().price_range(20.0, 40.0);
    let adapter = storefront
        .products(Some(filter), Some(SortSpec::asc("price")), None)
        .await
        .unwrap();
    let result = adapter.snapshot();
    let names: Vec<&str> = result.rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Floor", "Ceiling"]);
    assert_eq!(result.total, 2);

    // An inverted range matches nothing but still settles cleanly
    let inverted = FilterSpec::default().price_range(40.0, 20.0);
    let adapter = storefront.products(Some(inverted), None, None).await.unwrap();
    let result = adapter.snapshot();
    assert!(result.is_settled());
    assert!(!result.loading);
    assert!(result.error.is_none());
    assert!(result.is_empty());
    assert_eq!(result.total, 0);
}

#[tokio::test]
async fn test_products_default_order_is_featured_then_newest() {
    let store = memory_store();
    product(&store, "Old Plain", json!({"featured": false})).await;
    product(&store, "Old Star", json!({"featured": true})).await;
    product(&store, "New Plain", json!({"featured": false})).await;
    product(&store, "New Star", json!({"featured": true})).await;
    let storefront = storefront(&store);

    let adapter = storefront.products(None, None, None).await.unwrap();
    let names: Vec<String> = adapter
        .snapshot()
        .rows
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["New Star", "Old Star", "New Plain", "Old Plain"]);
}

#[tokio::test]
async fn test_explicit_sort_overrides_default() {
    let store = memory_store();
    product(&store, "Cheap", json!({"price": 5.0, "featured": true})).await;
    product(&store, "Pricey", json!({"price": 50.0})).await;
    let storefront = storefront(&store);

    let adapter = storefront
        .products(None, Some(SortSpec::desc("price")), None)
        .await
        .unwrap();
    assert_eq!(adapter.snapshot().rows[0]["name"], json!("Pricey"));
}

#[tokio::test]
async fn test_insert_fills_server_fields() {
    let store = memory_store();
    let storefront = storefront(&store);
    let adapter = storefront
        .adapter(CatalogTable::Brands.name(), QueryOptions::new())
        .await
        .unwrap();

    let stored = adapter
        .insert(row(json!({"name": "Aurora", "slug": "aurora"})))
        .await
        .unwrap();
    assert!(stored["id"].is_string());
    assert!(stored["created_at"].is_string());
    assert!(stored["updated_at"].is_string());
    assert_eq!(stored["active"], json!(true));

    // Mutations leave the local result set alone
    assert!(adapter.snapshot().is_empty());
    let result = adapter.refetch().await;
    assert_eq!(result.ids(), vec![id_of(&stored)]);
}

#[tokio::test]
async fn test_update_missing_row_fails_and_keeps_result() {
    let store = memory_store();
    product(&store, "Balm", json!({})).await;
    let storefront = storefront(&store);
    let adapter = storefront.products(None, None, None).await.unwrap();
    let before = adapter.snapshot();

    let missing = uuid::Uuid::new_v4().to_string();
    let err = adapter
        .update(&missing, row(json!({"name": "Renamed"})))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    quiesce().await;
    assert_eq!(adapter.snapshot(), before);
}

#[tokio::test]
async fn test_update_returns_stored_row() {
    let store = memory_store();
    let created = product(&store, "Toner", json!({})).await;
    let storefront = storefront(&store);
    let adapter = storefront.products(None, None, None).await.unwrap();

    let updated = adapter
        .update(&id_of(&created), row(json!({"price": 12.5})))
        .await
        .unwrap();
    assert_eq!(updated["price"], json!(12.5));
    assert_ne!(updated["updated_at"], created["updated_at"]);
}

#[tokio::test]
async fn test_remove_missing_row_succeeds() {
    let store = memory_store();
    let storefront = storefront(&store);
    let adapter = storefront.products(None, None, None).await.unwrap();

    let missing = uuid::Uuid::new_v4().to_string();
    adapter.remove(&missing).await.unwrap();
    adapter.remove(&missing).await.unwrap();
}

#[tokio::test]
async fn test_remove_referenced_product_is_a_constraint_error() {
    let store = memory_store();
    let sold = product(&store, "Sold Out Soap", json!({})).await;
    let storefront = storefront(&store);

    let order = row(json!({
        "customer_name": "Dana Reyes",
        "customer_phone": "+1 555 0100",
        "subtotal": 8.0,
        "total_amount": 8.0,
    }));
    let items = [OrderItemInput::new(id_of(&sold), "Sold Out Soap", 1, 8.0)];
    storefront.create_order(order, &items).await.unwrap();

    let adapter = storefront.products(None, None, None).await.unwrap();
    let err = adapter.remove(&id_of(&sold)).await.unwrap_err();
    assert!(err.is_constraint(), "unexpected error: {}", err);
    assert_eq!(store.rows(CatalogTable::Products.name()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_one_notification_triggers_one_refetch() {
    let store = memory_store();
    let storefront = storefront(&store);
    let adapter = storefront.products(None, None, None).await.unwrap();
    assert!(adapter.is_subscribed());
    assert_eq!(store.select_calls(), 1);

    product(&store, "Fresh Arrival", json!({})).await;
    let result = settle(&adapter, |r| r.len() == 1).await;
    assert_eq!(result.total, 1);

    quiesce().await;
    assert_eq!(store.select_calls(), 2);
}

#[tokio::test]
async fn test_refetch_uses_the_active_configuration() {
    let store = memory_store();
    product(&store, "Star", json!({"featured": true})).await;
    let storefront = storefront(&store);

    let filter = FilterSpec::default().featured(true);
    let adapter = storefront.products(Some(filter), None, None).await.unwrap();
    assert_eq!(adapter.snapshot().len(), 1);

    product(&store, "Plain", json!({"featured": false})).await;
    product(&store, "Another Star", json!({"featured": true})).await;
    let result = settle(&adapter, |r| r.len() == 2).await;
    assert!(result.rows.iter().all(|r| r["featured"] == json!(true)));
}

#[tokio::test]
async fn test_changes_on_other_tables_are_ignored() {
    let store = memory_store();
    let storefront = storefront(&store);
    let _adapter = storefront.products(None, None, None).await.unwrap();

    insert(&store, CatalogTable::Brands, json!({"name": "Solis", "slug": "solis"})).await;
    quiesce().await;
    assert_eq!(store.select_calls(), 1);
}

#[tokio::test]
async fn test_stale_fetch_is_discarded() {
    let store = memory_store();
    product(&store, "First", json!({})).await;
    let adapter = QueryAdapter::open(
        store.clone(),
        CatalogTable::Products.name(),
        QueryOptions::new(),
        false,
    )
    .await
    .unwrap();

    store.set_select_delay(Some(Duration::from_millis(200)));
    let (slow, fast) = tokio::join!(adapter.refetch(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        product(&store, "Second", json!({})).await;
        store.set_select_delay(None);
        adapter.refetch().await
    });

    assert_eq!(fast.len(), 2);
    // The slow fetch read one row but finished last
    assert_eq!(slow.len(), 2);
    assert_eq!(adapter.snapshot().len(), 2);
}

#[tokio::test]
async fn test_reconfigure_moves_the_subscription() {
    let store = memory_store();
    let storefront = storefront(&store);
    let products = CatalogTable::Products.name();
    let brands = CatalogTable::Brands.name();

    let mut adapter = storefront
        .adapter(products, QueryOptions::new().realtime(true))
        .await
        .unwrap();
    assert_eq!(store.signals().listener_count(products), 1);

    adapter
        .reconfigure(brands, QueryOptions::new().realtime(true))
        .await
        .unwrap();
    assert_eq!(adapter.table(), brands);
    assert_eq!(store.signals().listener_count(products), 0);
    assert_eq!(store.signals().listener_count(brands), 1);
    assert!(!adapter.snapshot().loading);

    // Old table changes no longer trigger fetches
    let calls = store.select_calls();
    product(&store, "Ignored", json!({})).await;
    quiesce().await;
    assert_eq!(store.select_calls(), calls);
}

#[tokio::test]
async fn test_reconfigure_to_same_configuration_is_a_no_op() {
    let store = memory_store();
    let storefront = storefront(&store);
    let options = QueryOptions::new().realtime(true).limit(10);

    let mut adapter = storefront
        .adapter(CatalogTable::Products.name(), options.clone())
        .await
        .unwrap();
    let calls = store.select_calls();

    adapter
        .reconfigure(CatalogTable::Products.name(), options)
        .await
        .unwrap();
    assert_eq!(store.select_calls(), calls);
    assert!(adapter.is_subscribed());
}

#[tokio::test]
async fn test_dropping_the_adapter_releases_the_subscription() {
    let store = memory_store();
    let storefront = storefront(&store);

    let adapter = storefront.categories(true).await.unwrap();
    let other = storefront.brands(true).await.unwrap();
    assert_eq!(store.signals().subscription_count(), 2);

    drop(adapter);
    assert_eq!(store.signals().subscription_count(), 1);
    assert_eq!(store.signals().listener_count(CatalogTable::Categories.name()), 0);

    let mut other = other;
    other.close();
    other.close();
    assert_eq!(store.signals().subscription_count(), 0);
    assert!(!other.is_subscribed());
}

#[tokio::test]
async fn test_realtime_disabled_in_config_never_subscribes() {
    let store = memory_store();
    let realtime = RealtimeConfig {
        enabled: false,
        ..RealtimeConfig::default()
    };
    let storefront = Storefront::with_store(store.clone(), realtime);

    let adapter = storefront.products(None, None, None).await.unwrap();
    assert!(!adapter.is_subscribed());
    assert_eq!(store.signals().subscription_count(), 0);
}

#[tokio::test]
async fn test_composition_failures_are_reported_in_the_result() {
    let store = memory_store();
    let storefront = storefront(&store);

    let empty = storefront.adapter("", QueryOptions::new()).await.unwrap();
    let result = empty.snapshot();
    assert!(!result.loading);
    assert!(result.error.as_deref().unwrap().contains("Table name cannot be empty"));

    let unknown = storefront
        .adapter("wishlists", QueryOptions::new())
        .await
        .unwrap();
    assert!(unknown.snapshot().is_error());

    let bad_sort = storefront
        .adapter(
            CatalogTable::Products.name(),
            QueryOptions::new().sort(SortSpec::asc("no_such_column")),
        )
        .await
        .unwrap();
    assert!(bad_sort.snapshot().is_error());
    assert!(bad_sort.snapshot().is_empty());
}

#[tokio::test]
async fn test_orders_preset_filters_by_customer() {
    let store = memory_store();
    let soap = product(&store, "Soap", json!({})).await;
    let alice = insert(&store, CatalogTable::Customers, json!({"email": "alice@example.com"})).await;
    let storefront = storefront(&store);

    for customer in [Some(id_of(&alice)), None] {
        let order = row(json!({
            "customer_id": customer,
            "customer_name": "Walk-in",
            "customer_phone": "+1 555 0101",
            "subtotal": 3.0,
            "total_amount": 3.0,
        }));
        let items = [OrderItemInput::new(id_of(&soap), "Soap", 1, 3.0)];
        storefront.create_order(order, &items).await.unwrap();
    }

    let all = storefront.orders(None).await.unwrap();
    assert_eq!(all.snapshot().total, 2);

    let mine = storefront.orders(Some(&id_of(&alice))).await.unwrap();
    assert_eq!(mine.snapshot().total, 1);
    assert_eq!(mine.snapshot().rows[0]["customer_id"], json!(id_of(&alice)));
}

#[tokio::test]
async fn test_shutdown_closes_the_storefront() {
    let store = memory_store();
    let storefront = Storefront::with_store(store.clone() as Arc<dyn RemoteStore>, RealtimeConfig::default());
    storefront.health_check().await.unwrap();

    storefront.shutdown().await;
    storefront.shutdown().await;
    assert!(storefront.is_closed());
    assert!(matches!(
        storefront.products(None, None, None).await,
        Err(StorefrontError::Closed)
    ));
    assert!(storefront.migrate(false).await.is_err());
}
