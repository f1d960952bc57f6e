//! Integration tests for product search and product details

mod common;

use common::*;
use storefront::prelude::*;
use storefront::search::search_query;

async fn seed_catalog(store: &MemoryRemoteStore) -> (Row, Row) {
    let category = insert(
        store,
        CatalogTable::Categories,
        json!({"name": "Skin Care", "slug": "skin-care", "description": "Everything for skin"}),
    )
    .await;
    let brand = insert(
        store,
        CatalogTable::Brands,
        json!({"name": "Lumen", "slug": "lumen"}),
    )
    .await;
    (category, brand)
}

// Search only finds categorised products
async fn shelf(store: &MemoryRemoteStore) -> Value {
    let category = insert(
        store,
        CatalogTable::Categories,
        json!({"name": "Bath", "slug": "bath"}),
    )
    .await;
    json!({"category_id": id_of(&category)})
}

fn with(base: &Value, extra: Value) -> Value {
    let mut merged = base.clone();
    if let (Some(target), Value::Object(fields)) = (merged.as_object_mut(), extra) {
        target.extend(fields);
    }
    merged
}

fn names(rows: &[Row]) -> Vec<&str> {
    rows.iter().map(|r| r["name"].as_str().unwrap()).collect()
}

#[tokio::test]
async fn test_search_matches_any_text_column_case_insensitively() {
    let store = memory_store();
    let bath = shelf(&store).await;
    product(&store, "Aloe Gel", bath.clone()).await;
    product(&store, "Night Mask", with(&bath, json!({"description": "With ALOE extract"}))).await;
    product(&store, "Hand Cream", with(&bath, json!({"ingredients": "shea, aloe vera"}))).await;
    product(&store, "Lip Balm", with(&bath, json!({"description": "Beeswax"}))).await;

    let rows = search_products(store.as_ref(), "aloe", None).await.unwrap();
    let mut found = names(&rows);
    found.sort();
    assert_eq!(found, vec!["Aloe Gel", "Hand Cream", "Night Mask"]);
}

#[tokio::test]
async fn test_search_only_returns_active_products() {
    let store = memory_store();
    let bath = shelf(&store).await;
    product(&store, "Rose Water", bath.clone()).await;
    product(&store, "Rose Soap", with(&bath, json!({"status": "draft"}))).await;

    // A status filter cannot widen the search
    let filter = FilterSpec::default().status("draft");
    let rows = search_products(store.as_ref(), "rose", Some(&filter)).await.unwrap();
    assert_eq!(names(&rows), vec!["Rose Water"]);
}

#[tokio::test]
async fn test_search_applies_product_filters_and_embeds() {
    let store = memory_store();
    let (category, brand) = seed_catalog(&store).await;
    product(
        &store,
        "Vitamin Serum",
        json!({"category_id": id_of(&category), "brand_id": id_of(&brand), "price": 30.0}),
    )
    .await;
    product(&store, "Vitamin Gummies", json!({"price": 8.0})).await;

    let filter = FilterSpec::default().category(id_of(&category)).price_range(20.0, 40.0);
    let rows = search_products(store.as_ref(), "vitamin", Some(&filter)).await.unwrap();
    assert_eq!(names(&rows), vec!["Vitamin Serum"]);

    let hit = &rows[0];
    assert_eq!(
        hit["enhanced_categories"],
        json!({"name": "Skin Care", "slug": "skin-care"})
    );
    assert_eq!(hit["enhanced_brands"], json!({"name": "Lumen", "slug": "lumen"}));
}

#[tokio::test]
async fn test_search_excludes_products_without_category() {
    let store = memory_store();
    let bath = shelf(&store).await;
    product(&store, "Loose Tea", json!({})).await;
    product(&store, "Green Tea Soap", bath).await;
    product(&store, "Tea Tree Oil", json!({"description": "Uncategorised"})).await;

    let rows = search_products(store.as_ref(), "tea", None).await.unwrap();
    assert_eq!(names(&rows), vec!["Green Tea Soap"]);
    assert_eq!(rows[0]["enhanced_categories"], json!({"name": "Bath", "slug": "bath"}));
    // Brand stays optional
    assert!(rows[0]["enhanced_brands"].is_null());

    let selection = store
        .select(&search_query("tea", None).count(CountMode::Exact))
        .await
        .unwrap();
    assert_eq!(selection.count, Some(1));
    assert_eq!(selection.rows.len(), 1);
}

#[tokio::test]
async fn test_search_orders_featured_first() {
    let store = memory_store();
    let bath = shelf(&store).await;
    product(&store, "Clay Mask", bath.clone()).await;
    product(&store, "Clay Soap", with(&bath, json!({"featured": true}))).await;
    product(&store, "Clay Scrub", bath).await;

    let rows = search_products(store.as_ref(), "clay", None).await.unwrap();
    assert_eq!(names(&rows), vec!["Clay Soap", "Clay Scrub", "Clay Mask"]);
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let store = memory_store();
    let bath = shelf(&store).await;
    product(&store, "100% Argan Oil", bath.clone()).await;
    product(&store, "Argan Shampoo", bath).await;

    let rows = search_products(store.as_ref(), "100%", None).await.unwrap();
    assert_eq!(names(&rows), vec!["100% Argan Oil"]);
}

#[tokio::test]
async fn test_product_details_embeds_relations() {
    let store = memory_store();
    let (category, brand) = seed_catalog(&store).await;
    let serum = product(
        &store,
        "Night Serum",
        json!({"category_id": id_of(&category), "brand_id": id_of(&brand)}),
    )
    .await;
    let serum_id = id_of(&serum);

    insert(
        &store,
        CatalogTable::ProductVariants,
        json!({"product_id": serum_id, "name": "30 ml", "stock_quantity": 4}),
    )
    .await;
    insert(
        &store,
        CatalogTable::ProductReviews,
        json!({"product_id": serum_id, "rating": 5, "title": "Lovely", "status": "approved"}),
    )
    .await;
    insert(
        &store,
        CatalogTable::ProductReviews,
        json!({"product_id": serum_id, "rating": 1, "title": "Spam"}),
    )
    .await;

    let storefront = storefront(&store);
    let details = storefront.product_details(&serum_id).await.unwrap();
    assert_eq!(details["name"], json!("Night Serum"));
    assert_eq!(
        details["enhanced_categories"]["description"],
        json!("Everything for skin")
    );
    assert_eq!(details["enhanced_brands"]["name"], json!("Lumen"));
    assert_eq!(details["product_variants"].as_array().unwrap().len(), 1);

    let reviews = details["product_reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["title"], json!("Lovely"));
    assert!(reviews[0].get("customer_email").is_none());
}

#[tokio::test]
async fn test_product_details_of_missing_product() {
    let store = memory_store();
    let storefront = storefront(&store);

    let missing = uuid::Uuid::new_v4().to_string();
    assert!(storefront.product_details(&missing).await.unwrap_err().is_not_found());
    assert!(storefront.product_details("not-a-uuid").await.unwrap_err().is_not_found());
}
