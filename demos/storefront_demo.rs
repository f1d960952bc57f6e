//! # Storefront Walkthrough
//!
//! Runs the storefront against the in-memory store, so no database is needed:
//! - Seeding brands, categories and products
//! - Product adapters with filters, sorting and limits
//! - Realtime re-fetch after a write
//! - Search, product details, orders and inventory
//!
//! Run with `RUST_LOG=storefront=debug cargo run --example storefront_demo`.

use std::sync::Arc;
use storefront::prelude::*;
use tracing_subscriber::EnvFilter;

fn object(value: Value) -> anyhow::Result<Row> {
    match value {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("expected a JSON object, got {}", other),
    }
}

fn id(row: &Row) -> anyhow::Result<String> {
    row.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("row has no id"))
}

fn print_products(title: &str, result: &ResultSet) {
    println!("   {} ({} of {}):", title, result.len(), result.total);
    for product in &result.rows {
        println!(
            "     - {:<22} price {:>6}  featured {}",
            product["name"].as_str().unwrap_or("?"),
            product["price"],
            product["featured"]
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Storefront Walkthrough");
    println!("======================");

    // 1. Setup
    println!("\nStep 1: In-memory store");
    let memory = MemoryRemoteStore::with_schemas(catalog_schemas());
    install_memory_procedures(&memory);
    let memory = Arc::new(memory);
    let storefront = Storefront::with_store(memory.clone(), RealtimeConfig::default());
    println!("   {} catalog tables registered", CatalogTable::ALL.len());

    // 2. Seed the catalog
    println!("\nStep 2: Seeding the catalog");
    let brand = memory
        .insert(
            CatalogTable::Brands.name(),
            object(json!({"name": "Lumen", "slug": "lumen", "featured": true}))?,
        )
        .await?;
    let category = memory
        .insert(
            CatalogTable::Categories.name(),
            object(json!({"name": "Skin Care", "slug": "skin-care"}))?,
        )
        .await?;

    let forms = [
        ("Vitamin C Serum", "29.90", true, "Brightening serum with citrus"),
        ("Hyaluronic Toner", "17.50", false, "Hydrating toner"),
        ("Night Cream", "oops", false, "Rich cream with vitamin E"),
        ("Clay Mask", "12", true, "Kaolin clay mask"),
    ];
    for (name, price, featured, description) in forms {
        let form = ProductForm {
            name: name.to_string(),
            price: price.to_string(),
            featured,
            description: description.to_string(),
            brand_id: id(&brand)?,
            category_id: id(&category)?,
            stock_quantity: "10".to_string(),
            ..ProductForm::default()
        };
        memory
            .insert(CatalogTable::Products.name(), form.to_insert_row())
            .await?;
    }
    println!("   1 brand, 1 category, {} products", forms.len());

    // 3. Adapters
    println!("\nStep 3: Product adapters");
    let all = storefront.products(None, None, None).await?;
    print_products("Default order (featured first, newest first)", &all.snapshot());

    let cheap = storefront
        .products(
            Some(FilterSpec::default().price_range(0.0, 20.0)),
            Some(SortSpec::asc("price")),
            Some(2),
        )
        .await?;
    print_products("Up to 20, cheapest first, limit 2", &cheap.snapshot());

    // 4. Realtime
    println!("\nStep 4: Realtime re-fetch");
    let mut updates = all.watch();
    let added = memory
        .insert(
            CatalogTable::Products.name(),
            ProductForm {
                name: "Rose Water Mist".to_string(),
                price: "9.90".to_string(),
                stock_quantity: "3".to_string(),
                ..ProductForm::default()
            }
            .to_insert_row(),
        )
        .await?;
    updates.wait_for(|result| result.total == 5).await?;
    print_products("After inserting a product", &all.snapshot());

    // 5. Search and details
    println!("\nStep 5: Search and details");
    let hits = storefront.search_products("vitamin", None).await?;
    for hit in &hits {
        println!(
            "   found {} ({})",
            hit["name"].as_str().unwrap_or("?"),
            hit["enhanced_brands"]["name"].as_str().unwrap_or("no brand")
        );
    }
    let details = storefront.product_details(&id(&added)?).await?;
    println!(
        "   {} has {} variants and slug {}",
        details["name"].as_str().unwrap_or("?"),
        details["product_variants"].as_array().map_or(0, Vec::len),
        details["slug"]
    );

    // 6. Orders and inventory
    println!("\nStep 6: Orders and inventory");
    let order = object(json!({
        "customer_name": "Dana Reyes",
        "customer_email": "dana@example.com",
        "customer_phone": "+1 555 0100",
        "subtotal": 19.80,
        "total_amount": 19.80,
    }))?;
    let items = [OrderItemInput::new(id(&added)?, "Rose Water Mist", 2, 9.90)];
    let placed = storefront.create_order(order, &items).await?;
    println!("   placed {}", placed["order_number"]);

    let sale = InventoryAdjustment::new(id(&added)?, -2, InventoryChangeType::Sale)
        .reference(placed["order_number"].as_str().unwrap_or_default(), "order");
    match storefront.adjust_inventory(&sale).await {
        Ok(log) => println!(
            "   stock {} -> {}",
            log["previous_quantity"], log["new_quantity"]
        ),
        Err(e) => println!("   inventory not adjusted: {}", e),
    }

    let orders = storefront.orders(None).await?;
    println!("   {} order(s) on record", orders.snapshot().total);

    // 7. Shutdown
    println!("\nStep 7: Shutdown");
    drop((all, cheap, orders));
    storefront.shutdown().await;
    println!("   open subscriptions: {}", memory.signals().subscription_count());

    Ok(())
}
