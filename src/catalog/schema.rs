//! Remote schema of the catalog tables

use super::CatalogTable;
use serde_json::json;
use store_object::{ColumnDef, OnDelete, TableSchema};
use type_mapping::ColumnType;

fn text(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Text)
}

fn uuid(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Uuid)
}

fn integer(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Integer)
}

fn numeric(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Numeric)
}

fn boolean(name: &str, default: bool) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Boolean)
        .required()
        .default_value(json!(default))
}

fn counter(name: &str, default: i64) -> ColumnDef {
    integer(name).required().default_value(json!(default))
}

fn created_at() -> ColumnDef {
    ColumnDef::new("created_at", ColumnType::Timestamp)
        .required()
        .default_now()
}

impl CatalogTable {
    pub fn schema(&self) -> TableSchema {
        let schema = TableSchema::new(self.name());
        match self {
            CatalogTable::GenderCategories => schema
                .column(text("name").required().unique())
                .column(text("description"))
                .column(text("image"))
                .column(boolean("active", true))
                .timestamps(),

            CatalogTable::Categories => schema
                .column(text("name").required())
                .column(text("slug").required().unique())
                .column(text("description"))
                .column(text("image"))
                .column(uuid("parent_id"))
                .column(counter("sort_order", 0))
                .column(boolean("active", true))
                .timestamps()
                .references("parent_id", "enhanced_categories", OnDelete::SetNull)
                .index("parent_id"),

            CatalogTable::Brands => schema
                .column(text("name").required())
                .column(text("slug").required().unique())
                .column(text("description"))
                .column(text("logo"))
                .column(text("website"))
                .column(text("country"))
                .column(boolean("active", true))
                .column(boolean("featured", false))
                .column(counter("sort_order", 0))
                .timestamps(),

            CatalogTable::Customers => schema
                .column(text("email").required().unique())
                .column(text("phone"))
                .column(text("first_name"))
                .column(text("last_name"))
                .column(text("date_of_birth"))
                .column(text("gender"))
                .column(ColumnDef::new("address", ColumnType::Json))
                .column(ColumnDef::new("preferences", ColumnType::Json))
                .timestamps(),

            CatalogTable::Products => schema
                .column(text("name").required())
                .column(text("slug").required().unique())
                .column(text("sku").unique())
                .column(uuid("brand_id"))
                .column(uuid("category_id"))
                .column(text("gender_category"))
                .column(numeric("price").required())
                .column(numeric("compare_price"))
                .column(numeric("cost_price"))
                .column(text("description"))
                .column(text("short_description"))
                .column(text("ingredients"))
                .column(text("usage_instructions"))
                .column(text("benefits"))
                .column(ColumnDef::new("images", ColumnType::Json).default_value(json!([])))
                .column(text("video_url"))
                .column(numeric("weight"))
                .column(ColumnDef::new("dimensions", ColumnType::Json))
                .column(counter("stock_quantity", 0))
                .column(counter("low_stock_threshold", 5))
                .column(boolean("track_inventory", true))
                .column(boolean("allow_backorder", false))
                .column(boolean("featured", false))
                .column(text("status").required().default_value(json!("active")))
                .column(text("seo_title"))
                .column(text("seo_description"))
                .column(ColumnDef::new("tags", ColumnType::TextArray))
                .column(counter("sort_order", 0))
                .timestamps()
                .references("brand_id", "enhanced_brands", OnDelete::SetNull)
                .references("category_id", "enhanced_categories", OnDelete::SetNull)
                .index("brand_id")
                .index("category_id")
                .index("status"),

            CatalogTable::ProductVariants => schema
                .column(uuid("product_id").required())
                .column(text("name").required())
                .column(text("sku"))
                .column(numeric("price"))
                .column(numeric("compare_price"))
                .column(counter("stock_quantity", 0))
                .column(numeric("weight"))
                .column(text("image"))
                .column(ColumnDef::new("attributes", ColumnType::Json).default_value(json!({})))
                .column(boolean("active", true))
                .timestamps()
                .references("product_id", "enhanced_products", OnDelete::Cascade)
                .index("product_id"),

            CatalogTable::ProductReviews => schema
                .column(uuid("product_id").required())
                .column(uuid("customer_id"))
                .column(text("customer_name"))
                .column(text("customer_email"))
                .column(integer("rating").required())
                .column(text("title"))
                .column(text("review_text"))
                .column(boolean("verified_purchase", false))
                .column(counter("helpful_count", 0))
                .column(text("status").required().default_value(json!("pending")))
                .timestamps()
                .references("product_id", "enhanced_products", OnDelete::Cascade)
                .references("customer_id", "customers", OnDelete::SetNull)
                .index("product_id"),

            CatalogTable::CartItems => schema
                .column(uuid("customer_id"))
                .column(text("session_id"))
                .column(uuid("product_id").required())
                .column(uuid("variant_id"))
                .column(integer("quantity").required())
                .column(numeric("price").required())
                .timestamps()
                .references("customer_id", "customers", OnDelete::Cascade)
                .references("product_id", "enhanced_products", OnDelete::Cascade)
                .references("variant_id", "product_variants", OnDelete::Cascade)
                .index("customer_id")
                .index("session_id"),

            CatalogTable::Orders => schema
                .column(text("order_number").required().unique())
                .column(uuid("customer_id"))
                .column(text("customer_name").required())
                .column(text("customer_email"))
                .column(text("customer_phone").required())
                .column(ColumnDef::new("billing_address", ColumnType::Json))
                .column(ColumnDef::new("shipping_address", ColumnType::Json))
                .column(numeric("subtotal").required())
                .column(numeric("tax_amount").required().default_value(json!(0)))
                .column(numeric("shipping_amount").required().default_value(json!(0)))
                .column(numeric("discount_amount").required().default_value(json!(0)))
                .column(numeric("total_amount").required())
                .column(text("currency").required().default_value(json!("USD")))
                .column(text("payment_status").required().default_value(json!("pending")))
                .column(text("payment_method"))
                .column(text("payment_reference"))
                .column(
                    text("fulfillment_status")
                        .required()
                        .default_value(json!("unfulfilled")),
                )
                .column(text("order_status").required().default_value(json!("pending")))
                .column(text("notes"))
                .column(ColumnDef::new("tags", ColumnType::TextArray))
                .timestamps()
                .references("customer_id", "customers", OnDelete::SetNull)
                .index("customer_id"),

            CatalogTable::OrderItems => schema
                .column(uuid("order_id").required())
                .column(uuid("product_id").required())
                .column(uuid("variant_id"))
                .column(text("product_name").required())
                .column(text("variant_name"))
                .column(text("sku"))
                .column(integer("quantity").required())
                .column(numeric("unit_price").required())
                .column(numeric("total_price").required())
                .column(created_at())
                .references("order_id", "enhanced_orders", OnDelete::Cascade)
                .references("product_id", "enhanced_products", OnDelete::Restrict)
                .references("variant_id", "product_variants", OnDelete::SetNull)
                .index("order_id"),

            CatalogTable::InventoryLogs => schema
                .column(uuid("product_id").required())
                .column(uuid("variant_id"))
                .column(text("change_type").required())
                .column(integer("quantity_change").required())
                .column(integer("previous_quantity").required())
                .column(integer("new_quantity").required())
                .column(text("reference_id"))
                .column(text("reference_type"))
                .column(text("notes"))
                .column(created_at())
                .references("product_id", "enhanced_products", OnDelete::Cascade)
                .references("variant_id", "product_variants", OnDelete::SetNull)
                .index("product_id"),
        }
    }
}

/// Schemas of every catalog table, parents first
pub fn catalog_schemas() -> Vec<TableSchema> {
    CatalogTable::ALL.iter().map(CatalogTable::schema).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_keys_point_at_earlier_tables() {
        let schemas = catalog_schemas();
        for (position, schema) in schemas.iter().enumerate() {
            for fk in &schema.foreign_keys {
                let parent = schemas
                    .iter()
                    .position(|s| s.name == fk.references)
                    .unwrap();
                assert!(parent <= position, "{} -> {}", schema.name, fk.references);
            }
        }
    }

    #[test]
    fn test_every_table_has_creation_time() {
        for table in CatalogTable::ALL {
            assert!(table.schema().has_column("created_at"), "{}", table);
        }
        assert!(!CatalogTable::OrderItems.schema().tracks_updates());
        assert!(CatalogTable::Products.schema().tracks_updates());
    }

    #[test]
    fn test_default_sort_columns_exist() {
        for table in CatalogTable::ALL {
            let schema = table.schema();
            for (column, _) in table.default_sort() {
                assert!(schema.has_column(column), "{}.{}", table, column);
            }
        }
    }
}
