//! Database migration functionality
//!
//! Creates the catalog tables, their indexes and triggers, and the SQL
//! functions behind the remote procedures. Every statement is idempotent, so
//! migrating an up-to-date database changes nothing.

use crate::catalog::catalog_schemas;
use crate::core::Storefront;
use crate::errors::StorefrontError;
use store_object::{StoreError, TableSchema};

const UPDATED_AT_FUNCTION: &str = r#"
CREATE OR REPLACE FUNCTION update_updated_at_column()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at = NOW();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql
"#;

/// Publishes `{table, kind, record_id, timestamp}` on the channel passed as
/// the trigger argument
const NOTIFY_FUNCTION: &str = r#"
CREATE OR REPLACE FUNCTION storefront_notify_change()
RETURNS TRIGGER AS $$
DECLARE
    changed_id TEXT;
BEGIN
    IF TG_OP = 'DELETE' THEN
        changed_id := OLD.id::text;
    ELSE
        changed_id := NEW.id::text;
    END IF;
    PERFORM pg_notify(
        TG_ARGV[0],
        json_build_object(
            'table', TG_TABLE_NAME,
            'kind', lower(TG_OP),
            'record_id', changed_id,
            'timestamp', NOW()
        )::text
    );
    RETURN NULL;
END;
$$ LANGUAGE plpgsql
"#;

const CREATE_ORDER_FUNCTION: &str = r#"
CREATE OR REPLACE FUNCTION create_order_with_items(order_data JSONB, items_data JSONB)
RETURNS enhanced_orders AS $$
DECLARE
    new_order enhanced_orders;
BEGIN
    IF items_data IS NULL
        OR jsonb_typeof(items_data) <> 'array'
        OR jsonb_array_length(items_data) = 0 THEN
        RAISE EXCEPTION 'order must contain at least one item';
    END IF;

    INSERT INTO enhanced_orders (
        order_number, customer_id, customer_name, customer_email, customer_phone,
        billing_address, shipping_address, subtotal, tax_amount, shipping_amount,
        discount_amount, total_amount, currency, payment_status, payment_method,
        payment_reference, fulfillment_status, order_status, notes, tags
    )
    SELECT
        COALESCE(p.order_number,
            'ORD-' || to_char(NOW(), 'YYYYMMDD') || '-'
                || lpad(floor(random() * 10000)::int::text, 4, '0')),
        p.customer_id, p.customer_name, p.customer_email, p.customer_phone,
        p.billing_address, p.shipping_address, p.subtotal,
        COALESCE(p.tax_amount, 0), COALESCE(p.shipping_amount, 0),
        COALESCE(p.discount_amount, 0), p.total_amount,
        COALESCE(p.currency, 'USD'), COALESCE(p.payment_status, 'pending'),
        p.payment_method, p.payment_reference,
        COALESCE(p.fulfillment_status, 'unfulfilled'), COALESCE(p.order_status, 'pending'),
        p.notes, p.tags
    FROM jsonb_populate_record(NULL::enhanced_orders, order_data) AS p
    RETURNING * INTO new_order;

    INSERT INTO order_items (
        order_id, product_id, variant_id, product_name, variant_name, sku,
        quantity, unit_price, total_price
    )
    SELECT
        new_order.id, i.product_id, i.variant_id, i.product_name, i.variant_name, i.sku,
        i.quantity, i.unit_price, COALESCE(i.total_price, i.quantity * i.unit_price)
    FROM jsonb_populate_recordset(NULL::order_items, items_data) AS i;

    RETURN new_order;
END;
$$ LANGUAGE plpgsql
"#;

const UPDATE_INVENTORY_FUNCTION: &str = r#"
CREATE OR REPLACE FUNCTION update_product_inventory(
    p_product_id UUID,
    p_quantity_change INTEGER,
    p_change_type TEXT,
    p_variant_id UUID DEFAULT NULL,
    p_reference_id TEXT DEFAULT NULL,
    p_reference_type TEXT DEFAULT NULL,
    p_notes TEXT DEFAULT NULL
)
RETURNS inventory_logs AS $$
DECLARE
    product enhanced_products;
    previous INTEGER;
    updated INTEGER;
    entry inventory_logs;
BEGIN
    IF p_change_type NOT IN ('sale', 'restock', 'return', 'adjustment', 'damage') THEN
        RAISE EXCEPTION 'unknown inventory change type %', p_change_type;
    END IF;

    SELECT * INTO product FROM enhanced_products WHERE id = p_product_id FOR UPDATE;
    IF NOT FOUND THEN
        RAISE EXCEPTION 'product % not found', p_product_id;
    END IF;

    IF p_variant_id IS NULL THEN
        previous := product.stock_quantity;
    ELSE
        SELECT stock_quantity INTO previous FROM product_variants
            WHERE id = p_variant_id AND product_id = p_product_id FOR UPDATE;
        IF NOT FOUND THEN
            RAISE EXCEPTION 'variant % not found', p_variant_id;
        END IF;
    END IF;

    updated := previous + p_quantity_change;
    IF updated < 0 AND product.track_inventory AND NOT product.allow_backorder THEN
        RAISE EXCEPTION 'insufficient stock: % available, % requested', previous, -p_quantity_change;
    END IF;

    IF p_variant_id IS NULL THEN
        UPDATE enhanced_products SET stock_quantity = updated WHERE id = p_product_id;
    ELSE
        UPDATE product_variants SET stock_quantity = updated WHERE id = p_variant_id;
    END IF;

    INSERT INTO inventory_logs (
        product_id, variant_id, change_type, quantity_change, previous_quantity,
        new_quantity, reference_id, reference_type, notes
    )
    VALUES (
        p_product_id, p_variant_id, p_change_type, p_quantity_change, previous,
        updated, p_reference_id, p_reference_type, p_notes
    )
    RETURNING * INTO entry;

    RETURN entry;
END;
$$ LANGUAGE plpgsql
"#;

fn trigger_statements(schema: &TableSchema, channel: &str) -> Vec<String> {
    let table = &schema.name;
    let mut statements = Vec::new();

    if schema.tracks_updates() {
        statements.push(format!(
            "DROP TRIGGER IF EXISTS update_{table}_updated_at ON {table}"
        ));
        statements.push(format!(
            "CREATE TRIGGER update_{table}_updated_at \
             BEFORE UPDATE ON {table} \
             FOR EACH ROW EXECUTE FUNCTION update_updated_at_column()"
        ));
    }

    statements.push(format!("DROP TRIGGER IF EXISTS notify_{table}_changes ON {table}"));
    statements.push(format!(
        "CREATE TRIGGER notify_{table}_changes \
         AFTER INSERT OR UPDATE OR DELETE ON {table} \
         FOR EACH ROW EXECUTE FUNCTION storefront_notify_change('{channel}')"
    ));
    statements
}

/// Every statement needed to bring a database up to the given schemas, in
/// execution order. `schemas` must list parents before their children.
pub fn migration_statements(schemas: &[TableSchema], channel: &str, recreate: bool) -> Vec<String> {
    let mut statements = Vec::new();

    if recreate {
        statements.extend(schemas.iter().rev().map(TableSchema::drop_table_sql));
    }
    statements.extend(schemas.iter().map(TableSchema::create_table_sql));
    statements.extend(schemas.iter().flat_map(TableSchema::create_indexes_sql));

    statements.push(UPDATED_AT_FUNCTION.trim().to_string());
    statements.push(NOTIFY_FUNCTION.trim().to_string());
    for schema in schemas {
        statements.extend(trigger_statements(schema, channel));
    }

    statements.push(CREATE_ORDER_FUNCTION.trim().to_string());
    statements.push(UPDATE_INVENTORY_FUNCTION.trim().to_string());
    statements
}

impl Storefront {
    /// Create every catalog table, trigger and procedure.
    /// If recreate is true, drops the existing tables first.
    pub async fn migrate(&self, recreate: bool) -> Result<(), StorefrontError> {
        self.check_open()?;
        let pool = self
            .pool()
            .ok_or_else(|| StorefrontError::NoDatabase("migrate".to_string()))?;

        let statements = migration_statements(&catalog_schemas(), &self.realtime().channel, recreate);
        tracing::info!(statements = statements.len(), recreate, "running migration");

        let mut tx = pool.begin().await?;
        for statement in &statements {
            crate::debug_log!(sql = %statement, "migration statement");
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::database_operation("", "migrate", e))?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogTable;

    #[test]
    fn test_statement_order() {
        let statements = migration_statements(&catalog_schemas(), "storefront_changes", true);
        let position = |needle: &str| {
            statements
                .iter()
                .position(|s| s.starts_with(needle))
                .unwrap()
        };

        assert!(statements[0].starts_with("DROP TABLE IF EXISTS inventory_logs"));
        assert!(
            position("CREATE TABLE IF NOT EXISTS enhanced_products")
                < position("CREATE TABLE IF NOT EXISTS order_items")
        );
        assert!(
            position("CREATE OR REPLACE FUNCTION storefront_notify_change")
                < position("CREATE TRIGGER notify_enhanced_products_changes")
        );
        assert!(statements.last().unwrap().contains("update_product_inventory"));
    }

    #[test]
    fn test_tables_without_updated_at_get_only_the_notify_trigger() {
        let triggers = trigger_statements(&CatalogTable::OrderItems.schema(), "feed");
        assert_eq!(triggers.len(), 2);
        assert!(triggers[1].ends_with("storefront_notify_change('feed')"));

        let triggers = trigger_statements(&CatalogTable::Brands.schema(), "feed");
        assert_eq!(triggers.len(), 4);
    }

    #[test]
    fn test_without_recreate_nothing_is_dropped() {
        let statements = migration_statements(&catalog_schemas(), "feed", false);
        assert!(!statements.iter().any(|s| s.starts_with("DROP TABLE")));
        assert_eq!(
            statements
                .iter()
                .filter(|s| s.starts_with("CREATE TABLE"))
                .count(),
            CatalogTable::ALL.len()
        );
    }
}
