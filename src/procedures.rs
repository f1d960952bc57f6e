//! Remote procedures
//!
//! Two composite writes run inside the database: creating an order together
//! with its line items, and adjusting stock with an audit log entry. Both are
//! atomic. PostgreSQL gets them as SQL functions (see `migration`); a
//! `MemoryRemoteStore` gets equivalent bodies from `install_memory_procedures`.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;
use store_object::{MemoryRemoteStore, MemoryTables, ProcedureArgs, RemoteStore, Row, StoreError};
use type_mapping::PostgresValue;

pub const CREATE_ORDER_WITH_ITEMS: &str = "create_order_with_items";
pub const UPDATE_PRODUCT_INVENTORY: &str = "update_product_inventory";

const ORDERS: &str = "enhanced_orders";
const ORDER_ITEMS: &str = "order_items";
const PRODUCTS: &str = "enhanced_products";
const VARIANTS: &str = "product_variants";
const INVENTORY_LOGS: &str = "inventory_logs";

/// `ORD-YYYYMMDD-NNNN`
pub fn generate_order_number() -> String {
    let suffix: u32 = rand::rng().random_range(0..10_000);
    format!("ORD-{}-{:04}", Utc::now().format("%Y%m%d"), suffix)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub quantity: i32,
    pub unit_price: f64,
}

impl OrderItemInput {
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        quantity: i32,
        unit_price: f64,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            variant_id: None,
            product_name: product_name.into(),
            variant_name: None,
            sku: None,
            quantity,
            unit_price,
        }
    }

    pub fn variant(mut self, variant_id: impl Into<String>, variant_name: impl Into<String>) -> Self {
        self.variant_id = Some(variant_id.into());
        self.variant_name = Some(variant_name.into());
        self
    }

    pub fn sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryChangeType {
    Sale,
    Restock,
    Return,
    Adjustment,
    Damage,
}

impl InventoryChangeType {
    pub const ALL: [InventoryChangeType; 5] = [
        InventoryChangeType::Sale,
        InventoryChangeType::Restock,
        InventoryChangeType::Return,
        InventoryChangeType::Adjustment,
        InventoryChangeType::Damage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryChangeType::Sale => "sale",
            InventoryChangeType::Restock => "restock",
            InventoryChangeType::Return => "return",
            InventoryChangeType::Adjustment => "adjustment",
            InventoryChangeType::Damage => "damage",
        }
    }
}

impl fmt::Display for InventoryChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InventoryChangeType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| StoreError::Validation(format!("unknown inventory change type {}", s)))
    }
}

/// Stock change for a product, or one of its variants, with audit details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryAdjustment {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub quantity_change: i32,
    pub change_type: InventoryChangeType,
    pub reference_id: Option<String>,
    pub reference_type: Option<String>,
    pub notes: Option<String>,
}

impl InventoryAdjustment {
    pub fn new(
        product_id: impl Into<String>,
        quantity_change: i32,
        change_type: InventoryChangeType,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            variant_id: None,
            quantity_change,
            change_type,
            reference_id: None,
            reference_type: None,
            notes: None,
        }
    }

    pub fn variant(mut self, variant_id: impl Into<String>) -> Self {
        self.variant_id = Some(variant_id.into());
        self
    }

    pub fn reference(mut self, reference_id: impl Into<String>, reference_type: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self.reference_type = Some(reference_type.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Named arguments for `update_product_inventory`
    pub fn args(&self) -> Result<ProcedureArgs, StoreError> {
        let uuid_arg = |name: &str, value: &str| {
            uuid::Uuid::parse_str(value)
                .map(PostgresValue::Uuid)
                .map_err(|_| StoreError::Validation(format!("{} is not a valid id: {}", name, value)))
        };

        let variant = match &self.variant_id {
            Some(id) => uuid_arg("variant_id", id)?,
            None => PostgresValue::Null,
        };
        Ok(vec![
            ("p_product_id".to_string(), uuid_arg("product_id", &self.product_id)?),
            ("p_variant_id".to_string(), variant),
            ("p_quantity_change".to_string(), PostgresValue::Integer(self.quantity_change)),
            ("p_change_type".to_string(), self.change_type.as_str().into()),
            ("p_reference_id".to_string(), self.reference_id.clone().into()),
            ("p_reference_type".to_string(), self.reference_type.clone().into()),
            ("p_notes".to_string(), self.notes.clone().into()),
        ])
    }
}

fn into_row(procedure: &str, value: Value) -> Result<Row, StoreError> {
    match value {
        Value::Object(row) => Ok(row),
        other => Err(StoreError::procedure(
            procedure,
            format!("expected a row, got {}", other),
        )),
    }
}

/// Insert an order and its items in one transaction. Returns the stored order.
pub async fn create_order(
    store: &dyn RemoteStore,
    order: Row,
    items: &[OrderItemInput],
) -> Result<Row, StoreError> {
    let items = serde_json::to_value(items)?;
    let args = vec![
        ("order_data".to_string(), PostgresValue::Json(Value::Object(order))),
        ("items_data".to_string(), PostgresValue::Json(items)),
    ];
    let stored = store.call(CREATE_ORDER_WITH_ITEMS, &args).await?;
    into_row(CREATE_ORDER_WITH_ITEMS, stored)
}

/// Apply a stock change. Returns the inventory log entry.
pub async fn adjust_inventory(
    store: &dyn RemoteStore,
    adjustment: &InventoryAdjustment,
) -> Result<Row, StoreError> {
    let logged = store.call(UPDATE_PRODUCT_INVENTORY, &adjustment.args()?).await?;
    into_row(UPDATE_PRODUCT_INVENTORY, logged)
}

// ========================================
// In-memory bodies
// ========================================

/// Register both procedures on an in-memory store
pub fn install_memory_procedures(store: &MemoryRemoteStore) {
    store.register_procedure(CREATE_ORDER_WITH_ITEMS, create_order_with_items);
    store.register_procedure(UPDATE_PRODUCT_INVENTORY, update_product_inventory);
}

fn string_arg<'a>(procedure: &str, args: &'a Row, name: &str) -> Result<&'a str, StoreError> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::procedure(procedure, format!("missing argument {}", name)))
}

fn int_field(row: &Row, name: &str) -> i64 {
    row.get(name).and_then(Value::as_i64).unwrap_or(0)
}

fn bool_field(row: &Row, name: &str) -> bool {
    row.get(name).and_then(Value::as_bool).unwrap_or(false)
}

fn create_order_with_items(tables: &mut MemoryTables, args: &Row) -> Result<Value, StoreError> {
    let procedure = CREATE_ORDER_WITH_ITEMS;
    let mut order = match args.get("order_data") {
        Some(Value::Object(order)) => order.clone(),
        _ => return Err(StoreError::procedure(procedure, "order_data must be an object")),
    };
    let items = match args.get("items_data") {
        Some(Value::Array(items)) if !items.is_empty() => items.clone(),
        _ => {
            return Err(StoreError::procedure(
                procedure,
                "order must contain at least one item",
            ));
        }
    };

    if order.get("order_number").is_none_or(Value::is_null) {
        order.insert("order_number".to_string(), json!(generate_order_number()));
    }
    let stored = tables.insert(ORDERS, order)?;
    let order_id = stored.get("id").cloned().unwrap_or(Value::Null);

    for item in items {
        let Value::Object(mut item) = item else {
            return Err(StoreError::procedure(procedure, "order items must be objects"));
        };
        if item.get("total_price").is_none_or(Value::is_null) {
            let quantity = item.get("quantity").and_then(Value::as_f64).unwrap_or(0.0);
            let unit_price = item.get("unit_price").and_then(Value::as_f64).unwrap_or(0.0);
            item.insert("total_price".to_string(), json!(quantity * unit_price));
        }
        item.insert("order_id".to_string(), order_id.clone());
        tables.insert(ORDER_ITEMS, item)?;
    }

    tracing::debug!(order_number = ?stored.get("order_number"), "order created");
    Ok(Value::Object(stored))
}

fn update_product_inventory(tables: &mut MemoryTables, args: &Row) -> Result<Value, StoreError> {
    let procedure = UPDATE_PRODUCT_INVENTORY;
    let product_id = string_arg(procedure, args, "p_product_id")?;
    let change_type = string_arg(procedure, args, "p_change_type")?;
    let change = args
        .get("p_quantity_change")
        .and_then(Value::as_i64)
        .ok_or_else(|| StoreError::procedure(procedure, "missing argument p_quantity_change"))?;
    if change_type.parse::<InventoryChangeType>().is_err() {
        return Err(StoreError::procedure(
            procedure,
            format!("unknown inventory change type {}", change_type),
        ));
    }
    let variant_id = args.get("p_variant_id").and_then(Value::as_str);

    let product = tables
        .get(PRODUCTS, product_id)?
        .ok_or_else(|| StoreError::procedure(procedure, format!("product {} not found", product_id)))?;

    let (table, id, previous) = match variant_id {
        Some(variant_id) => {
            let variant = tables
                .get(VARIANTS, variant_id)?
                .filter(|v| v.get("product_id").and_then(Value::as_str) == Some(product_id))
                .ok_or_else(|| {
                    StoreError::procedure(procedure, format!("variant {} not found", variant_id))
                })?;
            (VARIANTS, variant_id, int_field(&variant, "stock_quantity"))
        }
        None => (PRODUCTS, product_id, int_field(&product, "stock_quantity")),
    };

    let updated = previous + change;
    if updated < 0 && bool_field(&product, "track_inventory") && !bool_field(&product, "allow_backorder") {
        return Err(StoreError::procedure(
            procedure,
            format!("insufficient stock: {} available, {} requested", previous, -change),
        ));
    }

    let mut patch = Row::new();
    patch.insert("stock_quantity".to_string(), json!(updated));
    tables.update(table, id, patch)?;

    let mut log = Row::new();
    log.insert("product_id".to_string(), json!(product_id));
    log.insert("variant_id".to_string(), json!(variant_id));
    log.insert("change_type".to_string(), json!(change_type));
    log.insert("quantity_change".to_string(), json!(change));
    log.insert("previous_quantity".to_string(), json!(previous));
    log.insert("new_quantity".to_string(), json!(updated));
    for (arg, column) in [
        ("p_reference_id", "reference_id"),
        ("p_reference_type", "reference_type"),
        ("p_notes", "notes"),
    ] {
        log.insert(column.to_string(), args.get(arg).cloned().unwrap_or(Value::Null));
    }
    let logged = tables.insert(INVENTORY_LOGS, log)?;
    Ok(Value::Object(logged))
}
