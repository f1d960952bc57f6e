//! Table schema definitions
//!
//! A `TableSchema` describes one table the way PostgreSQL would see it:
//! columns with server defaults, nullability, uniqueness and foreign keys.
//! It generates the DDL for PostgreSQL and drives the server emulation of
//! the in-memory store.

use serde_json::Value;
use type_mapping::ColumnType;

/// Value a column takes when an insert omits it
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnDefault {
    None,
    /// `gen_random_uuid()`
    GeneratedUuid,
    /// `NOW()`
    Now,
    Value(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Restrict,
    Cascade,
    SetNull,
}

impl OnDelete {
    pub fn to_sql(&self) -> &'static str {
        match self {
            OnDelete::Restrict => "RESTRICT",
            OnDelete::Cascade => "CASCADE",
            OnDelete::SetNull => "SET NULL",
        }
    }
}

/// `column` references `references(id)`
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub column: String,
    pub references: String,
    pub on_delete: OnDelete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    pub default: ColumnDefault,
}

impl ColumnDef {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            nullable: true,
            unique: false,
            default: ColumnDefault::None,
        }
    }

    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = ColumnDefault::Value(value);
        self
    }

    pub fn default_now(mut self) -> Self {
        self.default = ColumnDefault::Now;
        self
    }

    pub fn generated_uuid(mut self) -> Self {
        self.default = ColumnDefault::GeneratedUuid;
        self
    }

    fn to_sql(&self, primary_key: bool) -> String {
        let mut parts = vec![self.name.clone(), self.column_type.to_sql().to_string()];
        if primary_key {
            parts.push("PRIMARY KEY".to_string());
        } else {
            if !self.nullable {
                parts.push("NOT NULL".to_string());
            }
            if self.unique {
                parts.push("UNIQUE".to_string());
            }
        }
        match &self.default {
            ColumnDefault::None => {}
            ColumnDefault::GeneratedUuid => parts.push("DEFAULT gen_random_uuid()".to_string()),
            ColumnDefault::Now => parts.push("DEFAULT NOW()".to_string()),
            ColumnDefault::Value(value) => {
                parts.push(format!("DEFAULT {}", default_literal(self.column_type, value)))
            }
        }
        parts.join(" ")
    }
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn default_literal(column_type: ColumnType, value: &Value) -> String {
    match (column_type, value) {
        (_, Value::Null) => "NULL".to_string(),
        (_, Value::Bool(b)) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        (_, Value::Number(n)) => n.to_string(),
        (ColumnType::TextArray, Value::Array(items)) => {
            let elements: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => quote_literal(s),
                    other => quote_literal(&other.to_string()),
                })
                .collect();
            format!("ARRAY[{}]::TEXT[]", elements.join(", "))
        }
        (ColumnType::Json, other) => format!("{}::jsonb", quote_literal(&other.to_string())),
        (_, Value::String(s)) => quote_literal(s),
        (_, other) => quote_literal(&other.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub primary_key: String,
    pub columns: Vec<ColumnDef>,
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<String>,
}

impl TableSchema {
    /// A table with a generated UUID primary key named `id`
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            primary_key: "id".to_string(),
            columns: vec![ColumnDef::new("id", ColumnType::Uuid)
                .required()
                .generated_uuid()],
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// `created_at` and `updated_at`, both defaulting to `NOW()`
    pub fn timestamps(self) -> Self {
        self.column(
            ColumnDef::new("created_at", ColumnType::Timestamp)
                .required()
                .default_now(),
        )
        .column(
            ColumnDef::new("updated_at", ColumnType::Timestamp)
                .required()
                .default_now(),
        )
    }

    pub fn references(mut self, column: &str, table: &str, on_delete: OnDelete) -> Self {
        self.foreign_keys.push(ForeignKey {
            column: column.to_string(),
            references: table.to_string(),
            on_delete,
        });
        self
    }

    pub fn index(mut self, column: &str) -> Self {
        self.indexes.push(column.to_string());
        self
    }

    pub fn column_def(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_def(name).is_some()
    }

    /// Whether rows get `updated_at` refreshed on every update
    pub fn tracks_updates(&self) -> bool {
        self.has_column("updated_at")
    }

    pub fn create_table_sql(&self) -> String {
        let mut definitions: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.to_sql(c.name == self.primary_key))
            .collect();
        definitions.extend(self.foreign_keys.iter().map(|fk| {
            format!(
                "FOREIGN KEY ({}) REFERENCES {}(id) ON DELETE {}",
                fk.column,
                fk.references,
                fk.on_delete.to_sql()
            )
        }));

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.name,
            definitions.join(", ")
        )
    }

    pub fn drop_table_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE", self.name)
    }

    pub fn create_indexes_sql(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(|column| {
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_{}_{} ON {} ({})",
                    self.name, column, self.name, column
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn brands() -> TableSchema {
        TableSchema::new("enhanced_brands")
            .column(ColumnDef::new("name", ColumnType::Text).required())
            .column(ColumnDef::new("slug", ColumnType::Text).required().unique())
            .column(ColumnDef::new("active", ColumnType::Boolean).default_value(json!(true)))
            .timestamps()
            .index("slug")
    }

    #[test]
    fn test_create_table_sql() {
        assert_eq!(
            brands().create_table_sql(),
            "CREATE TABLE IF NOT EXISTS enhanced_brands (\
             id UUID PRIMARY KEY DEFAULT gen_random_uuid(), \
             name TEXT NOT NULL, \
             slug TEXT NOT NULL UNIQUE, \
             active BOOLEAN DEFAULT TRUE, \
             created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(), \
             updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW())"
        );
    }

    #[test]
    fn test_foreign_keys_and_indexes() {
        let schema = TableSchema::new("order_items")
            .column(ColumnDef::new("order_id", ColumnType::Uuid).required())
            .references("order_id", "enhanced_orders", OnDelete::Cascade)
            .index("order_id");

        assert!(schema
            .create_table_sql()
            .ends_with("FOREIGN KEY (order_id) REFERENCES enhanced_orders(id) ON DELETE CASCADE)"));
        assert_eq!(
            schema.create_indexes_sql(),
            vec!["CREATE INDEX IF NOT EXISTS idx_order_items_order_id ON order_items (order_id)"]
        );
    }

    #[test]
    fn test_default_literals() {
        assert_eq!(default_literal(ColumnType::Text, &json!("it's")), "'it''s'");
        assert_eq!(default_literal(ColumnType::TextArray, &json!([])), "ARRAY[]::TEXT[]");
        assert_eq!(default_literal(ColumnType::Json, &json!({})), "'{}'::jsonb");
        assert_eq!(default_literal(ColumnType::Integer, &json!(5)), "5");
    }
}
