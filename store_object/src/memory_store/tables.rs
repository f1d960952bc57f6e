//! Table storage with server-side behaviour.
//!
//! `MemoryTables` applies what PostgreSQL would apply on its own: column
//! defaults, input conversion, NOT NULL, UNIQUE and foreign keys with their
//! ON DELETE actions, and the `updated_at` trigger. Every committed change
//! queues a `ChangeEvent` for the owner to publish.

use crate::errors::StoreError;
use crate::memory_store::eval::{matches_all, sort_rows, values_equal};
use crate::query_builder::{CountMode, Embed, EmbedKind, QueryBuilder};
use crate::schema::{ColumnDef, ColumnDefault, OnDelete, TableSchema};
use crate::traits::{Row, Selection};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::Value;
use signal_system::{ChangeEvent, ChangeKind};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct MemoryTables {
    schemas: HashMap<String, TableSchema>,
    rows: HashMap<String, Vec<Row>>,
    events: Vec<ChangeEvent>,
    last_timestamp: Option<DateTime<Utc>>,
}

/// Text form of a key column, as `column::text` renders it
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn unknown_column(table: &str, column: &str) -> StoreError {
    StoreError::database(
        table,
        "write",
        format!("column \"{}\" of relation \"{}\" does not exist", column, table),
    )
}

impl MemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: TableSchema) {
        self.rows.entry(schema.name.clone()).or_default();
        self.schemas.insert(schema.name.clone(), schema);
    }

    pub fn schema(&self, table: &str) -> Result<&TableSchema, StoreError> {
        self.schemas
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }

    pub fn rows(&self, table: &str) -> Result<&[Row], StoreError> {
        self.schema(table)?;
        Ok(self.rows.get(table).map(Vec::as_slice).unwrap_or(&[]))
    }

    /// Row whose primary key renders as `id`
    pub fn get(&self, table: &str, id: &str) -> Result<Option<Row>, StoreError> {
        let schema = self.schema(table)?;
        Ok(self
            .position(schema, id)
            .and_then(|index| self.rows.get(table).map(|rows| rows[index].clone())))
    }

    fn position(&self, schema: &TableSchema, id: &str) -> Option<usize> {
        self.rows.get(&schema.name)?.iter().position(|row| {
            row.get(&schema.primary_key)
                .and_then(value_text)
                .is_some_and(|key| key == id)
        })
    }

    /// Strictly increasing commit timestamps, so creation order is total
    fn next_timestamp(&mut self) -> Value {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        Value::String(now.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    /// Drain the change events queued since the last call
    pub fn take_events(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Run `f`, restoring every table if it fails
    pub fn atomically<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let rows = self.rows.clone();
        let queued = self.events.len();
        match f(self) {
            Ok(value) => Ok(value),
            Err(error) => {
                self.rows = rows;
                self.events.truncate(queued);
                Err(error)
            }
        }
    }

    // ========================================
    // Reads
    // ========================================

    pub fn select(&self, query: &QueryBuilder) -> Result<Selection, StoreError> {
        query.validate()?;
        let table = query.table();
        let schema = self.schema(table)?;

        for field in query
            .conditions()
            .iter()
            .flat_map(|f| f.fields())
            .chain(query.ordering().iter().map(|(field, _)| field.as_str()))
        {
            let column = match field.split_once('.') {
                Some(("t", column)) => column,
                Some(_) => {
                    return Err(StoreError::database(
                        table,
                        "select",
                        format!("unsupported qualified reference {}", field),
                    ))
                }
                None => field,
            };
            if !schema.has_column(column) {
                return Err(StoreError::database(
                    table,
                    "select",
                    format!("column t.{} does not exist", column),
                ));
            }
        }

        let mut matched: Vec<Row> = self
            .rows(table)?
            .iter()
            .filter(|row| matches_all(query.conditions(), row))
            .cloned()
            .collect();

        for embed in query.embeds().iter().filter(|e| e.is_inner()) {
            let mut kept = Vec::with_capacity(matched.len());
            for row in matched {
                if !self.resolve_embed(schema, &row, embed)?.is_null() {
                    kept.push(row);
                }
            }
            matched = kept;
        }

        let count = match query.count_mode() {
            CountMode::Exact => Some(matched.len() as u64),
            CountMode::None => None,
        };

        sort_rows(&mut matched, query.ordering());

        let offset = query.offset_value().unwrap_or(0) as usize;
        let limit = query
            .limit_value()
            .map(|l| l as usize)
            .unwrap_or(usize::MAX);

        let mut rows = Vec::new();
        for mut row in matched.into_iter().skip(offset).take(limit) {
            for embed in query.embeds() {
                let value = self.resolve_embed(schema, &row, embed)?;
                row.insert(embed.key().to_string(), value);
            }
            rows.push(row);
        }

        Ok(Selection { rows, count })
    }

    fn project(schema: &TableSchema, row: &Row, columns: &[String]) -> Result<Value, StoreError> {
        if columns.is_empty() {
            return Ok(Value::Object(row.clone()));
        }
        let mut projected = Row::new();
        for column in columns {
            if !schema.has_column(column) {
                return Err(StoreError::database(
                    &schema.name,
                    "select",
                    format!("column {}.{} does not exist", schema.name, column),
                ));
            }
            projected.insert(
                column.clone(),
                row.get(column).cloned().unwrap_or(Value::Null),
            );
        }
        Ok(Value::Object(projected))
    }

    fn resolve_embed(
        &self,
        base: &TableSchema,
        row: &Row,
        embed: &Embed,
    ) -> Result<Value, StoreError> {
        let related_schema = self.schema(&embed.table)?;
        let related_rows = self.rows(&embed.table)?;

        match &embed.kind {
            EmbedKind::ToOne { local_column, .. } => {
                if !base.has_column(local_column) {
                    return Err(StoreError::database(
                        &base.name,
                        "select",
                        format!("column t.{} does not exist", local_column),
                    ));
                }
                let Some(key) = row.get(local_column).filter(|v| !v.is_null()) else {
                    return Ok(Value::Null);
                };
                match related_rows.iter().find(|candidate| {
                    candidate
                        .get(&related_schema.primary_key)
                        .is_some_and(|id| values_equal(id, key))
                }) {
                    Some(related) => Self::project(related_schema, related, &embed.columns),
                    None => Ok(Value::Null),
                }
            }
            EmbedKind::ToMany {
                foreign_column,
                filters,
            } => {
                if !related_schema.has_column(foreign_column) {
                    return Err(StoreError::database(
                        &embed.table,
                        "select",
                        format!("column {} does not exist", foreign_column),
                    ));
                }
                let Some(key) = row.get(&base.primary_key) else {
                    return Ok(Value::Array(Vec::new()));
                };
                let items = related_rows
                    .iter()
                    .filter(|candidate| {
                        candidate
                            .get(foreign_column)
                            .is_some_and(|v| values_equal(v, key))
                    })
                    .filter(|candidate| matches_all(filters, candidate))
                    .map(|candidate| Self::project(related_schema, candidate, &embed.columns))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(items))
            }
        }
    }

    // ========================================
    // Writes
    // ========================================

    fn normalize(table: &str, column: &ColumnDef, value: Value) -> Result<Value, StoreError> {
        column
            .column_type
            .normalize(value)
            .map_err(|message| StoreError::database(table, "write", message))
    }

    fn default_value(table: &str, column: &ColumnDef, now: &Value) -> Result<Value, StoreError> {
        match &column.default {
            ColumnDefault::None => Ok(Value::Null),
            ColumnDefault::GeneratedUuid => Ok(Value::String(uuid::Uuid::new_v4().to_string())),
            ColumnDefault::Now => Ok(now.clone()),
            ColumnDefault::Value(value) => Self::normalize(table, column, value.clone()),
        }
    }

    /// NOT NULL, UNIQUE and foreign key checks for `row`, ignoring the row at `skip`
    fn check_row(&self, schema: &TableSchema, row: &Row, skip: Option<usize>) -> Result<(), StoreError> {
        let table = &schema.name;
        let existing = self.rows.get(table).map(Vec::as_slice).unwrap_or(&[]);

        for column in &schema.columns {
            let value = row.get(&column.name).unwrap_or(&Value::Null);
            let is_key = column.name == schema.primary_key;

            if value.is_null() {
                if !column.nullable || is_key {
                    return Err(StoreError::constraint(
                        table,
                        format!(
                            "null value in column \"{}\" of relation \"{}\" violates not-null constraint",
                            column.name, table
                        ),
                    ));
                }
                continue;
            }

            if column.unique || is_key {
                let duplicate = existing.iter().enumerate().any(|(index, other)| {
                    Some(index) != skip
                        && other.get(&column.name).is_some_and(|v| values_equal(v, value))
                });
                if duplicate {
                    let constraint = if is_key {
                        format!("{}_pkey", table)
                    } else {
                        format!("{}_{}_key", table, column.name)
                    };
                    return Err(StoreError::constraint(
                        table,
                        format!("duplicate key value violates unique constraint \"{}\"", constraint),
                    ));
                }
            }
        }

        for fk in &schema.foreign_keys {
            let Some(value) = row.get(&fk.column).filter(|v| !v.is_null()) else {
                continue;
            };
            let referenced = self.schemas.get(&fk.references);
            let exists = referenced.is_some_and(|parent| {
                // A self-reference may point at the row being written
                (fk.references == *table
                    && row.get(&parent.primary_key).is_some_and(|id| values_equal(id, value)))
                    || self.rows.get(&fk.references).is_some_and(|rows| {
                        rows.iter().any(|r| {
                            r.get(&parent.primary_key)
                                .is_some_and(|id| values_equal(id, value))
                        })
                    })
            });
            if !exists {
                return Err(StoreError::constraint(
                    table,
                    format!(
                        "insert or update on table \"{}\" violates foreign key constraint \"{}_{}_fkey\"",
                        table, table, fk.column
                    ),
                ));
            }
        }

        Ok(())
    }

    fn queue_event(&mut self, kind: ChangeKind, schema: &TableSchema, row: &Row) {
        let mut event = ChangeEvent::new(kind, schema.name.clone()).with_record(Value::Object(row.clone()));
        if let Some(id) = row.get(&schema.primary_key).and_then(value_text) {
            event = event.with_record_id(id);
        }
        self.events.push(event);
    }

    pub fn insert(&mut self, table: &str, row: Row) -> Result<Row, StoreError> {
        let schema = self.schema(table)?.clone();

        let mut stored = Row::new();
        for (column, value) in row {
            let def = schema
                .column_def(&column)
                .ok_or_else(|| unknown_column(table, &column))?;
            stored.insert(column, Self::normalize(table, def, value)?);
        }

        let now = self.next_timestamp();
        for column in &schema.columns {
            if !stored.contains_key(&column.name) {
                let value = Self::default_value(table, column, &now)?;
                stored.insert(column.name.clone(), value);
            }
        }

        self.check_row(&schema, &stored, None)?;

        self.rows
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());
        self.queue_event(ChangeKind::Insert, &schema, &stored);
        Ok(stored)
    }

    pub fn update(&mut self, table: &str, id: &str, patch: Row) -> Result<Row, StoreError> {
        let schema = self.schema(table)?.clone();
        let index = self
            .position(&schema, id)
            .ok_or_else(|| StoreError::NotFound(format!("{} row with id {}", table, id)))?;
        let current = self.rows[table][index].clone();

        let mut updated = current.clone();
        for (column, value) in patch {
            let def = schema
                .column_def(&column)
                .ok_or_else(|| unknown_column(table, &column))?;
            updated.insert(column, Self::normalize(table, def, value)?);
        }
        if schema.tracks_updates() {
            let now = self.next_timestamp();
            updated.insert("updated_at".to_string(), now);
        }

        self.check_row(&schema, &updated, Some(index))?;

        let old_key = current.get(&schema.primary_key).cloned().unwrap_or(Value::Null);
        let new_key = updated.get(&schema.primary_key).cloned().unwrap_or(Value::Null);
        if !values_equal(&old_key, &new_key) {
            if let Some((child, column)) = self.dependents(table, &old_key).into_iter().next() {
                return Err(Self::still_referenced(table, &child, &column));
            }
        }

        if let Some(rows) = self.rows.get_mut(table) {
            rows[index] = updated.clone();
        }
        self.queue_event(ChangeKind::Update, &schema, &updated);
        Ok(updated)
    }

    /// Delete the row with `id` and apply ON DELETE actions. A missing row is
    /// not an error. Not atomic on its own; wrap in `atomically`.
    pub fn delete(&mut self, table: &str, id: &str) -> Result<(), StoreError> {
        let schema = self.schema(table)?.clone();
        let Some(index) = self.position(&schema, id) else {
            return Ok(());
        };
        let removed = match self.rows.get_mut(table) {
            Some(rows) => rows.remove(index),
            None => return Ok(()),
        };
        let key = removed.get(&schema.primary_key).cloned().unwrap_or(Value::Null);

        let references: Vec<(String, String, OnDelete)> = self
            .schemas
            .values()
            .flat_map(|child| {
                child
                    .foreign_keys
                    .iter()
                    .filter(|fk| fk.references == table)
                    .map(|fk| (child.name.clone(), fk.column.clone(), fk.on_delete))
            })
            .collect();

        for (child, column, on_delete) in references {
            let child_schema = self.schema(&child)?.clone();
            let dependents: Vec<String> = self
                .rows
                .get(&child)
                .map(|rows| {
                    rows.iter()
                        .filter(|r| r.get(&column).is_some_and(|v| values_equal(v, &key)))
                        .filter_map(|r| r.get(&child_schema.primary_key).and_then(value_text))
                        .collect()
                })
                .unwrap_or_default();
            if dependents.is_empty() {
                continue;
            }

            match on_delete {
                OnDelete::Restrict => return Err(Self::still_referenced(table, &child, &column)),
                OnDelete::Cascade => {
                    for dependent in dependents {
                        self.delete(&child, &dependent)?;
                    }
                }
                OnDelete::SetNull => {
                    for dependent in dependents {
                        let Some(position) = self.position(&child_schema, &dependent) else {
                            continue;
                        };
                        let now = self.next_timestamp();
                        let mut row = self.rows[&child][position].clone();
                        row.insert(column.clone(), Value::Null);
                        if child_schema.tracks_updates() {
                            row.insert("updated_at".to_string(), now);
                        }
                        if let Some(rows) = self.rows.get_mut(&child) {
                            rows[position] = row.clone();
                        }
                        self.queue_event(ChangeKind::Update, &child_schema, &row);
                    }
                }
            }
        }

        self.queue_event(ChangeKind::Delete, &schema, &removed);
        Ok(())
    }

    /// (table, column) pairs holding a reference to `key` in `table`
    fn dependents(&self, table: &str, key: &Value) -> Vec<(String, String)> {
        let mut found = Vec::new();
        for child in self.schemas.values() {
            for fk in child.foreign_keys.iter().filter(|fk| fk.references == table) {
                let referenced = self.rows.get(&child.name).is_some_and(|rows| {
                    rows.iter()
                        .any(|r| r.get(&fk.column).is_some_and(|v| values_equal(v, key)))
                });
                if referenced {
                    found.push((child.name.clone(), fk.column.clone()));
                }
            }
        }
        found
    }

    fn still_referenced(table: &str, child: &str, column: &str) -> StoreError {
        StoreError::constraint(
            table,
            format!(
                "update or delete on table \"{}\" violates foreign key constraint \"{}_{}_fkey\" on table \"{}\"",
                table, child, column, child
            ),
        )
    }
}
