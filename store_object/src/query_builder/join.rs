use crate::query_builder::filter::QueryFilter;

/// How an embedded relation is attached to each base row
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedKind {
    /// Many-to-one: `local_column` on the base row references the related
    /// table's `id`. The related row is embedded as an object, or null.
    ToOne {
        local_column: String,
        /// Drop base rows without a related row (INNER JOIN)
        inner: bool,
    },
    /// One-to-many: `foreign_column` on the related table references the base
    /// row's `id`. Related rows are embedded as an array.
    ToMany {
        foreign_column: String,
        filters: Vec<QueryFilter>,
    },
}

/// A related table embedded into every returned row under its table name
#[derive(Debug, Clone, PartialEq)]
pub struct Embed {
    pub table: String,
    /// Columns to embed; empty embeds the whole related row
    pub columns: Vec<String>,
    pub kind: EmbedKind,
}

impl Embed {
    pub fn to_one(table: impl Into<String>, local_column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            kind: EmbedKind::ToOne {
                local_column: local_column.into(),
                inner: false,
            },
        }
    }

    pub fn to_many(table: impl Into<String>, foreign_column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            kind: EmbedKind::ToMany {
                foreign_column: foreign_column.into(),
                filters: Vec::new(),
            },
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Require a related row (to-one embeds only)
    pub fn inner(mut self) -> Self {
        if let EmbedKind::ToOne { inner, .. } = &mut self.kind {
            *inner = true;
        }
        self
    }

    /// Restrict embedded rows (to-many embeds only)
    pub fn filter(mut self, filter: QueryFilter) -> Self {
        if let EmbedKind::ToMany { filters, .. } = &mut self.kind {
            filters.push(filter);
        }
        self
    }

    /// Key the embedded value is stored under in each row
    pub fn key(&self) -> &str {
        &self.table
    }

    pub fn is_inner(&self) -> bool {
        matches!(self.kind, EmbedKind::ToOne { inner: true, .. })
    }
}
