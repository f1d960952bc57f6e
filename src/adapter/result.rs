use serde::Serialize;
use store_object::{Row, Selection};

/// An adapter's current view of its query.
///
/// Starts empty with `loading` set. A settled fetch clears `loading` and
/// leaves either rows with no error or an error with no rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub rows: Vec<Row>,
    /// Rows matching the filters, ignoring the limit
    pub total: u64,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for ResultSet {
    fn default() -> Self {
        Self::pending()
    }
}

impl ResultSet {
    pub fn pending() -> Self {
        Self {
            rows: Vec::new(),
            total: 0,
            loading: true,
            error: None,
        }
    }

    pub fn settled(selection: Selection) -> Self {
        let total = selection.count.unwrap_or(selection.rows.len() as u64);
        Self {
            rows: selection.rows,
            total,
            loading: false,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            total: 0,
            loading: false,
            error: Some(message.into()),
        }
    }

    pub fn is_settled(&self) -> bool {
        !self.loading
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Identifiers of the rows, in order
    pub fn ids(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.get("id").and_then(|id| id.as_str()).map(str::to_string))
            .collect()
    }
}
