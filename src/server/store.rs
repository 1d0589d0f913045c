use std::collections::{BTreeMap, HashMap};

use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

/// One stored record: column name -> value.
pub type Row = BTreeMap<String, JsonValue>;

/// In-memory table addressed by record id.
///
/// Writes are column-scoped: `update_columns` touches exactly the columns it
/// is given, which is what a presence-aware partial update needs.
#[derive(Debug, Default)]
pub struct ColumnStore {
    rows: RwLock<HashMap<String, Row>>,
}

impl ColumnStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, id: &str, row: Row) {
        self.rows.write().await.insert(id.to_string(), row);
    }

    pub async fn get(&self, id: &str) -> Option<Row> {
        self.rows.read().await.get(id).cloned()
    }

    /// Sets only `changes`; returns the updated row, or `None` for an unknown id.
    pub async fn update_columns(&self, id: &str, changes: Row) -> Option<Row> {
        let mut rows = self.rows.write().await;
        let row = rows.get_mut(id)?;
        row.extend(changes);
        Some(row.clone())
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}
