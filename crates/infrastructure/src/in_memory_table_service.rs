use std::collections::HashMap;

use async_trait::async_trait;
use flock_application::{Row, Table, TableService};
use flock_core::{AppError, AppResult};
use flock_domain::FieldValue;
use tokio::sync::RwLock;
use uuid::Uuid;


/// In-memory table service keeping rows in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryTableService {
    tables: RwLock<HashMap<Table, Vec<Row>>>,
}

impl InMemoryTableService {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a store pre-populated with rows.
    #[must_use]
    pub fn with_rows(rows: impl IntoIterator<Item = (Table, Row)>) -> Self {
        let mut tables: HashMap<Table, Vec<Row>> = HashMap::new();
        for (table, row) in rows {
            tables.entry(table).or_default().push(row);
        }

        Self {
            tables: RwLock::new(tables),
        }
    }
}

#[async_trait]
impl TableService for InMemoryTableService {
    async fn list(&self, table: Table) -> AppResult<Vec<Row>> {
        Ok(self
            .tables
            .read()
            .await
            .get(&table)
            .cloned()
            .unwrap_or_default())
    }

    async fn get(&self, table: Table, id: &str) -> AppResult<Row> {
        self.tables
            .read()
            .await
            .get(&table)
            .and_then(|rows| rows.iter().find(|row| row.id().as_deref() == Some(id)))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("{table} row '{id}' does not exist")))
    }

    async fn append(&self, table: Table, mut row: Row) -> AppResult<String> {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table).or_default();

        let id = row.id().unwrap_or_else(|| Uuid::new_v4().to_string());
        if rows.iter().any(|existing| existing.id().as_deref() == Some(id.as_str())) {
            return Err(AppError::Conflict(format!(
                "{table} row '{id}' already exists"
            )));
        }

        row.insert(Row::ID_COLUMN, FieldValue::Text(id.clone()));
        rows.push(row);
        Ok(id)
    }

    async fn update_by_id(&self, table: Table, id: &str, mut patch: Row) -> AppResult<Row> {
        let mut tables = self.tables.write().await;
        let row = tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|row| row.id().as_deref() == Some(id)))
            .ok_or_else(|| AppError::NotFound(format!("{table} row '{id}' does not exist")))?;

        patch.insert(Row::ID_COLUMN, FieldValue::Text(id.to_owned()));
        row.merge(patch);
        Ok(row.clone())
    }
}
