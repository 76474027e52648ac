use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use flock_core::{AppError, AppResult, UserIdentity};
use flock_domain::{FieldValue, Permission};
use tokio::sync::Mutex;

use crate::{Row, Table, TableService};

#[derive(Default)]
pub(crate) struct FakeTableService {
    tables: Mutex<HashMap<Table, Vec<Row>>>,
    unavailable: Mutex<HashSet<Table>>,
    unavailable_rows: Mutex<HashSet<(Table, String)>>,
    writes: Mutex<Vec<Table>>,
}

impl FakeTableService {
    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) async fn seed(&self, table: Table, row: Row) {
        self.tables.lock().await.entry(table).or_default().push(row);
    }

    pub(crate) async fn rows(&self, table: Table) -> Vec<Row> {
        self.tables
            .lock()
            .await
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) async fn row(&self, table: Table, id: &str) -> Option<Row> {
        self.rows(table)
            .await
            .into_iter()
            .find(|row| row.id().as_deref() == Some(id))
    }

    pub(crate) async fn fail(&self, table: Table) {
        self.unavailable.lock().await.insert(table);
    }

    pub(crate) async fn fail_row(&self, table: Table, id: &str) {
        self.unavailable_rows
            .lock()
            .await
            .insert((table, id.to_owned()));
    }

    pub(crate) async fn write_count(&self, table: Table) -> usize {
        self.writes
            .lock()
            .await
            .iter()
            .filter(|written| **written == table)
            .count()
    }

    async fn check_available(&self, table: Table) -> AppResult<()> {
        if self.unavailable.lock().await.contains(&table) {
            return Err(AppError::Unavailable(format!("{table} timed out")));
        }

        Ok(())
    }

    async fn check_row_available(&self, table: Table, id: &str) -> AppResult<()> {
        self.check_available(table).await?;
        if self
            .unavailable_rows
            .lock()
            .await
            .contains(&(table, id.to_owned()))
        {
            return Err(AppError::Unavailable(format!("{table} row '{id}' timed out")));
        }

        Ok(())
    }
}

#[async_trait]
impl TableService for FakeTableService {
    async fn list(&self, table: Table) -> AppResult<Vec<Row>> {
        self.check_available(table).await?;
        Ok(self.rows(table).await)
    }

    async fn get(&self, table: Table, id: &str) -> AppResult<Row> {
        self.check_row_available(table, id).await?;
        self.row(table, id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("{table} row '{id}' does not exist")))
    }

    async fn append(&self, table: Table, mut row: Row) -> AppResult<String> {
        self.check_available(table).await?;
        let mut tables = self.tables.lock().await;
        let rows = tables.entry(table).or_default();
        let id = row
            .id()
            .unwrap_or_else(|| format!("{}-{}", table.as_str().to_lowercase(), rows.len() + 1));
        row.insert(Row::ID_COLUMN, FieldValue::Text(id.clone()));
        rows.push(row);
        self.writes.lock().await.push(table);
        Ok(id)
    }

    async fn update_by_id(&self, table: Table, id: &str, patch: Row) -> AppResult<Row> {
        self.check_row_available(table, id).await?;
        let mut tables = self.tables.lock().await;
        let row = tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|row| row.id().as_deref() == Some(id)))
            .ok_or_else(|| AppError::NotFound(format!("{table} row '{id}' does not exist")))?;
        row.merge(patch);
        let updated = row.clone();
        self.writes.lock().await.push(table);
        Ok(updated)
    }
}

pub(crate) fn permission(value: &str) -> Permission {
    match Permission::from_str(value) {
        Ok(permission) => permission,
        Err(error) => panic!("{error}"),
    }
}

pub(crate) fn actor(user_id: &str) -> UserIdentity {
    UserIdentity::new(user_id, None)
}

pub(crate) fn user_row(id: &str, role: &str) -> Row {
    Row::new()
        .with_text("id", id)
        .with_text("email", format!("{id}@church.example"))
        .with_text("role", role)
        .with_text("status", "active")
}

pub(crate) fn role_row(id: &str, name: &str, permissions: &str, is_system: bool) -> Row {
    Row::new()
        .with_text("id", id)
        .with_text("name", name)
        .with_text("permissions", permissions)
        .with("is_system_role", FieldValue::Bool(is_system))
        .with_text("status", "active")
}

pub(crate) fn assignment_row(id: &str, user_id: &str, role_id: &str) -> Row {
    Row::new()
        .with_text("id", id)
        .with_text("user_id", user_id)
        .with_text("role_id", role_id)
        .with_text("assigned_by", "u-admin")
        .with_text("assigned_at", "2024-03-01T10:00:00Z")
        .with_text("status", "active")
}

pub(crate) fn tag_row(id: &str, name: &str) -> Row {
    Row::new()
        .with_text("id", id)
        .with_text("name", name)
        .with_text("status", "active")
}

pub(crate) fn rule_row(
    id: &str,
    tag_id: &str,
    condition: (&str, &str, &str),
    priority: u32,
    status: &str,
) -> Row {
    let (field, operator, value) = condition;
    Row::new()
        .with_text("id", id)
        .with_text("tag_id", tag_id)
        .with_text("condition_field", field)
        .with_text("condition_operator", operator)
        .with_text("condition_value", value)
        .with("priority", FieldValue::Number(f64::from(priority)))
        .with_text("status", status)
}

pub(crate) fn member_row(id: &str, fields: &[(&str, &str)]) -> Row {
    fields
        .iter()
        .fold(Row::new().with_text("id", id), |row, (column, value)| {
            row.with_text(column, *value)
        })
}
