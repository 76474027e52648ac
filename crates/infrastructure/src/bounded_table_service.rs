use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flock_application::{Row, Table, TableService};
use flock_core::{AppError, AppResult};
use tracing::warn;


/// Decorator bounding every store call by a timeout.
///
/// Expiry surfaces as `AppError::Unavailable` so callers can retry.
#[derive(Clone)]
pub struct BoundedTableService {
    inner: Arc<dyn TableService>,
    timeout: Duration,
}

impl BoundedTableService {
    /// Wraps a table service.
    #[must_use]
    pub fn new(inner: Arc<dyn TableService>, timeout: Duration) -> Self {
        Self {
            inner,
            timeout: timeout.max(Duration::from_millis(1)),
        }
    }

    async fn bounded<T>(
        &self,
        table: Table,
        operation: &'static str,
        call: impl Future<Output = AppResult<T>> + Send,
    ) -> AppResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(%table, operation, timeout_ms, "table service call timed out");
                Err(AppError::Unavailable(format!(
                    "{table} {operation} timed out after {timeout_ms} ms"
                )))
            }
        }
    }
}

#[async_trait]
impl TableService for BoundedTableService {
    async fn list(&self, table: Table) -> AppResult<Vec<Row>> {
        self.bounded(table, "list", self.inner.list(table)).await
    }

    async fn get(&self, table: Table, id: &str) -> AppResult<Row> {
        self.bounded(table, "get", self.inner.get(table, id)).await
    }

    async fn append(&self, table: Table, row: Row) -> AppResult<String> {
        self.bounded(table, "append", self.inner.append(table, row))
            .await
    }

    async fn update_by_id(&self, table: Table, id: &str, patch: Row) -> AppResult<Row> {
        self.bounded(table, "update", self.inner.update_by_id(table, id, patch))
            .await
    }
}
