use async_trait::async_trait;
use flock_application::{Row, Table, TableService};
use flock_core::{AppError, AppResult};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;
use url::Url;

mod json;


use json::{row_from_json, row_to_json, rows_from_json};

/// Connection settings for the REST spreadsheet gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTableServiceConfig {
    /// Gateway root, e.g. `https://sheets.example/api/`.
    pub base_url: Url,
    /// Optional bearer token.
    pub token: Option<String>,
}

/// Table service backed by a REST gateway in front of the spreadsheet.
///
/// Routes are `GET|POST {base}/{table}` and `GET|PATCH {base}/{table}/{id}`.
/// Timeouts are applied by wrapping this service in `BoundedTableService`.
#[derive(Debug, Clone)]
pub struct HttpTableService {
    http_client: reqwest::Client,
    config: HttpTableServiceConfig,
}

impl HttpTableService {
    /// Creates a gateway client.
    #[must_use]
    pub fn new(http_client: reqwest::Client, config: HttpTableServiceConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    fn endpoint(&self, table: Table, id: Option<&str>) -> AppResult<Url> {
        let mut url = self.config.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                AppError::Internal(format!(
                    "table service url '{}' cannot carry a path",
                    self.config.base_url
                ))
            })?;
            segments.pop_if_empty().push(table.as_str());
            if let Some(id) = id {
                segments.push(id);
            }
        }

        Ok(url)
    }

    async fn send(
        &self,
        table: Table,
        request: reqwest::RequestBuilder,
        subject: &str,
    ) -> AppResult<Value> {
        let request = match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|error| {
            AppError::Unavailable(format!("{table} request for {subject} failed: {error}"))
        })?;

        let status = response.status();
        debug!(%table, subject, status = status.as_u16(), "table service responded");
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            return Err(status_error(status, table, subject, body.trim()));
        }

        response.json::<Value>().await.map_err(|error| {
            AppError::Internal(format!("{table} response for {subject} is not JSON: {error}"))
        })
    }
}

#[async_trait]
impl TableService for HttpTableService {
    async fn list(&self, table: Table) -> AppResult<Vec<Row>> {
        let url = self.endpoint(table, None)?;
        let body = self
            .send(table, self.http_client.get(url), "all rows")
            .await?;
        rows_from_json(table, body)
    }

    async fn get(&self, table: Table, id: &str) -> AppResult<Row> {
        let url = self.endpoint(table, Some(id))?;
        let subject = format!("row '{id}'");
        let body = self
            .send(table, self.http_client.get(url), subject.as_str())
            .await?;
        row_from_json(table, body)
    }

    async fn append(&self, table: Table, row: Row) -> AppResult<String> {
        let url = self.endpoint(table, None)?;
        let request = self.http_client.post(url).json(&row_to_json(&row));
        let body = self.send(table, request, "new row").await?;

        body.get(Row::ID_COLUMN)
            .and_then(|id| match id {
                Value::String(text) => Some(text.trim().to_owned()),
                Value::Number(number) => Some(number.to_string()),
                _ => None,
            })
            .filter(|id| !id.is_empty())
            .or_else(|| row.id())
            .ok_or_else(|| {
                AppError::Internal(format!("{table} append response did not carry an id"))
            })
    }

    async fn update_by_id(&self, table: Table, id: &str, patch: Row) -> AppResult<Row> {
        let url = self.endpoint(table, Some(id))?;
        let subject = format!("row '{id}'");
        let request = self.http_client.patch(url).json(&row_to_json(&patch));
        let body = self.send(table, request, subject.as_str()).await?;
        row_from_json(table, body)
    }
}

fn status_error(status: StatusCode, table: Table, subject: &str, body: &str) -> AppError {
    let message = format!("{table} request for {subject} returned {status}: {body}");

    if status == StatusCode::NOT_FOUND {
        AppError::NotFound(format!("{table} {subject} does not exist"))
    } else if status == StatusCode::CONFLICT {
        AppError::Conflict(message)
    } else if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
        AppError::Validation(message)
    } else if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        AppError::Unavailable(message)
    } else {
        AppError::Internal(message)
    }
}
