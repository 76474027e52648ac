use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use flock_application::TableService;
use flock_core::AppError;
use flock_infrastructure::{BoundedTableService, HttpTableService, HttpTableServiceConfig};
use tracing_subscriber::EnvFilter;
use url::Url;

const DEFAULT_TABLE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_RETAG_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub table_service: HttpTableServiceConfig,
    pub table_timeout: Duration,
    pub retag_concurrency: usize,
    pub api_host: String,
    pub api_port: u16,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let base_url = required_non_empty_env("TABLE_SERVICE_URL")?;
        let base_url = Url::parse(base_url.trim()).map_err(|error| {
            AppError::Validation(format!("invalid TABLE_SERVICE_URL: {error}"))
        })?;
        let token = env::var("TABLE_SERVICE_TOKEN")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let timeout_ms = parse_env("TABLE_SERVICE_TIMEOUT_MS", DEFAULT_TABLE_TIMEOUT_MS)?;
        if timeout_ms == 0 {
            return Err(AppError::Validation(
                "TABLE_SERVICE_TIMEOUT_MS must be greater than zero".to_owned(),
            ));
        }
        let retag_concurrency = parse_env("RETAG_CONCURRENCY", DEFAULT_RETAG_CONCURRENCY)?.max(1);

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = parse_env("API_PORT", 3001_u16)?;

        Ok(Self {
            table_service: HttpTableServiceConfig { base_url, token },
            table_timeout: Duration::from_millis(timeout_ms),
            retag_concurrency,
            api_host,
            api_port,
        })
    }

    pub fn table_service(&self) -> Arc<dyn TableService> {
        let gateway = HttpTableService::new(reqwest::Client::new(), self.table_service.clone());
        Arc::new(BoundedTableService::new(Arc::new(gateway), self.table_timeout))
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_env<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        _ => Ok(default),
    }
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}
