//! Flock maintenance commands.

#![forbid(unsafe_code)]

use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use flock_application::{
    AuthorizationGate, PermissionResolver, RoleStore, TableService, TaggingService,
};
use flock_core::{AppError, AppResult};
use flock_domain::{Permission, UserId};
use flock_infrastructure::{BoundedTableService, HttpTableService, HttpTableServiceConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    SeedRoles,
    RecomputeTags,
    Check { user_id: String, permission: String },
}

impl Command {
    fn parse(args: &[String]) -> AppResult<Self> {
        match args {
            [command] if command == "seed-roles" => Ok(Self::SeedRoles),
            [command] if command == "recompute-tags" => Ok(Self::RecomputeTags),
            [command, user_id, permission] if command == "check" => Ok(Self::Check {
                user_id: user_id.clone(),
                permission: permission.clone(),
            }),
            _ => Err(AppError::Validation(
                "usage: flock-worker seed-roles | recompute-tags | check <user_id> <permission>"
                    .to_owned(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
struct WorkerConfig {
    table_service: HttpTableServiceConfig,
    table_timeout: Duration,
    retag_concurrency: usize,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = Command::parse(&args)?;
    let config = WorkerConfig::load()?;
    let tables = build_table_service(&config);

    match command {
        Command::SeedRoles => {
            let created = RoleStore::new(tables).ensure_system_roles().await?;
            info!(created = created.len(), "system roles seeded");
        }
        Command::RecomputeTags => {
            let summary = TaggingService::new(tables, config.retag_concurrency)
                .recompute_all()
                .await?;
            info!(
                evaluated = summary.evaluated,
                updated = summary.updated,
                unchanged = summary.unchanged,
                failed = summary.failed,
                "member tags recomputed"
            );
            if summary.failed > 0 {
                return Err(AppError::Unavailable(format!(
                    "{} members could not be re-tagged",
                    summary.failed
                )));
            }
        }
        Command::Check {
            user_id,
            permission,
        } => {
            let user_id = UserId::new(user_id)?;
            let permission = Permission::from_transport(permission.as_str())?;
            let gate = AuthorizationGate::new(PermissionResolver::new(
                tables.clone(),
                RoleStore::new(tables),
            ));
            let allowed = gate.can(&user_id, permission).await?;
            println!(
                "{user_id} {} {permission}",
                if allowed { "can" } else { "cannot" }
            );
        }
    }

    Ok(())
}

fn build_table_service(config: &WorkerConfig) -> Arc<dyn TableService> {
    let gateway = HttpTableService::new(reqwest::Client::new(), config.table_service.clone());
    Arc::new(BoundedTableService::new(
        Arc::new(gateway),
        config.table_timeout,
    ))
}

impl WorkerConfig {
    fn load() -> AppResult<Self> {
        let base_url = required_env("TABLE_SERVICE_URL")?;
        let base_url = Url::parse(base_url.trim()).map_err(|error| {
            AppError::Validation(format!("invalid TABLE_SERVICE_URL: {error}"))
        })?;
        let token = env::var("TABLE_SERVICE_TOKEN")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        let timeout_ms = parse_env("TABLE_SERVICE_TIMEOUT_MS", 5_000_u64)?;
        let retag_concurrency = parse_env("RETAG_CONCURRENCY", 8_usize)?;

        if timeout_ms == 0 {
            return Err(AppError::Validation(
                "TABLE_SERVICE_TIMEOUT_MS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            table_service: HttpTableServiceConfig { base_url, token },
            table_timeout: Duration::from_millis(timeout_ms),
            retag_concurrency: retag_concurrency.max(1),
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    let value = env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn parse_env<T>(name: &str, default: T) -> AppResult<T>
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
