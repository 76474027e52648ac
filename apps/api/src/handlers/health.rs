use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use flock_application::Table;
use tracing::warn;

use crate::dto::HealthResponse;
use crate::state::AppState;

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let record_store = match state.tables.list(Table::Roles).await {
        Ok(_) => "ok",
        Err(error) => {
            warn!(error = %error, "record store probe failed");
            "unavailable"
        }
    };

    let ready = record_store == "ok";
    let http_status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status: if ready { "ok" } else { "degraded" },
            record_store,
        }),
    )
}
