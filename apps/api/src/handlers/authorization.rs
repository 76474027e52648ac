use axum::Json;
use axum::extract::{Extension, Query, State};
use flock_application::actor_id;
use flock_core::UserIdentity;
use flock_domain::Permission;

use crate::dto::{PermissionCheckQuery, PermissionCheckResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn check_permission_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Query(query): Query<PermissionCheckQuery>,
) -> ApiResult<Json<PermissionCheckResponse>> {
    let user_id = actor_id(&user)?;
    let permission = Permission::from_transport(query.permission.as_str())?;
    let allowed = state.authorization_gate.can(&user_id, permission).await?;

    Ok(Json(PermissionCheckResponse {
        user_id: user_id.into(),
        permission: permission.to_string(),
        allowed,
    }))
}
