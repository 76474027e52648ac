use std::collections::BTreeSet;

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use flock_application::CreateRoleInput;
use flock_core::{AppResult, UserIdentity};
use flock_domain::{Permission, RoleId, RoleName, RolePatch, UserId};

use crate::dto::{
    AssignRoleRequest, CreateRoleRequest, EffectivePermissionsResponse, RoleAssignmentResponse,
    RoleResponse, UpdateRoleRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .role_admin_service
        .list_roles(&user)
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn get_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(role_id): Path<String>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .role_admin_service
        .get_role(&user, &RoleId::new(role_id)?)
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let role = state
        .role_admin_service
        .create_role(
            &user,
            CreateRoleInput {
                name: RoleName::new(payload.name)?,
                permissions: parse_permissions(&payload.permissions)?,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

pub async fn update_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(role_id): Path<String>,
    Json(payload): Json<UpdateRoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let patch = RolePatch {
        name: payload.name.map(RoleName::new).transpose()?,
        permissions: payload
            .permissions
            .as_deref()
            .map(parse_permissions)
            .transpose()?,
        is_system: None,
    };

    let role = state
        .role_admin_service
        .update_role(&user, &RoleId::new(role_id)?, patch)
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn delete_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(role_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .delete_role(&user, &RoleId::new(role_id)?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_role_assignments_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<RoleAssignmentResponse>>> {
    let assignments = state
        .role_admin_service
        .list_assignments(&user)
        .await?
        .into_iter()
        .map(RoleAssignmentResponse::from)
        .collect();

    Ok(Json(assignments))
}

pub async fn assign_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(user_id): Path<String>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleAssignmentResponse>)> {
    let assignment = state
        .role_admin_service
        .assign_role(&user, &UserId::new(user_id)?, &RoleId::new(payload.role_id)?)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RoleAssignmentResponse::from(assignment)),
    ))
}

pub async fn revoke_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path((user_id, role_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<RoleAssignmentResponse>>> {
    let revoked = state
        .role_admin_service
        .revoke_role(&user, &UserId::new(user_id)?, &RoleId::new(role_id)?)
        .await?
        .into_iter()
        .map(RoleAssignmentResponse::from)
        .collect();

    Ok(Json(revoked))
}

pub async fn user_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<EffectivePermissionsResponse>> {
    let permissions = state
        .role_admin_service
        .effective_permissions(&user, &UserId::new(user_id)?)
        .await?;

    Ok(Json(EffectivePermissionsResponse::from(permissions)))
}

fn parse_permissions(values: &[String]) -> AppResult<BTreeSet<Permission>> {
    values
        .iter()
        .map(|value| Permission::from_transport(value.as_str()))
        .collect()
}
