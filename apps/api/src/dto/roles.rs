use chrono::SecondsFormat;
use flock_application::EffectivePermissions;
use flock_domain::{Role, RoleAssignment};
use serde::{Deserialize, Serialize};

/// Incoming payload for custom role creation.
#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub permissions: Vec<String>,
}

/// Incoming payload for role edits. System roles accept `permissions` only.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub permissions: Option<Vec<String>>,
}

/// Incoming payload for role assignment.
#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role_id: String,
}

/// Query for a permission check against the calling user.
#[derive(Debug, Deserialize)]
pub struct PermissionCheckQuery {
    pub permission: String,
}

/// API representation of a role.
#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub role_id: String,
    pub name: String,
    pub is_system: bool,
    pub permissions: Vec<String>,
}

impl From<Role> for RoleResponse {
    fn from(value: Role) -> Self {
        Self {
            role_id: value.id.into(),
            name: value.name.into(),
            is_system: value.is_system,
            permissions: value
                .permissions
                .into_iter()
                .map(|permission| permission.to_string())
                .collect(),
        }
    }
}

/// API representation of a role assignment.
#[derive(Debug, Serialize)]
pub struct RoleAssignmentResponse {
    pub assignment_id: String,
    pub user_id: String,
    pub role_id: String,
    pub assigned_by: String,
    pub assigned_at: String,
    pub status: &'static str,
    pub revoked_by: Option<String>,
    pub revoked_at: Option<String>,
}

impl From<RoleAssignment> for RoleAssignmentResponse {
    fn from(value: RoleAssignment) -> Self {
        Self {
            assignment_id: value.id.into(),
            user_id: value.user_id.into(),
            role_id: value.role_id.into(),
            assigned_by: value.assigned_by.into(),
            assigned_at: value
                .assigned_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            status: value.status.as_str(),
            revoked_by: value.revoked_by.map(String::from),
            revoked_at: value
                .revoked_at
                .map(|revoked_at| revoked_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}

/// API representation of a user's effective permissions.
#[derive(Debug, Serialize)]
pub struct EffectivePermissionsResponse {
    pub user_id: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl From<EffectivePermissions> for EffectivePermissionsResponse {
    fn from(value: EffectivePermissions) -> Self {
        Self {
            user_id: value.user_id.into(),
            roles: value.roles.into_iter().map(String::from).collect(),
            permissions: value
                .permissions
                .into_iter()
                .map(|permission| permission.to_string())
                .collect(),
        }
    }
}

/// Result of a permission check.
#[derive(Debug, Serialize)]
pub struct PermissionCheckResponse {
    pub user_id: String,
    pub permission: String,
    pub allowed: bool,
}
