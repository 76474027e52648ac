use serde::Serialize;

mod roles;
mod tags;

pub use roles::{
    AssignRoleRequest, CreateRoleRequest, EffectivePermissionsResponse, PermissionCheckQuery,
    PermissionCheckResponse, RoleAssignmentResponse, RoleResponse, UpdateRoleRequest,
};
pub use tags::{
    ApplyMemberTagRequest, CreateTagRequest, CreateTagRuleRequest, MemberTagOutcomeResponse,
    MemberTagsResponse, RecomputeSummaryResponse, RuleConditionRequest, TagResponse,
    TagRuleResponse, TagRuleWriteResponse, UpdateTagRuleRequest,
};

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub record_store: &'static str,
}
