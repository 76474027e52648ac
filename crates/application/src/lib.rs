//! Application services and ports.

#![forbid(unsafe_code)]

mod authorization_gate;
mod permission_resolver;
mod role_admin_service;
mod role_store;
mod table_ports;
mod tag_admin_service;
mod tagging_service;

#[cfg(test)]
mod test_support;

pub use authorization_gate::{AuthorizationGate, AuthorizationScope, actor_id};
pub use permission_resolver::{EffectivePermissions, PermissionResolver};
pub use role_admin_service::RoleAdminService;
pub use role_store::{CreateRoleInput, RoleStore};
pub use table_ports::{
    Row, Table, TableService, decode_assignment, decode_member, decode_permissions, decode_role,
    decode_rule, decode_tag, decode_tag_list, decode_user, encode_assignment, encode_permissions,
    encode_role, encode_rule, encode_tag, encode_tag_list, member_tags_patch,
};
pub use tag_admin_service::{CreateTagInput, CreateTagRuleInput, TagAdminService, TagRulePatch};
pub use tagging_service::{
    ConditionEvaluator, MemberTagOutcome, RecomputeSummary, TagRuleEngine, TaggingService,
};
