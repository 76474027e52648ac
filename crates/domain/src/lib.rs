//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod ids;
mod member;
mod role;
mod security;
mod tag;
mod user;

pub use ids::{MemberId, RoleAssignmentId, RoleId, TagId, TagRuleId, UserId};
pub use member::{FieldValue, MemberSnapshot, parse_date, split_list};
pub use role::{
    AssignmentStatus, MAX_ROLE_NAME_CHARS, Role, RoleAssignment, RoleName, RolePatch, RoleStatus,
    SystemRole,
};
pub use security::{Action, Permission, Resource};
pub use tag::{
    ConditionOperator, MalformedCondition, RuleCondition, RuleStatus, Tag, TagCondition, TagRule,
    TagStatus, Threshold,
};
pub use user::{EmailAddress, User, UserStatus};
