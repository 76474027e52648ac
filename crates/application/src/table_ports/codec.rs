//! Typed parsing between store rows and domain records.
//!
//! Rows arrive as loosely-typed cells. Decoders reject rows missing identity
//! columns; callers decide whether a bad row is skipped or surfaced.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Utc};
use flock_core::{AppError, AppResult, NonEmptyString};
use flock_domain::{
    AssignmentStatus, EmailAddress, FieldValue, MemberId, MemberSnapshot, Permission, Role,
    RoleAssignment, RoleAssignmentId, RoleId, RoleName, RoleStatus, RuleCondition, RuleStatus,
    Tag, TagId, TagRule, TagRuleId, TagStatus, User, UserId, UserStatus,
};
use tracing::warn;

use super::{Row, Table};

const MEMBER_TAG_COLUMNS: [&str; 3] = ["manual_tags", "rule_tags", "tags"];

/// Parses a multi-valued permission cell, skipping tokens outside the catalogue.
#[must_use]
pub fn decode_permissions(value: Option<&FieldValue>) -> BTreeSet<Permission> {
    let Some(value) = value else {
        return BTreeSet::new();
    };

    value
        .items()
        .into_iter()
        .filter_map(|token| match Permission::from_transport(token.as_str()) {
            Ok(permission) => Some(permission),
            Err(error) => {
                warn!(token = %token, error = %error, "ignoring unknown permission token");
                None
            }
        })
        .collect()
}

/// Renders a permission set as a comma-delimited cell.
#[must_use]
pub fn encode_permissions(permissions: &BTreeSet<Permission>) -> FieldValue {
    FieldValue::Text(
        permissions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// Renders a tag id set as a comma-delimited cell.
#[must_use]
pub fn encode_tag_list(tags: &BTreeSet<TagId>) -> FieldValue {
    FieldValue::Text(
        tags.iter()
            .map(TagId::as_str)
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// Parses a tag id list cell.
#[must_use]
pub fn decode_tag_list(value: Option<&FieldValue>) -> BTreeSet<TagId> {
    value
        .map(FieldValue::items)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| TagId::new(item).ok())
        .collect()
}

/// Decodes a `Users` row.
pub fn decode_user(row: &Row) -> AppResult<User> {
    let id = UserId::new(required_text(row, Table::Users, "id")?)?;
    let email = EmailAddress::new(required_text(row, Table::Users, "email")?)?;
    let member_id = row.text("member_id").map(MemberId::new).transpose()?;
    let permissions_override = row
        .text("permissions_override")
        .map(|_| decode_permissions(row.get("permissions_override")));

    let status = match row.text("status") {
        None => UserStatus::Active,
        Some(value) => UserStatus::from_str(value.to_lowercase().as_str()).unwrap_or_else(|_| {
            warn!(user_id = %id, status = %value, "unknown user status, treating as inactive");
            UserStatus::Inactive
        }),
    };

    Ok(User {
        id,
        member_id,
        email,
        role_name: row.text("role"),
        permissions_override,
        status,
    })
}

/// Decodes a `Roles` row.
pub fn decode_role(row: &Row) -> AppResult<Role> {
    let status = row
        .text("status")
        .map(|value| RoleStatus::from_str(value.to_lowercase().as_str()))
        .transpose()?
        .unwrap_or(RoleStatus::Active);

    Ok(Role {
        id: RoleId::new(required_text(row, Table::Roles, "id")?)?,
        name: RoleName::new(required_text(row, Table::Roles, "name")?)?,
        permissions: decode_permissions(row.get("permissions")),
        is_system: decode_flag(row.get("is_system_role")),
        status,
    })
}

/// Encodes a role as a full row.
#[must_use]
pub fn encode_role(role: &Role) -> Row {
    Row::new()
        .with_text("id", role.id.as_str())
        .with_text("name", role.name.as_str())
        .with("permissions", encode_permissions(&role.permissions))
        .with("is_system_role", FieldValue::Bool(role.is_system))
        .with_text("status", role.status.as_str())
}

/// Decodes a `Role_Assignments` row.
pub fn decode_assignment(row: &Row) -> AppResult<RoleAssignment> {
    let table = Table::RoleAssignments;
    let status = row
        .text("status")
        .map(|value| AssignmentStatus::from_str(value.to_lowercase().as_str()))
        .transpose()?
        .unwrap_or(AssignmentStatus::Active);
    let assigned_at = decode_timestamp(row.get("assigned_at")).ok_or_else(|| {
        AppError::Validation(format!("{table} row has an invalid 'assigned_at' value"))
    })?;

    Ok(RoleAssignment {
        id: RoleAssignmentId::new(required_text(row, table, "id")?)?,
        user_id: UserId::new(required_text(row, table, "user_id")?)?,
        role_id: RoleId::new(required_text(row, table, "role_id")?)?,
        assigned_by: UserId::new(required_text(row, table, "assigned_by")?)?,
        assigned_at,
        status,
        revoked_by: row.text("revoked_by").map(UserId::new).transpose()?,
        revoked_at: decode_timestamp(row.get("revoked_at")),
    })
}

/// Encodes an assignment as a full row.
#[must_use]
pub fn encode_assignment(assignment: &RoleAssignment) -> Row {
    let mut row = Row::new()
        .with_text("id", assignment.id.as_str())
        .with_text("user_id", assignment.user_id.as_str())
        .with_text("role_id", assignment.role_id.as_str())
        .with_text("assigned_by", assignment.assigned_by.as_str())
        .with_text("assigned_at", assignment.assigned_at.to_rfc3339())
        .with_text("status", assignment.status.as_str());

    if let Some(revoked_by) = &assignment.revoked_by {
        row.insert("revoked_by", FieldValue::Text(revoked_by.to_string()));
    }
    if let Some(revoked_at) = assignment.revoked_at {
        row.insert("revoked_at", FieldValue::Text(revoked_at.to_rfc3339()));
    }

    row
}

/// Decodes a `Tags` row.
pub fn decode_tag(row: &Row) -> AppResult<Tag> {
    let status = row
        .text("status")
        .map(|value| TagStatus::from_str(value.to_lowercase().as_str()))
        .transpose()?
        .unwrap_or(TagStatus::Active);

    Ok(Tag {
        id: TagId::new(required_text(row, Table::Tags, "id")?)?,
        name: NonEmptyString::new(required_text(row, Table::Tags, "name")?)?,
        category: row.text("category"),
        status,
    })
}

/// Encodes a tag as a full row.
#[must_use]
pub fn encode_tag(tag: &Tag) -> Row {
    Row::new()
        .with_text("id", tag.id.as_str())
        .with_text("name", tag.name.as_str())
        .with_text("category", tag.category.clone().unwrap_or_default())
        .with_text("status", tag.status.as_str())
}

/// Decodes a `Tag_Rules` row.
///
/// Identity, priority and status must be well formed; an unparseable
/// condition is kept as [`RuleCondition::Malformed`] instead of failing.
pub fn decode_rule(row: &Row) -> AppResult<TagRule> {
    let table = Table::TagRules;
    let status = RuleStatus::from_str(
        required_text(row, table, "status")?
            .to_lowercase()
            .as_str(),
    )?;
    let priority = decode_priority(row.get("priority")).ok_or_else(|| {
        AppError::Validation(format!(
            "{table} row has an invalid 'priority' value; expected an integer >= 0"
        ))
    })?;

    let text_or_empty = |column: &str| row.text(column).unwrap_or_default();
    let condition = RuleCondition::from_parts(
        text_or_empty("condition_field").as_str(),
        text_or_empty("condition_operator").as_str(),
        text_or_empty("condition_value").as_str(),
    );

    Ok(TagRule {
        id: TagRuleId::new(required_text(row, table, "id")?)?,
        tag_id: TagId::new(required_text(row, table, "tag_id")?)?,
        condition,
        priority,
        status,
    })
}

/// Encodes a rule as a full row.
#[must_use]
pub fn encode_rule(rule: &TagRule) -> Row {
    let (field, operator, value) = rule.condition.to_parts();

    Row::new()
        .with_text("id", rule.id.as_str())
        .with_text("tag_id", rule.tag_id.as_str())
        .with_text("condition_field", field)
        .with_text("condition_operator", operator)
        .with_text("condition_value", value)
        .with("priority", FieldValue::Number(f64::from(rule.priority)))
        .with_text("status", rule.status.as_str())
}

/// Decodes a `Members` row into a snapshot, separating the tag columns.
pub fn decode_member(row: &Row) -> AppResult<MemberSnapshot> {
    let id = MemberId::new(required_text(row, Table::Members, "id")?)?;

    // Rows written before tags were split keep everything in `tags`; treat
    // those as human-applied so the first recompute cannot drop them. Blank
    // split columns count as absent since gateways return empty cells as "".
    let (manual_tags, rule_tags) =
        if row.text("manual_tags").is_none() && row.text("rule_tags").is_none() {
            (decode_tag_list(row.get("tags")), BTreeSet::new())
        } else {
            (
                decode_tag_list(row.get("manual_tags")),
                decode_tag_list(row.get("rule_tags")),
            )
        };
    let fields = row
        .cells()
        .iter()
        .filter(|(column, _)| {
            column.as_str() != Row::ID_COLUMN && !MEMBER_TAG_COLUMNS.contains(&column.as_str())
        })
        .map(|(column, value)| (column.clone(), value.clone()))
        .collect();

    Ok(MemberSnapshot {
        id,
        fields,
        manual_tags,
        rule_tags,
    })
}

/// Builds the patch that writes a member's tag columns.
#[must_use]
pub fn member_tags_patch(member: &MemberSnapshot) -> Row {
    Row::new()
        .with("manual_tags", encode_tag_list(&member.manual_tags))
        .with("rule_tags", encode_tag_list(&member.rule_tags))
        .with("tags", encode_tag_list(&member.merged_tags()))
}

fn required_text(row: &Row, table: Table, column: &str) -> AppResult<String> {
    row.text(column)
        .ok_or_else(|| AppError::Validation(format!("{table} row is missing '{column}'")))
}

fn decode_flag(value: Option<&FieldValue>) -> bool {
    match value {
        Some(FieldValue::Bool(flag)) => *flag,
        Some(FieldValue::Number(number)) => *number != 0.0,
        Some(FieldValue::Text(text)) => matches!(
            text.trim().to_lowercase().as_str(),
            "true" | "yes" | "y" | "1" | "x"
        ),
        _ => false,
    }
}

fn decode_priority(value: Option<&FieldValue>) -> Option<u32> {
    match value? {
        FieldValue::Number(number) => {
            let in_range = number.is_finite()
                && number.fract() == 0.0
                && *number >= 0.0
                && *number <= f64::from(u32::MAX);
            // Range and integrality are checked above.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            in_range.then_some(*number as u32)
        }
        FieldValue::Text(text) => text.trim().parse::<u32>().ok(),
        _ => None,
    }
}

fn decode_timestamp(value: Option<&FieldValue>) -> Option<DateTime<Utc>> {
    match value? {
        FieldValue::Date(date) => Some(date.and_time(NaiveTime::MIN).and_utc()),
        FieldValue::Text(text) => DateTime::parse_from_rfc3339(text.trim())
            .map(|timestamp| timestamp.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                flock_domain::parse_date(text)
                    .map(|date| date.and_time(NaiveTime::MIN).and_utc())
            }),
        _ => None,
    }
}
