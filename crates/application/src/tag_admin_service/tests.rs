use std::sync::Arc;

use flock_core::{AppError, NonEmptyString};
use flock_domain::{ConditionOperator, MemberId, RuleStatus, TagCondition, TagId, TagRuleId};

use crate::test_support::{
    FakeTableService, actor, member_row, role_row, rule_row, tag_row, user_row,
};
use crate::{AuthorizationGate, PermissionResolver, RoleStore, Table, TaggingService};

use super::{CreateTagInput, CreateTagRuleInput, TagAdminService, TagRulePatch};

fn service(tables: Arc<FakeTableService>) -> TagAdminService {
    let store = RoleStore::new(tables.clone());
    let gate = AuthorizationGate::new(PermissionResolver::new(tables.clone(), store));
    TagAdminService::new(gate, tables.clone(), TaggingService::new(tables, 2))
}

fn condition(field: &str, operator: ConditionOperator, value: &str) -> TagCondition {
    match TagCondition::parse(field, operator, value) {
        Ok(condition) => condition,
        Err(error) => panic!("{error}"),
    }
}

fn tag_id(value: &str) -> TagId {
    match TagId::new(value) {
        Ok(id) => id,
        Err(error) => panic!("{error}"),
    }
}

async fn tables() -> Arc<FakeTableService> {
    let tables = FakeTableService::shared();
    tables
        .seed(
            Table::Roles,
            role_row(
                "r-admin",
                "admin",
                "settings:read,settings:update,members:update",
                true,
            ),
        )
        .await;
    tables
        .seed(
            Table::Roles,
            role_row("r-readonly", "readonly", "settings:read,members:read", true),
        )
        .await;
    tables.seed(Table::Users, user_row("u-admin", "admin")).await;
    tables.seed(Table::Users, user_row("u-reader", "readonly")).await;
    tables.seed(Table::Tags, tag_row("new-friend", "New friend")).await;
    tables
        .seed(
            Table::Members,
            member_row("m-1", &[("faith_status", "seeker")]),
        )
        .await;
    tables
        .seed(
            Table::Members,
            member_row("m-2", &[("faith_status", "member")]),
        )
        .await;
    tables
}

#[tokio::test]
async fn creating_a_rule_retags_members() {
    let tables = tables().await;
    let service = service(tables.clone());

    let created = service
        .create_rule(
            &actor("u-admin"),
            CreateTagRuleInput {
                tag_id: tag_id("new-friend"),
                condition: condition("faith_status", ConditionOperator::Equals, "seeker"),
                priority: 0,
                status: RuleStatus::Enabled,
            },
        )
        .await;
    assert!(created.is_ok());
    let Ok((_, Some(summary))) = created else {
        panic!("rule creation did not re-tag members");
    };

    assert_eq!(summary.evaluated, 2);
    assert_eq!(summary.updated, 1);
    assert_eq!(
        tables
            .row(Table::Members, "m-1")
            .await
            .and_then(|row| row.text("tags")),
        Some("new-friend".to_owned())
    );
}

#[tokio::test]
async fn saved_rule_is_reported_when_retag_is_unavailable() {
    let tables = tables().await;
    tables.fail(Table::Members).await;
    let service = service(tables.clone());

    let created = service
        .create_rule(
            &actor("u-admin"),
            CreateTagRuleInput {
                tag_id: tag_id("new-friend"),
                condition: condition("faith_status", ConditionOperator::Equals, "seeker"),
                priority: 0,
                status: RuleStatus::Enabled,
            },
        )
        .await;

    assert!(created.is_ok_and(|(rule, summary)| rule.is_enabled() && summary.is_none()));
    assert_eq!(tables.rows(Table::TagRules).await.len(), 1);
}

#[tokio::test]
async fn disabling_a_rule_removes_its_tags() {
    let tables = tables().await;
    tables
        .seed(
            Table::TagRules,
            rule_row(
                "rule-1",
                "new-friend",
                ("faith_status", "equals", "seeker"),
                0,
                "enabled",
            ),
        )
        .await;
    let service = service(tables.clone());
    assert!(service.recompute_all(&actor("u-admin")).await.is_ok());

    let rule_id = TagRuleId::new("rule-1").unwrap_or_else(|error| panic!("{error}"));
    let updated = service
        .update_rule(
            &actor("u-admin"),
            &rule_id,
            TagRulePatch {
                status: Some(RuleStatus::Disabled),
                ..TagRulePatch::default()
            },
        )
        .await;
    assert!(updated.is_ok_and(|(rule, summary)| {
        !rule.is_enabled() && summary.is_some_and(|summary| summary.updated == 1)
    }));

    assert_eq!(
        tables
            .row(Table::Members, "m-1")
            .await
            .and_then(|row| row.text("tags")),
        None
    );
}

#[tokio::test]
async fn rule_writes_require_settings_update() {
    let service = service(tables().await);

    let result = service
        .create_rule(
            &actor("u-reader"),
            CreateTagRuleInput {
                tag_id: tag_id("new-friend"),
                condition: condition("faith_status", ConditionOperator::IsNotEmpty, ""),
                priority: 0,
                status: RuleStatus::Enabled,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    let listed = service.list_rules(&actor("u-reader")).await;
    assert!(listed.is_ok());
}

#[tokio::test]
async fn duplicate_tag_names_conflict() {
    let service = service(tables().await);

    let result = service
        .create_tag(
            &actor("u-admin"),
            CreateTagInput {
                name: NonEmptyString::new("NEW FRIEND").unwrap_or_else(|error| panic!("{error}")),
                category: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn rule_for_unknown_tag_is_not_found() {
    let service = service(tables().await);

    let result = service
        .create_rule(
            &actor("u-admin"),
            CreateTagRuleInput {
                tag_id: tag_id("missing"),
                condition: condition("age", ConditionOperator::GreaterThan, "18"),
                priority: 0,
                status: RuleStatus::Enabled,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn manual_tags_require_members_update() {
    let service = service(tables().await);
    let member_id = MemberId::new("m-2").unwrap_or_else(|error| panic!("{error}"));

    let denied = service
        .apply_manual_tag(&actor("u-reader"), &member_id, &tag_id("new-friend"))
        .await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    let applied = service
        .apply_manual_tag(&actor("u-admin"), &member_id, &tag_id("new-friend"))
        .await;
    assert!(applied.is_ok_and(|member| member.manual_tags.contains(&tag_id("new-friend"))));
}
