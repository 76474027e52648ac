use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use flock_core::AppError;
use flock_domain::{
    FieldValue, MemberId, MemberSnapshot, RuleCondition, RuleStatus, TagId, TagRule, TagRuleId,
};

use crate::Table;
use crate::test_support::{FakeTableService, member_row, rule_row, tag_row};

use super::{TagRuleEngine, TaggingService};

fn tag(value: &str) -> TagId {
    match TagId::new(value) {
        Ok(id) => id,
        Err(error) => panic!("{error}"),
    }
}

fn member_id(value: &str) -> MemberId {
    match MemberId::new(value) {
        Ok(id) => id,
        Err(error) => panic!("{error}"),
    }
}

fn rule(id: &str, tag_id: &str, condition: (&str, &str, &str), priority: u32) -> TagRule {
    let (field, operator, value) = condition;
    TagRule {
        id: TagRuleId::new(id).unwrap_or_else(|error| panic!("{error}")),
        tag_id: tag(tag_id),
        condition: RuleCondition::from_parts(field, operator, value),
        priority,
        status: RuleStatus::Enabled,
    }
}

fn member(fields: &[(&str, &str)]) -> MemberSnapshot {
    MemberSnapshot::new(
        member_id("m-1"),
        fields
            .iter()
            .map(|(column, value)| ((*column).to_owned(), FieldValue::Text((*value).to_owned())))
            .collect::<BTreeMap<_, _>>(),
    )
}

fn tag_set(values: &[&str]) -> BTreeSet<TagId> {
    values.iter().map(|value| tag(value)).collect()
}

#[test]
fn seeker_gets_new_friend_tag() {
    let member = member(&[("faith_status", "seeker"), ("join_date", "2024-01-01")]);
    let rules = vec![rule(
        "rule-1",
        "new-friend",
        ("faith_status", "equals", "seeker"),
        0,
    )];

    assert_eq!(
        TagRuleEngine::evaluate(&member, &rules),
        tag_set(&["new-friend"])
    );
}

#[test]
fn priority_orders_but_never_excludes() {
    let member = member(&[("age", "30"), ("ministry", "choir, ushers")]);
    let rules = vec![
        rule("rule-b", "b", ("ministry", "contains", "ushers"), 2),
        rule("rule-a", "a", ("age", "greater_than", "18"), 1),
    ];

    let order: Vec<&str> = TagRuleEngine::evaluation_order(&rules)
        .into_iter()
        .map(|rule| rule.id.as_str())
        .collect();
    assert_eq!(order, vec!["rule-a", "rule-b"]);
    assert_eq!(TagRuleEngine::evaluate(&member, &rules), tag_set(&["a", "b"]));
}

#[test]
fn priority_ties_break_on_rule_id() {
    let rules = vec![
        rule("rule-2", "a", ("age", "is_not_empty", ""), 5),
        rule("rule-1", "b", ("age", "is_not_empty", ""), 5),
    ];

    let order: Vec<&str> = TagRuleEngine::evaluation_order(&rules)
        .into_iter()
        .map(|rule| rule.id.as_str())
        .collect();
    assert_eq!(order, vec!["rule-1", "rule-2"]);
}

#[test]
fn disabled_rule_never_contributes() {
    let member = member(&[("faith_status", "seeker")]);
    let mut disabled = rule("rule-1", "new-friend", ("faith_status", "equals", "seeker"), 0);
    disabled.status = RuleStatus::Disabled;

    assert!(TagRuleEngine::evaluate(&member, &[disabled]).is_empty());
}

#[test]
fn malformed_rule_does_not_stop_other_rules() {
    let member = member(&[("age", "30"), ("faith_status", "seeker")]);
    let rules = vec![
        rule("rule-1", "adult", ("age", "greater_than", "eighteen"), 0),
        rule("rule-2", "broken", ("", "equals", "x"), 1),
        rule("rule-3", "new-friend", ("faith_status", "equals", "seeker"), 2),
    ];

    assert_eq!(
        TagRuleEngine::evaluate(&member, &rules),
        tag_set(&["new-friend"])
    );
}

async fn church_tables() -> Arc<FakeTableService> {
    let tables = FakeTableService::shared();
    tables.seed(Table::Tags, tag_row("new-friend", "New friend")).await;
    tables.seed(Table::Tags, tag_row("adult", "Adult")).await;
    tables.seed(Table::Tags, tag_row("volunteer", "Volunteer")).await;
    tables
        .seed(
            Table::Tags,
            tag_row("legacy", "Legacy").with_text("status", "archived"),
        )
        .await;
    tables
        .seed(
            Table::TagRules,
            rule_row(
                "rule-1",
                "new-friend",
                ("faith_status", "equals", "seeker"),
                1,
                "enabled",
            ),
        )
        .await;
    tables
        .seed(
            Table::TagRules,
            rule_row("rule-2", "adult", ("age", "greater_than", "17"), 2, "enabled"),
        )
        .await;
    tables
        .seed(
            Table::TagRules,
            rule_row("rule-3", "legacy", ("age", "is_not_empty", ""), 3, "enabled"),
        )
        .await;
    tables
}

#[tokio::test]
async fn recompute_member_keeps_manual_tags() {
    let tables = church_tables().await;
    tables
        .seed(
            Table::Members,
            member_row(
                "m-1",
                &[
                    ("faith_status", "seeker"),
                    ("age", "15"),
                    ("manual_tags", "volunteer"),
                    ("rule_tags", "adult"),
                ],
            ),
        )
        .await;
    let service = TaggingService::new(tables.clone(), 4);

    let outcome = service.recompute_member(&member_id("m-1")).await;
    assert!(outcome.is_ok());
    let Ok(outcome) = outcome else {
        return;
    };

    assert_eq!(outcome.added, tag_set(&["new-friend"]));
    assert_eq!(outcome.removed, tag_set(&["adult"]));
    assert_eq!(outcome.tags, tag_set(&["new-friend", "volunteer"]));
    assert!(outcome.written);

    let row = tables.row(Table::Members, "m-1").await;
    assert_eq!(
        row.as_ref().and_then(|row| row.text("manual_tags")),
        Some("volunteer".to_owned())
    );
    assert_eq!(
        row.as_ref().and_then(|row| row.text("rule_tags")),
        Some("new-friend".to_owned())
    );
    assert_eq!(
        row.and_then(|row| row.text("tags")),
        Some("new-friend,volunteer".to_owned())
    );
}

#[tokio::test]
async fn blank_split_columns_keep_legacy_tags_as_manual() {
    let tables = church_tables().await;
    tables
        .seed(
            Table::Members,
            member_row(
                "m-1",
                &[
                    ("faith_status", "seeker"),
                    ("tags", "volunteer"),
                    ("manual_tags", ""),
                    ("rule_tags", ""),
                ],
            ),
        )
        .await;
    let service = TaggingService::new(tables.clone(), 1);

    let outcome = service.recompute_member(&member_id("m-1")).await;
    assert!(outcome.is_ok_and(|outcome| outcome.tags == tag_set(&["new-friend", "volunteer"])));

    let row = tables.row(Table::Members, "m-1").await;
    assert_eq!(
        row.as_ref().and_then(|row| row.text("manual_tags")),
        Some("volunteer".to_owned())
    );
    assert_eq!(
        row.and_then(|row| row.text("tags")),
        Some("new-friend,volunteer".to_owned())
    );
}

#[tokio::test]
async fn recompute_is_idempotent_and_skips_unchanged_writes() {
    let tables = church_tables().await;
    tables
        .seed(
            Table::Members,
            member_row("m-1", &[("faith_status", "seeker"), ("age", "40")]),
        )
        .await;
    let service = TaggingService::new(tables.clone(), 4);

    let first = service.recompute_member(&member_id("m-1")).await;
    let second = service.recompute_member(&member_id("m-1")).await;

    assert!(first.as_ref().is_ok_and(|outcome| outcome.written));
    assert!(second.as_ref().is_ok_and(|outcome| !outcome.written));
    assert_eq!(
        first.map(|outcome| outcome.tags).ok(),
        second.map(|outcome| outcome.tags).ok()
    );
    assert_eq!(tables.write_count(Table::Members).await, 1);
}

#[tokio::test]
async fn rules_for_archived_tags_are_skipped() {
    let tables = church_tables().await;
    let service = TaggingService::new(tables, 1);

    let rules = service.active_rules().await;
    assert!(rules.is_ok_and(|rules| rules.iter().all(|rule| rule.tag_id != tag("legacy"))));
}

#[tokio::test]
async fn recompute_all_counts_failures_without_aborting() {
    let tables = church_tables().await;
    tables
        .seed(Table::Members, member_row("m-1", &[("faith_status", "seeker")]))
        .await;
    tables
        .seed(Table::Members, member_row("m-2", &[("faith_status", "member")]))
        .await;
    tables
        .seed(Table::Members, member_row("m-3", &[("age", "40")]))
        .await;
    tables.fail_row(Table::Members, "m-3").await;
    let service = TaggingService::new(tables.clone(), 2);

    let summary = service.recompute_all().await;
    assert!(summary.is_ok());
    let Ok(summary) = summary else {
        return;
    };

    assert_eq!(summary.evaluated, 3);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn idle_member_locks_are_released() {
    let tables = church_tables().await;
    for id in ["m-1", "m-2", "m-3"] {
        tables
            .seed(Table::Members, member_row(id, &[("age", "40")]))
            .await;
    }
    let service = TaggingService::new(tables, 2);

    assert!(service.recompute_all().await.is_ok());
    assert!(service.recompute_member(&member_id("m-1")).await.is_ok());

    assert_eq!(service.member_locks.lock().await.len(), 1);
}

#[tokio::test]
async fn recompute_all_fails_when_rules_are_unreadable() {
    let tables = church_tables().await;
    tables.fail(Table::TagRules).await;
    let service = TaggingService::new(tables, 2);

    let result = service.recompute_all().await;
    assert!(matches!(result, Err(AppError::Unavailable(_))));
}

#[tokio::test]
async fn manual_tag_survives_recompute() {
    let tables = church_tables().await;
    tables
        .seed(Table::Members, member_row("m-1", &[("age", "12")]))
        .await;
    let service = TaggingService::new(tables.clone(), 2);

    let applied = service
        .apply_manual_tag(&member_id("m-1"), &tag("adult"))
        .await;
    assert!(applied.is_ok());

    let outcome = service.recompute_member(&member_id("m-1")).await;
    assert!(outcome.is_ok_and(|outcome| outcome.tags == tag_set(&["adult"])));
}

#[tokio::test]
async fn removing_manual_tag_keeps_rule_tag() {
    let tables = church_tables().await;
    tables
        .seed(
            Table::Members,
            member_row(
                "m-1",
                &[
                    ("age", "40"),
                    ("manual_tags", "adult"),
                    ("rule_tags", "adult"),
                ],
            ),
        )
        .await;
    let service = TaggingService::new(tables.clone(), 2);

    let member = service
        .remove_manual_tag(&member_id("m-1"), &tag("adult"))
        .await;
    assert!(member.is_ok_and(|member| member.merged_tags() == tag_set(&["adult"])));

    let again = service
        .remove_manual_tag(&member_id("m-1"), &tag("adult"))
        .await;
    assert!(matches!(again, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn archived_tag_cannot_be_applied() {
    let tables = church_tables().await;
    tables.seed(Table::Members, member_row("m-1", &[])).await;
    let service = TaggingService::new(tables, 2);

    let result = service
        .apply_manual_tag(&member_id("m-1"), &tag("legacy"))
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_manual_edits_and_recompute_do_not_clobber() {
    let tables = church_tables().await;
    tables
        .seed(
            Table::Members,
            member_row("m-1", &[("faith_status", "seeker"), ("age", "40")]),
        )
        .await;
    let service = TaggingService::new(tables.clone(), 4);

    let mut tasks = tokio::task::JoinSet::new();
    for tag_id in ["volunteer", "adult", "new-friend"] {
        let tagger = service.clone();
        tasks.spawn(async move {
            tagger
                .apply_manual_tag(&member_id("m-1"), &tag(tag_id))
                .await
                .map(|_| ())
        });
        let recomputer = service.clone();
        tasks.spawn(async move {
            recomputer
                .recompute_member(&member_id("m-1"))
                .await
                .map(|_| ())
        });
    }
    while let Some(joined) = tasks.join_next().await {
        assert!(matches!(joined, Ok(Ok(()))));
    }

    let stored = tables
        .row(Table::Members, "m-1")
        .await
        .and_then(|row| row.text("manual_tags"));
    assert_eq!(stored, Some("adult,new-friend,volunteer".to_owned()));
}

mod proptest_engine {
    use proptest::prelude::*;

    use super::*;

    const FIELDS: [&str; 3] = ["age", "faith_status", "ministry"];
    const OPERATORS: [&str; 9] = [
        "equals",
        "not_equals",
        "contains",
        "greater_than",
        "less_than",
        "in",
        "is_empty",
        "is_not_empty",
        "between",
    ];
    const VALUES: [&str; 6] = ["18", "seeker", "choir", "2024-01-01", "", "member, seeker"];

    fn rule_strategy() -> impl Strategy<Value = (usize, usize, usize, u32, bool)> {
        (0..FIELDS.len(), 0..OPERATORS.len(), 0..VALUES.len(), 0u32..4, any::<bool>())
    }

    fn build_rules(specs: &[(usize, usize, usize, u32, bool)]) -> Vec<TagRule> {
        specs
            .iter()
            .enumerate()
            .map(|(index, (field, operator, value, priority, enabled))| {
                let mut rule = rule(
                    &format!("rule-{index:02}"),
                    &format!("tag-{}", index % 4),
                    (FIELDS[*field], OPERATORS[*operator], VALUES[*value]),
                    *priority,
                );
                if !enabled {
                    rule.status = RuleStatus::Disabled;
                }
                rule
            })
            .collect()
    }

    fn member_strategy() -> impl Strategy<Value = Vec<(usize, usize)>> {
        prop::collection::vec((0..FIELDS.len(), 0..VALUES.len()), 0..3)
    }

    fn build_member(fields: &[(usize, usize)]) -> MemberSnapshot {
        let pairs: Vec<(&str, &str)> = fields
            .iter()
            .map(|(field, value)| (FIELDS[*field], VALUES[*value]))
            .collect();
        member(&pairs)
    }

    proptest! {
        #[test]
        fn evaluation_is_idempotent_and_order_free(
            specs in prop::collection::vec(rule_strategy(), 0..8),
            fields in member_strategy(),
        ) {
            let rules = build_rules(&specs);
            let member = build_member(&fields);

            let first = TagRuleEngine::evaluate(&member, &rules);
            let second = TagRuleEngine::evaluate(&member, &rules);
            prop_assert_eq!(&first, &second);

            let mut reversed = rules.clone();
            reversed.reverse();
            prop_assert_eq!(&first, &TagRuleEngine::evaluate(&member, &reversed));
        }

        #[test]
        fn disabled_rules_never_add_tags(
            specs in prop::collection::vec(rule_strategy(), 0..8),
            fields in member_strategy(),
        ) {
            let rules = build_rules(&specs);
            let member = build_member(&fields);
            let enabled_only: Vec<TagRule> =
                rules.iter().filter(|rule| rule.is_enabled()).cloned().collect();

            prop_assert_eq!(
                TagRuleEngine::evaluate(&member, &rules),
                TagRuleEngine::evaluate(&member, &enabled_only)
            );
        }
    }
}
