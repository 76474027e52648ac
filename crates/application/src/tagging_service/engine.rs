use std::collections::BTreeSet;

use flock_domain::{MemberSnapshot, RuleCondition, TagId, TagRule};
use tracing::debug;

use super::ConditionEvaluator;

/// Computes the rule-derived tag set of a member.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagRuleEngine;

impl TagRuleEngine {
    /// Returns enabled rules sorted by priority, then rule id.
    #[must_use]
    pub fn evaluation_order(rules: &[TagRule]) -> Vec<&TagRule> {
        let mut ordered: Vec<&TagRule> = rules.iter().filter(|rule| rule.is_enabled()).collect();
        ordered.sort_by(|left, right| {
            left.priority
                .cmp(&right.priority)
                .then_with(|| left.id.cmp(&right.id))
        });
        ordered
    }

    /// Evaluates every enabled rule against the member.
    ///
    /// Matches accumulate; a matching rule never suppresses a later one. The
    /// result depends only on the member fields and the rule set.
    #[must_use]
    pub fn evaluate(member: &MemberSnapshot, rules: &[TagRule]) -> BTreeSet<TagId> {
        let mut tags = BTreeSet::new();

        for rule in Self::evaluation_order(rules) {
            let matched = match &rule.condition {
                RuleCondition::Valid(condition) => {
                    ConditionEvaluator::evaluate(condition, member.field(condition.field()))
                }
                RuleCondition::Malformed(malformed) => {
                    debug!(
                        rule_id = %rule.id,
                        reason = %malformed.reason,
                        "malformed rule skipped"
                    );
                    false
                }
            };

            if matched {
                tags.insert(rule.tag_id.clone());
            }
        }

        tags
    }
}
