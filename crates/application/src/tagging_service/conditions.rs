use std::cmp::Ordering;

use flock_domain::{ConditionOperator, FieldValue, RuleCondition, TagCondition, Threshold};

/// Evaluates one condition against one member field.
///
/// Evaluation is total: absent fields and values that fail typed parsing
/// yield `false` rather than an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Evaluates a stored rule condition; malformed conditions never match.
    #[must_use]
    pub fn evaluate_rule(condition: &RuleCondition, value: Option<&FieldValue>) -> bool {
        match condition {
            RuleCondition::Valid(condition) => Self::evaluate(condition, value),
            RuleCondition::Malformed(_) => false,
        }
    }

    /// Evaluates a raw operator and operand pair.
    #[must_use]
    pub fn evaluate_raw(
        value: Option<&FieldValue>,
        operator: ConditionOperator,
        operand: &str,
    ) -> bool {
        TagCondition::parse("value", operator, operand)
            .is_ok_and(|condition| Self::evaluate(&condition, value))
    }

    /// Evaluates a validated condition.
    #[must_use]
    pub fn evaluate(condition: &TagCondition, value: Option<&FieldValue>) -> bool {
        match condition {
            TagCondition::IsEmpty { .. } => value.is_none_or(FieldValue::is_blank),
            TagCondition::IsNotEmpty { .. } => value.is_some_and(|value| !value.is_blank()),
            TagCondition::NotEquals { value: expected, .. } => {
                value.is_none_or(|value| !equals(value, expected))
            }
            TagCondition::Equals { value: expected, .. } => {
                value.is_some_and(|value| equals(value, expected))
            }
            TagCondition::Contains { value: needle, .. } => {
                value.is_some_and(|value| contains(value, needle.as_str()))
            }
            TagCondition::GreaterThan { threshold, .. } => value
                .and_then(|value| compare(value, threshold))
                .is_some_and(Ordering::is_gt),
            TagCondition::LessThan { threshold, .. } => value
                .and_then(|value| compare(value, threshold))
                .is_some_and(Ordering::is_lt),
            TagCondition::In { values, .. } => value.is_some_and(|value| {
                candidates(value)
                    .iter()
                    .any(|candidate| values.iter().any(|allowed| same_text(candidate, allowed)))
            }),
        }
    }
}

fn same_text(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}

fn equals(value: &FieldValue, expected: &str) -> bool {
    if same_text(value.as_text().as_str(), expected) {
        return true;
    }

    if let (Some(actual), Ok(expected)) = (value.as_number(), expected.trim().parse::<f64>()) {
        return actual == expected;
    }

    match (value.as_date(), flock_domain::parse_date(expected)) {
        (Some(actual), Some(expected)) => actual == expected,
        _ => false,
    }
}

fn contains(value: &FieldValue, needle: &str) -> bool {
    match value {
        FieldValue::List(items) => items.iter().any(|item| same_text(item, needle)),
        other => other
            .as_text()
            .to_lowercase()
            .contains(needle.trim().to_lowercase().as_str()),
    }
}

fn candidates(value: &FieldValue) -> Vec<String> {
    match value {
        FieldValue::List(_) => value.items(),
        other => vec![other.as_text()],
    }
}

fn compare(value: &FieldValue, threshold: &Threshold) -> Option<Ordering> {
    match threshold {
        Threshold::Number(bound) => value.as_number()?.partial_cmp(bound),
        Threshold::Date(bound) => Some(value.as_date()?.cmp(bound)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use flock_domain::{ConditionOperator, FieldValue, RuleCondition};

    use super::ConditionEvaluator;

    fn text(value: &str) -> FieldValue {
        FieldValue::Text(value.to_owned())
    }

    #[test]
    fn absent_field_only_matches_is_empty_and_not_equals() {
        for operator in [
            ConditionOperator::Equals,
            ConditionOperator::Contains,
            ConditionOperator::GreaterThan,
            ConditionOperator::LessThan,
            ConditionOperator::In,
            ConditionOperator::IsNotEmpty,
        ] {
            assert!(
                !ConditionEvaluator::evaluate_raw(None, operator, "1"),
                "{}",
                operator.as_str()
            );
        }

        assert!(ConditionEvaluator::evaluate_raw(
            None,
            ConditionOperator::IsEmpty,
            ""
        ));
        assert!(ConditionEvaluator::evaluate_raw(
            None,
            ConditionOperator::NotEquals,
            "seeker"
        ));
    }

    #[test]
    fn equals_ignores_case_and_padding() {
        let value = text(" Seeker ");
        assert!(ConditionEvaluator::evaluate_raw(
            Some(&value),
            ConditionOperator::Equals,
            "seeker"
        ));
        assert!(!ConditionEvaluator::evaluate_raw(
            Some(&value),
            ConditionOperator::NotEquals,
            "SEEKER"
        ));
    }

    #[test]
    fn equals_compares_numbers_and_dates_by_value() {
        assert!(ConditionEvaluator::evaluate_raw(
            Some(&FieldValue::Number(40.0)),
            ConditionOperator::Equals,
            "40.0"
        ));

        let date = NaiveDate::from_ymd_opt(2024, 1, 1).map(FieldValue::Date);
        assert!(ConditionEvaluator::evaluate_raw(
            date.as_ref(),
            ConditionOperator::Equals,
            "01/01/2024"
        ));
    }

    #[test]
    fn contains_matches_substrings_and_list_items() {
        assert!(ConditionEvaluator::evaluate_raw(
            Some(&text("Worship Team")),
            ConditionOperator::Contains,
            "worship"
        ));

        let list = FieldValue::List(vec!["choir".to_owned(), "ushers".to_owned()]);
        assert!(ConditionEvaluator::evaluate_raw(
            Some(&list),
            ConditionOperator::Contains,
            "Ushers"
        ));
        assert!(!ConditionEvaluator::evaluate_raw(
            Some(&list),
            ConditionOperator::Contains,
            "ush"
        ));
    }

    #[test]
    fn ordering_operators_compare_numbers_and_dates() {
        assert!(ConditionEvaluator::evaluate_raw(
            Some(&text("21")),
            ConditionOperator::GreaterThan,
            "18"
        ));
        assert!(!ConditionEvaluator::evaluate_raw(
            Some(&FieldValue::Number(18.0)),
            ConditionOperator::GreaterThan,
            "18"
        ));
        assert!(ConditionEvaluator::evaluate_raw(
            Some(&text("2023-12-31")),
            ConditionOperator::LessThan,
            "2024-01-01"
        ));
    }

    #[test]
    fn unparseable_field_value_does_not_match() {
        assert!(!ConditionEvaluator::evaluate_raw(
            Some(&text("forty")),
            ConditionOperator::GreaterThan,
            "18"
        ));
        assert!(!ConditionEvaluator::evaluate_raw(
            Some(&text("soon")),
            ConditionOperator::LessThan,
            "2024-01-01"
        ));
    }

    #[test]
    fn in_accepts_any_listed_value() {
        assert!(ConditionEvaluator::evaluate_raw(
            Some(&text("Member")),
            ConditionOperator::In,
            "visitor, member, regular"
        ));
        assert!(!ConditionEvaluator::evaluate_raw(
            Some(&text("staff")),
            ConditionOperator::In,
            "visitor, member"
        ));
    }

    #[test]
    fn blank_cell_is_empty() {
        assert!(ConditionEvaluator::evaluate_raw(
            Some(&text("   ")),
            ConditionOperator::IsEmpty,
            ""
        ));
        assert!(!ConditionEvaluator::evaluate_raw(
            Some(&text("   ")),
            ConditionOperator::IsNotEmpty,
            ""
        ));
    }

    #[test]
    fn malformed_rule_condition_never_matches() {
        let condition = RuleCondition::from_parts("age", "greater_than", "eighteen");
        assert!(!ConditionEvaluator::evaluate_rule(&condition, Some(&text("40"))));

        let condition = RuleCondition::from_parts("age", "between", "1,2");
        assert!(!ConditionEvaluator::evaluate_rule(&condition, None));
    }
}
