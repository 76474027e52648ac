use std::str::FromStr;

use chrono::NaiveDate;
use flock_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::member::{parse_date, split_list};
use crate::{TagId, TagRuleId};

/// Lifecycle state of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagStatus {
    /// Tag can be applied.
    Active,
    /// Tag is kept for history but no longer applied by rules.
    Archived,
}

impl TagStatus {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }
}

impl FromStr for TagStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "archived" | "inactive" => Ok(Self::Archived),
            _ => Err(AppError::Validation(format!("unknown tag status '{value}'"))),
        }
    }
}

/// Label applicable to a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Stable tag identifier.
    pub id: TagId,
    /// Display name.
    pub name: NonEmptyString,
    /// Optional grouping such as `faith` or `ministry`.
    pub category: Option<String>,
    /// Lifecycle state.
    pub status: TagStatus,
}

impl Tag {
    /// Returns whether rules may apply this tag.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == TagStatus::Active
    }
}

/// Whether a rule participates in evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    /// Rule is evaluated.
    Enabled,
    /// Rule is ignored.
    Disabled,
}

impl RuleStatus {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }
}

impl FromStr for RuleStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "enabled" => Ok(Self::Enabled),
            "disabled" => Ok(Self::Disabled),
            _ => Err(AppError::Validation(format!("unknown rule status '{value}'"))),
        }
    }
}

/// Operators accepted in a tag rule condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    /// Case-insensitive equality.
    Equals,
    /// Negated equality; true for absent fields.
    NotEquals,
    /// Substring or list membership.
    Contains,
    /// Numeric or date comparison.
    GreaterThan,
    /// Numeric or date comparison.
    LessThan,
    /// Membership in a comma-delimited operand list.
    In,
    /// Absent or blank field.
    IsEmpty,
    /// Present, non-blank field.
    IsNotEmpty,
}

impl ConditionOperator {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Contains => "contains",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::In => "in",
            Self::IsEmpty => "is_empty",
            Self::IsNotEmpty => "is_not_empty",
        }
    }
}

impl FromStr for ConditionOperator {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "equals" => Ok(Self::Equals),
            "not_equals" => Ok(Self::NotEquals),
            "contains" => Ok(Self::Contains),
            "greater_than" => Ok(Self::GreaterThan),
            "less_than" => Ok(Self::LessThan),
            "in" => Ok(Self::In),
            "is_empty" => Ok(Self::IsEmpty),
            "is_not_empty" => Ok(Self::IsNotEmpty),
            _ => Err(AppError::Validation(format!(
                "unknown condition operator '{value}'"
            ))),
        }
    }
}

/// Typed bound for ordering comparisons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    /// Numeric bound.
    Number(f64),
    /// Calendar date bound.
    Date(NaiveDate),
}

impl Threshold {
    /// Parses a numeric bound, falling back to a date bound.
    pub fn parse(value: &str) -> AppResult<Self> {
        let trimmed = value.trim();
        if let Ok(number) = trimmed.parse::<f64>()
            && number.is_finite()
        {
            return Ok(Self::Number(number));
        }

        parse_date(trimmed).map(Self::Date).ok_or_else(|| {
            AppError::Validation(format!(
                "comparison operand '{trimmed}' is neither a number nor a date"
            ))
        })
    }

    fn render(&self) -> String {
        match self {
            Self::Number(number) => number.to_string(),
            Self::Date(date) => date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Validated rule condition; each operator carries only the operand it uses.
#[derive(Debug, Clone, PartialEq)]
pub enum TagCondition {
    /// Field equals the value.
    Equals {
        /// Member column.
        field: NonEmptyString,
        /// Expected value.
        value: String,
    },
    /// Field differs from the value.
    NotEquals {
        /// Member column.
        field: NonEmptyString,
        /// Rejected value.
        value: String,
    },
    /// Field contains the value.
    Contains {
        /// Member column.
        field: NonEmptyString,
        /// Needle.
        value: NonEmptyString,
    },
    /// Field is greater than the bound.
    GreaterThan {
        /// Member column.
        field: NonEmptyString,
        /// Exclusive lower bound.
        threshold: Threshold,
    },
    /// Field is less than the bound.
    LessThan {
        /// Member column.
        field: NonEmptyString,
        /// Exclusive upper bound.
        threshold: Threshold,
    },
    /// Field is one of the listed values.
    In {
        /// Member column.
        field: NonEmptyString,
        /// Accepted values.
        values: Vec<String>,
    },
    /// Field is absent or blank.
    IsEmpty {
        /// Member column.
        field: NonEmptyString,
    },
    /// Field is present and not blank.
    IsNotEmpty {
        /// Member column.
        field: NonEmptyString,
    },
}

impl TagCondition {
    /// Builds a condition from its stored parts.
    pub fn parse(field: &str, operator: ConditionOperator, value: &str) -> AppResult<Self> {
        let field = NonEmptyString::new(field.trim())?;
        let value = value.trim();

        let condition = match operator {
            ConditionOperator::Equals => Self::Equals {
                field,
                value: value.to_owned(),
            },
            ConditionOperator::NotEquals => Self::NotEquals {
                field,
                value: value.to_owned(),
            },
            ConditionOperator::Contains => Self::Contains {
                field,
                value: NonEmptyString::new(value)?,
            },
            ConditionOperator::GreaterThan => Self::GreaterThan {
                field,
                threshold: Threshold::parse(value)?,
            },
            ConditionOperator::LessThan => Self::LessThan {
                field,
                threshold: Threshold::parse(value)?,
            },
            ConditionOperator::In => {
                let values = split_list(value);
                if values.is_empty() {
                    return Err(AppError::Validation(
                        "'in' conditions require at least one value".to_owned(),
                    ));
                }
                Self::In { field, values }
            }
            ConditionOperator::IsEmpty => Self::IsEmpty { field },
            ConditionOperator::IsNotEmpty => Self::IsNotEmpty { field },
        };

        Ok(condition)
    }

    /// Returns the member column the condition reads.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Equals { field, .. }
            | Self::NotEquals { field, .. }
            | Self::Contains { field, .. }
            | Self::GreaterThan { field, .. }
            | Self::LessThan { field, .. }
            | Self::In { field, .. }
            | Self::IsEmpty { field }
            | Self::IsNotEmpty { field } => field.as_str(),
        }
    }

    /// Returns the condition operator.
    #[must_use]
    pub fn operator(&self) -> ConditionOperator {
        match self {
            Self::Equals { .. } => ConditionOperator::Equals,
            Self::NotEquals { .. } => ConditionOperator::NotEquals,
            Self::Contains { .. } => ConditionOperator::Contains,
            Self::GreaterThan { .. } => ConditionOperator::GreaterThan,
            Self::LessThan { .. } => ConditionOperator::LessThan,
            Self::In { .. } => ConditionOperator::In,
            Self::IsEmpty { .. } => ConditionOperator::IsEmpty,
            Self::IsNotEmpty { .. } => ConditionOperator::IsNotEmpty,
        }
    }

    /// Returns the operand as written to the `condition_value` column.
    #[must_use]
    pub fn operand(&self) -> String {
        match self {
            Self::Equals { value, .. } | Self::NotEquals { value, .. } => value.clone(),
            Self::Contains { value, .. } => value.as_str().to_owned(),
            Self::GreaterThan { threshold, .. } | Self::LessThan { threshold, .. } => {
                threshold.render()
            }
            Self::In { values, .. } => values.join(","),
            Self::IsEmpty { .. } | Self::IsNotEmpty { .. } => String::new(),
        }
    }
}

/// Stored condition that could not be turned into a [`TagCondition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedCondition {
    /// Raw `condition_field` cell.
    pub field: String,
    /// Raw `condition_operator` cell.
    pub operator: String,
    /// Raw `condition_value` cell.
    pub value: String,
    /// Why parsing failed.
    pub reason: String,
}

/// Condition attached to a stored rule.
///
/// A malformed condition never matches, so one bad row cannot stop the rest
/// of the rule set from being evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleCondition {
    /// Parsed condition.
    Valid(TagCondition),
    /// Unparseable condition that evaluates to no match.
    Malformed(MalformedCondition),
}

impl RuleCondition {
    /// Parses stored cells, keeping failures as [`RuleCondition::Malformed`].
    #[must_use]
    pub fn from_parts(field: &str, operator: &str, value: &str) -> Self {
        let parsed = ConditionOperator::from_str(operator.trim().to_lowercase().as_str())
            .and_then(|operator| TagCondition::parse(field, operator, value));

        match parsed {
            Ok(condition) => Self::Valid(condition),
            Err(error) => Self::Malformed(MalformedCondition {
                field: field.to_owned(),
                operator: operator.to_owned(),
                value: value.to_owned(),
                reason: error.to_string(),
            }),
        }
    }

    /// Returns the raw `(field, operator, value)` cells for storage.
    #[must_use]
    pub fn to_parts(&self) -> (String, String, String) {
        match self {
            Self::Valid(condition) => (
                condition.field().to_owned(),
                condition.operator().as_str().to_owned(),
                condition.operand(),
            ),
            Self::Malformed(malformed) => (
                malformed.field.clone(),
                malformed.operator.clone(),
                malformed.value.clone(),
            ),
        }
    }
}

/// Rule that applies a tag when its condition matches.
#[derive(Debug, Clone, PartialEq)]
pub struct TagRule {
    /// Stable rule identifier; breaks priority ties.
    pub id: TagRuleId,
    /// Tag applied on match.
    pub tag_id: TagId,
    /// Condition evaluated against one member field.
    pub condition: RuleCondition,
    /// Evaluation order, lowest first.
    pub priority: u32,
    /// Whether the rule participates.
    pub status: RuleStatus,
}

impl TagRule {
    /// Returns whether the rule participates in evaluation.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.status == RuleStatus::Enabled
    }
}
