use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate};

use crate::{MemberId, TagId};

/// Typed cell value read from a record row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Free text.
    Text(String),
    /// Numeric cell.
    Number(f64),
    /// Date cell.
    Date(NaiveDate),
    /// Checkbox cell.
    Bool(bool),
    /// Multi-valued cell.
    List(Vec<String>),
}

impl FieldValue {
    /// Renders the value the way it is written back to a row.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(number) => format_number(*number),
            Self::Date(date) => date.format("%Y-%m-%d").to_string(),
            Self::Bool(flag) => flag.to_string(),
            Self::List(items) => items.join(", "),
        }
    }

    /// Returns the value as a finite number, parsing text cells.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        let number = match self {
            Self::Number(number) => *number,
            Self::Text(text) => text.trim().parse::<f64>().ok()?,
            Self::Date(_) | Self::Bool(_) | Self::List(_) => return None,
        };

        number.is_finite().then_some(number)
    }

    /// Returns the value as a calendar date, parsing text cells.
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(date) => Some(*date),
            Self::Text(text) => parse_date(text),
            Self::Number(_) | Self::Bool(_) | Self::List(_) => None,
        }
    }

    /// Returns the individual items of a multi-valued cell.
    ///
    /// Text cells are split on commas so a delimited column behaves like a list.
    #[must_use]
    pub fn items(&self) -> Vec<String> {
        match self {
            Self::List(items) => items
                .iter()
                .map(|item| item.trim().to_owned())
                .filter(|item| !item.is_empty())
                .collect(),
            Self::Text(text) => split_list(text),
            other => vec![other.as_text()],
        }
    }

    /// Returns whether the cell holds no meaningful content.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::List(items) => items.iter().all(|item| item.trim().is_empty()),
            Self::Number(_) | Self::Date(_) | Self::Bool(_) => false,
        }
    }
}

/// Parses the date layouts found in spreadsheet cells.
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|timestamp| timestamp.date_naive())
        })
        .or_else(|| NaiveDate::parse_from_str(trimmed, "%m/%d/%Y").ok())
}

/// Splits a comma-delimited cell into trimmed, non-empty items.
#[must_use]
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{number:.0}")
    } else {
        number.to_string()
    }
}

/// Member record as seen by the tagging engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSnapshot {
    /// Member identifier.
    pub id: MemberId,
    /// Column values keyed by column name.
    pub fields: BTreeMap<String, FieldValue>,
    /// Tags a human applied; never removed by rule evaluation.
    pub manual_tags: BTreeSet<TagId>,
    /// Tags produced by the last rule evaluation.
    pub rule_tags: BTreeSet<TagId>,
}

impl MemberSnapshot {
    /// Creates a snapshot with no tags.
    #[must_use]
    pub fn new(id: MemberId, fields: BTreeMap<String, FieldValue>) -> Self {
        Self {
            id,
            fields,
            manual_tags: BTreeSet::new(),
            rule_tags: BTreeSet::new(),
        }
    }

    /// Returns a named field value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Returns the union of manual and rule-derived tags.
    #[must_use]
    pub fn merged_tags(&self) -> BTreeSet<TagId> {
        self.manual_tags.union(&self.rule_tags).cloned().collect()
    }
}
