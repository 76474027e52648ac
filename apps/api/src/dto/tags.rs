use flock_application::{MemberTagOutcome, RecomputeSummary};
use flock_domain::{MemberSnapshot, RuleCondition, Tag, TagId, TagRule};
use serde::{Deserialize, Serialize};

/// Incoming payload for tag creation.
#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    pub category: Option<String>,
}

/// Rule condition as submitted by clients.
#[derive(Debug, Deserialize)]
pub struct RuleConditionRequest {
    pub field: String,
    pub operator: String,
    #[serde(default)]
    pub value: String,
}

/// Incoming payload for tag rule creation.
#[derive(Debug, Deserialize)]
pub struct CreateTagRuleRequest {
    pub tag_id: String,
    pub condition: RuleConditionRequest,
    #[serde(default)]
    pub priority: u32,
    pub status: Option<String>,
}

/// Incoming payload for tag rule edits.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTagRuleRequest {
    pub condition: Option<RuleConditionRequest>,
    pub priority: Option<u32>,
    pub status: Option<String>,
}

/// Incoming payload for applying a manual tag.
#[derive(Debug, Deserialize)]
pub struct ApplyMemberTagRequest {
    pub tag_id: String,
}

/// API representation of a tag.
#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub tag_id: String,
    pub name: String,
    pub category: Option<String>,
    pub status: &'static str,
}

impl From<Tag> for TagResponse {
    fn from(value: Tag) -> Self {
        Self {
            tag_id: value.id.into(),
            name: value.name.into(),
            category: value.category,
            status: value.status.as_str(),
        }
    }
}

/// API representation of a tag rule.
///
/// `malformed` carries the parse failure of a stored condition the engine
/// skips.
#[derive(Debug, Serialize)]
pub struct TagRuleResponse {
    pub rule_id: String,
    pub tag_id: String,
    pub field: String,
    pub operator: String,
    pub value: String,
    pub priority: u32,
    pub status: &'static str,
    pub malformed: Option<String>,
}

impl From<TagRule> for TagRuleResponse {
    fn from(value: TagRule) -> Self {
        let (field, operator, operand) = value.condition.to_parts();
        let malformed = match value.condition {
            RuleCondition::Valid(_) => None,
            RuleCondition::Malformed(malformed) => Some(malformed.reason),
        };

        Self {
            rule_id: value.id.into(),
            tag_id: value.tag_id.into(),
            field,
            operator,
            value: operand,
            priority: value.priority,
            status: value.status.as_str(),
            malformed,
        }
    }
}

/// Counters of a bulk re-tag.
#[derive(Debug, Serialize)]
pub struct RecomputeSummaryResponse {
    pub evaluated: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl From<RecomputeSummary> for RecomputeSummaryResponse {
    fn from(value: RecomputeSummary) -> Self {
        Self {
            evaluated: value.evaluated,
            updated: value.updated,
            unchanged: value.unchanged,
            failed: value.failed,
        }
    }
}

/// Rule write result together with the re-tag it triggered.
///
/// `recompute` is `null` when the rule was saved but the re-tag failed.
#[derive(Debug, Serialize)]
pub struct TagRuleWriteResponse {
    pub rule: TagRuleResponse,
    pub recompute: Option<RecomputeSummaryResponse>,
}

/// Result of re-tagging one member.
#[derive(Debug, Serialize)]
pub struct MemberTagOutcomeResponse {
    pub member_id: String,
    pub tags: Vec<String>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub written: bool,
}

impl From<MemberTagOutcome> for MemberTagOutcomeResponse {
    fn from(value: MemberTagOutcome) -> Self {
        Self {
            member_id: value.member_id.into(),
            tags: tag_ids(value.tags),
            added: tag_ids(value.added),
            removed: tag_ids(value.removed),
            written: value.written,
        }
    }
}

/// Tag state of one member.
#[derive(Debug, Serialize)]
pub struct MemberTagsResponse {
    pub member_id: String,
    pub manual_tags: Vec<String>,
    pub rule_tags: Vec<String>,
    pub tags: Vec<String>,
}

impl From<MemberSnapshot> for MemberTagsResponse {
    fn from(value: MemberSnapshot) -> Self {
        let tags = tag_ids(value.merged_tags());

        Self {
            member_id: value.id.into(),
            manual_tags: tag_ids(value.manual_tags),
            rule_tags: tag_ids(value.rule_tags),
            tags,
        }
    }
}

fn tag_ids(tags: impl IntoIterator<Item = TagId>) -> Vec<String> {
    tags.into_iter().map(String::from).collect()
}
