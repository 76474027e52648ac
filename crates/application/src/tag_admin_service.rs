use std::sync::Arc;

use flock_core::{AppError, AppResult, NonEmptyString, UserIdentity};
use flock_domain::{
    Action, MemberId, MemberSnapshot, Permission, Resource, RuleCondition, RuleStatus, Tag,
    TagCondition, TagId, TagRule, TagRuleId, TagStatus,
};
use tracing::{info, warn};

use crate::table_ports::{Table, TableService, decode_rule, decode_tag, encode_rule, encode_tag};
use crate::{AuthorizationGate, MemberTagOutcome, RecomputeSummary, TagRuleEngine, TaggingService};

#[cfg(test)]
mod tests;

/// Input payload for creating a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTagInput {
    /// Display name, unique ignoring case.
    pub name: NonEmptyString,
    /// Optional grouping.
    pub category: Option<String>,
}

/// Input payload for creating a tag rule.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTagRuleInput {
    /// Tag applied on match.
    pub tag_id: TagId,
    /// Condition evaluated against a member field.
    pub condition: TagCondition,
    /// Evaluation order, lowest first.
    pub priority: u32,
    /// Initial status.
    pub status: RuleStatus,
}

/// Partial update for a tag rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagRulePatch {
    /// Replacement condition.
    pub condition: Option<TagCondition>,
    /// New priority.
    pub priority: Option<u32>,
    /// New status.
    pub status: Option<RuleStatus>,
}

/// Tag and rule administration plus member-facing tag operations.
///
/// Rule writes trigger a bulk recompute so stored member tags follow the
/// new rule set.
#[derive(Clone)]
pub struct TagAdminService {
    gate: AuthorizationGate,
    tables: Arc<dyn TableService>,
    tagging: TaggingService,
}

impl TagAdminService {
    /// Creates a new tag administration service.
    #[must_use]
    pub fn new(
        gate: AuthorizationGate,
        tables: Arc<dyn TableService>,
        tagging: TaggingService,
    ) -> Self {
        Self {
            gate,
            tables,
            tagging,
        }
    }

    /// Lists every tag.
    pub async fn list_tags(&self, actor: &UserIdentity) -> AppResult<Vec<Tag>> {
        self.require(actor, Resource::Settings, Action::Read).await?;
        self.tags().await
    }

    /// Creates a tag.
    pub async fn create_tag(&self, actor: &UserIdentity, input: CreateTagInput) -> AppResult<Tag> {
        self.require(actor, Resource::Settings, Action::Update).await?;

        let wanted = input.name.as_str().trim().to_lowercase();
        if self
            .tags()
            .await?
            .iter()
            .any(|tag| tag.name.as_str().trim().to_lowercase() == wanted)
        {
            return Err(AppError::Conflict(format!(
                "tag '{}' already exists",
                input.name.as_str()
            )));
        }

        let tag = Tag {
            id: TagId::generate(),
            name: input.name,
            category: input
                .category
                .map(|category| category.trim().to_owned())
                .filter(|category| !category.is_empty()),
            status: TagStatus::Active,
        };
        self.tables.append(Table::Tags, encode_tag(&tag)).await?;

        info!(actor = %actor.subject(), tag_id = %tag.id, "created tag");
        Ok(tag)
    }

    /// Lists every rule in evaluation order, disabled rules last.
    pub async fn list_rules(&self, actor: &UserIdentity) -> AppResult<Vec<TagRule>> {
        self.require(actor, Resource::Settings, Action::Read).await?;

        let rows = self.tables.list(Table::TagRules).await?;
        let rules: Vec<TagRule> = rows
            .iter()
            .filter_map(|row| match decode_rule(row) {
                Ok(rule) => Some(rule),
                Err(error) => {
                    warn!(row_id = ?row.id(), error = %error, "skipping malformed tag rule row");
                    None
                }
            })
            .collect();

        let mut ordered: Vec<TagRule> = TagRuleEngine::evaluation_order(&rules)
            .into_iter()
            .cloned()
            .collect();
        ordered.extend(rules.iter().filter(|rule| !rule.is_enabled()).cloned());
        Ok(ordered)
    }

    /// Creates a rule and re-tags every member.
    ///
    /// The rule is saved before the re-tag starts; a failed re-tag yields
    /// `None` instead of an error so callers never retry a saved write.
    pub async fn create_rule(
        &self,
        actor: &UserIdentity,
        input: CreateTagRuleInput,
    ) -> AppResult<(TagRule, Option<RecomputeSummary>)> {
        self.require(actor, Resource::Settings, Action::Update).await?;
        self.ensure_active_tag(&input.tag_id).await?;

        let rule = TagRule {
            id: TagRuleId::generate(),
            tag_id: input.tag_id,
            condition: RuleCondition::Valid(input.condition),
            priority: input.priority,
            status: input.status,
        };
        self.tables.append(Table::TagRules, encode_rule(&rule)).await?;
        info!(actor = %actor.subject(), rule_id = %rule.id, "created tag rule");

        let summary = self.retag_after_rule_write(&rule.id).await;
        Ok((rule, summary))
    }

    /// Updates a rule and re-tags every member; see [`Self::create_rule`].
    pub async fn update_rule(
        &self,
        actor: &UserIdentity,
        rule_id: &TagRuleId,
        patch: TagRulePatch,
    ) -> AppResult<(TagRule, Option<RecomputeSummary>)> {
        self.require(actor, Resource::Settings, Action::Update).await?;

        let mut rule = decode_rule(&self.tables.get(Table::TagRules, rule_id.as_str()).await?)?;
        if let Some(condition) = patch.condition {
            rule.condition = RuleCondition::Valid(condition);
        }
        if let Some(priority) = patch.priority {
            rule.priority = priority;
        }
        if let Some(status) = patch.status {
            rule.status = status;
        }
        if rule.is_enabled() {
            self.ensure_active_tag(&rule.tag_id).await?;
        }

        self.tables
            .update_by_id(Table::TagRules, rule_id.as_str(), encode_rule(&rule))
            .await?;
        info!(actor = %actor.subject(), rule_id = %rule.id, "updated tag rule");

        let summary = self.retag_after_rule_write(&rule.id).await;
        Ok((rule, summary))
    }

    /// Re-tags every member.
    pub async fn recompute_all(&self, actor: &UserIdentity) -> AppResult<RecomputeSummary> {
        self.require(actor, Resource::Settings, Action::Update).await?;
        self.tagging.recompute_all().await
    }

    /// Re-tags one member.
    pub async fn recompute_member(
        &self,
        actor: &UserIdentity,
        member_id: &MemberId,
    ) -> AppResult<MemberTagOutcome> {
        self.require(actor, Resource::Members, Action::Update).await?;
        self.tagging.recompute_member(member_id).await
    }

    /// Applies a manual tag to a member.
    pub async fn apply_manual_tag(
        &self,
        actor: &UserIdentity,
        member_id: &MemberId,
        tag_id: &TagId,
    ) -> AppResult<MemberSnapshot> {
        self.require(actor, Resource::Members, Action::Update).await?;
        self.tagging.apply_manual_tag(member_id, tag_id).await
    }

    /// Removes a manual tag from a member.
    pub async fn remove_manual_tag(
        &self,
        actor: &UserIdentity,
        member_id: &MemberId,
        tag_id: &TagId,
    ) -> AppResult<MemberSnapshot> {
        self.require(actor, Resource::Members, Action::Update).await?;
        self.tagging.remove_manual_tag(member_id, tag_id).await
    }

    async fn retag_after_rule_write(&self, rule_id: &TagRuleId) -> Option<RecomputeSummary> {
        match self.tagging.recompute_all().await {
            Ok(summary) => Some(summary),
            Err(error) => {
                warn!(
                    rule_id = %rule_id,
                    error = %error,
                    "rule saved but member re-tag failed"
                );
                None
            }
        }
    }

    async fn tags(&self) -> AppResult<Vec<Tag>> {
        let rows = self.tables.list(Table::Tags).await?;

        Ok(rows
            .iter()
            .filter_map(|row| match decode_tag(row) {
                Ok(tag) => Some(tag),
                Err(error) => {
                    warn!(row_id = ?row.id(), error = %error, "skipping malformed tag row");
                    None
                }
            })
            .collect())
    }

    async fn ensure_active_tag(&self, tag_id: &TagId) -> AppResult<()> {
        let tag = decode_tag(&self.tables.get(Table::Tags, tag_id.as_str()).await?)?;
        if !tag.is_active() {
            return Err(AppError::Validation(format!(
                "tag '{}' is archived",
                tag.name.as_str()
            )));
        }

        Ok(())
    }

    async fn require(
        &self,
        actor: &UserIdentity,
        resource: Resource,
        action: Action,
    ) -> AppResult<()> {
        self.gate
            .require_actor(actor, Permission::new(resource, action)?)
            .await
            .map(|_| ())
    }
}
