use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use flock_core::AppResult;
use flock_domain::{MemberId, MemberSnapshot, TagId, TagRule};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;

use crate::table_ports::{
    Table, TableService, decode_member, decode_rule, decode_tag, decode_tag_list, member_tags_patch,
};

mod conditions;
mod engine;
mod manual;
mod recompute;

#[cfg(test)]
mod tests;

pub use conditions::ConditionEvaluator;
pub use engine::TagRuleEngine;

/// Result of re-evaluating one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberTagOutcome {
    /// Evaluated member.
    pub member_id: MemberId,
    /// Merged manual and rule-derived tags after evaluation.
    pub tags: BTreeSet<TagId>,
    /// Rule-derived tags gained.
    pub added: BTreeSet<TagId>,
    /// Rule-derived tags lost.
    pub removed: BTreeSet<TagId>,
    /// Whether the member row was written.
    pub written: bool,
}

/// Counters for a bulk recompute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecomputeSummary {
    /// Members evaluated.
    pub evaluated: usize,
    /// Members whose tags were rewritten.
    pub updated: usize,
    /// Members left untouched.
    pub unchanged: usize,
    /// Members whose evaluation or write failed.
    pub failed: usize,
}

/// Runs the rule engine against stored members and writes tags back.
///
/// Writes for one member are serialized through an in-process lock and the
/// member row is re-read after the lock is taken, so concurrent manual
/// edits are never overwritten with a stale copy.
#[derive(Clone)]
pub struct TaggingService {
    tables: Arc<dyn TableService>,
    member_locks: Arc<Mutex<HashMap<MemberId, Arc<Mutex<()>>>>>,
    concurrency: usize,
}

impl TaggingService {
    /// Creates a tagging service; `concurrency` bounds bulk recompute.
    #[must_use]
    pub fn new(tables: Arc<dyn TableService>, concurrency: usize) -> Self {
        Self {
            tables,
            member_locks: Arc::new(Mutex::new(HashMap::new())),
            concurrency: concurrency.max(1),
        }
    }

    /// Loads rules whose target tag exists and is active.
    pub async fn active_rules(&self) -> AppResult<Vec<TagRule>> {
        let (tag_rows, rule_rows) = tokio::try_join!(
            self.tables.list(Table::Tags),
            self.tables.list(Table::TagRules)
        )?;

        let active_tags: BTreeSet<TagId> = tag_rows
            .iter()
            .filter_map(|row| match decode_tag(row) {
                Ok(tag) => Some(tag),
                Err(error) => {
                    warn!(row_id = ?row.id(), error = %error, "skipping malformed tag row");
                    None
                }
            })
            .filter(|tag| tag.is_active())
            .map(|tag| tag.id)
            .collect();

        Ok(rule_rows
            .iter()
            .filter_map(|row| match decode_rule(row) {
                Ok(rule) => Some(rule),
                Err(error) => {
                    warn!(row_id = ?row.id(), error = %error, "skipping malformed tag rule row");
                    None
                }
            })
            .filter(|rule| {
                let targets_active_tag = active_tags.contains(&rule.tag_id);
                if !targets_active_tag {
                    warn!(
                        rule_id = %rule.id,
                        tag_id = %rule.tag_id,
                        "rule targets an unknown or inactive tag"
                    );
                }
                targets_active_tag
            })
            .collect())
    }

    async fn lock_member(&self, member_id: &MemberId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.member_locks.lock().await;
            // Entries only the map still references are idle.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(member_id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// Reads a member and the merged tag list currently stored on it.
    async fn load_member(
        &self,
        member_id: &MemberId,
    ) -> AppResult<(MemberSnapshot, BTreeSet<TagId>)> {
        let row = self.tables.get(Table::Members, member_id.as_str()).await?;
        let member = decode_member(&row)?;
        Ok((member, decode_tag_list(row.get("tags"))))
    }

    async fn write_member(&self, member: &MemberSnapshot) -> AppResult<()> {
        self.tables
            .update_by_id(Table::Members, member.id.as_str(), member_tags_patch(member))
            .await?;
        Ok(())
    }
}
