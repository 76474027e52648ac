use std::collections::BTreeSet;
use std::sync::Arc;

use flock_core::{AppError, AppResult};
use flock_domain::{MemberId, TagRule};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::table_ports::Table;

use super::{MemberTagOutcome, RecomputeSummary, TagRuleEngine, TaggingService};

impl TaggingService {
    /// Re-evaluates one member against the current rule set.
    pub async fn recompute_member(&self, member_id: &MemberId) -> AppResult<MemberTagOutcome> {
        let rules = self.active_rules().await?;
        self.apply_rules(member_id, &rules).await
    }

    /// Re-evaluates every member concurrently.
    ///
    /// Per-member failures are counted in the summary; only failing to read
    /// the rule set or the member list aborts the run.
    pub async fn recompute_all(&self) -> AppResult<RecomputeSummary> {
        let (rules, member_rows) =
            tokio::try_join!(self.active_rules(), self.tables.list(Table::Members))?;
        let rules = Arc::new(rules);
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let mut tasks = JoinSet::new();
        let mut summary = RecomputeSummary::default();
        for member_id in member_rows
            .iter()
            .filter_map(|row| row.id())
            .filter_map(|id| MemberId::new(id).ok())
        {
            summary.evaluated += 1;
            let service = self.clone();
            let rules = Arc::clone(&rules);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => service.apply_rules(&member_id, &rules).await,
                    Err(error) => Err(AppError::Internal(format!(
                        "recompute semaphore closed: {error}"
                    ))),
                };
                (member_id, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(outcome))) if outcome.written => summary.updated += 1,
                Ok((_, Ok(_))) => summary.unchanged += 1,
                Ok((member_id, Err(error))) => {
                    warn!(member_id = %member_id, error = %error, "member recompute failed");
                    summary.failed += 1;
                }
                Err(error) => {
                    warn!(error = %error, "member recompute task aborted");
                    summary.failed += 1;
                }
            }
        }

        info!(
            evaluated = summary.evaluated,
            updated = summary.updated,
            unchanged = summary.unchanged,
            failed = summary.failed,
            rules = rules.len(),
            "tag recompute finished"
        );
        Ok(summary)
    }

    async fn apply_rules(
        &self,
        member_id: &MemberId,
        rules: &[TagRule],
    ) -> AppResult<MemberTagOutcome> {
        let _guard = self.lock_member(member_id).await;
        let (mut member, stored) = self.load_member(member_id).await?;

        let derived = TagRuleEngine::evaluate(&member, rules);
        let added: BTreeSet<_> = derived.difference(&member.rule_tags).cloned().collect();
        let removed: BTreeSet<_> = member.rule_tags.difference(&derived).cloned().collect();
        member.rule_tags = derived;

        let tags = member.merged_tags();
        let written = !added.is_empty() || !removed.is_empty() || tags != stored;
        if written {
            self.write_member(&member).await?;
        }

        debug!(
            member_id = %member_id,
            added = added.len(),
            removed = removed.len(),
            written,
            "member tags evaluated"
        );
        Ok(MemberTagOutcome {
            member_id: member.id,
            tags,
            added,
            removed,
            written,
        })
    }
}
