use flock_core::{AppError, AppResult};
use flock_domain::{MemberId, MemberSnapshot, TagId};
use tracing::info;

use crate::table_ports::{Table, decode_tag};

use super::TaggingService;

impl TaggingService {
    /// Adds a human-applied tag; rule evaluation never removes it.
    pub async fn apply_manual_tag(
        &self,
        member_id: &MemberId,
        tag_id: &TagId,
    ) -> AppResult<MemberSnapshot> {
        let tag = decode_tag(&self.tables.get(Table::Tags, tag_id.as_str()).await?)?;
        if !tag.is_active() {
            return Err(AppError::Validation(format!(
                "tag '{}' is archived",
                tag.name.as_str()
            )));
        }

        let _guard = self.lock_member(member_id).await;
        let (mut member, stored) = self.load_member(member_id).await?;
        let inserted = member.manual_tags.insert(tag.id);
        if inserted || member.merged_tags() != stored {
            self.write_member(&member).await?;
        }

        info!(member_id = %member_id, tag_id = %tag_id, "manual tag applied");
        Ok(member)
    }

    /// Removes a human-applied tag; rule-derived tags are untouched.
    pub async fn remove_manual_tag(
        &self,
        member_id: &MemberId,
        tag_id: &TagId,
    ) -> AppResult<MemberSnapshot> {
        let _guard = self.lock_member(member_id).await;
        let (mut member, _) = self.load_member(member_id).await?;
        if !member.manual_tags.remove(tag_id) {
            return Err(AppError::NotFound(format!(
                "member '{member_id}' has no manual tag '{tag_id}'"
            )));
        }

        self.write_member(&member).await?;
        info!(member_id = %member_id, tag_id = %tag_id, "manual tag removed");
        Ok(member)
    }
}
