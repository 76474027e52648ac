use chrono::Utc;
use flock_core::{AppError, AppResult};
use flock_domain::{AssignmentStatus, RoleAssignment, RoleAssignmentId, RoleId, UserId};
use tracing::{info, warn};

use crate::table_ports::{Row, Table, decode_assignment, encode_assignment};

use super::RoleStore;

impl RoleStore {
    /// Grants a role to a user.
    ///
    /// Assigning an already-held role returns the existing assignment.
    pub async fn assign(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
        assigned_by: &UserId,
    ) -> AppResult<RoleAssignment> {
        self.tables.get(Table::Users, user_id.as_str()).await?;
        let role = self.get(role_id).await?;

        if let Some(existing) = self
            .assignments_for_user(user_id)
            .await?
            .into_iter()
            .find(|assignment| assignment.role_id == role.id)
        {
            return Ok(existing);
        }

        let assignment = RoleAssignment {
            id: RoleAssignmentId::generate(),
            user_id: user_id.clone(),
            role_id: role.id,
            assigned_by: assigned_by.clone(),
            assigned_at: Utc::now(),
            status: AssignmentStatus::Active,
            revoked_by: None,
            revoked_at: None,
        };
        self.tables
            .append(Table::RoleAssignments, encode_assignment(&assignment))
            .await?;

        info!(
            user_id = %user_id,
            role = %role.name.as_str(),
            assigned_by = %assigned_by,
            "role assigned"
        );
        Ok(assignment)
    }

    /// Revokes every active assignment of the role to the user.
    pub async fn revoke(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
        revoked_by: &UserId,
    ) -> AppResult<Vec<RoleAssignment>> {
        let matching: Vec<RoleAssignment> = self
            .assignments_for_user(user_id)
            .await?
            .into_iter()
            .filter(|assignment| assignment.role_id == *role_id)
            .collect();

        if matching.is_empty() {
            return Err(AppError::NotFound(format!(
                "user '{user_id}' holds no active assignment of role '{role_id}'"
            )));
        }

        let revoked_at = Utc::now();
        let mut revoked = Vec::with_capacity(matching.len());
        for mut assignment in matching {
            assignment.status = AssignmentStatus::Revoked;
            assignment.revoked_by = Some(revoked_by.clone());
            assignment.revoked_at = Some(revoked_at);
            let patch = Row::new()
                .with_text("status", assignment.status.as_str())
                .with_text("revoked_by", revoked_by.as_str())
                .with_text("revoked_at", revoked_at.to_rfc3339());
            self.tables
                .update_by_id(Table::RoleAssignments, assignment.id.as_str(), patch)
                .await?;
            revoked.push(assignment);
        }

        info!(user_id = %user_id, role_id = %role_id, revoked_by = %revoked_by, "role revoked");
        Ok(revoked)
    }

    /// Lists the active assignments held by a user.
    pub async fn assignments_for_user(&self, user_id: &UserId) -> AppResult<Vec<RoleAssignment>> {
        Ok(self
            .active_assignments()
            .await?
            .into_iter()
            .filter(|assignment| assignment.user_id == *user_id)
            .collect())
    }

    /// Lists every active assignment.
    pub async fn list_assignments(&self) -> AppResult<Vec<RoleAssignment>> {
        self.active_assignments().await
    }

    pub(super) async fn active_assignments(&self) -> AppResult<Vec<RoleAssignment>> {
        let rows = self.tables.list(Table::RoleAssignments).await?;

        Ok(rows
            .iter()
            .filter_map(|row| match decode_assignment(row) {
                Ok(assignment) => Some(assignment),
                Err(error) => {
                    warn!(row_id = ?row.id(), error = %error, "skipping malformed assignment row");
                    None
                }
            })
            .filter(RoleAssignment::is_active)
            .collect())
    }
}
