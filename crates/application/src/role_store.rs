use std::collections::BTreeSet;
use std::sync::Arc;

use flock_core::{AppError, AppResult};
use flock_domain::{Permission, Role, RoleId, RoleName, RolePatch, RoleStatus, SystemRole};
use tracing::{info, warn};

use crate::table_ports::{Row, Table, TableService, decode_role, encode_role};

mod assignments;


/// Input payload for creating custom roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Requested role name.
    pub name: RoleName,
    /// Grants attached to the role.
    pub permissions: BTreeSet<Permission>,
}

/// Role and role assignment persistence over the record store.
///
/// Deletion is a status transition: deleted roles and revoked assignments
/// stay in their tables and are invisible to every read below.
#[derive(Clone)]
pub struct RoleStore {
    tables: Arc<dyn TableService>,
}

impl RoleStore {
    /// Creates a store over a table service.
    #[must_use]
    pub fn new(tables: Arc<dyn TableService>) -> Self {
        Self { tables }
    }

    /// Lists active roles, skipping rows that fail to decode.
    pub async fn list(&self) -> AppResult<Vec<Role>> {
        let rows = self.tables.list(Table::Roles).await?;

        Ok(rows
            .iter()
            .filter_map(|row| match decode_role(row) {
                Ok(role) => Some(role),
                Err(error) => {
                    warn!(row_id = ?row.id(), error = %error, "skipping malformed role row");
                    None
                }
            })
            .filter(Role::is_active)
            .collect())
    }

    /// Returns one active role.
    pub async fn get(&self, role_id: &RoleId) -> AppResult<Role> {
        let row = self.tables.get(Table::Roles, role_id.as_str()).await?;
        let role = decode_role(&row)?;
        if !role.is_active() {
            return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
        }

        Ok(role)
    }

    /// Finds an active role by name; invalid names match nothing.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        let Ok(name) = RoleName::new(name) else {
            return Ok(None);
        };

        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|role| role.name == name))
    }

    /// Creates a custom role.
    pub async fn create(&self, input: CreateRoleInput) -> AppResult<Role> {
        self.insert(input.name, input.permissions, false).await
    }

    /// Applies a patch; system roles accept permission changes only.
    pub async fn update(&self, role_id: &RoleId, patch: RolePatch) -> AppResult<Role> {
        let mut role = self.get(role_id).await?;
        let previous_name = role.name.clone();

        role.apply_patch(patch)?;
        if role.name != previous_name {
            self.ensure_name_available(&role.name).await?;
        }

        self.tables
            .update_by_id(Table::Roles, role_id.as_str(), encode_role(&role))
            .await?;

        Ok(role)
    }

    /// Deletes a custom role that no active assignment references.
    pub async fn delete(&self, role_id: &RoleId) -> AppResult<()> {
        let role = self.get(role_id).await?;
        if role.is_system {
            return Err(AppError::Forbidden(format!(
                "system role '{}' cannot be deleted",
                role.name.as_str()
            )));
        }

        let referencing = self
            .active_assignments()
            .await?
            .into_iter()
            .filter(|assignment| assignment.role_id == role.id)
            .count();
        if referencing > 0 {
            return Err(AppError::Conflict(format!(
                "role '{}' is still assigned to {referencing} user(s)",
                role.name.as_str()
            )));
        }

        let patch = Row::new().with_text("status", RoleStatus::Deleted.as_str());
        self.tables
            .update_by_id(Table::Roles, role_id.as_str(), patch)
            .await?;

        Ok(())
    }

    /// Seeds every missing system role with its default permissions.
    ///
    /// Returns the roles created by this call; existing roles are untouched.
    pub async fn ensure_system_roles(&self) -> AppResult<Vec<Role>> {
        let existing = self.list().await?;
        let mut created = Vec::new();

        for system_role in SystemRole::all() {
            let name = RoleName::new(system_role.as_str())?;
            match existing.iter().find(|role| role.name == name) {
                Some(role) if !role.is_system => {
                    warn!(
                        role = %system_role.as_str(),
                        "system role name is held by a custom role"
                    );
                }
                Some(_) => {}
                None => {
                    let role = self
                        .insert(name, system_role.default_permissions(), true)
                        .await?;
                    info!(role = %system_role.as_str(), role_id = %role.id, "seeded system role");
                    created.push(role);
                }
            }
        }

        Ok(created)
    }

    async fn insert(
        &self,
        name: RoleName,
        permissions: BTreeSet<Permission>,
        is_system: bool,
    ) -> AppResult<Role> {
        self.ensure_name_available(&name).await?;

        let role = Role {
            id: RoleId::generate(),
            name,
            permissions,
            is_system,
            status: RoleStatus::Active,
        };
        self.tables.append(Table::Roles, encode_role(&role)).await?;

        Ok(role)
    }

    async fn ensure_name_available(&self, name: &RoleName) -> AppResult<()> {
        if self.list().await?.iter().any(|role| role.name == *name) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                name.as_str()
            )));
        }

        Ok(())
    }
}
