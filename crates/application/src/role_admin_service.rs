use flock_core::{AppResult, UserIdentity};
use flock_domain::{Action, Permission, Resource, Role, RoleAssignment, RoleId, RolePatch, UserId};
use tracing::info;

use crate::{
    AuthorizationGate, AuthorizationScope, CreateRoleInput, EffectivePermissions,
    PermissionResolver, RoleStore, actor_id,
};

#[cfg(test)]
mod tests;

/// Role administration gated by the caller's permissions.
#[derive(Clone)]
pub struct RoleAdminService {
    gate: AuthorizationGate,
    resolver: PermissionResolver,
    store: RoleStore,
}

impl RoleAdminService {
    /// Creates a new role administration service.
    #[must_use]
    pub fn new(gate: AuthorizationGate, resolver: PermissionResolver, store: RoleStore) -> Self {
        Self {
            gate,
            resolver,
            store,
        }
    }

    /// Lists active roles.
    pub async fn list_roles(&self, actor: &UserIdentity) -> AppResult<Vec<Role>> {
        self.require(actor, Action::Read).await?;
        self.store.list().await
    }

    /// Returns one active role.
    pub async fn get_role(&self, actor: &UserIdentity, role_id: &RoleId) -> AppResult<Role> {
        self.require(actor, Action::Read).await?;
        self.store.get(role_id).await
    }

    /// Creates a custom role.
    pub async fn create_role(
        &self,
        actor: &UserIdentity,
        input: CreateRoleInput,
    ) -> AppResult<Role> {
        self.require(actor, Action::Create).await?;

        let role = self.store.create(input).await?;
        info!(actor = %actor.subject(), role = %role.name.as_str(), "created role");
        Ok(role)
    }

    /// Updates a role; system roles accept permission changes only.
    pub async fn update_role(
        &self,
        actor: &UserIdentity,
        role_id: &RoleId,
        patch: RolePatch,
    ) -> AppResult<Role> {
        self.require(actor, Action::Update).await?;

        let role = self.store.update(role_id, patch).await?;
        info!(actor = %actor.subject(), role = %role.name.as_str(), "updated role");
        Ok(role)
    }

    /// Deletes an unassigned custom role.
    pub async fn delete_role(&self, actor: &UserIdentity, role_id: &RoleId) -> AppResult<()> {
        self.require(actor, Action::Delete).await?;

        self.store.delete(role_id).await?;
        info!(actor = %actor.subject(), role_id = %role_id, "deleted role");
        Ok(())
    }

    /// Assigns a role to a user.
    pub async fn assign_role(
        &self,
        actor: &UserIdentity,
        user_id: &UserId,
        role_id: &RoleId,
    ) -> AppResult<RoleAssignment> {
        let scope = self.require(actor, Action::Manage).await?;
        self.store.assign(user_id, role_id, scope.user_id()).await
    }

    /// Revokes a role from a user.
    pub async fn revoke_role(
        &self,
        actor: &UserIdentity,
        user_id: &UserId,
        role_id: &RoleId,
    ) -> AppResult<Vec<RoleAssignment>> {
        let scope = self.require(actor, Action::Manage).await?;
        self.store.revoke(user_id, role_id, scope.user_id()).await
    }

    /// Lists active role assignments.
    pub async fn list_assignments(&self, actor: &UserIdentity) -> AppResult<Vec<RoleAssignment>> {
        self.require(actor, Action::Manage).await?;
        self.store.list_assignments().await
    }

    /// Returns a user's effective permissions.
    ///
    /// Users may always inspect themselves; anyone else needs `users:read`.
    pub async fn effective_permissions(
        &self,
        actor: &UserIdentity,
        user_id: &UserId,
    ) -> AppResult<EffectivePermissions> {
        let caller = actor_id(actor)?;
        if caller == *user_id {
            let scope = self.gate.scope(user_id).await?;
            return Ok(scope.permissions().clone());
        }

        self.gate
            .require(&caller, Permission::new(Resource::Users, Action::Read)?)
            .await?;
        self.resolver.resolve(user_id).await
    }

    async fn require(
        &self,
        actor: &UserIdentity,
        action: Action,
    ) -> AppResult<AuthorizationScope> {
        self.gate
            .require_actor(actor, Permission::new(Resource::Roles, action)?)
            .await
    }
}
