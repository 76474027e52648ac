use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use flock_core::AppResult;
use flock_domain::{Permission, Role, RoleAssignment, RoleId, RoleName, User, UserId};
use tracing::debug;

use crate::RoleStore;
use crate::table_ports::{Table, TableService, decode_user};


/// Effective permission set computed for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectivePermissions {
    /// Resolved user.
    pub user_id: UserId,
    /// Roles that contributed grants.
    pub roles: BTreeSet<RoleName>,
    /// Union of every contributing grant.
    pub permissions: BTreeSet<Permission>,
}

impl EffectivePermissions {
    /// Creates a set that grants nothing.
    #[must_use]
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            roles: BTreeSet::new(),
            permissions: BTreeSet::new(),
        }
    }

    /// Returns whether the permission is granted; exact match only.
    #[must_use]
    pub fn contains(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// Computes effective permissions from the current store state.
///
/// Nothing is cached: every call re-reads the user, roles and assignments.
#[derive(Clone)]
pub struct PermissionResolver {
    tables: Arc<dyn TableService>,
    role_store: RoleStore,
}

impl PermissionResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(tables: Arc<dyn TableService>, role_store: RoleStore) -> Self {
        Self { tables, role_store }
    }

    /// Resolves the effective permissions of a user.
    ///
    /// Returns `NotFound` for an unknown user and the empty set for an
    /// inactive one.
    pub async fn resolve(&self, user_id: &UserId) -> AppResult<EffectivePermissions> {
        let row = self.tables.get(Table::Users, user_id.as_str()).await?;
        let user = decode_user(&row)?;

        if !user.is_active() {
            debug!(user_id = %user_id, "inactive user resolves to no permissions");
            return Ok(EffectivePermissions::empty(user.id));
        }

        let (roles, assignments) = tokio::try_join!(
            self.role_store.list(),
            self.role_store.assignments_for_user(user_id)
        )?;

        Ok(Self::aggregate(&user, &roles, &assignments))
    }

    /// Unions the grants of the legacy role, every active assignment and the
    /// per-user override.
    ///
    /// Inputs may arrive in any order; roles or assignments that are not
    /// active contribute nothing.
    #[must_use]
    pub fn aggregate(
        user: &User,
        roles: &[Role],
        assignments: &[RoleAssignment],
    ) -> EffectivePermissions {
        let mut effective = EffectivePermissions::empty(user.id.clone());
        if !user.is_active() {
            return effective;
        }

        let active_roles: BTreeMap<&RoleId, &Role> = roles
            .iter()
            .filter(|role| role.is_active())
            .map(|role| (&role.id, role))
            .collect();
        let mut grant = |role: &Role| {
            effective.roles.insert(role.name.clone());
            effective.permissions.extend(role.permissions.iter().copied());
        };

        if let Some(role_name) = user.role_name.as_deref() {
            match RoleName::new(role_name).ok().and_then(|name| {
                active_roles
                    .values()
                    .copied()
                    .find(|role| role.name == name)
            }) {
                Some(role) => grant(role),
                None => {
                    debug!(user_id = %user.id, role = %role_name, "legacy role does not resolve");
                }
            }
        }

        for assignment in assignments
            .iter()
            .filter(|assignment| assignment.is_active() && assignment.user_id == user.id)
        {
            match active_roles.get(&assignment.role_id) {
                Some(role) => grant(role),
                None => {
                    debug!(
                        user_id = %user.id,
                        role_id = %assignment.role_id,
                        "assignment references a missing role"
                    );
                }
            }
        }

        if let Some(overrides) = &user.permissions_override {
            effective.permissions.extend(overrides.iter().copied());
        }

        effective
    }
}
