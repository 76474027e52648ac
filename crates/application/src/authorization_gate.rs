use flock_core::{AppError, AppResult, UserIdentity};
use flock_domain::{Permission, UserId};
use tracing::warn;

use crate::{EffectivePermissions, PermissionResolver};


/// Single choke point for permission checks.
///
/// Checks fail closed: an unknown user holds nothing, and a store failure is
/// returned as an error instead of a decision.
#[derive(Clone)]
pub struct AuthorizationGate {
    resolver: PermissionResolver,
}

impl AuthorizationGate {
    /// Creates a gate over a resolver.
    #[must_use]
    pub fn new(resolver: PermissionResolver) -> Self {
        Self { resolver }
    }

    /// Returns whether the user currently holds the permission.
    pub async fn can(&self, user_id: &UserId, permission: Permission) -> AppResult<bool> {
        Ok(self.scope(user_id).await?.can(permission))
    }

    /// Fails with `Forbidden` unless the user holds the permission.
    pub async fn require(&self, user_id: &UserId, permission: Permission) -> AppResult<()> {
        self.scope(user_id).await?.require(permission)
    }

    /// Resolves once for the rest of a request.
    pub async fn scope(&self, user_id: &UserId) -> AppResult<AuthorizationScope> {
        let permissions = match self.resolver.resolve(user_id).await {
            Ok(permissions) => permissions,
            Err(AppError::NotFound(_)) => {
                warn!(user_id = %user_id, "authorization check for unknown user");
                EffectivePermissions::empty(user_id.clone())
            }
            Err(error) => return Err(error),
        };

        Ok(AuthorizationScope { permissions })
    }

    /// Resolves the actor's user id and requires the permission.
    pub async fn require_actor(
        &self,
        actor: &UserIdentity,
        permission: Permission,
    ) -> AppResult<AuthorizationScope> {
        let scope = self.scope(&actor_id(actor)?).await?;
        scope.require(permission)?;
        Ok(scope)
    }
}

/// Permissions of one user, memoized for the duration of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationScope {
    permissions: EffectivePermissions,
}

impl AuthorizationScope {
    /// Returns the user the scope belongs to.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.permissions.user_id
    }

    /// Returns the resolved permissions.
    #[must_use]
    pub fn permissions(&self) -> &EffectivePermissions {
        &self.permissions
    }

    /// Returns whether the permission is granted.
    #[must_use]
    pub fn can(&self, permission: Permission) -> bool {
        self.permissions.contains(permission)
    }

    /// Fails with `Forbidden` unless the permission is granted.
    pub fn require(&self, permission: Permission) -> AppResult<()> {
        if self.can(permission) {
            return Ok(());
        }

        warn!(
            user_id = %self.permissions.user_id,
            permission = %permission,
            "permission denied"
        );
        Err(AppError::Forbidden(format!(
            "user '{}' is missing permission '{permission}'",
            self.permissions.user_id
        )))
    }
}

/// Parses the authenticated subject into a user id.
pub fn actor_id(actor: &UserIdentity) -> AppResult<UserId> {
    UserId::new(actor.subject())
        .map_err(|_| AppError::Unauthorized("actor has no user id".to_owned()))
}
