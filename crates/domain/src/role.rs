use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use flock_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::{Action, Permission, Resource, RoleAssignmentId, RoleId, UserId};

/// Maximum role name length.
pub const MAX_ROLE_NAME_CHARS: usize = 64;

/// Normalized role name, unique among active roles.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    /// Trims, lowercases and validates a role name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let normalized = value.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(AppError::Validation("role name is required".to_owned()));
        }
        if normalized.chars().count() > MAX_ROLE_NAME_CHARS {
            return Err(AppError::Validation(format!(
                "role name must be at most {MAX_ROLE_NAME_CHARS} characters"
            )));
        }
        if !normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AppError::Validation(format!(
                "role name '{normalized}' contains invalid characters"
            )));
        }

        Ok(Self(normalized))
    }

    /// Returns the normalized name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for RoleName {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoleName> for String {
    fn from(value: RoleName) -> Self {
        value.0
    }
}

/// Roles seeded at bootstrap whose identity can never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemRole {
    /// Full access.
    Admin,
    /// Pastoral oversight of every ministry area.
    Pastor,
    /// Ministry and cell group leaders.
    Leader,
    /// Office staff.
    Staff,
    /// Event-day volunteers.
    Volunteer,
    /// Read-only observers.
    Readonly,
}

impl SystemRole {
    /// Returns all system roles in seeding order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[
            Self::Admin,
            Self::Pastor,
            Self::Leader,
            Self::Staff,
            Self::Volunteer,
            Self::Readonly,
        ]
    }

    /// Returns the stable role name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Pastor => "pastor",
            Self::Leader => "leader",
            Self::Staff => "staff",
            Self::Volunteer => "volunteer",
            Self::Readonly => "readonly",
        }
    }

    /// Returns the permission set the role is seeded with.
    #[must_use]
    pub fn default_permissions(&self) -> BTreeSet<Permission> {
        use Action::{Checkin, Create, Delete, Invite, Manage, Read, Update};
        use Resource::{
            Cellgroups, Courses, Events, Finance, Media, Members, Offerings, Roles, Settings,
            Surveys, Users, Volunteers,
        };

        match self {
            Self::Admin => Permission::all().into_iter().collect(),
            Self::Pastor => Permission::all()
                .into_iter()
                .filter(|permission| {
                    !matches!(permission.resource(), Settings | Roles | Users)
                        || matches!(permission.action(), Read | Invite)
                })
                .collect(),
            Self::Leader => grants(&[
                (Members, Read),
                (Members, Update),
                (Events, Read),
                (Events, Create),
                (Events, Update),
                (Events, Checkin),
                (Courses, Read),
                (Courses, Checkin),
                (Cellgroups, Read),
                (Cellgroups, Update),
                (Cellgroups, Manage),
                (Volunteers, Read),
                (Volunteers, Manage),
                (Media, Read),
                (Surveys, Read),
                (Surveys, Create),
            ]),
            Self::Staff => grants(&[
                (Members, Read),
                (Members, Create),
                (Members, Update),
                (Offerings, Read),
                (Offerings, Create),
                (Offerings, Update),
                (Events, Read),
                (Events, Create),
                (Events, Update),
                (Events, Delete),
                (Events, Checkin),
                (Courses, Read),
                (Courses, Create),
                (Courses, Update),
                (Courses, Checkin),
                (Cellgroups, Read),
                (Volunteers, Read),
                (Volunteers, Create),
                (Volunteers, Update),
                (Finance, Read),
                (Media, Read),
                (Media, Create),
                (Media, Update),
                (Surveys, Read),
                (Surveys, Create),
                (Surveys, Update),
                (Settings, Read),
            ]),
            Self::Volunteer => grants(&[
                (Members, Read),
                (Events, Read),
                (Events, Checkin),
                (Media, Read),
            ]),
            Self::Readonly => Permission::all()
                .into_iter()
                .filter(|permission| permission.action() == Read)
                .collect(),
        }
    }
}

impl FromStr for SystemRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("'{value}' is not a system role")))
    }
}

fn grants(pairs: &[(Resource, Action)]) -> BTreeSet<Permission> {
    pairs
        .iter()
        .filter_map(|(resource, action)| Permission::new(*resource, *action).ok())
        .collect()
}

/// Lifecycle state of a role row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleStatus {
    /// Role participates in resolution.
    Active,
    /// Role was deleted; kept for the audit trail.
    Deleted,
}

impl RoleStatus {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }
}

impl FromStr for RoleStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "deleted" => Ok(Self::Deleted),
            _ => Err(AppError::Validation(format!("unknown role status '{value}'"))),
        }
    }
}

/// Named permission set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Stable role identifier.
    pub id: RoleId,
    /// Unique role name.
    pub name: RoleName,
    /// Capabilities granted by the role.
    pub permissions: BTreeSet<Permission>,
    /// Seeded role whose name and flag are frozen.
    pub is_system: bool,
    /// Lifecycle state.
    pub status: RoleStatus,
}

impl Role {
    /// Returns whether the role currently participates in resolution.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == RoleStatus::Active
    }

    /// Applies a patch, refusing identity changes on system roles.
    pub fn apply_patch(&mut self, patch: RolePatch) -> AppResult<()> {
        if self.is_system && patch.touches_identity() {
            return Err(AppError::Forbidden(format!(
                "system role '{}' only allows permission changes",
                self.name.as_str()
            )));
        }

        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(permissions) = patch.permissions {
            self.permissions = permissions;
        }
        if let Some(is_system) = patch.is_system {
            self.is_system = is_system;
        }

        Ok(())
    }
}

/// Partial update for a role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolePatch {
    /// New role name.
    pub name: Option<RoleName>,
    /// Replacement permission set.
    pub permissions: Option<BTreeSet<Permission>>,
    /// New system flag.
    pub is_system: Option<bool>,
}

impl RolePatch {
    /// Returns whether the patch changes anything besides permissions.
    #[must_use]
    pub fn touches_identity(&self) -> bool {
        self.name.is_some() || self.is_system.is_some()
    }

    /// Returns whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.touches_identity() && self.permissions.is_none()
    }
}

/// Lifecycle state of a role assignment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// Assignment grants its role.
    Active,
    /// Assignment was removed.
    Revoked,
}

impl AssignmentStatus {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Revoked => "revoked",
        }
    }
}

impl FromStr for AssignmentStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "revoked" => Ok(Self::Revoked),
            _ => Err(AppError::Validation(format!(
                "unknown assignment status '{value}'"
            ))),
        }
    }
}

/// Join row granting a role to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    /// Stable assignment identifier.
    pub id: RoleAssignmentId,
    /// Grantee.
    pub user_id: UserId,
    /// Granted role.
    pub role_id: RoleId,
    /// Actor who created the assignment.
    pub assigned_by: UserId,
    /// Creation timestamp.
    pub assigned_at: DateTime<Utc>,
    /// Lifecycle state.
    pub status: AssignmentStatus,
    /// Actor who revoked the assignment.
    pub revoked_by: Option<UserId>,
    /// Revocation timestamp.
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RoleAssignment {
    /// Returns whether the assignment currently grants its role.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == AssignmentStatus::Active
    }
}
