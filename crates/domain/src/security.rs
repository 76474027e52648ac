use std::fmt::{Display, Formatter};
use std::str::FromStr;

use flock_core::AppError;
use serde::{Deserialize, Serialize};

/// Protected resource families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resource {
    /// Member directory.
    Members,
    /// Offerings and giving records.
    Offerings,
    /// Events and attendance.
    Events,
    /// Courses and enrolment.
    Courses,
    /// Cell groups.
    Cellgroups,
    /// Volunteer scheduling.
    Volunteers,
    /// Finance ledgers.
    Finance,
    /// Media library.
    Media,
    /// Surveys and responses.
    Surveys,
    /// System settings, tags, and tag rules.
    Settings,
    /// Role definitions and assignments.
    Roles,
    /// User accounts.
    Users,
}

impl Resource {
    /// Returns a stable storage value for this resource.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Members => "members",
            Self::Offerings => "offerings",
            Self::Events => "events",
            Self::Courses => "courses",
            Self::Cellgroups => "cellgroups",
            Self::Volunteers => "volunteers",
            Self::Finance => "finance",
            Self::Media => "media",
            Self::Surveys => "surveys",
            Self::Settings => "settings",
            Self::Roles => "roles",
            Self::Users => "users",
        }
    }

    /// Returns all known resources.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Resource] = &[
            Resource::Members,
            Resource::Offerings,
            Resource::Events,
            Resource::Courses,
            Resource::Cellgroups,
            Resource::Volunteers,
            Resource::Finance,
            Resource::Media,
            Resource::Surveys,
            Resource::Settings,
            Resource::Roles,
            Resource::Users,
        ];

        ALL
    }

    /// Returns the actions deployable on this resource.
    #[must_use]
    pub fn actions(&self) -> &'static [Action] {
        use Action::{Checkin, Create, Delete, Invite, Manage, Read, Sensitive, Update};

        match self {
            Self::Members | Self::Offerings | Self::Finance => {
                &[Read, Create, Update, Delete, Sensitive]
            }
            Self::Events | Self::Courses => &[Read, Create, Update, Delete, Checkin],
            Self::Cellgroups | Self::Volunteers | Self::Roles => {
                &[Read, Create, Update, Delete, Manage]
            }
            Self::Media | Self::Surveys => &[Read, Create, Update, Delete],
            Self::Settings => &[Read, Update],
            Self::Users => &[Read, Create, Update, Delete, Invite, Manage],
        }
    }
}

impl FromStr for Resource {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|resource| resource.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown resource '{value}'")))
    }
}

/// Capabilities that can be exercised on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    /// List and view.
    Read,
    /// Create new records.
    Create,
    /// Edit existing records.
    Update,
    /// Remove records.
    Delete,
    /// View sensitive columns (contact details, giving amounts).
    Sensitive,
    /// Record attendance.
    Checkin,
    /// Administer membership or assignments.
    Manage,
    /// Send account invitations.
    Invite,
}

impl Action {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Sensitive => "sensitive",
            Self::Checkin => "checkin",
            Self::Manage => "manage",
            Self::Invite => "invite",
        }
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "read" => Ok(Self::Read),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "sensitive" => Ok(Self::Sensitive),
            "checkin" => Ok(Self::Checkin),
            "manage" => Ok(Self::Manage),
            "invite" => Ok(Self::Invite),
            _ => Err(AppError::Validation(format!("unknown action '{value}'"))),
        }
    }
}

/// Atomic `resource:action` capability enforced by authorization checks.
///
/// Only pairs listed in the deployment catalogue ([`Resource::actions`]) can
/// be constructed, so a stored token naming an unknown pair never becomes a
/// grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission {
    resource: Resource,
    action: Action,
}

impl Permission {
    /// Creates a permission if the pair is part of the catalogue.
    pub fn new(resource: Resource, action: Action) -> Result<Self, AppError> {
        if !resource.actions().contains(&action) {
            return Err(AppError::Validation(format!(
                "action '{}' is not defined for resource '{}'",
                action.as_str(),
                resource.as_str()
            )));
        }

        Ok(Self { resource, action })
    }

    /// Returns the resource part.
    #[must_use]
    pub fn resource(&self) -> Resource {
        self.resource
    }

    /// Returns the action part.
    #[must_use]
    pub fn action(&self) -> Action {
        self.action
    }

    /// Returns every permission in the catalogue.
    #[must_use]
    pub fn all() -> Vec<Self> {
        Resource::all()
            .iter()
            .flat_map(|resource| {
                resource.actions().iter().map(move |action| Self {
                    resource: *resource,
                    action: *action,
                })
            })
            .collect()
    }

    /// Parses a transport value into a permission.
    pub fn from_transport(value: &str) -> Result<Self, AppError> {
        Self::from_str(value.trim())
    }
}

impl Display for Permission {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}:{}",
            self.resource.as_str(),
            self.action.as_str()
        )
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let Some((resource, action)) = value.split_once(':') else {
            return Err(AppError::Validation(format!(
                "permission '{value}' must have the form resource:action"
            )));
        };

        let well_formed = |part: &str| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase() || c == '_')
        };
        if !well_formed(resource) || !well_formed(action) {
            return Err(AppError::Validation(format!(
                "permission '{value}' must match [a-z_]+:[a-z_]+"
            )));
        }

        Self::new(Resource::from_str(resource)?, Action::from_str(action)?)
    }
}

impl TryFrom<String> for Permission {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(value.as_str())
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{Action, Permission, Resource};

    #[test]
    fn permission_roundtrip_storage_value() {
        let permission = Permission::new(Resource::Members, Action::Delete);
        assert!(permission.is_ok());
        let Ok(permission) = permission else {
            return;
        };

        assert_eq!(permission.to_string(), "members:delete");
        assert_eq!(Permission::from_str("members:delete").ok(), Some(permission));
    }

    #[test]
    fn unknown_permission_is_rejected() {
        assert!(Permission::from_str("members:fly").is_err());
        assert!(Permission::from_str("spaceships:read").is_err());
        assert!(Permission::from_str("members").is_err());
        assert!(Permission::from_str("Members:Read").is_err());
        assert!(Permission::from_str("members:*").is_err());
    }

    #[test]
    fn pair_outside_catalogue_is_rejected() {
        assert!(Permission::from_str("settings:delete").is_err());
        assert!(Permission::from_str("events:checkin").is_ok());
        assert!(Permission::from_str("users:invite").is_ok());
    }

    #[test]
    fn catalogue_contains_every_listed_pair() {
        let all = Permission::all();
        let expected: usize = Resource::all()
            .iter()
            .map(|resource| resource.actions().len())
            .sum();
        assert_eq!(all.len(), expected);
        assert!(all.iter().all(|permission| {
            Permission::from_str(permission.to_string().as_str()).ok() == Some(*permission)
        }));
    }

    mod proptest_permission {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            /// Any accepted token renders back to exactly the input; nothing is widened.
            #[test]
            fn prop_accepted_tokens_render_verbatim(value in "[a-z_]{1,12}:[a-z_]{1,12}") {
                if let Ok(permission) = Permission::from_str(value.as_str()) {
                    prop_assert_eq!(permission.to_string(), value);
                    prop_assert!(permission.resource().actions().contains(&permission.action()));
                }
            }

            /// Arbitrary input never panics the parser.
            #[test]
            fn prop_parser_is_total(value in ".{0,40}") {
                let _ = Permission::from_str(value.as_str());
            }
        }
    }
}
