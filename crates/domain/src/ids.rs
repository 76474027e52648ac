use flock_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from a stored row id.
            pub fn new(value: impl Into<String>) -> AppResult<Self> {
                let value = value.into();
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(AppError::Validation(format!(
                        "{} must not be empty",
                        stringify!($name)
                    )));
                }

                Ok(Self(trimmed.to_owned()))
            }

            /// Creates a random identifier for a row about to be appended.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Returns the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl TryFrom<String> for $name {
            type Error = AppError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str(self.0.as_str())
            }
        }
    };
}

record_id!(
    /// Identifier of a row in the `Users` table.
    UserId
);
record_id!(
    /// Identifier of a row in the `Members` table.
    MemberId
);
record_id!(
    /// Identifier of a row in the `Roles` table.
    RoleId
);
record_id!(
    /// Identifier of a row in the `Role_Assignments` table.
    RoleAssignmentId
);
record_id!(
    /// Identifier of a row in the `Tags` table.
    TagId
);
record_id!(
    /// Identifier of a row in the `Tag_Rules` table.
    TagRuleId
);
