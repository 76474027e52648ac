use async_trait::async_trait;

use flock_core::AppResult;

use super::Row;

/// Logical tables backing the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Identity records.
    Users,
    /// Role definitions.
    Roles,
    /// User-to-role join rows.
    RoleAssignments,
    /// Tag definitions.
    Tags,
    /// Auto-tagging rules.
    TagRules,
    /// Member directory.
    Members,
}

impl Table {
    /// Returns the sheet name used by the record store.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "Users",
            Self::Roles => "Roles",
            Self::RoleAssignments => "Role_Assignments",
            Self::Tags => "Tags",
            Self::TagRules => "Tag_Rules",
            Self::Members => "Members",
        }
    }

    /// Returns all tables.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[
            Self::Users,
            Self::Roles,
            Self::RoleAssignments,
            Self::Tags,
            Self::TagRules,
            Self::Members,
        ]
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Port for the row-oriented record store.
///
/// Implementations bound every call by a timeout and report expiry or
/// transport failure as `AppError::Unavailable`.
#[async_trait]
pub trait TableService: Send + Sync {
    /// Lists every row of a table.
    async fn list(&self, table: Table) -> AppResult<Vec<Row>>;

    /// Returns one row by id or `AppError::NotFound`.
    async fn get(&self, table: Table, id: &str) -> AppResult<Row>;

    /// Appends a row and returns its id.
    async fn append(&self, table: Table, row: Row) -> AppResult<String>;

    /// Overwrites the patch columns of one row and returns the stored row.
    async fn update_by_id(&self, table: Table, id: &str, patch: Row) -> AppResult<Row>;
}
