use std::collections::BTreeMap;

use flock_domain::FieldValue;

/// Flat mapping of column name to cell value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: BTreeMap<String, FieldValue>,
}

impl Row {
    /// Column holding the row identifier.
    pub const ID_COLUMN: &'static str = "id";

    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a row from cells.
    #[must_use]
    pub fn from_cells(cells: BTreeMap<String, FieldValue>) -> Self {
        Self { cells }
    }

    /// Returns the row with a text cell set.
    #[must_use]
    pub fn with_text(mut self, column: &str, value: impl Into<String>) -> Self {
        self.insert(column, FieldValue::Text(value.into()));
        self
    }

    /// Returns the row with a cell set.
    #[must_use]
    pub fn with(mut self, column: &str, value: FieldValue) -> Self {
        self.insert(column, value);
        self
    }

    /// Sets a cell.
    pub fn insert(&mut self, column: impl Into<String>, value: FieldValue) {
        self.cells.insert(column.into(), value);
    }

    /// Returns a cell.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.cells.get(column)
    }

    /// Returns a cell rendered as trimmed text, or `None` when blank.
    #[must_use]
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column)
            .filter(|value| !value.is_blank())
            .map(|value| value.as_text().trim().to_owned())
    }

    /// Returns the row id, if present.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.text(Self::ID_COLUMN)
    }

    /// Overwrites cells with the ones present in `patch`.
    pub fn merge(&mut self, patch: Row) {
        self.cells.extend(patch.cells);
    }

    /// Returns every cell.
    #[must_use]
    pub fn cells(&self) -> &BTreeMap<String, FieldValue> {
        &self.cells
    }

    /// Consumes the row into its cells.
    #[must_use]
    pub fn into_cells(self) -> BTreeMap<String, FieldValue> {
        self.cells
    }
}
