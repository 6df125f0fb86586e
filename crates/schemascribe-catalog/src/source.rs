//! Schema source trait for reading live database structure

use serde::{Deserialize, Serialize};

/// A column as reported by the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    /// Column name
    pub name: String,

    /// Database type, as the database spells it
    pub data_type: String,

    /// Comment stored in the database, empty if none
    #[serde(default)]
    pub description: String,

    /// Whether NULLs are allowed
    #[serde(default = "default_true")]
    pub is_nullable: bool,

    /// Whether the column is part of the primary key
    #[serde(default)]
    pub is_pk: bool,
}

fn default_true() -> bool {
    true
}

impl TableColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            description: String::new(),
            is_nullable: true,
            is_pk: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_pk = true;
        self.is_nullable = false;
        self
    }
}

/// Row statistics for one column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub total_count: u64,
    pub null_count: u64,
    pub distinct_count: u64,
}

impl ColumnProfile {
    pub fn new(total_count: u64, null_count: u64, distinct_count: u64) -> Self {
        Self {
            total_count,
            null_count,
            distinct_count,
        }
    }

    /// Share of NULL rows, rounded to two decimals; 0.0 for empty tables
    pub fn null_ratio(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        let ratio = self.null_count as f64 / self.total_count as f64;
        (ratio * 100.0).round() / 100.0
    }

    /// Every row holds a distinct non-NULL value (vacuously true when empty)
    pub fn is_unique(&self) -> bool {
        self.total_count == 0 || (self.distinct_count == self.total_count && self.null_count == 0)
    }
}

/// A view and its SQL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub name: String,
    pub definition: String,
}

/// A foreign key edge between two tables
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Referencing table
    pub source_table: String,

    /// Referencing column
    pub source_column: String,

    /// Referenced table
    pub target_table: String,

    /// Referenced column
    pub target_column: String,
}

impl ForeignKey {
    pub fn new(
        source_table: impl Into<String>,
        source_column: impl Into<String>,
        target_table: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            source_table: source_table.into(),
            source_column: source_column.into(),
            target_table: target_table.into(),
            target_column: target_column.into(),
        }
    }
}

/// Errors that can occur when reading from a schema source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Connection failed: {0}")]
    ConnectionError(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Query failed: {0}")]
    QueryError(String),
}

/// Read access to a live database
///
/// Calls are blocking. Timeouts and retries belong to the caller.
pub trait SchemaSource {
    /// Source name for logs (e.g., "duckdb", "postgres")
    fn name(&self) -> &str;

    /// Tables visible to the connection
    fn list_tables(&self) -> Result<Vec<String>, FetchError>;

    /// Columns of one table, in ordinal order
    fn describe_columns(&self, table: &str) -> Result<Vec<TableColumn>, FetchError>;

    /// Row statistics for one column
    fn profile_column(&self, table: &str, column: &str) -> Result<ColumnProfile, FetchError>;

    /// Views and their definitions
    fn list_views(&self) -> Result<Vec<ViewDefinition>, FetchError>;

    /// All foreign keys
    fn list_foreign_keys(&self) -> Result<Vec<ForeignKey>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_ratios() {
        let profile = ColumnProfile::new(8, 2, 6);
        assert_eq!(profile.null_ratio(), 0.25);
        assert!(!profile.is_unique());

        let thirds = ColumnProfile::new(3, 1, 2);
        assert_eq!(thirds.null_ratio(), 0.33);
    }

    #[test]
    fn test_profile_uniqueness() {
        assert!(ColumnProfile::new(5, 0, 5).is_unique());
        assert!(!ColumnProfile::new(5, 1, 5).is_unique());
        assert!(ColumnProfile::default().is_unique());
        assert_eq!(ColumnProfile::default().null_ratio(), 0.0);
    }

    #[test]
    fn test_table_column_builders() {
        let column = TableColumn::new("id", "INTEGER").primary_key();
        assert!(column.is_pk);
        assert!(!column.is_nullable);

        let column = TableColumn::new("email", "VARCHAR").with_description("Login");
        assert_eq!(column.description, "Login");
        assert!(column.is_nullable);
    }
}
