//! In-memory collaborators for testing
//!
//! [`MockSchemaSource`] returns predefined tables without connecting to any
//! database. [`ScriptedDescriber`] answers prompts from a script instead of a
//! model. Both are useful for:
//! - Unit testing catalog assembly and drift verdicts
//! - Integration testing CI workflows
//! - Simulating failures of either collaborator
//!
//! ## Usage
//!
//! ```rust,ignore
//! let source = MockSchemaSource::new()
//!     .with_table("orders", vec![TableColumn::new("id", "INTEGER")])
//!     .with_profile("orders", "id", ColumnProfile::new(10, 0, 10))
//!     .with_foreign_key(ForeignKey::new("orders", "user_id", "users", "id"));
//!
//! let describer = ScriptedDescriber::new("A column.")
//!     .with_reply("Drift", "MATCH");
//! ```

use crate::describer::{DescribeError, Describer};
use crate::source::{ColumnProfile, FetchError, ForeignKey, SchemaSource, TableColumn, ViewDefinition};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

/// Mock schema source for testing
///
/// Tables are listed in name order.
#[derive(Debug, Clone)]
pub struct MockSchemaSource {
    /// Columns by table name
    tables: BTreeMap<String, Vec<TableColumn>>,

    /// Profiles by `table.column`
    profiles: HashMap<String, ColumnProfile>,

    views: Vec<ViewDefinition>,

    foreign_keys: Vec<ForeignKey>,

    /// Errors to return for specific tables
    errors: HashMap<String, FetchError>,

    /// Simulate an unreachable database
    fail_connection: bool,

    /// Name to return from name()
    source_name: String,
}

impl MockSchemaSource {
    /// Create a new mock source with no tables
    pub fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
            profiles: HashMap::new(),
            views: Vec::new(),
            foreign_keys: Vec::new(),
            errors: HashMap::new(),
            fail_connection: false,
            source_name: "mock".to_string(),
        }
    }

    /// Add a table and its columns
    pub fn with_table(mut self, table: impl Into<String>, columns: Vec<TableColumn>) -> Self {
        self.tables.insert(table.into(), columns);
        self
    }

    /// Add a column profile
    pub fn with_profile(mut self, table: &str, column: &str, profile: ColumnProfile) -> Self {
        self.profiles.insert(format!("{table}.{column}"), profile);
        self
    }

    pub fn with_view(mut self, name: impl Into<String>, definition: impl Into<String>) -> Self {
        self.views.push(ViewDefinition {
            name: name.into(),
            definition: definition.into(),
        });
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Return `error` for every call about `table`
    pub fn with_table_error(mut self, table: impl Into<String>, error: FetchError) -> Self {
        self.errors.insert(table.into(), error);
        self
    }

    /// Fail every call
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Set a custom source name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    fn check_connection(&self) -> Result<(), FetchError> {
        if self.fail_connection {
            Err(FetchError::ConnectionError("Simulated connection failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_table(&self, table: &str) -> Result<&Vec<TableColumn>, FetchError> {
        self.check_connection()?;

        // Configured errors win over stored tables
        if let Some(error) = self.errors.get(table) {
            return Err(error.clone());
        }

        self.tables
            .get(table)
            .ok_or_else(|| FetchError::TableNotFound(table.to_string()))
    }
}

impl Default for MockSchemaSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaSource for MockSchemaSource {
    fn name(&self) -> &str {
        &self.source_name
    }

    fn list_tables(&self) -> Result<Vec<String>, FetchError> {
        self.check_connection()?;
        Ok(self.tables.keys().cloned().collect())
    }

    fn describe_columns(&self, table: &str) -> Result<Vec<TableColumn>, FetchError> {
        self.check_table(table).cloned()
    }

    fn profile_column(&self, table: &str, column: &str) -> Result<ColumnProfile, FetchError> {
        let columns = self.check_table(table)?;
        if !columns.iter().any(|c| c.name == column) {
            return Err(FetchError::ColumnNotFound(format!("{table}.{column}")));
        }

        Ok(self
            .profiles
            .get(&format!("{table}.{column}"))
            .copied()
            .unwrap_or_default())
    }

    fn list_views(&self) -> Result<Vec<ViewDefinition>, FetchError> {
        self.check_connection()?;
        Ok(self.views.clone())
    }

    fn list_foreign_keys(&self) -> Result<Vec<ForeignKey>, FetchError> {
        self.check_connection()?;
        Ok(self.foreign_keys.clone())
    }
}

/// One recorded describer call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeCall {
    pub prompt: String,
    pub max_tokens: u32,
}

/// Describer that answers from a script
///
/// The first rule whose key occurs in the prompt decides the outcome;
/// otherwise the default reply is returned. Every call is recorded.
#[derive(Debug, Default)]
pub struct ScriptedDescriber {
    /// Substring -> reply
    replies: Vec<(String, String)>,

    /// Prompts containing any of these fail
    failures: Vec<String>,

    default_reply: String,

    calls: RefCell<Vec<DescribeCall>>,
}

impl ScriptedDescriber {
    pub fn new(default_reply: impl Into<String>) -> Self {
        Self {
            default_reply: default_reply.into(),
            ..Self::default()
        }
    }

    /// Reply with `reply` when the prompt contains `needle`
    pub fn with_reply(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.replies.push((needle.into(), reply.into()));
        self
    }

    /// Fail when the prompt contains `needle`
    pub fn with_failure(mut self, needle: impl Into<String>) -> Self {
        self.failures.push(needle.into());
        self
    }

    /// Calls made so far
    pub fn calls(&self) -> Vec<DescribeCall> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl Describer for ScriptedDescriber {
    fn describe(&self, prompt: &str, max_tokens: u32) -> Result<String, DescribeError> {
        self.calls.borrow_mut().push(DescribeCall {
            prompt: prompt.to_string(),
            max_tokens,
        });

        if let Some(needle) = self.failures.iter().find(|n| prompt.contains(n.as_str())) {
            return Err(DescribeError::RequestFailed(format!("scripted failure for '{needle}'")));
        }

        let reply = self
            .replies
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.as_str())
            .unwrap_or(self.default_reply.as_str());

        if reply.trim().is_empty() {
            return Err(DescribeError::EmptyResponse);
        }
        Ok(reply.to_string())
    }
}
