//! Catalog documents
//!
//! A catalog is the assembled set of generated descriptions plus structural
//! facts for one dbt project, keyed by model name. It is the input of the
//! documentation reconciler and of the generic writers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Verdict of comparing human-written documentation with the live schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriftStatus {
    /// Existing text is consistent with the live column
    Match,

    /// Existing text conflicts with the live column
    Drift,

    /// No verdict could be reached
    Unknown,
}

/// Generated facts for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogColumn {
    /// Column name
    pub name: String,

    /// Generated documentation fields, e.g. `description`, `tags`
    #[serde(default)]
    pub ai_generated: BTreeMap<String, serde_json::Value>,

    /// Drift verdict for the column's existing description, if computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drift_status: Option<DriftStatus>,
}

impl CatalogColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ai_generated: BTreeMap::new(),
            drift_status: None,
        }
    }

    /// Add a generated field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.ai_generated.insert(key.into(), value.into());
        self
    }

    /// Set the drift verdict
    pub fn with_drift(mut self, status: DriftStatus) -> Self {
        self.drift_status = Some(status);
        self
    }

    /// Generated description, if any
    pub fn description(&self) -> Option<&str> {
        self.ai_generated.get("description").and_then(|v| v.as_str())
    }
}

/// Generated facts for one model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogModel {
    /// Generated model summary
    #[serde(default)]
    pub model_description: String,

    /// Path of the model's SQL file, relative to the project root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_file_path: Option<String>,

    /// Columns in declaration order
    #[serde(default)]
    pub columns: Vec<CatalogColumn>,
}

impl CatalogModel {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            model_description: description.into(),
            original_file_path: None,
            columns: Vec::new(),
        }
    }

    /// Set the SQL file path
    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.original_file_path = Some(path.into());
        self
    }

    /// Append a column
    pub fn with_column(mut self, column: CatalogColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Find a column by name
    pub fn column(&self, name: &str) -> Option<&CatalogColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Catalog keyed by model name
///
/// Backed by a `BTreeMap` so that iteration (and therefore every log line,
/// prompt, and emitted stub) follows model name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    pub models: BTreeMap<String, CatalogModel>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a model
    pub fn insert(&mut self, name: impl Into<String>, model: CatalogModel) {
        self.models.insert(name.into(), model);
    }

    /// Builder-style insert
    pub fn with_model(mut self, name: impl Into<String>, model: CatalogModel) -> Self {
        self.insert(name, model);
        self
    }

    pub fn get(&self, name: &str) -> Option<&CatalogModel> {
        self.models.get(name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CatalogModel)> {
        self.models.iter()
    }
}

/// Documentation for one live table column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEntry {
    pub name: String,
    pub data_type: String,

    /// Generated text, or the database comment when generation failed
    #[serde(default)]
    pub description: String,
}

/// Documentation for one live table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Columns in ordinal order
    #[serde(default)]
    pub columns: Vec<ColumnEntry>,
}

/// Documentation for one view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewEntry {
    pub name: String,

    /// View SQL as the database reports it
    pub definition: String,

    #[serde(default)]
    pub summary: String,
}

/// `from_table.from_column` references `to_table.to_column`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

/// Catalog of a live database rather than a dbt project
///
/// Entries keep the order the database listed them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseCatalog {
    /// Name of the source the catalog was read from
    pub source: String,

    #[serde(default)]
    pub tables: Vec<TableEntry>,

    #[serde(default)]
    pub views: Vec<ViewEntry>,

    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl DatabaseCatalog {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableEntry> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn view(&self, name: &str) -> Option<&ViewEntry> {
        self.views.iter().find(|v| v.name == name)
    }
}

impl TableEntry {
    pub fn column(&self, name: &str) -> Option<&ColumnEntry> {
        self.columns.iter().find(|c| c.name == name)
    }
}
