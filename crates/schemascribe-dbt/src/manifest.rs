//! Reading models out of dbt's `manifest.json`
//!
//! Parses dbt-generated manifest.json to extract models, their columns, and
//! their upstream dependencies.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Placeholder used when a node carries no SQL
pub const MISSING_SQL: &str = "-- SQL code not available --";

/// Placeholder used when a column has no declared type
pub const UNKNOWN_TYPE: &str = "N/A";

/// The parts of `manifest.json` documentation generation reads
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Manifest {
    /// Run metadata written by dbt
    #[serde(default)]
    pub metadata: ManifestMetadata,

    /// Model, test, seed and snapshot nodes
    #[serde(default)]
    pub nodes: HashMap<String, ManifestNode>,
}

impl Manifest {
    /// Read and parse `path`
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ManifestError::NotFound(path.display().to_string())
            } else {
                ManifestError::IoError(path.display().to_string(), e.to_string())
            }
        })?;

        Self::from_str(&contents)
    }

    /// Parse manifest JSON
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(json).map_err(|e| ManifestError::ParseError(e.to_string()))
    }

    /// Enabled model nodes, flattened and ordered by unique_id
    pub fn models(&self) -> Vec<ManifestModel> {
        let mut models: Vec<ManifestModel> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.resource_type == "model" && node.config.enabled)
            .map(|(id, node)| ManifestModel::from_node(id, node))
            .collect();

        models.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));
        models
    }
}

/// Manifest metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    #[serde(default)]
    pub dbt_schema_version: Option<String>,
    #[serde(default)]
    pub dbt_version: Option<String>,
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub invocation_id: Option<String>,
}

/// Manifest node; only models are turned into [`ManifestModel`]s
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManifestNode {
    /// Unique identifier (e.g., "model.jaffle_shop.orders")
    #[serde(default)]
    pub unique_id: String,

    /// Node name (e.g., "orders")
    pub name: String,

    /// `model`, `seed`, `test`, ...
    pub resource_type: String,

    /// Package name
    #[serde(default)]
    pub package_name: String,

    /// Path relative to the resource directory
    #[serde(default)]
    pub path: String,

    /// Path relative to the project root
    #[serde(default)]
    pub original_file_path: String,

    /// Node configuration
    #[serde(default)]
    pub config: NodeConfig,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Column definitions, in declaration order
    #[serde(default, deserialize_with = "ordered_columns")]
    pub columns: Vec<ColumnDefinition>,

    /// Dependencies
    #[serde(default)]
    pub depends_on: DependsOn,

    /// SQL source (dbt >= 1.3)
    #[serde(default)]
    pub raw_code: Option<String>,

    /// SQL source (older dbt)
    #[serde(default)]
    pub raw_sql: Option<String>,
}

/// Resolved node config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Disabled nodes are ignored
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Materialization type
    #[serde(default)]
    pub materialized: Option<String>,

    /// Description set through `config(description=...)`
    #[serde(default)]
    pub description: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            materialized: None,
            description: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Column as dbt records it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name
    #[serde(default)]
    pub name: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Data type (if declared)
    #[serde(default)]
    pub data_type: Option<String>,
}

/// Upstream unique ids
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependsOn {
    /// Unique ids, possibly repeated
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// manifest.json stores columns as an object keyed by name; keep file order
fn ordered_columns<'de, D>(deserializer: D) -> Result<Vec<ColumnDefinition>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ColumnsVisitor;

    impl<'de> Visitor<'de> for ColumnsVisitor {
        type Value = Vec<ColumnDefinition>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of column name to column definition")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut columns = Vec::new();
            while let Some((key, mut column)) = map.next_entry::<String, ColumnDefinition>()? {
                if column.name.is_empty() {
                    column.name = key;
                }
                columns.push(column);
            }
            Ok(columns)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(ColumnsVisitor)
}

/// A manifest column as the documentation engine sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestColumn {
    pub name: String,

    /// Declared type, `"N/A"` when undeclared
    pub data_type: String,

    /// Existing human-written description
    pub description: String,
}

/// A dbt model flattened for documentation and lineage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestModel {
    /// Model name (e.g., "orders")
    pub name: String,

    /// Unique identifier (e.g., "model.jaffle_shop.orders")
    pub unique_id: String,

    /// Existing description (node, falling back to config)
    pub description: String,

    /// Raw SQL, or a placeholder when the manifest has none
    pub raw_sql: String,

    /// Columns in declaration order
    pub columns: Vec<ManifestColumn>,

    /// SQL file path relative to the project root
    pub original_file_path: Option<String>,

    /// Upstream models (`orders`) and sources (`raw.orders`)
    pub dependencies: Vec<String>,
}

impl ManifestModel {
    fn from_node(unique_id: &str, node: &ManifestNode) -> Self {
        let description = if node.description.is_empty() {
            node.config.description.clone().unwrap_or_default()
        } else {
            node.description.clone()
        };

        let raw_sql = node
            .raw_code
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(node.raw_sql.as_deref())
            .unwrap_or(MISSING_SQL)
            .to_string();

        let columns = node
            .columns
            .iter()
            .map(|c| ManifestColumn {
                name: c.name.clone(),
                data_type: c.data_type.clone().unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
                description: c.description.clone(),
            })
            .collect();

        let mut dependencies: Vec<String> = Vec::new();
        for dep in node.depends_on.nodes.iter().filter_map(|id| dependency_name(id)) {
            if !dependencies.contains(&dep) {
                dependencies.push(dep);
            }
        }

        Self {
            name: node.name.clone(),
            unique_id: unique_id.to_string(),
            description,
            raw_sql,
            columns,
            original_file_path: Some(node.original_file_path.clone()).filter(|p| !p.is_empty()),
            dependencies,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ManifestColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Lineage name for a `depends_on` unique_id
///
/// Models, seeds and snapshots map to their bare name; sources map to
/// `source_name.table` so the separator marks them as external. Macros,
/// tests and other resource types have no lineage node.
pub fn dependency_name(unique_id: &str) -> Option<String> {
    let parts: Vec<&str> = unique_id.split('.').collect();
    match parts.as_slice() {
        ["model" | "seed" | "snapshot", _package, name, ..] => Some((*name).to_string()),
        ["source", _package, source, table, ..] => Some(format!("{source}.{table}")),
        _ => None,
    }
}

/// Manifest loading errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest.json not found at {0}. Run `dbt compile` or `dbt run` in the project first")]
    NotFound(String),

    #[error("Failed to read manifest file {0}: {1}")]
    IoError(String, String),

    #[error("Failed to parse manifest JSON: {0}")]
    ParseError(String),
}
