//! dbt artifact parsing
//!
//! This crate handles:
//! - Parsing manifest.json (dbt-generated artifacts)
//! - Flattening model nodes into the facts the documentation engine needs
//! - Normalizing `depends_on` ids into lineage-friendly names

pub mod manifest;
pub mod project;

pub use manifest::{
    dependency_name, ColumnDefinition, DependsOn, Manifest, ManifestColumn, ManifestError, ManifestMetadata,
    ManifestModel, ManifestNode, NodeConfig,
};
pub use project::{DbtProject, ManifestSource};
