//! Generic output writers
//!
//! The YAML reconciler edits documentation in place; everything else goes
//! through an [`OutputWriter`].

use schemascribe_core::{Catalog, DatabaseCatalog};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Something a workflow produced
#[derive(Debug, Clone, Copy)]
pub enum Artifact<'a> {
    Catalog(&'a Catalog),

    /// Tables, views and relationships of a live database
    DatabaseCatalog(&'a DatabaseCatalog),

    /// Mermaid lineage graph
    Lineage(&'a str),
}

impl Artifact<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Catalog(_) => "catalog",
            Self::DatabaseCatalog(_) => "database_catalog",
            Self::Lineage(_) => "lineage",
        }
    }
}

/// Writer errors
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error("Failed to serialize {kind}: {source}")]
    Serialize {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Destination for workflow artifacts
pub trait OutputWriter {
    fn write(&self, artifact: &Artifact<'_>) -> Result<(), WriterError>;
}

#[derive(Serialize)]
struct LineageDocument<'a> {
    mermaid_graph: &'a str,
}

/// Pretty-printed JSON file
///
/// Both catalog kinds are written as-is; lineage becomes `{"mermaid_graph": "..."}`.
#[derive(Debug, Clone)]
pub struct JsonWriter {
    path: PathBuf,
}

impl JsonWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputWriter for JsonWriter {
    fn write(&self, artifact: &Artifact<'_>) -> Result<(), WriterError> {
        let kind = artifact.kind();
        let json = match artifact {
            Artifact::Catalog(catalog) => serde_json::to_string_pretty(catalog),
            Artifact::DatabaseCatalog(catalog) => serde_json::to_string_pretty(catalog),
            Artifact::Lineage(graph) => serde_json::to_string_pretty(&LineageDocument { mermaid_graph: graph }),
        }
        .map_err(|source| WriterError::Serialize { kind, source })?;

        tracing::info!(kind, path = %self.path.display(), "writing output");
        fs::write(&self.path, json).map_err(|source| {
            tracing::error!(path = %self.path.display(), error = %source, "failed to write output");
            WriterError::Io {
                path: self.path.clone(),
                source,
            }
        })
    }
}
