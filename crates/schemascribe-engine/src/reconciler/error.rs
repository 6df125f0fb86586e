//! Reconciliation errors

use schemascribe_yaml::YamlError;
use std::path::PathBuf;

/// Errors that abort a reconciliation run
///
/// Per-model problems (such as a stub that cannot be placed) are reported as
/// diagnostics instead and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// A documentation file is not valid YAML
    #[error("failed to parse documentation file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: YamlError,
    },

    /// A documentation file could not be read
    #[error("failed to read documentation file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A model has no source path to place its stub next to
    #[error("cannot place documentation stub for '{model}': missing original_file_path")]
    MissingLocation { model: String },

    /// An in-memory edit was rejected by the document
    #[error("failed to update {}: {source}", path.display())]
    Update {
        path: PathBuf,
        #[source]
        source: YamlError,
    },

    /// Writing a dirty file failed; `written` lists files already on disk
    #[error("failed to write {} ({} file(s) already written): {source}", path.display(), written.len())]
    Persist {
        path: PathBuf,
        written: Vec<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// The operator prompt could not be read
    #[error("interactive prompt failed: {0}")]
    Prompt(#[source] std::io::Error),

    #[error("invalid reconciler configuration: {0}")]
    Configuration(String),
}
