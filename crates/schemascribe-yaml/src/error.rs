//! YAML document errors

/// Errors raised while parsing or editing a document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum YamlError {
    /// The text is not valid YAML
    #[error("invalid YAML at line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// Valid YAML, but laid out in a way the editor cannot track
    #[error("unsupported layout at line {line}: {message}")]
    Layout { line: usize, message: String },

    /// An edit targeted a value of the wrong shape
    #[error("cannot update '{key}': {message}")]
    Structure { key: String, message: String },
}
