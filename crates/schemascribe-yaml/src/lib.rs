//! Comment- and layout-preserving YAML documents
//!
//! dbt documentation files are hand-maintained: comments, key order, quote
//! style and indentation all carry meaning for their owners. This crate keeps
//! every source line verbatim and only re-emits the entries that are
//! explicitly written through [`Mapping::set`] or [`Mapping::push_to_sequence`].
//!
//! Supported layout is block-style YAML (the style dbt projects use). Flow
//! collections and block scalars are kept as opaque values: they render
//! unchanged but are not navigable. Anchors and tags in front of a block
//! (`columns: &cols`) are skipped, so the block underneath stays navigable;
//! aliases (`*cols`) are opaque.
//!
//! ```rust,ignore
//! let mut doc = Document::parse(&std::fs::read_to_string("models/schema.yml")?)?;
//! let models = doc.root_mapping_mut().and_then(|m| m.sequence_mut("models"));
//! ```

mod document;
mod emit;
mod error;
mod parser;

pub use document::{Document, Entry, ItemBody, Mapping, Node, SeqItem, Sequence};
pub use emit::encode_scalar;
pub use error::YamlError;

/// Whether a value counts as "not filled in"
///
/// Null, whitespace-only strings and empty collections are blank; `false`
/// and `0` are deliberate values and are not.
pub fn value_is_blank(value: &serde_yaml::Value) -> bool {
    use serde_yaml::Value;

    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Sequence(s) => s.is_empty(),
        Value::Mapping(m) => m.is_empty(),
        Value::Tagged(tagged) => value_is_blank(&tagged.value),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
