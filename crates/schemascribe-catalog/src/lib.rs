//! Live-database and text-generation collaborators
//!
//! The documentation engine talks to two outside systems: the database the
//! dbt project builds into (for live columns, profiles and foreign keys) and
//! a text generator that writes descriptions. Both are traits here so that
//! concrete drivers stay outside the engine.
//!
//! ## Example
//!
//! ```rust,ignore
//! use schemascribe_catalog::{MockSchemaSource, SchemaSource, TableColumn};
//!
//! let source = MockSchemaSource::new()
//!     .with_table("orders", vec![TableColumn::new("id", "INTEGER")]);
//! let columns = source.describe_columns("orders")?;
//! ```

pub mod describer;
pub mod mock;
pub mod source;

pub use describer::{DescribeError, Describer};
pub use mock::{DescribeCall, MockSchemaSource, ScriptedDescriber};
pub use source::{ColumnProfile, FetchError, ForeignKey, SchemaSource, TableColumn, ViewDefinition};
