//! SchemaScribe Core
//!
//! Core domain model shared by every schemascribe crate.
//! Never rename diagnostic codes - they are part of the public API.

pub mod catalog;
pub mod config;
pub mod diagnostic;
pub mod logging;
pub mod report;

pub use catalog::{
    Catalog, CatalogColumn, CatalogModel, ColumnEntry, DatabaseCatalog, DriftStatus, Relationship, TableEntry, ViewEntry,
};
pub use config::{Config, ConfigError, DbtConfig, DescribeConfig, IndentStyle, Mode};
pub use diagnostic::{Diagnostic, DiagnosticCode, Location, Severity};
pub use report::{Report, ReportSummary, ReportVersion};
