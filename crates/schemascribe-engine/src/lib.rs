//! schemascribe engine - documentation and lineage logic
//!
//! This crate implements the main business logic for schemascribe:
//! - Reconciling generated descriptions into hand-written dbt YAML
//! - Merging foreign keys and dbt dependencies into one lineage graph
//! - Assembling catalogs from manifest facts and a describer
//! - Documenting a live database's tables and views
//! - Output writers and the end-to-end workflows

pub mod assembler;
pub mod lineage;
pub mod prompts;
pub mod reconciler;
pub mod workflow;
pub mod writer;

pub use assembler::{AssembleError, CatalogAssembler};
pub use lineage::{Edge, LineageGraph, NodeStyle};
pub use prompts::PromptTemplates;
pub use reconciler::{
    DbtYamlReconciler, PromptRequest, PromptResponse, Prompter, ReconcileError, ReconcileOutcome,
    ReconcilerSettings, ScriptedPrompter, TerminalPrompter,
};
pub use workflow::{DbWorkflow, DbtRunOutcome, DbtWorkflow, LineageWorkflow, WorkflowError};
pub use writer::{Artifact, JsonWriter, OutputWriter, WriterError};
