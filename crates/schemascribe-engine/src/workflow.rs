//! End-to-end workflows
//!
//! Workflows receive fully built collaborators and only decide what runs in
//! which order. Creating connectors, describers and writers from
//! configuration is the caller's job.

use crate::assembler::{AssembleError, CatalogAssembler};
use crate::lineage::LineageGraph;
use crate::reconciler::{DbtYamlReconciler, ReconcileError, ReconcileOutcome};
use crate::writer::{Artifact, OutputWriter, WriterError};
use schemascribe_catalog::{Describer, FetchError, SchemaSource};
use schemascribe_core::{Catalog, DatabaseCatalog, DescribeConfig, Mode};
use schemascribe_dbt::{ManifestError, ManifestSource};

/// Workflow errors
///
/// [`WorkflowError::CheckFailed`] is the CI signal: the run itself worked but
/// documentation needs attention. Every other variant is a real failure.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("CI CHECK FAILED: {0}")]
    CheckFailed(String),

    #[error("Drift mode requires a schema source to compare against")]
    MissingSchemaSource,

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Writer(#[from] WriterError),
}

impl WorkflowError {
    /// Whether this is a CI check failure rather than an operational error
    pub fn is_check_failure(&self) -> bool {
        matches!(self, Self::CheckFailed(_))
    }
}

/// Result of a dbt documentation run
#[derive(Debug, Clone)]
pub struct DbtRunOutcome {
    pub catalog: Catalog,

    /// Present when the run reconciled YAML documentation
    pub reconciliation: Option<ReconcileOutcome>,
}

/// Documents a dbt project
///
/// With a reconciler the catalog is merged into the project's YAML in the
/// reconciler's mode. Otherwise, with a writer, the catalog is written out.
pub struct DbtWorkflow<'a> {
    manifest: &'a dyn ManifestSource,
    describer: &'a dyn Describer,
    schema_source: Option<&'a dyn SchemaSource>,
    reconciler: Option<DbtYamlReconciler>,
    writer: Option<&'a dyn OutputWriter>,
    budgets: DescribeConfig,
}

impl<'a> DbtWorkflow<'a> {
    pub fn new(manifest: &'a dyn ManifestSource, describer: &'a dyn Describer) -> Self {
        Self {
            manifest,
            describer,
            schema_source: None,
            reconciler: None,
            writer: None,
            budgets: DescribeConfig::default(),
        }
    }

    pub fn with_schema_source(mut self, source: &'a dyn SchemaSource) -> Self {
        self.schema_source = Some(source);
        self
    }

    pub fn with_reconciler(mut self, reconciler: DbtYamlReconciler) -> Self {
        self.reconciler = Some(reconciler);
        self
    }

    pub fn with_writer(mut self, writer: &'a dyn OutputWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn with_budgets(mut self, budgets: DescribeConfig) -> Self {
        self.budgets = budgets;
        self
    }

    pub fn run(&mut self) -> Result<DbtRunOutcome, WorkflowError> {
        let mode = self.reconciler.as_ref().map(DbtYamlReconciler::mode);
        let run_drift_check = mode == Some(Mode::Drift);

        if run_drift_check && self.schema_source.is_none() {
            tracing::error!("drift mode requires a schema source, but none was provided");
            return Err(WorkflowError::MissingSchemaSource);
        }

        let models = self.manifest.models()?;
        tracing::info!(models = models.len(), "generating dbt catalog");

        let mut assembler = CatalogAssembler::new(self.describer)?.with_budgets(self.budgets);
        if let Some(source) = self.schema_source {
            assembler = assembler.with_schema_source(source);
        }
        let catalog = assembler.assemble(&models, run_drift_check)?;

        let reconciliation = match self.reconciler.as_mut() {
            Some(reconciler) => Some(Self::reconcile(reconciler, &catalog)?),
            None => {
                if let Some(writer) = self.writer {
                    writer.write(&Artifact::Catalog(&catalog))?;
                } else {
                    tracing::info!("catalog generated; no reconciler or writer configured");
                }
                None
            }
        };

        Ok(DbtRunOutcome {
            catalog,
            reconciliation,
        })
    }

    fn reconcile(reconciler: &mut DbtYamlReconciler, catalog: &Catalog) -> Result<ReconcileOutcome, WorkflowError> {
        let mode = reconciler.mode();
        tracing::info!(mode = %mode, "reconciling dbt documentation");
        let outcome = reconciler.reconcile(catalog)?;

        let failure = match mode {
            Mode::Check => "documentation is outdated",
            Mode::Drift => "documentation drift was detected",
            Mode::Update | Mode::Interactive => {
                tracing::info!(files = outcome.written.len(), "dbt documentation {mode} complete");
                return Ok(outcome);
            }
        };

        if outcome.outdated {
            tracing::error!("CI CHECK FAILED: {failure}");
            return Err(WorkflowError::CheckFailed(failure.to_string()));
        }

        let passed = if mode == Mode::Check { "is up-to-date" } else { "has no drift" };
        tracing::info!("CI CHECK PASSED: all dbt documentation {passed}");
        Ok(outcome)
    }
}

/// Documents a live database
///
/// Tables, columns, views and foreign keys come from the schema source and
/// the prose from the describer. Without a writer the catalog is only
/// returned.
pub struct DbWorkflow<'a> {
    schema_source: &'a dyn SchemaSource,
    describer: &'a dyn Describer,
    writer: Option<&'a dyn OutputWriter>,
    budgets: DescribeConfig,
}

impl<'a> DbWorkflow<'a> {
    pub fn new(schema_source: &'a dyn SchemaSource, describer: &'a dyn Describer) -> Self {
        Self {
            schema_source,
            describer,
            writer: None,
            budgets: DescribeConfig::default(),
        }
    }

    pub fn with_writer(mut self, writer: &'a dyn OutputWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn with_budgets(mut self, budgets: DescribeConfig) -> Self {
        self.budgets = budgets;
        self
    }

    pub fn run(&self) -> Result<DatabaseCatalog, WorkflowError> {
        tracing::info!(source = self.schema_source.name(), "generating database catalog");

        let catalog = CatalogAssembler::new(self.describer)?
            .with_budgets(self.budgets)
            .with_schema_source(self.schema_source)
            .assemble_database()?;

        match self.writer {
            Some(writer) => {
                writer.write(&Artifact::DatabaseCatalog(&catalog))?;
                tracing::info!("database catalog written");
            }
            None => tracing::info!("database catalog generated; no writer configured"),
        }
        Ok(catalog)
    }
}

/// Builds the global lineage graph and hands it to a writer
pub struct LineageWorkflow<'a> {
    schema_source: &'a dyn SchemaSource,
    manifest: &'a dyn ManifestSource,
    writer: &'a dyn OutputWriter,
}

impl<'a> LineageWorkflow<'a> {
    pub fn new(
        schema_source: &'a dyn SchemaSource,
        manifest: &'a dyn ManifestSource,
        writer: &'a dyn OutputWriter,
    ) -> Self {
        Self {
            schema_source,
            manifest,
            writer,
        }
    }

    /// Returns the Mermaid text that was written
    pub fn run(&self) -> Result<String, WorkflowError> {
        let foreign_keys = self.schema_source.list_foreign_keys()?;
        tracing::info!(
            source = self.schema_source.name(),
            foreign_keys = foreign_keys.len(),
            "fetched physical lineage"
        );

        let models = self.manifest.models()?;
        let graph = LineageGraph::generate(&foreign_keys, &models);

        self.writer.write(&Artifact::Lineage(&graph))?;
        Ok(graph)
    }
}
