//! dbt documentation reconciler
//!
//! Merges a generated [`Catalog`] into the hand-written YAML documentation of
//! a dbt project. A run goes through fixed phases:
//!
//! 1. discover documentation files under the configured directories
//! 2. load every file (a malformed file aborts the run)
//! 3. index model names to the file and collection documenting them
//! 4. reconcile documented models field by field
//! 5. synthesize stubs for undocumented models
//! 6. persist dirty files, in modes that write to disk
//!
//! All mutation goes through the field policy in [`policy`]. Files are only
//! written after every model has been processed.

mod discovery;
mod error;
pub mod policy;
mod prompt;

pub use error::ReconcileError;
pub use policy::{decide, Decision, FieldTarget};
pub use prompt::{PromptRequest, PromptResponse, Prompter, ScriptedPrompter, TerminalPrompter};

use discovery::{discover_doc_files, doc_files_in};
use policy::{json_to_yaml, FieldPolicy, Subject};
use schemascribe_core::{
    Catalog, CatalogModel, Config, Diagnostic, DiagnosticCode, DriftStatus, IndentStyle, Location, Mode, Report,
    Severity,
};
use schemascribe_yaml::Document;
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Collections whose items are indexed by `name`
const INDEXED_COLLECTIONS: [&str; 4] = ["models", "sources", "seeds", "snapshots"];

/// Collection new stubs are appended to
const STUB_COLLECTION: &str = "models";

/// Project layout and formatting knobs
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilerSettings {
    /// Directories under the project root scanned for documentation
    pub doc_dirs: Vec<String>,

    /// Project configuration file, excluded from discovery
    pub project_file: String,

    /// Name of files created for stubs
    pub stub_file_name: String,

    pub style: IndentStyle,
}

impl ReconcilerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            doc_dirs: config.dbt.doc_dirs.clone(),
            project_file: config.dbt.project_file.clone(),
            stub_file_name: config.dbt.stub_file_name.clone(),
            style: config.yaml,
        }
    }
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Result of one reconciliation run
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// Whether any model needed (or, in check mode, would need) a change
    pub outdated: bool,

    pub report: Report,

    /// Files written to disk, in write order
    pub written: Vec<PathBuf>,
}

/// Reconciles generated catalogs into a dbt project's YAML documentation
///
/// The mode is fixed at construction. Interactive mode needs a [`Prompter`].
pub struct DbtYamlReconciler {
    project_dir: PathBuf,
    mode: Mode,
    settings: ReconcilerSettings,
    prompter: Option<Box<dyn Prompter>>,
}

impl DbtYamlReconciler {
    pub fn new(project_dir: impl Into<PathBuf>, mode: Mode) -> Self {
        let project_dir = project_dir.into();
        tracing::info!(mode = %mode, project = %project_dir.display(), "reconciler initialized");

        Self {
            project_dir,
            mode,
            settings: ReconcilerSettings::default(),
            prompter: None,
        }
    }

    /// Build from a loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.project_dir(), config.mode).with_settings(ReconcilerSettings::from_config(config))
    }

    pub fn with_settings(mut self, settings: ReconcilerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Install the operator callback used in interactive mode
    pub fn with_prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Some(Box::new(prompter));
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Reconcile and report whether documentation was outdated or missing
    pub fn write(&mut self, catalog: &Catalog) -> Result<bool, ReconcileError> {
        self.reconcile(catalog).map(|outcome| outcome.outdated)
    }

    /// Run all phases against `catalog`
    pub fn reconcile(&mut self, catalog: &Catalog) -> Result<ReconcileOutcome, ReconcileError> {
        if self.mode == Mode::Interactive && self.prompter.is_none() {
            return Err(ReconcileError::Configuration(
                "interactive mode requires a prompter".to_string(),
            ));
        }

        let files = discover_doc_files(&self.project_dir, &self.settings.doc_dirs, &self.settings.project_file);

        let mut run = Run {
            project_dir: &self.project_dir,
            mode: self.mode,
            settings: &self.settings,
            prompter: self.prompter.as_mut(),
            documents: BTreeMap::new(),
            index: BTreeMap::new(),
            dirty: BTreeSet::new(),
            report: Report::new(self.mode),
        };

        run.load(files)?;
        run.build_index();

        let mut outdated = false;
        for (name, model) in catalog.iter() {
            let changed = match run.index.get(name).cloned() {
                Some(location) => run.reconcile_known(name, model, &location)?,
                None => run.reconcile_unknown(name, model)?,
            };

            run.report.record_model(changed);
            outdated |= changed;
        }

        let written = run.persist()?;
        if !outdated {
            tracing::info!("all dbt documentation is up-to-date");
        }

        Ok(ReconcileOutcome {
            outdated,
            report: run.report,
            written,
        })
    }
}

/// Where a documented model lives
#[derive(Debug, Clone)]
struct IndexEntry {
    path: PathBuf,
    collection: &'static str,
    line: Option<usize>,
}

/// State owned by one reconciliation run
struct Run<'r> {
    project_dir: &'r Path,
    mode: Mode,
    settings: &'r ReconcilerSettings,
    prompter: Option<&'r mut Box<dyn Prompter>>,
    documents: BTreeMap<PathBuf, Document>,
    index: BTreeMap<String, IndexEntry>,
    dirty: BTreeSet<PathBuf>,
    report: Report,
}

impl Run<'_> {
    /// Path for messages: relative to the project when possible
    fn display_path<'p>(&self, path: &'p Path) -> &'p Path {
        path.strip_prefix(self.project_dir).unwrap_or(path)
    }

    fn load(&mut self, files: Vec<PathBuf>) -> Result<(), ReconcileError> {
        for path in files {
            let text = fs::read_to_string(&path).map_err(|source| ReconcileError::Io {
                path: path.clone(),
                source,
            })?;

            let document = Document::parse(&text).map_err(|source| {
                tracing::error!(file = %path.display(), error = %source, "failed to parse documentation file");
                ReconcileError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;

            tracing::debug!(file = %path.display(), "loaded documentation file");
            self.documents.insert(path, document);
        }
        Ok(())
    }

    fn build_index(&mut self) {
        let paths: Vec<PathBuf> = self.documents.keys().cloned().collect();
        for path in &paths {
            self.index_document(path);
        }
        tracing::info!(models = self.index.len(), "indexed documented models");
    }

    fn index_document(&mut self, path: &Path) {
        let Some(document) = self.documents.get(path) else {
            return;
        };

        for (name, collection, line) in documented_nodes(document) {
            let entry = IndexEntry {
                path: path.to_path_buf(),
                collection,
                line,
            };

            // Later files win; the hidden definition is reported
            if let Some(previous) = self.index.insert(name.clone(), entry) {
                self.report_duplicate(&name, &previous.path, path, line);
            }
        }
    }

    fn report_duplicate(&mut self, name: &str, hidden: &Path, kept: &Path, line: Option<usize>) {
        let file = self.display_path(kept).display().to_string();
        let hidden = self.display_path(hidden).display().to_string();
        tracing::warn!(model = %name, kept = %file, hidden = %hidden, "duplicate documentation definition");

        let location = match line {
            Some(line) => Location::with_line(file.clone(), line),
            None => Location::new(file.clone()),
        };
        self.report.add_diagnostic(
            Diagnostic::new(
                DiagnosticCode::DocDuplicateDefinition,
                Severity::Warn,
                format!("'{name}' is documented in both {hidden} and {file}; using {file}"),
            )
            .with_location(location)
            .with_subject(name, None),
        );
    }

    /// Load and index documentation files in `dir` that discovery did not reach
    ///
    /// Only files with a `version` key or an indexed collection are kept.
    /// Returns whether anything new was kept.
    fn load_directory(&mut self, dir: &Path) -> Result<bool, ReconcileError> {
        let fresh: Vec<PathBuf> = doc_files_in(dir, &self.settings.project_file)
            .into_iter()
            .filter(|path| !self.documents.contains_key(path))
            .collect();
        if fresh.is_empty() {
            return Ok(false);
        }

        tracing::info!(
            dir = %self.display_path(dir).display(),
            files = fresh.len(),
            "loading documentation outside the scanned directories"
        );
        self.load(fresh.clone())?;

        let mut loaded = false;
        for path in &fresh {
            let is_docs = self
                .documents
                .get(path)
                .and_then(Document::root_mapping)
                .is_some_and(|root| {
                    root.contains_key("version") || INDEXED_COLLECTIONS.iter().any(|c| root.contains_key(c))
                });

            // Other YAML next to the SQL (packages.yml, selectors.yml) is not ours
            if is_docs {
                self.index_document(path);
                loaded = true;
            } else {
                self.documents.remove(path);
            }
        }
        Ok(loaded)
    }

    fn reconcile_known(&mut self, name: &str, model: &CatalogModel, location: &IndexEntry) -> Result<bool, ReconcileError> {
        let file = self.display_path(&location.path).to_path_buf();
        tracing::info!(model = %name, file = %file.display(), "checking documented model");

        let Some(node) = self
            .documents
            .get_mut(&location.path)
            .and_then(Document::root_mapping_mut)
            .and_then(|root| root.sequence_mut(location.collection))
            .and_then(|items| items.find_by_name_mut(name))
        else {
            tracing::info!(
                model = %name,
                file = %file.display(),
                "documentation is not a block mapping; leaving it as written"
            );
            return Ok(false);
        };

        let mut policy = FieldPolicy {
            mode: self.mode,
            style: &self.settings.style,
            prompter: self.prompter.as_deref_mut(),
            report: &mut self.report,
        };

        let mut changed = policy.process_update(
            &mut *node,
            "description",
            &Value::String(model.model_description.clone()),
            Subject {
                model: name,
                column: None,
                file: &file,
                line: location.line,
            },
        )?;

        if let Some(columns) = node.sequence_mut("columns") {
            for column_node in columns.mappings_mut() {
                let Some(column_name) = column_node.get_str("name") else {
                    continue;
                };
                let Some(column) = model.column(&column_name) else {
                    continue;
                };

                let subject = Subject {
                    model: name,
                    column: Some(column_name.as_str()),
                    file: &file,
                    line: column_node.line(),
                };

                if self.mode == Mode::Drift
                    && !column_node.is_blank("description")
                    && column.drift_status == Some(DriftStatus::Drift)
                {
                    tracing::warn!("DRIFT DETECTED: documentation for '{name}.{column_name}' conflicts with live data");
                    policy.report.add_diagnostic(
                        Diagnostic::new(
                            DiagnosticCode::DocDrift,
                            Severity::Warn,
                            format!("Documentation for '{name}.{column_name}' conflicts with live data"),
                        )
                        .with_location(match subject.line {
                            Some(line) => Location::with_line(file.display().to_string(), line),
                            None => Location::new(file.display().to_string()),
                        })
                        .with_subject(name, Some(column_name.clone()))
                        .with_field("description"),
                    );
                    changed = true;
                    continue;
                }

                for (field, value) in &column.ai_generated {
                    changed |= policy.process_update(&mut *column_node, field, &json_to_yaml(value), subject)?;
                }
            }
        }

        if changed {
            self.dirty.insert(location.path.clone());
        }
        Ok(changed)
    }

    fn reconcile_unknown(&mut self, name: &str, model: &CatalogModel) -> Result<bool, ReconcileError> {
        if self.mode == Mode::Check {
            tracing::warn!("CI CHECK: missing documentation for new model '{name}'");
            self.report.add_diagnostic(
                Diagnostic::new(
                    DiagnosticCode::DocModelMissing,
                    Severity::Warn,
                    format!("Missing documentation for model '{name}'"),
                )
                .with_subject(name, None),
            );
            return Ok(true);
        }

        let Some(dir) = self.stub_dir(model) else {
            self.report_unplaceable(name, ReconcileError::MissingLocation { model: name.to_string() }.to_string());
            return Ok(false);
        };

        // The SQL file may live outside the scanned directories, next to
        // documentation that is already on disk
        if self.load_directory(&dir)? {
            if let Some(location) = self.index.get(name).cloned() {
                return self.reconcile_known(name, model, &location);
            }
        }

        let target = self.stub_target(&dir);
        let file = self.display_path(&target).to_path_buf();
        tracing::info!(model = %name, file = %file.display(), "generating documentation stub");

        let stub = self.build_stub(name, model, &file)?;

        let document = self
            .documents
            .entry(target.clone())
            .or_insert_with(|| new_stub_document(&self.settings.style));

        let placed = document
            .ensure_root_mapping()
            .and_then(|root| root.push_to_sequence(STUB_COLLECTION, &Value::Mapping(stub), &self.settings.style));

        if let Err(err) = placed {
            self.report_unplaceable(name, format!("cannot place documentation stub for '{name}' in {}: {err}", file.display()));
            return Ok(false);
        }

        self.report.add_diagnostic(
            Diagnostic::new(
                DiagnosticCode::DocStubCreated,
                Severity::Info,
                format!("Created documentation stub for '{name}'"),
            )
            .with_location(Location::new(file.display().to_string()))
            .with_subject(name, None),
        );
        self.dirty.insert(target);
        Ok(true)
    }

    /// Stub content, passed through the field policy
    fn build_stub(&mut self, name: &str, model: &CatalogModel, file: &Path) -> Result<serde_yaml::Mapping, ReconcileError> {
        let mut policy = FieldPolicy {
            mode: self.mode,
            style: &self.settings.style,
            prompter: self.prompter.as_deref_mut(),
            report: &mut self.report,
        };

        let mut stub = serde_yaml::Mapping::new();
        stub.insert(Value::from("name"), Value::from(name));
        policy.process_update(
            &mut stub,
            "description",
            &Value::String(model.model_description.clone()),
            Subject {
                model: name,
                column: None,
                file,
                line: None,
            },
        )?;

        let mut columns = Vec::with_capacity(model.columns.len());
        for column in &model.columns {
            let mut column_stub = serde_yaml::Mapping::new();
            column_stub.insert(Value::from("name"), Value::from(column.name.as_str()));

            let subject = Subject {
                model: name,
                column: Some(column.name.as_str()),
                file,
                line: None,
            };
            for (field, value) in &column.ai_generated {
                policy.process_update(&mut column_stub, field, &json_to_yaml(value), subject)?;
            }
            columns.push(Value::Mapping(column_stub));
        }

        if !columns.is_empty() {
            stub.insert(Value::from("columns"), Value::Sequence(columns));
        }
        Ok(stub)
    }

    /// Directory of the model's SQL file
    fn stub_dir(&self, model: &CatalogModel) -> Option<PathBuf> {
        let sql_path = model.original_file_path.as_deref().filter(|p| !p.trim().is_empty())?;
        Some(
            self.project_dir
                .join(sql_path)
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.project_dir.to_path_buf()),
        )
    }

    /// File in `dir` that receives a stub
    ///
    /// Parents are never searched. A loaded file named like new stub files
    /// wins, then the first loaded file in sorted order, then a new file.
    fn stub_target(&self, dir: &Path) -> PathBuf {
        let preferred = dir.join(&self.settings.stub_file_name);
        if self.documents.contains_key(&preferred) {
            return preferred;
        }

        self.documents
            .keys()
            .find(|path| path.parent() == Some(dir))
            .cloned()
            .unwrap_or(preferred)
    }

    fn report_unplaceable(&mut self, name: &str, message: String) {
        tracing::error!("{message}");
        self.report.add_diagnostic(
            Diagnostic::new(DiagnosticCode::DocStubUnplaceable, Severity::Error, message).with_subject(name, None),
        );
    }

    /// Write dirty files in modes that persist
    fn persist(&mut self) -> Result<Vec<PathBuf>, ReconcileError> {
        let mut written = Vec::new();
        if !self.mode.writes_to_disk() || self.dirty.is_empty() {
            return Ok(written);
        }

        tracing::info!(files = self.dirty.len(), "writing documentation changes");
        for path in &self.dirty {
            let Some(document) = self.documents.get(path) else {
                continue;
            };

            let result = match path.parent() {
                Some(parent) => fs::create_dir_all(parent),
                None => Ok(()),
            }
            .and_then(|()| fs::write(path, document.render()));

            if let Err(source) = result {
                tracing::error!(
                    file = %path.display(),
                    already_written = ?written,
                    error = %source,
                    "failed to write documentation file"
                );
                self.report.record_files_written(written.len());
                return Err(ReconcileError::Persist {
                    path: path.clone(),
                    written,
                    source,
                });
            }

            tracing::info!(file = %path.display(), "updated documentation file");
            written.push(path.clone());
        }

        self.report.record_files_written(written.len());
        Ok(written)
    }
}

/// `(name, collection, line)` of every named item in the indexed collections
///
/// Flow-style items (`- {name: orders}`) are included so that they count as
/// documented, even though they cannot be edited in place.
fn documented_nodes(document: &Document) -> Vec<(String, &'static str, Option<usize>)> {
    let Some(root) = document.root_mapping() else {
        return Vec::new();
    };

    let mut nodes = Vec::new();
    for collection in INDEXED_COLLECTIONS {
        let Some(items) = root.sequence(collection) else {
            continue;
        };
        for item in items.items() {
            if let Some(name) = item.name() {
                nodes.push((name, collection, item.line()));
            }
        }
    }
    nodes
}

/// Fresh `{version: 2, models: []}` document
fn new_stub_document(style: &IndentStyle) -> Document {
    let mut seed = serde_yaml::Mapping::new();
    seed.insert(Value::from("version"), Value::from(2));
    seed.insert(Value::from(STUB_COLLECTION), Value::Sequence(Vec::new()));

    Document::from_value(&Value::Mapping(seed), style).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use schemascribe_core::CatalogColumn;

    fn orders_catalog() -> Catalog {
        Catalog::new().with_model(
            "orders",
            CatalogModel::new("Order facts")
                .with_file("models/orders.sql")
                .with_column(CatalogColumn::new("id").with_field("description", "PK")),
        )
    }

    #[test]
    fn new_stub_document_is_seeded() {
        let doc = new_stub_document(&IndentStyle::default());
        assert_eq!(doc.render(), "version: 2\nmodels: []\n");
    }

    #[test]
    fn interactive_without_prompter_fails_fast() {
        let tmp = tempfile::tempdir().unwrap();
        let mut reconciler = DbtYamlReconciler::new(tmp.path(), Mode::Interactive);

        let err = reconciler.write(&orders_catalog()).unwrap_err();
        assert!(matches!(err, ReconcileError::Configuration(_)));
    }

    #[test]
    fn stub_goes_next_to_the_sql_file() {
        let tmp = tempfile::tempdir().unwrap();
        let mut reconciler = DbtYamlReconciler::new(tmp.path(), Mode::Update);

        let outcome = reconciler.reconcile(&orders_catalog()).unwrap();
        assert!(outcome.outdated);
        assert_eq!(outcome.written, vec![tmp.path().join("models/schema.yml")]);
        assert_eq!(outcome.report.summary.files_written, 1);
        assert_eq!(outcome.report.with_code(DiagnosticCode::DocStubCreated).count(), 1);
    }

    #[test]
    fn stub_without_location_is_reported_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog = Catalog::new()
            .with_model("floating", CatalogModel::new("No file"))
            .with_model("orders", CatalogModel::new("Order facts").with_file("models/orders.sql"));

        let mut reconciler = DbtYamlReconciler::new(tmp.path(), Mode::Update);
        let outcome = reconciler.reconcile(&catalog).unwrap();

        assert!(outcome.outdated);
        assert!(outcome.report.has_errors());
        let unplaceable: Vec<_> = outcome.report.with_code(DiagnosticCode::DocStubUnplaceable).collect();
        assert_eq!(unplaceable.len(), 1);
        assert_eq!(unplaceable[0].model.as_deref(), Some("floating"));
        assert!(tmp.path().join("models/schema.yml").exists());
    }

    #[test]
    fn settings_follow_config() {
        let mut config = Config::default();
        config.dbt.stub_file_name = "_docs.yml".to_string();
        config.mode = Mode::Check;

        let reconciler = DbtYamlReconciler::from_config(&config);
        assert_eq!(reconciler.mode(), Mode::Check);
        assert_eq!(reconciler.settings.stub_file_name, "_docs.yml");
    }
}
