//! Catalog assembly
//!
//! Turns manifest facts into a [`Catalog`] by asking a [`Describer`] for a
//! summary of every model and column. With a [`SchemaSource`], columns that
//! exist in the warehouse but not in the manifest are included, and existing
//! column descriptions can be checked for drift against live data.
//!
//! [`CatalogAssembler::assemble_database`] documents the schema source itself
//! instead: every table, column and view it lists, plus its foreign keys.

use crate::prompts::PromptTemplates;
use schemascribe_catalog::{Describer, FetchError, SchemaSource, TableColumn};
use schemascribe_core::{
    Catalog, CatalogColumn, CatalogModel, ColumnEntry, DatabaseCatalog, DescribeConfig, DriftStatus, Relationship,
    TableEntry, ViewEntry,
};
use schemascribe_dbt::manifest::UNKNOWN_TYPE;
use schemascribe_dbt::ManifestModel;

/// Errors that stop catalog assembly
///
/// Failures about a single model or column are logged and skipped instead.
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error("Prompt template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Drift check requires a schema source")]
    MissingSchemaSource,

    #[error("Schema source '{source_name}' is unavailable: {error}")]
    SourceUnavailable { source_name: String, error: FetchError },
}

/// Combines manifest facts, live schema facts and generated text
pub struct CatalogAssembler<'a> {
    describer: &'a dyn Describer,
    schema_source: Option<&'a dyn SchemaSource>,
    budgets: DescribeConfig,
    prompts: PromptTemplates,
}

impl<'a> CatalogAssembler<'a> {
    pub fn new(describer: &'a dyn Describer) -> Result<Self, AssembleError> {
        Ok(Self {
            describer,
            schema_source: None,
            budgets: DescribeConfig::default(),
            prompts: PromptTemplates::new()?,
        })
    }

    pub fn with_schema_source(mut self, source: &'a dyn SchemaSource) -> Self {
        self.schema_source = Some(source);
        self
    }

    pub fn with_budgets(mut self, budgets: DescribeConfig) -> Self {
        self.budgets = budgets;
        self
    }

    /// Build the catalog for `models`
    ///
    /// With `run_drift_check`, every column that already has a description
    /// gets a `drift_status`.
    pub fn assemble(&self, models: &[ManifestModel], run_drift_check: bool) -> Result<Catalog, AssembleError> {
        if run_drift_check && self.schema_source.is_none() {
            return Err(AssembleError::MissingSchemaSource);
        }

        let mut catalog = Catalog::new();
        for model in models {
            tracing::info!(model = %model.name, "assembling catalog entry");
            catalog.insert(model.name.clone(), self.assemble_model(model, run_drift_check)?);
        }

        tracing::info!(models = catalog.len(), "catalog assembled");
        Ok(catalog)
    }

    fn assemble_model(&self, model: &ManifestModel, run_drift_check: bool) -> Result<CatalogModel, AssembleError> {
        let prompt = self.prompts.model_description(&model.name, &model.raw_sql)?;
        let model_description = self
            .generate(&prompt, self.budgets.model_max_tokens, &model.name)
            .unwrap_or_default();

        let mut entry = CatalogModel::new(model_description);
        entry.original_file_path = model.original_file_path.clone();

        for (column, data_type, existing) in self.columns_of(model)? {
            let subject = format!("{}.{}", model.name, column);
            let mut catalog_column = CatalogColumn::new(column.as_str());

            let prompt = self
                .prompts
                .column_description(&model.name, &entry.model_description, &column, &data_type)?;
            if let Some(text) = self.generate(&prompt, self.budgets.column_max_tokens, &subject) {
                catalog_column = catalog_column.with_field("description", text);
            }

            if run_drift_check && !existing.trim().is_empty() {
                let status = self.drift_status(model, &column, &existing)?;
                catalog_column = catalog_column.with_drift(status);
            }

            entry.columns.push(catalog_column);
        }

        Ok(entry)
    }

    /// `(name, type, existing description)` for every known column
    ///
    /// Manifest columns come first, in declaration order, followed by live
    /// columns the manifest does not declare.
    fn columns_of(&self, model: &ManifestModel) -> Result<Vec<(String, String, String)>, AssembleError> {
        let mut columns: Vec<(String, String, String)> = model
            .columns
            .iter()
            .map(|c| (c.name.clone(), c.data_type.clone(), c.description.clone()))
            .collect();

        let Some(source) = self.schema_source else {
            return Ok(columns);
        };

        let live = match source.describe_columns(&model.name) {
            Ok(live) => live,
            Err(FetchError::ConnectionError(message)) => {
                return Err(AssembleError::SourceUnavailable {
                    source_name: source.name().to_string(),
                    error: FetchError::ConnectionError(message),
                })
            }
            Err(err) => {
                tracing::warn!(model = %model.name, error = %err, "could not read live columns");
                return Ok(columns);
            }
        };

        for TableColumn { name, data_type, description, .. } in live {
            match columns.iter_mut().find(|(known, _, _)| *known == name) {
                Some((_, declared, _)) => {
                    if declared.as_str() == UNKNOWN_TYPE {
                        *declared = data_type;
                    }
                }
                None => columns.push((name, data_type, description)),
            }
        }

        Ok(columns)
    }

    fn drift_status(&self, model: &ManifestModel, column: &str, existing: &str) -> Result<DriftStatus, AssembleError> {
        let Some(source) = self.schema_source else {
            return Err(AssembleError::MissingSchemaSource);
        };

        let profile = match source.profile_column(&model.name, column) {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(model = %model.name, column, error = %err, "could not profile column");
                return Ok(DriftStatus::Unknown);
            }
        };

        let prompt = self.prompts.drift_check(&model.name, column, existing, &profile)?;
        let subject = format!("{}.{}", model.name, column);
        let status = self
            .generate(&prompt, self.budgets.drift_max_tokens, &subject)
            .map_or(DriftStatus::Unknown, |reply| parse_verdict(&reply));

        if status == DriftStatus::Drift {
            tracing::warn!("drift suspected for '{subject}'");
        }
        Ok(status)
    }

    /// Build the catalog of the schema source's own tables and views
    ///
    /// Listing failures are fatal. A table whose columns cannot be read is
    /// logged and left out; a column that cannot be profiled is described
    /// from its name and type alone.
    pub fn assemble_database(&self) -> Result<DatabaseCatalog, AssembleError> {
        let Some(source) = self.schema_source else {
            return Err(AssembleError::MissingSchemaSource);
        };
        let unavailable = |error: FetchError| AssembleError::SourceUnavailable {
            source_name: source.name().to_string(),
            error,
        };

        let mut catalog = DatabaseCatalog::new(source.name());

        for table in source.list_tables().map_err(unavailable)? {
            let columns = match source.describe_columns(&table) {
                Ok(columns) => columns,
                Err(err @ FetchError::ConnectionError(_)) => return Err(unavailable(err)),
                Err(err) => {
                    tracing::warn!(table = %table, error = %err, "skipping table");
                    continue;
                }
            };
            tracing::info!(table = %table, columns = columns.len(), "documenting table");
            catalog.tables.push(self.assemble_table(source, &table, &columns)?);
        }

        for view in source.list_views().map_err(unavailable)? {
            tracing::info!(view = %view.name, "documenting view");
            let prompt = self.prompts.view_summary(&view.name, &view.definition)?;
            let summary = self
                .generate(&prompt, self.budgets.model_max_tokens, &view.name)
                .unwrap_or_default();
            catalog.views.push(ViewEntry {
                name: view.name,
                definition: view.definition,
                summary,
            });
        }

        catalog.relationships = source
            .list_foreign_keys()
            .map_err(unavailable)?
            .into_iter()
            .map(|fk| Relationship {
                from_table: fk.source_table,
                from_column: fk.source_column,
                to_table: fk.target_table,
                to_column: fk.target_column,
            })
            .collect();

        tracing::info!(
            tables = catalog.tables.len(),
            views = catalog.views.len(),
            relationships = catalog.relationships.len(),
            "database catalog assembled"
        );
        Ok(catalog)
    }

    fn assemble_table(
        &self,
        source: &dyn SchemaSource,
        table: &str,
        columns: &[TableColumn],
    ) -> Result<TableEntry, AssembleError> {
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        let prompt = self.prompts.table_description(table, &names)?;
        let description = self
            .generate(&prompt, self.budgets.model_max_tokens, table)
            .unwrap_or_default();

        let mut entry = TableEntry {
            name: table.to_string(),
            description,
            columns: Vec::with_capacity(columns.len()),
        };

        for column in columns {
            let profile = match source.profile_column(table, &column.name) {
                Ok(profile) => Some(profile),
                Err(err) => {
                    tracing::warn!(table, column = %column.name, error = %err, "could not profile column");
                    None
                }
            };

            let prompt = self
                .prompts
                .table_column_description(table, &column.name, &column.data_type, profile.as_ref())?;
            let subject = format!("{table}.{}", column.name);
            let description = self
                .generate(&prompt, self.budgets.column_max_tokens, &subject)
                .unwrap_or_else(|| column.description.clone());

            entry.columns.push(ColumnEntry {
                name: column.name.clone(),
                data_type: column.data_type.clone(),
                description,
            });
        }

        Ok(entry)
    }

    /// Describer reply, or `None` (logged) on failure
    fn generate(&self, prompt: &str, max_tokens: u32, subject: &str) -> Option<String> {
        match self.describer.describe(prompt, max_tokens) {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                tracing::warn!(subject, "describer returned no text");
                None
            }
            Err(err) => {
                tracing::warn!(subject, error = %err, "describer failed");
                None
            }
        }
    }
}

/// Read a MATCH/DRIFT verdict; anything else is unknown
fn parse_verdict(reply: &str) -> DriftStatus {
    let reply = reply.trim().to_ascii_uppercase();
    if reply.contains("DRIFT") {
        DriftStatus::Drift
    } else if reply.contains("MATCH") {
        DriftStatus::Match
    } else {
        DriftStatus::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use schemascribe_catalog::{ColumnProfile, ForeignKey, MockSchemaSource, ScriptedDescriber};
    use schemascribe_dbt::ManifestColumn;

    fn orders() -> ManifestModel {
        ManifestModel {
            name: "orders".to_string(),
            unique_id: "model.shop.orders".to_string(),
            description: String::new(),
            raw_sql: "select * from {{ ref('stg_orders') }}".to_string(),
            columns: vec![
                ManifestColumn {
                    name: "id".to_string(),
                    data_type: UNKNOWN_TYPE.to_string(),
                    description: "Unique order id".to_string(),
                },
                ManifestColumn {
                    name: "status".to_string(),
                    data_type: "TEXT".to_string(),
                    description: String::new(),
                },
            ],
            original_file_path: Some("models/orders.sql".to_string()),
            dependencies: vec!["stg_orders".to_string()],
        }
    }

    #[test]
    fn assembles_descriptions_from_describer() {
        let describer = ScriptedDescriber::new("A column.").with_reply("Summarize", "Order facts");
        let assembler = CatalogAssembler::new(&describer).unwrap();

        let catalog = assembler.assemble(&[orders()], false).unwrap();
        let model = catalog.get("orders").unwrap();

        assert_eq!(model.model_description, "Order facts");
        assert_eq!(model.original_file_path.as_deref(), Some("models/orders.sql"));
        assert_eq!(model.columns.len(), 2);
        assert_eq!(model.columns[0].description(), Some("A column."));
        assert_eq!(model.columns[0].drift_status, None);

        let calls = describer.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].max_tokens, 200);
        assert_eq!(calls[1].max_tokens, 60);
    }

    #[test]
    fn describer_failures_leave_fields_out() {
        let describer = ScriptedDescriber::new("A column.")
            .with_failure("Summarize")
            .with_failure("`status`");
        let assembler = CatalogAssembler::new(&describer).unwrap();

        let catalog = assembler.assemble(&[orders()], false).unwrap();
        let model = catalog.get("orders").unwrap();

        assert_eq!(model.model_description, "");
        assert_eq!(model.columns[0].description(), Some("A column."));
        assert!(model.columns[1].ai_generated.is_empty());
    }

    #[test]
    fn live_columns_fill_gaps() {
        let source = MockSchemaSource::new().with_table(
            "orders",
            vec![
                TableColumn::new("id", "INTEGER"),
                TableColumn::new("status", "TEXT"),
                TableColumn::new("amount", "DECIMAL"),
            ],
        );
        let describer = ScriptedDescriber::new("text");
        let assembler = CatalogAssembler::new(&describer).unwrap().with_schema_source(&source);

        let model = assembler.assemble(&[orders()], false).unwrap().get("orders").cloned().unwrap();
        let names: Vec<_> = model.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "status", "amount"]);

        let prompts: Vec<_> = describer.calls().into_iter().map(|c| c.prompt).collect();
        assert!(prompts.iter().any(|p| p.contains("`id` (type: INTEGER)")));
    }

    #[test]
    fn drift_verdicts_for_documented_columns() {
        let source = MockSchemaSource::new()
            .with_table("orders", vec![TableColumn::new("id", "INTEGER"), TableColumn::new("status", "TEXT")])
            .with_profile("orders", "id", ColumnProfile::new(10, 2, 5));
        let describer = ScriptedDescriber::new("text").with_reply("Drift check", " drift\n");
        let assembler = CatalogAssembler::new(&describer).unwrap().with_schema_source(&source);

        let model = assembler.assemble(&[orders()], true).unwrap().get("orders").cloned().unwrap();
        assert_eq!(model.columns[0].drift_status, Some(DriftStatus::Drift));
        assert_eq!(model.columns[1].drift_status, None);

        let drift_call = describer
            .calls()
            .into_iter()
            .find(|c| c.prompt.contains("Drift check"))
            .unwrap();
        assert_eq!(drift_call.max_tokens, 10);
    }

    #[test]
    fn drift_without_source_is_rejected() {
        let describer = ScriptedDescriber::new("text");
        let assembler = CatalogAssembler::new(&describer).unwrap();
        assert!(matches!(
            assembler.assemble(&[orders()], true),
            Err(AssembleError::MissingSchemaSource)
        ));
    }

    #[test]
    fn unreachable_source_is_fatal() {
        let source = MockSchemaSource::new().with_connection_failure();
        let describer = ScriptedDescriber::new("text");
        let assembler = CatalogAssembler::new(&describer).unwrap().with_schema_source(&source);

        assert!(matches!(
            assembler.assemble(&[orders()], false),
            Err(AssembleError::SourceUnavailable { .. })
        ));
    }

    fn warehouse() -> MockSchemaSource {
        MockSchemaSource::new()
            .with_name("duckdb")
            .with_table(
                "users",
                vec![
                    TableColumn::new("id", "INTEGER").primary_key(),
                    TableColumn::new("email", "TEXT").with_description("Login address"),
                ],
            )
            .with_table("orders", vec![TableColumn::new("user_id", "INTEGER")])
            .with_profile("users", "id", ColumnProfile::new(3, 0, 3))
            .with_view("user_orders", "SELECT * FROM users JOIN orders ON users.id = orders.user_id")
            .with_foreign_key(ForeignKey::new("orders", "user_id", "users", "id"))
    }

    #[test]
    fn database_catalog_covers_tables_views_and_keys() {
        let source = warehouse();
        let describer = ScriptedDescriber::new("A column.")
            .with_reply("Summarize the purpose of the table `users`", "People who can log in")
            .with_reply("Summarize the purpose of the table `orders`", "Orders placed")
            .with_reply("view `user_orders`", "Orders with their buyer")
            .with_failure("`email`");
        let assembler = CatalogAssembler::new(&describer).unwrap().with_schema_source(&source);

        let catalog = assembler.assemble_database().unwrap();

        assert_eq!(catalog.source, "duckdb");
        let names: Vec<_> = catalog.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["orders", "users"]);

        let users = catalog.table("users").unwrap();
        assert_eq!(users.description, "People who can log in");
        assert_eq!(users.column("id").unwrap().description, "A column.");
        assert_eq!(users.column("email").unwrap().description, "Login address");
        assert_eq!(catalog.table("orders").unwrap().description, "Orders placed");

        let view = catalog.view("user_orders").unwrap();
        assert_eq!(view.summary, "Orders with their buyer");
        assert!(view.definition.starts_with("SELECT"));

        assert_eq!(
            catalog.relationships,
            vec![Relationship {
                from_table: "orders".to_string(),
                from_column: "user_id".to_string(),
                to_table: "users".to_string(),
                to_column: "id".to_string(),
            }]
        );

        let calls = describer.calls();
        let id_prompt = calls.iter().find(|c| c.prompt.contains("`id` (type: INTEGER)")).unwrap();
        assert!(id_prompt.prompt.contains("3 rows, null ratio 0.0, 3 distinct values, unique: true"));
        assert_eq!(id_prompt.max_tokens, 60);
        let view_call = calls.iter().find(|c| c.prompt.contains("view `user_orders`")).unwrap();
        assert_eq!(view_call.max_tokens, 200);
    }

    #[test]
    fn unreadable_tables_are_skipped() {
        let source = warehouse().with_table_error("orders", FetchError::PermissionDenied("restricted".into()));
        let describer = ScriptedDescriber::new("text");
        let assembler = CatalogAssembler::new(&describer).unwrap().with_schema_source(&source);

        let catalog = assembler.assemble_database().unwrap();
        let names: Vec<_> = catalog.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["users"]);
    }

    #[test]
    fn database_catalog_needs_a_reachable_source() {
        let describer = ScriptedDescriber::new("text");
        let assembler = CatalogAssembler::new(&describer).unwrap();
        assert!(matches!(assembler.assemble_database(), Err(AssembleError::MissingSchemaSource)));

        let source = warehouse().with_connection_failure();
        let assembler = CatalogAssembler::new(&describer).unwrap().with_schema_source(&source);
        assert!(matches!(
            assembler.assemble_database(),
            Err(AssembleError::SourceUnavailable { ref source_name, .. }) if source_name == "duckdb"
        ));
    }

    #[test]
    fn verdict_parsing() {
        assert_eq!(parse_verdict("MATCH"), DriftStatus::Match);
        assert_eq!(parse_verdict("match."), DriftStatus::Match);
        assert_eq!(parse_verdict("DRIFT"), DriftStatus::Drift);
        assert_eq!(parse_verdict("maybe"), DriftStatus::Unknown);
    }
}
