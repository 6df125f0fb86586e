//! Describer prompt templates
//!
//! Prompts are minijinja templates so their wording can change without
//! touching the assembly logic.

use minijinja::{context, Environment, Error};
use schemascribe_catalog::ColumnProfile;

const MODEL_DESCRIPTION: &str = "model_description";
const COLUMN_DESCRIPTION: &str = "column_description";
const DRIFT_CHECK: &str = "drift_check";
const TABLE_DESCRIPTION: &str = "table_description";
const TABLE_COLUMN_DESCRIPTION: &str = "table_column_description";
const VIEW_SUMMARY: &str = "view_summary";

const MODEL_DESCRIPTION_TEMPLATE: &str = "\
You are documenting a dbt project.
Summarize the purpose of the dbt model `{{ model_name }}` in one or two sentences for a business audience.

SQL:
{{ raw_sql }}

Summary:";

const COLUMN_DESCRIPTION_TEMPLATE: &str = "\
You are documenting a dbt project.
Describe the column `{{ column_name }}` (type: {{ data_type }}) of the dbt model `{{ model_name }}` in one short sentence.
{% if model_description %}The model is summarized as: {{ model_description }}
{% endif %}
Description:";

const DRIFT_CHECK_TEMPLATE: &str = "\
Drift check for column `{{ model_name }}.{{ column_name }}`.
Existing documentation: \"{{ description }}\"
Live data profile: {{ total_count }} rows, null ratio {{ null_ratio }}, {{ distinct_count }} distinct values, unique: {{ \"true\" if is_unique else \"false\" }}.
Is the existing documentation still consistent with the live data?
Answer with exactly one word: MATCH or DRIFT.";

const TABLE_DESCRIPTION_TEMPLATE: &str = "\
You are documenting a database.
Summarize the purpose of the table `{{ table_name }}` in one or two sentences for a business audience.
Columns: {{ columns | join(\", \") }}

Summary:";

const TABLE_COLUMN_DESCRIPTION_TEMPLATE: &str = "\
You are documenting a database.
Describe the column `{{ column_name }}` (type: {{ data_type }}) of the table `{{ table_name }}` in one short sentence.
{% if profiled %}Data profile: {{ total_count }} rows, null ratio {{ null_ratio }}, {{ distinct_count }} distinct values, unique: {{ \"true\" if is_unique else \"false\" }}.
{% endif %}
Description:";

const VIEW_SUMMARY_TEMPLATE: &str = "\
You are documenting a database.
Summarize what the view `{{ view_name }}` returns in one or two sentences.

SQL:
{{ definition }}

Summary:";

/// Compiled prompt templates
pub struct PromptTemplates {
    env: Environment<'static>,
}

impl PromptTemplates {
    pub fn new() -> Result<Self, Error> {
        let mut env = Environment::new();
        env.add_template(MODEL_DESCRIPTION, MODEL_DESCRIPTION_TEMPLATE)?;
        env.add_template(COLUMN_DESCRIPTION, COLUMN_DESCRIPTION_TEMPLATE)?;
        env.add_template(DRIFT_CHECK, DRIFT_CHECK_TEMPLATE)?;
        env.add_template(TABLE_DESCRIPTION, TABLE_DESCRIPTION_TEMPLATE)?;
        env.add_template(TABLE_COLUMN_DESCRIPTION, TABLE_COLUMN_DESCRIPTION_TEMPLATE)?;
        env.add_template(VIEW_SUMMARY, VIEW_SUMMARY_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn model_description(&self, model_name: &str, raw_sql: &str) -> Result<String, Error> {
        self.env
            .get_template(MODEL_DESCRIPTION)?
            .render(context! { model_name, raw_sql })
    }

    pub fn column_description(
        &self,
        model_name: &str,
        model_description: &str,
        column_name: &str,
        data_type: &str,
    ) -> Result<String, Error> {
        self.env
            .get_template(COLUMN_DESCRIPTION)?
            .render(context! { model_name, model_description, column_name, data_type })
    }

    pub fn drift_check(
        &self,
        model_name: &str,
        column_name: &str,
        description: &str,
        profile: &ColumnProfile,
    ) -> Result<String, Error> {
        self.env.get_template(DRIFT_CHECK)?.render(context! {
            model_name,
            column_name,
            description,
            total_count => profile.total_count,
            null_ratio => profile.null_ratio(),
            distinct_count => profile.distinct_count,
            is_unique => profile.is_unique(),
        })
    }

    pub fn table_description(&self, table_name: &str, columns: &[&str]) -> Result<String, Error> {
        self.env
            .get_template(TABLE_DESCRIPTION)?
            .render(context! { table_name, columns })
    }

    /// Column prompt for a live table; the profile is included when known
    pub fn table_column_description(
        &self,
        table_name: &str,
        column_name: &str,
        data_type: &str,
        profile: Option<&ColumnProfile>,
    ) -> Result<String, Error> {
        let stats = profile.copied().unwrap_or_default();
        self.env.get_template(TABLE_COLUMN_DESCRIPTION)?.render(context! {
            table_name,
            column_name,
            data_type,
            profiled => profile.is_some(),
            total_count => stats.total_count,
            null_ratio => stats.null_ratio(),
            distinct_count => stats.distinct_count,
            is_unique => stats.is_unique(),
        })
    }

    pub fn view_summary(&self, view_name: &str, definition: &str) -> Result<String, Error> {
        self.env
            .get_template(VIEW_SUMMARY)?
            .render(context! { view_name, definition })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_prompt_carries_sql() {
        let prompts = PromptTemplates::new().unwrap();
        let prompt = prompts
            .model_description("orders", "select * from {{ ref('stg_orders') }}")
            .unwrap();

        assert!(prompt.contains("`orders`"));
        assert!(prompt.contains("select * from {{ ref('stg_orders') }}"));
    }

    #[test]
    fn column_prompt_mentions_model_summary_only_when_known() {
        let prompts = PromptTemplates::new().unwrap();

        let with = prompts.column_description("orders", "Order facts", "id", "INTEGER").unwrap();
        assert!(with.contains("`id` (type: INTEGER)"));
        assert!(with.contains("Order facts"));

        let without = prompts.column_description("orders", "", "id", "N/A").unwrap();
        assert!(!without.contains("summarized"));
    }

    #[test]
    fn drift_prompt_includes_profile() {
        let prompts = PromptTemplates::new().unwrap();
        let prompt = prompts
            .drift_check("orders", "id", "Always unique", &ColumnProfile::new(4, 1, 3))
            .unwrap();

        assert!(prompt.contains("orders.id"));
        assert!(prompt.contains("\"Always unique\""));
        assert!(prompt.contains("4 rows, null ratio 0.25, 3 distinct values, unique: false"));
        assert!(prompt.contains("MATCH or DRIFT"));
    }

    #[test]
    fn table_prompt_lists_columns() {
        let prompts = PromptTemplates::new().unwrap();
        let prompt = prompts.table_description("users", &["id", "email"]).unwrap();

        assert!(prompt.contains("table `users`"));
        assert!(prompt.contains("Columns: id, email"));
    }

    #[test]
    fn table_column_prompt_shows_profile_when_known() {
        let prompts = PromptTemplates::new().unwrap();

        let profiled = prompts
            .table_column_description("users", "id", "INTEGER", Some(&ColumnProfile::new(5, 0, 5)))
            .unwrap();
        assert!(profiled.contains("`id` (type: INTEGER) of the table `users`"));
        assert!(profiled.contains("5 rows, null ratio 0.0, 5 distinct values, unique: true"));

        let bare = prompts.table_column_description("users", "id", "INTEGER", None).unwrap();
        assert!(!bare.contains("Data profile"));
    }

    #[test]
    fn view_prompt_carries_definition() {
        let prompts = PromptTemplates::new().unwrap();
        let prompt = prompts
            .view_summary("user_orders", "SELECT * FROM users JOIN orders USING (id)")
            .unwrap();

        assert!(prompt.contains("view `user_orders`"));
        assert!(prompt.contains("JOIN orders"));
    }
}
