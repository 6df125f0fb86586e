//! Global lineage merging
//!
//! Combines physical lineage (database foreign keys) with logical lineage
//! (dbt model dependencies) into one Mermaid flowchart. The same name can be
//! observed as a table, a source and a model; the node keeps the most
//! significant style it was ever given.

use schemascribe_catalog::ForeignKey;
use schemascribe_dbt::ManifestModel;
use std::collections::{BTreeMap, BTreeSet};

/// Label of foreign-key edges
pub const FK_LABEL: &str = "FK";

/// Node style, ordered by priority
///
/// `Model > Source > Table`: a higher style is never replaced by a lower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeStyle {
    /// Database table, drawn as a cylinder
    Table = 1,

    /// dbt source, drawn as a circle
    Source = 2,

    /// dbt model, drawn as a rectangle
    Model = 3,
}

impl NodeStyle {
    pub fn priority(self) -> u8 {
        self as u8
    }

    /// Mermaid node definition for `name`
    fn definition(self, name: &str) -> String {
        match self {
            Self::Model => format!("    {name}[\"{name}\"]"),
            Self::Table => format!("    {name}[(\"{name}\")]"),
            Self::Source => format!("    {name}((\"{name}\"))"),
        }
    }
}

/// A directed, optionally labelled edge
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
}

impl Edge {
    fn render(&self) -> String {
        match &self.label {
            Some(label) => format!("    {} -- \"{}\" --> {}", self.from, label, self.to),
            None => format!("    {} --> {}", self.from, self.to),
        }
    }
}

/// Styled nodes plus deduplicated edges
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineageGraph {
    nodes: BTreeMap<String, NodeStyle>,
    edges: BTreeSet<Edge>,
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge foreign keys and model dependencies and render the result
    pub fn generate(foreign_keys: &[ForeignKey], models: &[ManifestModel]) -> String {
        tracing::info!(
            foreign_keys = foreign_keys.len(),
            models = models.len(),
            "generating global lineage graph"
        );

        let mut graph = Self::new();
        graph.add_foreign_keys(foreign_keys);
        graph.add_models(models);
        graph.render()
    }

    /// Register `name`, upgrading its style if `style` outranks the current one
    pub fn add_node(&mut self, name: &str, style: NodeStyle) {
        match self.nodes.get_mut(name) {
            Some(current) if *current >= style => {}
            Some(current) => *current = style,
            None => {
                self.nodes.insert(name.to_string(), style);
            }
        }
    }

    /// Returns `false` if the identical edge was already present
    pub fn add_edge(&mut self, from: &str, to: &str, label: Option<&str>) -> bool {
        self.edges.insert(Edge {
            from: from.to_string(),
            to: to.to_string(),
            label: label.map(str::to_string),
        })
    }

    pub fn add_foreign_keys(&mut self, foreign_keys: &[ForeignKey]) {
        for fk in foreign_keys {
            self.add_node(&fk.source_table, NodeStyle::Table);
            self.add_node(&fk.target_table, NodeStyle::Table);
            self.add_edge(&fk.source_table, &fk.target_table, Some(FK_LABEL));
        }
    }

    /// Dotted dependencies (`source.table`) are sources, bare ones models
    pub fn add_models(&mut self, models: &[ManifestModel]) {
        for model in models {
            self.add_node(&model.name, NodeStyle::Model);

            for dependency in &model.dependencies {
                let style = if dependency.contains('.') {
                    NodeStyle::Source
                } else {
                    NodeStyle::Model
                };
                self.add_node(dependency, style);
                self.add_edge(dependency, &model.name, None);
            }
        }
    }

    pub fn style_of(&self, name: &str) -> Option<NodeStyle> {
        self.nodes.get(name).copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, NodeStyle)> {
        self.nodes.iter().map(|(name, style)| (name.as_str(), *style))
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Mermaid `graph TD` text
    ///
    /// Node definitions and edges are each sorted by their rendered line, so
    /// equal inputs always give identical output.
    pub fn render(&self) -> String {
        let mut definitions: Vec<String> = self
            .nodes
            .iter()
            .map(|(name, style)| style.definition(name))
            .collect();
        definitions.sort();

        let mut edges: Vec<String> = self.edges.iter().map(Edge::render).collect();
        edges.sort();

        let mut lines = Vec::with_capacity(definitions.len() + edges.len() + 2);
        lines.push("graph TD;".to_string());
        lines.extend(definitions);
        lines.push(String::new());
        lines.extend(edges);
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn model(name: &str, dependencies: &[&str]) -> ManifestModel {
        ManifestModel {
            name: name.to_string(),
            unique_id: format!("model.shop.{name}"),
            description: String::new(),
            raw_sql: String::new(),
            columns: Vec::new(),
            original_file_path: Some(format!("models/{name}.sql")),
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn style_never_downgrades() {
        let orders = [
            [NodeStyle::Table, NodeStyle::Source, NodeStyle::Model],
            [NodeStyle::Model, NodeStyle::Table, NodeStyle::Source],
            [NodeStyle::Source, NodeStyle::Model, NodeStyle::Table],
        ];

        for sequence in orders {
            let mut graph = LineageGraph::new();
            for style in sequence {
                graph.add_node("orders", style);
            }
            assert_eq!(graph.style_of("orders"), Some(NodeStyle::Model));
        }

        let mut graph = LineageGraph::new();
        graph.add_node("raw", NodeStyle::Table);
        graph.add_node("raw", NodeStyle::Source);
        graph.add_node("raw", NodeStyle::Table);
        assert_eq!(graph.style_of("raw"), Some(NodeStyle::Source));
    }

    #[test]
    fn edges_are_deduplicated_by_label() {
        let mut graph = LineageGraph::new();
        assert!(graph.add_edge("orders", "users", Some("FK")));
        assert!(!graph.add_edge("orders", "users", Some("FK")));
        assert!(graph.add_edge("orders", "users", None));
        assert_eq!(graph.edges().count(), 2);
    }

    #[test]
    fn model_outranks_foreign_key_table() {
        let fks = [ForeignKey::new("orders", "user_id", "users", "id")];
        let models = [model("orders", &["users"])];

        let mermaid = LineageGraph::generate(&fks, &models);
        assert_eq!(
            mermaid,
            [
                "graph TD;",
                "    orders[\"orders\"]",
                "    users[\"users\"]",
                "",
                "    orders -- \"FK\" --> users",
                "    users --> orders",
            ]
            .join("\n")
        );
    }

    #[test]
    fn sources_and_tables_get_their_shapes() {
        let fks = [ForeignKey::new("payments", "order_id", "orders", "id")];
        let models = [
            model("stg_orders", &["jaffle.raw_orders"]),
            model("orders", &["stg_orders", "jaffle.raw_orders"]),
        ];

        let mermaid = LineageGraph::generate(&fks, &models);
        let lines: Vec<&str> = mermaid.lines().collect();

        assert_eq!(lines[0], "graph TD;");
        assert!(lines.contains(&"    jaffle.raw_orders((\"jaffle.raw_orders\"))"));
        assert!(lines.contains(&"    payments[(\"payments\")]"));
        assert!(lines.contains(&"    orders[\"orders\"]"));
        assert!(lines.contains(&"    payments -- \"FK\" --> orders"));
        assert!(lines.contains(&"    jaffle.raw_orders --> orders"));

        let blank = lines.iter().position(|l| l.is_empty()).unwrap();
        assert_eq!(blank, 5);
        assert_eq!(lines.len(), 5 + 1 + 4);
    }

    #[test]
    fn output_is_deterministic() {
        let fks = [
            ForeignKey::new("b", "x", "a", "id"),
            ForeignKey::new("c", "x", "a", "id"),
        ];
        let forward = [model("m1", &["b"]), model("m2", &["c", "m1"])];
        let reverse = [model("m2", &["m1", "c"]), model("m1", &["b"])];

        let fks_reversed: Vec<_> = fks.iter().rev().cloned().collect();
        assert_eq!(
            LineageGraph::generate(&fks, &forward),
            LineageGraph::generate(&fks_reversed, &reverse)
        );
    }

    #[test]
    fn empty_inputs_render_header_only() {
        assert_eq!(LineageGraph::generate(&[], &[]), "graph TD;\n");
    }
}
