//! Configuration schema (schemascribe.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How the documentation reconciler treats missing or outdated fields
///
/// Fixed for the lifetime of a reconciler. Every field-level decision
/// branches on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Fill blank fields and persist the result
    Update,

    /// Report what would change; never mutate anything
    Check,

    /// Ask an operator before every change, persist accepted changes
    Interactive,

    /// Flag human-written text that diverges from the live schema; never persist
    Drift,
}

impl Mode {
    /// All modes, in declaration order
    pub const ALL: [Mode; 4] = [Mode::Update, Mode::Check, Mode::Interactive, Mode::Drift];

    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Check => "check",
            Self::Interactive => "interactive",
            Self::Drift => "drift",
        }
    }

    /// Whether modified documentation files are written back to disk
    pub fn writes_to_disk(&self) -> bool {
        matches!(self, Self::Update | Self::Interactive)
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::Update
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str() == s.trim())
            .ok_or_else(|| ConfigError::InvalidMode(s.to_string()))
    }
}

/// dbt project layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbtConfig {
    /// dbt project root, relative to the config file
    pub project_dir: PathBuf,

    /// Directories scanned (recursively) for documentation files
    pub doc_dirs: Vec<String>,

    /// Project configuration file, never treated as documentation
    pub project_file: String,

    /// File name used when a new documentation file has to be created
    pub stub_file_name: String,
}

impl Default for DbtConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            doc_dirs: vec![
                "models".to_string(),
                "seeds".to_string(),
                "snapshots".to_string(),
            ],
            project_file: "dbt_project.yml".to_string(),
            stub_file_name: "schema.yml".to_string(),
        }
    }
}

/// Indentation used when emitting new YAML content
///
/// The defaults produce the layout most dbt projects use:
///
/// ```yaml
/// models:
///   - name: orders
///     columns:
///       - name: id
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndentStyle {
    /// Indent of a nested mapping relative to its parent key
    pub mapping: usize,

    /// Indent of sequence item content relative to the parent key
    pub sequence: usize,

    /// Indent of the dash relative to the parent key
    pub offset: usize,
}

impl IndentStyle {
    /// Columns between a sequence dash and the item content
    pub fn dash_gap(&self) -> usize {
        self.sequence.saturating_sub(self.offset).max(2)
    }
}

impl Default for IndentStyle {
    fn default() -> Self {
        Self {
            mapping: 2,
            sequence: 4,
            offset: 2,
        }
    }
}

/// Token budgets for describer calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescribeConfig {
    /// Budget for a model summary
    pub model_max_tokens: u32,

    /// Budget for a column description
    pub column_max_tokens: u32,

    /// Budget for a drift verdict
    pub drift_max_tokens: u32,
}

impl Default for DescribeConfig {
    fn default() -> Self {
        Self {
            model_max_tokens: 200,
            column_max_tokens: 60,
            drift_max_tokens: 10,
        }
    }
}

/// Settings for a documentation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Reconciliation mode
    #[serde(default)]
    pub mode: Mode,

    /// dbt project layout
    #[serde(default)]
    pub dbt: DbtConfig,

    /// YAML emission style
    #[serde(default)]
    pub yaml: IndentStyle,

    /// Describer budgets
    #[serde(default)]
    pub describe: DescribeConfig,

    /// Directory the config was loaded from (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            dbt: DbtConfig::default(),
            yaml: IndentStyle::default(),
            describe: DescribeConfig::default(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Read `schemascribe.toml`-style configuration from `path`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        // Relative project paths resolve against the config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Parse configuration text
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.project_root = std::env::current_dir().unwrap_or_default();
        Ok(config)
    }

    /// Write the configuration back as TOML
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Absolute-or-root-relative dbt project directory
    pub fn project_dir(&self) -> PathBuf {
        self.project_root.join(&self.dbt.project_dir)
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid mode '{0}': expected one of update, check, interactive, drift")]
    InvalidMode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.mode, Mode::Update);
        assert_eq!(config.dbt.doc_dirs, vec!["models", "seeds", "snapshots"]);
        assert_eq!(config.dbt.stub_file_name, "schema.yml");
        assert_eq!(config.yaml, IndentStyle { mapping: 2, sequence: 4, offset: 2 });
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("check".parse::<Mode>().unwrap(), Mode::Check);
        assert_eq!(" drift ".parse::<Mode>().unwrap(), Mode::Drift);

        let err = "overwrite".parse::<Mode>().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMode(ref m) if m == "overwrite"));
    }

    #[test]
    fn only_update_and_interactive_write() {
        assert!(Mode::Update.writes_to_disk());
        assert!(Mode::Interactive.writes_to_disk());
        assert!(!Mode::Check.writes_to_disk());
        assert!(!Mode::Drift.writes_to_disk());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
mode = "check"

[dbt]
project_dir = "analytics"

[yaml]
sequence = 2
offset = 0
"#,
        )
        .unwrap();

        assert_eq!(config.mode, Mode::Check);
        assert_eq!(config.dbt.project_dir, PathBuf::from("analytics"));
        assert_eq!(config.dbt.project_file, "dbt_project.yml");
        assert_eq!(config.yaml.mapping, 2);
        assert_eq!(config.yaml.dash_gap(), 2);
        assert_eq!(config.describe.model_max_tokens, 200);
    }

    #[test]
    fn invalid_mode_in_toml_is_rejected() {
        let result = Config::from_toml("mode = \"rewrite\"");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn config_toml_roundtrip() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.mode, parsed.mode);
        assert_eq!(config.dbt, parsed.dbt);
        assert_eq!(config.yaml, parsed.yaml);
    }
}
