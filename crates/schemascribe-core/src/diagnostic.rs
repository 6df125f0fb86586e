//! Findings raised while reconciling documentation
//!
//! Codes serialize to stable `SCREAMING_SNAKE_CASE` names that CI tooling
//! matches on. Existing names never change; new findings get new codes.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    /// Blank field with a generated value available
    DocFieldMissing,

    /// Catalog model with no documentation node
    DocModelMissing,

    DocFieldUpdated,

    /// Operator declined a suggestion
    DocFieldSkipped,

    DocStubCreated,

    /// Human-written text conflicts with live data
    DocDrift,

    /// Model name documented in more than one place
    DocDuplicateDefinition,

    /// Stub has nowhere to go: the model has no SQL path
    DocStubUnplaceable,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocFieldMissing => "DOC_FIELD_MISSING",
            Self::DocModelMissing => "DOC_MODEL_MISSING",
            Self::DocFieldUpdated => "DOC_FIELD_UPDATED",
            Self::DocFieldSkipped => "DOC_FIELD_SKIPPED",
            Self::DocStubCreated => "DOC_STUB_CREATED",
            Self::DocDrift => "DOC_DRIFT",
            Self::DocDuplicateDefinition => "DOC_DUPLICATE_DEFINITION",
            Self::DocStubUnplaceable => "DOC_STUB_UNPLACEABLE",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered so that `Info < Warn < Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,

    /// Needs review, does not fail the run
    Warn,

    /// The affected model was not reconciled
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

/// Documentation file plus optional 1-based line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: Option<usize>,
}

impl Location {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
        }
    }

    pub fn with_line(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file, line),
            None => f.write_str(&self.file),
        }
    }
}

/// One finding, tied to a model and optionally a column and field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,

    /// Best effort; absent for models that have no documentation yet
    pub location: Option<Location>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    /// Field key, e.g. `description`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            location: None,
            model: None,
            column: None,
            field: None,
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_subject(mut self, model: impl Into<String>, column: Option<String>) -> Self {
        self.model = Some(model.into());
        self.column = column;
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// `warn[DOC_DRIFT] models/schema.yml:7: message`
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.severity, self.code)?;
        if let Some(location) = &self.location {
            write!(f, " {location}")?;
        }
        write!(f, ": {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_have_stable_names() {
        assert_eq!(DiagnosticCode::DocFieldMissing.as_str(), "DOC_FIELD_MISSING");
        assert_eq!(DiagnosticCode::DocDrift.as_str(), "DOC_DRIFT");
        assert_eq!(DiagnosticCode::DocStubUnplaceable.as_str(), "DOC_STUB_UNPLACEABLE");
    }

    #[test]
    fn serde_names_match_as_str() {
        let json = serde_json::to_string(&DiagnosticCode::DocDuplicateDefinition).unwrap();
        assert_eq!(json, "\"DOC_DUPLICATE_DEFINITION\"");
    }

    #[test]
    fn diagnostic_serialization() {
        let diag = Diagnostic::new(
            DiagnosticCode::DocFieldMissing,
            Severity::Warn,
            "Missing 'description' on column 'orders.id'",
        )
        .with_location(Location::with_line("models/schema.yml", 7))
        .with_subject("orders", Some("id".to_string()))
        .with_field("description");

        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("DOC_FIELD_MISSING"));
        assert!(json.contains("\"warn\""));
        assert!(json.contains("\"column\":\"id\""));
    }

    #[test]
    fn location_display() {
        assert_eq!(Location::new("a.yml").to_string(), "a.yml");
        assert_eq!(Location::with_line("a.yml", 3).to_string(), "a.yml:3");
    }

    #[test]
    fn display_includes_location_when_known() {
        let diag = Diagnostic::new(DiagnosticCode::DocDrift, Severity::Warn, "conflicts with live data")
            .with_location(Location::with_line("models/schema.yml", 7));
        assert_eq!(diag.to_string(), "warn[DOC_DRIFT] models/schema.yml:7: conflicts with live data");

        let bare = Diagnostic::new(DiagnosticCode::DocModelMissing, Severity::Warn, "missing");
        assert_eq!(bare.to_string(), "warn[DOC_MODEL_MISSING]: missing");
    }
}
