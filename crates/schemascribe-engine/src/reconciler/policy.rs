//! Field policy: the single place where documentation gets mutated
//!
//! [`decide`] is a pure function of the mode, the target's current state and
//! the candidate value. [`FieldPolicy::process_update`] carries the decision
//! out, asking the operator when the decision is [`Decision::Prompt`].

use super::error::ReconcileError;
use super::prompt::{PromptRequest, PromptResponse, Prompter};
use schemascribe_core::{Diagnostic, DiagnosticCode, IndentStyle, Location, Mode, Report, Severity};
use schemascribe_yaml::{value_is_blank, Mapping, YamlError};
use serde_yaml::Value;
use std::path::Path;

/// Outcome of the field policy for one candidate
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Write the value
    Apply(Value),

    /// Report that the field needs the value, change nothing
    Flag,

    /// Ask the operator about the value
    Prompt(Value),

    /// Nothing to do
    Skip,
}

/// Something holding documentation fields
pub trait FieldTarget {
    fn is_blank(&self, field: &str) -> bool;

    /// Store `value`; returns whether anything changed
    fn apply(&mut self, field: &str, value: &Value, style: &IndentStyle) -> Result<bool, YamlError>;
}

impl FieldTarget for Mapping {
    fn is_blank(&self, field: &str) -> bool {
        Mapping::is_blank(self, field)
    }

    fn apply(&mut self, field: &str, value: &Value, style: &IndentStyle) -> Result<bool, YamlError> {
        self.set(field, value, style)
    }
}

/// Stubs are built as plain values before they are emitted
impl FieldTarget for serde_yaml::Mapping {
    fn is_blank(&self, field: &str) -> bool {
        self.get(field).map_or(true, value_is_blank)
    }

    fn apply(&mut self, field: &str, value: &Value, _style: &IndentStyle) -> Result<bool, YamlError> {
        let previous = self.insert(Value::String(field.to_string()), value.clone());
        Ok(previous.as_ref() != Some(value))
    }
}

/// Decide what to do with `candidate` for `field`
///
/// Filled fields are never touched and blank candidates are never offered.
pub fn decide(mode: Mode, target: &dyn FieldTarget, field: &str, candidate: &Value) -> Decision {
    if value_is_blank(candidate) || !target.is_blank(field) {
        return Decision::Skip;
    }

    match mode {
        Mode::Check => Decision::Flag,
        Mode::Interactive => Decision::Prompt(candidate.clone()),
        Mode::Update | Mode::Drift => Decision::Apply(candidate.clone()),
    }
}

/// What a field belongs to, for prompts and diagnostics
#[derive(Debug, Clone, Copy)]
pub(crate) struct Subject<'a> {
    pub model: &'a str,
    pub column: Option<&'a str>,
    pub file: &'a Path,
    pub line: Option<usize>,
}

impl Subject<'_> {
    fn describe(&self) -> String {
        match self.column {
            Some(column) => format!("column '{}.{}'", self.model, column),
            None => format!("model '{}'", self.model),
        }
    }

    fn diagnostic(&self, code: DiagnosticCode, severity: Severity, field: &str, message: String) -> Diagnostic {
        let file = self.file.display().to_string();
        let location = match self.line {
            Some(line) => Location::with_line(file, line),
            None => Location::new(file),
        };

        Diagnostic::new(code, severity, message)
            .with_location(location)
            .with_subject(self.model, self.column.map(str::to_string))
            .with_field(field)
    }
}

/// Run-scoped state the policy needs to act
pub(crate) struct FieldPolicy<'a> {
    pub mode: Mode,
    pub style: &'a IndentStyle,
    pub prompter: Option<&'a mut Box<dyn Prompter>>,
    pub report: &'a mut Report,
}

impl FieldPolicy<'_> {
    /// Apply the field policy to one candidate
    ///
    /// Returns `true` when the field changed or, in check mode, would change.
    pub fn process_update(
        &mut self,
        target: &mut dyn FieldTarget,
        field: &str,
        candidate: &Value,
        subject: Subject<'_>,
    ) -> Result<bool, ReconcileError> {
        let what = format!("'{}' on {}", field, subject.describe());

        let value = match decide(self.mode, &*target, field, candidate) {
            Decision::Skip => return Ok(false),
            Decision::Flag => {
                tracing::warn!("CI CHECK: missing {what}");
                self.report.add_diagnostic(subject.diagnostic(
                    DiagnosticCode::DocFieldMissing,
                    Severity::Warn,
                    field,
                    format!("Missing {what}"),
                ));
                return Ok(true);
            }
            Decision::Prompt(suggestion) => match self.ask(field, &suggestion, subject)? {
                Some(value) => value,
                None => {
                    tracing::info!("operator skipped {what}");
                    self.report.add_diagnostic(subject.diagnostic(
                        DiagnosticCode::DocFieldSkipped,
                        Severity::Info,
                        field,
                        format!("Skipped {what}"),
                    ));
                    return Ok(false);
                }
            },
            Decision::Apply(value) => value,
        };

        let changed = target
            .apply(field, &value, self.style)
            .map_err(|source| ReconcileError::Update {
                path: subject.file.to_path_buf(),
                source,
            })?;

        if changed {
            tracing::info!("updating {what}");
            self.report.add_diagnostic(subject.diagnostic(
                DiagnosticCode::DocFieldUpdated,
                Severity::Info,
                field,
                format!("Filled {what}"),
            ));
        }
        Ok(changed)
    }

    /// `None` means the operator declined
    fn ask(&mut self, field: &str, suggestion: &Value, subject: Subject<'_>) -> Result<Option<Value>, ReconcileError> {
        let prompter = self
            .prompter
            .as_mut()
            .ok_or_else(|| ReconcileError::Configuration("interactive mode requires a prompter".to_string()))?;

        let request = PromptRequest {
            model: subject.model,
            column: subject.column,
            field,
            suggestion,
        };

        match prompter.prompt(&request).map_err(ReconcileError::Prompt)? {
            PromptResponse::Accept => Ok(Some(suggestion.clone())),
            PromptResponse::Edit(text) if text.trim().is_empty() => Ok(None),
            PromptResponse::Edit(text) => Ok(Some(Value::String(text))),
            PromptResponse::Skip => Ok(None),
        }
    }
}

/// Catalog values are JSON; documentation is YAML
pub(crate) fn json_to_yaml(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                Value::Number(n.as_f64().unwrap_or_default().into())
            }
        }
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::Sequence(items.iter().map(json_to_yaml).collect()),
        serde_json::Value::Object(map) => Value::Mapping(
            map.iter()
                .map(|(k, v)| (Value::String(k.clone()), json_to_yaml(v)))
                .collect(),
        ),
    }
}
