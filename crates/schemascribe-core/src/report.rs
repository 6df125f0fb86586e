//! Reconciliation run report
//!
//! The JSON shape is versioned. Fields may be added in a minor version;
//! renaming or removing one needs a new major version.

use crate::config::Mode;
use crate::diagnostic::{Diagnostic, DiagnosticCode, Severity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    pub major: u32,
    pub minor: u32,
}

impl ReportVersion {
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Counters kept up to date while a run progresses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Diagnostics of every severity
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,

    /// Catalog models looked at
    pub models_checked: usize,

    /// Models that needed (or in check mode would need) a change
    pub models_outdated: usize,

    /// Documentation files persisted
    pub files_written: usize,
}

/// Everything one reconciliation run found and did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub version: ReportVersion,

    /// RFC 3339 creation time
    pub timestamp: String,

    pub mode: Mode,
    pub summary: ReportSummary,

    /// In the order they were raised
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn new(mode: Mode) -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            mode,
            summary: ReportSummary::default(),
            diagnostics: Vec::new(),
        }
    }

    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        let counter = match diagnostic.severity {
            Severity::Error => &mut self.summary.errors,
            Severity::Warn => &mut self.summary.warnings,
            Severity::Info => &mut self.summary.info,
        };
        *counter += 1;
        self.summary.total += 1;
        self.diagnostics.push(diagnostic);
    }

    /// Count one processed catalog model
    pub fn record_model(&mut self, outdated: bool) {
        self.summary.models_checked += 1;
        if outdated {
            self.summary.models_outdated += 1;
        }
    }

    pub fn record_files_written(&mut self, count: usize) {
        self.summary.files_written = count;
    }

    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    /// Diagnostics carrying `code`
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }

    /// Names of models with at least one diagnostic at `severity` or above
    pub fn models_at_least(&self, severity: Severity) -> Vec<&str> {
        let mut models: Vec<&str> = self
            .diagnostics
            .iter()
            .filter(|d| d.severity >= severity)
            .filter_map(|d| d.model.as_deref())
            .collect();
        models.sort_unstable();
        models.dedup();
        models
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn save_to_file(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new(Mode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_report_is_empty() {
        let report = Report::new(Mode::Check);
        assert_eq!(report.version.to_string(), "1.0");
        assert_eq!(report.mode, Mode::Check);
        assert_eq!(report.summary, ReportSummary::default());
        assert!(!report.has_errors());
    }

    #[test]
    fn severities_are_counted() {
        let mut report = Report::new(Mode::Update);
        report.add_diagnostic(
            Diagnostic::new(DiagnosticCode::DocStubUnplaceable, Severity::Error, "no path").with_subject("orphan", None),
        );
        report.add_diagnostic(
            Diagnostic::new(DiagnosticCode::DocFieldUpdated, Severity::Info, "filled").with_subject("orders", None),
        );
        report.add_diagnostic(
            Diagnostic::new(DiagnosticCode::DocFieldUpdated, Severity::Info, "filled").with_subject("orders", None),
        );

        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.summary.info, 2);
        assert_eq!(report.with_code(DiagnosticCode::DocFieldUpdated).count(), 2);
        assert_eq!(report.models_at_least(Severity::Warn), vec!["orphan"]);
        assert_eq!(report.models_at_least(Severity::Info), vec!["orders", "orphan"]);
        assert!(report.has_errors());
    }

    #[test]
    fn model_counters() {
        let mut report = Report::new(Mode::Update);
        report.record_model(true);
        report.record_model(false);
        report.record_files_written(1);

        assert_eq!(report.summary.models_checked, 2);
        assert_eq!(report.summary.models_outdated, 1);
        assert_eq!(report.summary.files_written, 1);
    }

    #[test]
    fn saved_report_reads_back() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("report.json");

        let mut report = Report::new(Mode::Drift);
        report.add_diagnostic(Diagnostic::new(DiagnosticCode::DocDrift, Severity::Warn, "drift"));
        report.save_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"mode\": \"drift\""));
        let read: Report = serde_json::from_str(&text).unwrap();
        assert_eq!(read, report);
    }
}
