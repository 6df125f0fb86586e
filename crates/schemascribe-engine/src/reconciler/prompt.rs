//! Operator prompts for interactive mode

use colored::Colorize;
use schemascribe_yaml::encode_scalar;
use serde_yaml::Value;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// A suggested value awaiting an operator decision
#[derive(Debug, Clone, Copy)]
pub struct PromptRequest<'a> {
    pub model: &'a str,
    pub column: Option<&'a str>,

    /// Field key, e.g. `description`
    pub field: &'a str,

    pub suggestion: &'a Value,
}

impl PromptRequest<'_> {
    /// `model 'orders'` or `column 'orders.id'`
    pub fn target(&self) -> String {
        match self.column {
            Some(column) => format!("column '{}.{}'", self.model, column),
            None => format!("model '{}'", self.model),
        }
    }

    /// Suggestion as plain text
    pub fn suggestion_text(&self) -> String {
        match self.suggestion {
            Value::String(s) => s.clone(),
            other => encode_scalar(other),
        }
    }
}

/// Operator decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResponse {
    /// Keep the suggestion verbatim
    Accept,

    /// Store this text instead
    Edit(String),

    /// Leave the field blank
    Skip,
}

/// Synchronous human-in-the-loop callback
pub trait Prompter {
    fn prompt(&mut self, request: &PromptRequest<'_>) -> io::Result<PromptResponse>;
}

/// Replays canned responses, then skips
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    responses: VecDeque<PromptResponse>,
    seen: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(responses: impl IntoIterator<Item = PromptResponse>) -> Self {
        Self {
            responses: responses.into_iter().collect(),
            seen: Vec::new(),
        }
    }

    /// `"<field> on <target>"` for every prompt shown so far
    pub fn seen(&self) -> &[String] {
        &self.seen
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt(&mut self, request: &PromptRequest<'_>) -> io::Result<PromptResponse> {
        self.seen.push(format!("{} on {}", request.field, request.target()));
        Ok(self.responses.pop_front().unwrap_or(PromptResponse::Skip))
    }
}

/// Line-based prompt on a terminal
///
/// Enter accepts, `s` skips, anything else replaces the suggestion.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn prompt(&mut self, request: &PromptRequest<'_>) -> io::Result<PromptResponse> {
        let suggestion = request.suggestion_text();

        writeln!(
            self.output,
            "{}",
            format!("Suggestion for '{}' on {}:", request.field, request.target()).cyan()
        )?;
        writeln!(self.output, "{}", format!("  AI: \"{suggestion}\"").green())?;
        write!(self.output, "  [Enter] to Accept, type to Edit, or [s] + [Enter] to Skip: ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            // Closed input: never apply anything unseen
            return Ok(PromptResponse::Skip);
        }

        let answer = line.trim_end_matches(['\r', '\n']);
        let response = if answer.trim().is_empty() || answer == suggestion {
            PromptResponse::Accept
        } else if answer.trim().eq_ignore_ascii_case("s") {
            PromptResponse::Skip
        } else {
            PromptResponse::Edit(answer.to_string())
        };

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ask(input: &str) -> PromptResponse {
        let suggestion = Value::String("Primary key".into());
        let request = PromptRequest {
            model: "orders",
            column: Some("id"),
            field: "description",
            suggestion: &suggestion,
        };

        let mut output = Vec::new();
        let mut prompter = TerminalPrompter::new(Cursor::new(input.as_bytes().to_vec()), &mut output);
        let response = prompter.prompt(&request).unwrap();

        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("column 'orders.id'"));
        assert!(shown.contains("Primary key"));
        response
    }

    #[test]
    fn terminal_answers() {
        assert_eq!(ask("\n"), PromptResponse::Accept);
        assert_eq!(ask("Primary key\n"), PromptResponse::Accept);
        assert_eq!(ask("s\n"), PromptResponse::Skip);
        assert_eq!(ask("S\r\n"), PromptResponse::Skip);
        assert_eq!(ask("Order id\n"), PromptResponse::Edit("Order id".into()));
        assert_eq!(ask(""), PromptResponse::Skip);
    }

    #[test]
    fn scripted_prompter_records_and_defaults_to_skip() {
        let suggestion = Value::String("x".into());
        let request = PromptRequest {
            model: "orders",
            column: None,
            field: "description",
            suggestion: &suggestion,
        };

        let mut prompter = ScriptedPrompter::new([PromptResponse::Accept]);
        assert_eq!(prompter.prompt(&request).unwrap(), PromptResponse::Accept);
        assert_eq!(prompter.prompt(&request).unwrap(), PromptResponse::Skip);
        assert_eq!(prompter.seen(), &["description on model 'orders'", "description on model 'orders'"]);
    }
}
