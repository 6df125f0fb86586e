//! Indentation-driven layout parser
//!
//! Builds the line tree used by [`crate::Document`]. Semantic validation is
//! done separately by `serde_yaml`; this pass only has to find where each
//! mapping entry and sequence item starts and ends.

use crate::document::{Document, Entry, ItemBody, Mapping, Node, SeqItem, Sequence};
use crate::error::YamlError;

/// Number of leading spaces
pub(crate) fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Blank or comment-only line
pub(crate) fn is_trivia(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Sequence entry indicator at the start of `content`
pub(crate) fn is_dash(content: &str) -> bool {
    content == "-" || content.starts_with("- ") || content.starts_with("-\t")
}

fn is_value_separator(after_colon: &str) -> bool {
    after_colon.is_empty() || after_colon.starts_with(' ') || after_colon.starts_with('\t')
}

fn closing_double_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            return Some(i);
        }
    }
    None
}

fn closing_single_quote(s: &str) -> Option<usize> {
    let mut chars = s.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        if c == '\'' {
            if matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
            } else {
                return Some(i);
            }
        }
    }
    None
}

fn colon_after_quote(content: &str, quote_end: usize) -> Option<usize> {
    let from = quote_end + 1;
    let rest = &content[from..];
    let trimmed = rest.trim_start_matches(' ');
    let colon = from + (rest.len() - trimmed.len());
    (trimmed.starts_with(':') && is_value_separator(&content[colon + 1..])).then_some(colon)
}

/// Byte offset of the `:` that ends a mapping key, if `content` is a key line
pub(crate) fn split_key(content: &str) -> Option<usize> {
    match content.chars().next()? {
        '"' => colon_after_quote(content, closing_double_quote(content)?),
        '\'' => colon_after_quote(content, closing_single_quote(content)?),
        '{' | '[' | '#' | '|' | '>' | '&' | '*' | '!' | '%' | '@' | '`' | '?' => None,
        '-' if is_dash(content) => None,
        _ => {
            let mut prev_blank = false;
            for (i, c) in content.char_indices() {
                if c == '#' && prev_blank {
                    return None;
                }
                if c == ':' && is_value_separator(&content[i + 1..]) {
                    return Some(i);
                }
                prev_blank = c == ' ' || c == '\t';
            }
            None
        }
    }
}

/// Decoded form of a raw key
pub(crate) fn decode_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') || trimmed.starts_with('\'') {
        serde_yaml::from_str::<String>(trimmed).unwrap_or_else(|_| trimmed.to_string())
    } else {
        trimmed.to_string()
    }
}

enum ValueStart {
    /// Nothing after the colon (or only a comment)
    Empty,
    /// `|` or `>`
    BlockScalar,
    /// Anything else on the key line
    Inline,
}

/// `text` past any leading anchors and tags
pub(crate) fn skip_properties(text: &str) -> &str {
    let mut rest = text.trim_start();
    while rest.starts_with('&') || rest.starts_with('!') {
        let end = rest.find(|c: char| c == ' ' || c == '\t').unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }
    rest
}

fn value_start(after_colon: &str) -> ValueStart {
    let trimmed = skip_properties(after_colon);
    if trimmed.is_empty() || trimmed.starts_with('#') {
        ValueStart::Empty
    } else if trimmed.starts_with('|') || trimmed.starts_with('>') {
        ValueStart::BlockScalar
    } else {
        ValueStart::Inline
    }
}

fn is_document_start(line: &str) -> bool {
    let trimmed = line.trim_end();
    trimmed == "---" || trimmed.starts_with("--- #")
}

fn is_document_end(line: &str) -> bool {
    line.trim_end() == "..."
}

/// Split text into lines, remembering the newline convention
///
/// `\r\n` is only adopted when every line break uses it; mixed files keep
/// their carriage returns inside the stored lines.
pub(crate) fn split_lines(text: &str) -> (&'static str, bool, Vec<String>) {
    let breaks = text.matches('\n').count();
    let crlf = breaks > 0 && text.matches("\r\n").count() == breaks;
    let newline = if crlf { "\r\n" } else { "\n" };
    let trailing_newline = text.ends_with('\n');

    let mut lines: Vec<String> = text
        .split('\n')
        .map(|line| {
            if crlf {
                line.strip_suffix('\r').unwrap_or(line).to_string()
            } else {
                line.to_string()
            }
        })
        .collect();

    if trailing_newline {
        lines.pop();
    }
    if text.is_empty() {
        lines.clear();
    }

    (newline, trailing_newline, lines)
}

pub(crate) struct Parser {
    lines: Vec<String>,
    pos: usize,
    synthetic: bool,
}

impl Parser {
    pub(crate) fn new(lines: Vec<String>) -> Self {
        Self {
            lines,
            pos: 0,
            synthetic: false,
        }
    }

    /// Parser over generated lines; entries carry no source line numbers
    pub(crate) fn synthetic(lines: Vec<String>) -> Self {
        Self {
            lines,
            pos: 0,
            synthetic: true,
        }
    }

    fn line_no(&self, idx: usize) -> Option<usize> {
        (!self.synthetic).then_some(idx + 1)
    }

    fn layout_error(&self, idx: usize, message: &str) -> YamlError {
        YamlError::Layout {
            line: idx + 1,
            message: message.to_string(),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.lines.len()
    }

    /// Index of the next non-trivia line, without consuming anything
    fn peek_content(&self) -> Option<usize> {
        (self.pos..self.lines.len()).find(|&i| !is_trivia(&self.lines[i]))
    }

    fn take_trivia(&mut self) -> Vec<String> {
        let mut taken = Vec::new();
        while !self.at_end() && is_trivia(&self.lines[self.pos]) {
            taken.push(self.lines[self.pos].clone());
            self.pos += 1;
        }
        taken
    }

    /// Lines belonging to a value that started on a line at `indent`
    ///
    /// Blank lines and trailing comments are left for the next sibling.
    fn take_continuation(&mut self, indent: usize, block_scalar: bool) -> Vec<String> {
        let start = self.pos;
        let mut end = self.pos;
        let mut i = self.pos;

        while i < self.lines.len() {
            let line = &self.lines[i];
            if line.trim().is_empty() {
                i += 1;
                continue;
            }
            if indent_of(line) <= indent {
                break;
            }
            i += 1;
            if block_scalar || !is_trivia(line) {
                end = i;
            }
        }

        self.pos = end;
        self.lines[start..end].to_vec()
    }

    pub(crate) fn parse_document(mut self, newline: &'static str, trailing_newline: bool) -> Result<Document, YamlError> {
        let mut head = Vec::new();

        // Directives and an explicit `---` stay in front of the root
        while let Some(idx) = self.peek_content() {
            let line = &self.lines[idx];
            let directive = line.starts_with('%');
            let start = is_document_start(line);
            if !directive && !start {
                break;
            }
            head.extend(self.lines[self.pos..=idx].iter().cloned());
            self.pos = idx + 1;
            if start {
                break;
            }
        }

        let root = match self.peek_content() {
            Some(idx) if !is_document_end(&self.lines[idx]) => Some(self.parse_block(idx)?),
            _ => None,
        };

        let mut tail = Vec::new();
        while !self.at_end() {
            let line = &self.lines[self.pos];
            if !is_trivia(line) && !is_document_end(line) {
                return Err(self.layout_error(self.pos, "unexpected content after the document root"));
            }
            tail.push(line.clone());
            self.pos += 1;
        }

        Ok(Document::from_parts(head, root, tail, newline, trailing_newline))
    }

    /// Parse the block whose first content line is `idx`
    fn parse_block(&mut self, idx: usize) -> Result<Node, YamlError> {
        let line = &self.lines[idx];
        let indent = indent_of(line);
        let content = &line[indent..];

        if is_dash(content) {
            Ok(Node::Sequence(self.parse_sequence(indent)?))
        } else if split_key(content).is_some() {
            Ok(Node::Mapping(self.parse_mapping(indent)?))
        } else {
            // Root scalar or flow collection: keep it verbatim
            let first = self.pos;
            self.pos = idx + 1;
            let rest = self.take_rest();
            let mut lines = self.lines[first..=idx].to_vec();
            lines.extend(rest);
            Ok(Node::Raw(lines))
        }
    }

    fn take_rest(&mut self) -> Vec<String> {
        let start = self.pos;
        let mut end = self.pos;
        for i in self.pos..self.lines.len() {
            if !is_trivia(&self.lines[i]) {
                end = i + 1;
            }
        }
        self.pos = end;
        self.lines[start..end].to_vec()
    }

    pub(crate) fn parse_mapping(&mut self, indent: usize) -> Result<Mapping, YamlError> {
        self.parse_mapping_from(indent, Vec::new())
    }

    /// Parse mapping entries at `indent`, after any already-parsed `entries`
    fn parse_mapping_from(&mut self, indent: usize, mut entries: Vec<Entry>) -> Result<Mapping, YamlError> {
        loop {
            let save = self.pos;
            let leading = self.take_trivia();
            if self.at_end() {
                self.pos = save;
                break;
            }

            let idx = self.pos;
            let line = self.lines[idx].clone();
            let line_indent = indent_of(&line);

            if line_indent < indent
                || is_document_end(&line)
                || is_document_start(&line)
                || is_dash(&line[line_indent..])
            {
                self.pos = save;
                break;
            }
            if line_indent > indent {
                return Err(self.layout_error(idx, "unexpected indentation"));
            }

            self.pos += 1;
            entries.push(self.parse_entry(indent, leading, line, idx, indent)?);
        }

        Ok(Mapping::from_parts(indent, entries))
    }

    /// Parse one entry whose key starts at byte `key_start` of `head`
    fn parse_entry(
        &mut self,
        indent: usize,
        leading: Vec<String>,
        head: String,
        idx: usize,
        key_start: usize,
    ) -> Result<Entry, YamlError> {
        let colon = split_key(&head[key_start..])
            .ok_or_else(|| self.layout_error(idx, "expected a `key: value` line"))?;
        let key_end = key_start + colon;
        let key = decode_key(&head[key_start..key_end]);

        let mut continuation = Vec::new();
        let mut child = None;

        match value_start(&head[key_end + 1..]) {
            ValueStart::Inline => continuation = self.take_continuation(indent, false),
            ValueStart::BlockScalar => continuation = self.take_continuation(indent, true),
            ValueStart::Empty => {
                if let Some(next) = self.peek_content() {
                    let line = &self.lines[next];
                    let next_indent = indent_of(line);
                    let content = &line[next_indent..];

                    // `key:` followed by a dash at the same indent is a sequence
                    if is_dash(content) && next_indent >= indent && !is_document_start(line) {
                        child = Some(Node::Sequence(self.parse_sequence(next_indent)?));
                    } else if next_indent > indent && split_key(content).is_some() {
                        child = Some(Node::Mapping(self.parse_mapping(next_indent)?));
                    } else if next_indent > indent {
                        // Plain scalar starting on the following line
                        continuation = self.take_continuation(indent, false);
                    }
                }
            }
        }

        Ok(Entry::from_parts(
            leading,
            head,
            key_start,
            key_end,
            key,
            continuation,
            child,
            self.line_no(idx),
        ))
    }

    pub(crate) fn parse_sequence(&mut self, indent: usize) -> Result<Sequence, YamlError> {
        let mut items = Vec::new();

        loop {
            let save = self.pos;
            let leading = self.take_trivia();
            if self.at_end() {
                self.pos = save;
                break;
            }

            let idx = self.pos;
            let line = self.lines[idx].clone();
            let line_indent = indent_of(&line);

            if line_indent != indent || !is_dash(&line[line_indent..]) {
                if line_indent > indent {
                    return Err(self.layout_error(idx, "unexpected indentation"));
                }
                self.pos = save;
                break;
            }

            self.pos += 1;
            let after_dash = &line[indent + 1..];
            let gap = 1 + (after_dash.len() - after_dash.trim_start_matches(' ').len());
            let body_text = after_dash.trim_start_matches(' ');

            let bare = skip_properties(body_text);
            let body = if bare.is_empty() || bare.starts_with('#') {
                let child = self.parse_item_child(indent)?;
                ItemBody::Block { text: line, child }
            } else if split_key(body_text).is_some() {
                let content_col = indent + gap;
                let first = self.parse_entry(content_col, Vec::new(), line, idx, content_col)?;
                ItemBody::Mapping(self.parse_mapping_from(content_col, vec![first])?)
            } else {
                let block_scalar = bare.starts_with('|') || bare.starts_with('>');
                let continuation = self.take_continuation(indent, block_scalar);
                ItemBody::Scalar { text: line, continuation }
            };

            items.push(SeqItem::from_parts(leading, body, self.line_no(idx)));
        }

        Ok(Sequence::from_parts(indent, items))
    }

    /// Content nested under a bare `-`
    fn parse_item_child(&mut self, indent: usize) -> Result<Option<Node>, YamlError> {
        let Some(next) = self.peek_content() else {
            return Ok(None);
        };
        let line = &self.lines[next];
        let next_indent = indent_of(line);
        if next_indent <= indent {
            return Ok(None);
        }

        let content = &line[next_indent..];
        if is_dash(content) {
            Ok(Some(Node::Sequence(self.parse_sequence(next_indent)?)))
        } else if split_key(content).is_some() {
            Ok(Some(Node::Mapping(self.parse_mapping(next_indent)?)))
        } else {
            Ok(Some(Node::Raw(self.take_continuation(indent, false))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_detection() {
        assert_eq!(split_key("name: orders"), Some(4));
        assert_eq!(split_key("columns:"), Some(7));
        assert_eq!(split_key("name  : x"), Some(6));
        assert_eq!(split_key("\"quoted key\": 1"), Some(12));
        assert_eq!(split_key("'it''s': 1"), Some(7));
        assert_eq!(split_key("url: http://example.com"), Some(3));
    }

    #[test]
    fn non_keys() {
        assert_eq!(split_key("http://example.com"), None);
        assert_eq!(split_key("\"a: b\""), None);
        assert_eq!(split_key("{a: 1}"), None);
        assert_eq!(split_key("- item"), None);
        assert_eq!(split_key("plain # note: here"), None);
        assert_eq!(split_key("? complex"), None);
    }

    #[test]
    fn key_decoding() {
        assert_eq!(decode_key("name "), "name");
        assert_eq!(decode_key("\"my key\""), "my key");
        assert_eq!(decode_key("'it''s'"), "it's");
    }

    #[test]
    fn line_splitting() {
        let (nl, trailing, lines) = split_lines("a: 1\r\nb: 2\r\n");
        assert_eq!(nl, "\r\n");
        assert!(trailing);
        assert_eq!(lines, vec!["a: 1", "b: 2"]);

        let (nl, trailing, lines) = split_lines("a: 1\nb: 2");
        assert_eq!(nl, "\n");
        assert!(!trailing);
        assert_eq!(lines, vec!["a: 1", "b: 2"]);

        let (_, _, lines) = split_lines("");
        assert!(lines.is_empty());
    }

    #[test]
    fn properties_are_skipped() {
        assert_eq!(skip_properties(" &cols"), "");
        assert_eq!(skip_properties(" !!map # typed"), "# typed");
        assert_eq!(skip_properties(" &a !custom |"), "|");
        assert_eq!(skip_properties(" plain"), "plain");
    }

    #[test]
    fn anchored_blocks_stay_navigable() {
        let lines: Vec<String> = ["columns: &cols", "  - name: id", "    description: PK", "meta: !!map", "  owner: data"]
            .iter()
            .map(|l| l.to_string())
            .collect();
        let mut parser = Parser::new(lines);
        let mapping = parser.parse_mapping(0).unwrap();

        let columns = mapping.sequence("columns").unwrap();
        assert_eq!(columns.find_by_name("id").unwrap().get_str("description").as_deref(), Some("PK"));
        assert_eq!(mapping.mapping("meta").unwrap().get_str("owner").as_deref(), Some("data"));
        assert!(mapping.get("columns").unwrap().continuation_lines().is_empty());
    }

    #[test]
    fn continuation_leaves_trailing_comments() {
        let lines = vec![
            "a: first".to_string(),
            "  second".to_string(),
            "  # about b".to_string(),
            "".to_string(),
            "b: 2".to_string(),
        ];
        let mut parser = Parser::new(lines);
        let mapping = parser.parse_mapping(0).unwrap();

        let a = mapping.get("a").unwrap();
        assert_eq!(a.continuation_lines(), &["  second".to_string()]);
        let b = mapping.get("b").unwrap();
        assert_eq!(b.leading_lines(), &["  # about b".to_string(), "".to_string()]);
    }
}
