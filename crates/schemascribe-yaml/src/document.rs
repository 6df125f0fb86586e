//! Line-preserving document tree

use crate::emit;
use crate::error::YamlError;
use crate::parser::{self, Parser};
use crate::value_is_blank;
use schemascribe_core::IndentStyle;
use serde_yaml::Value;

/// A parsed YAML file
///
/// Rendering an unmodified document reproduces the input byte for byte.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Directives and an explicit `---`
    head: Vec<String>,

    /// Root block, if the file has any content
    root: Option<Node>,

    /// Trailing comments, blank lines and `...`
    tail: Vec<String>,

    /// Line terminator used on render
    newline: &'static str,

    /// Whether the source ended with a line terminator
    trailing_newline: bool,
}

/// A block node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Mapping(Mapping),
    Sequence(Sequence),

    /// Content the tree does not navigate into (flow collections, root scalars)
    Raw(Vec<String>),
}

/// A block mapping
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    /// Column of the keys
    indent: usize,
    entries: Vec<Entry>,
}

/// One `key: value` entry
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Comments and blank lines directly above the key
    leading: Vec<String>,

    /// Full first line, including any sequence dash in front of the key
    head: String,

    /// Byte offset of the key within `head`
    key_start: usize,

    /// Byte offset of the `:` that ends the key
    key_end: usize,

    /// Decoded key
    key: String,

    /// Remaining lines of a scalar value
    continuation: Vec<String>,

    /// Nested block value
    child: Option<Node>,

    /// 1-based source line, `None` for entries written in this session
    line: Option<usize>,
}

/// A block sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    /// Column of the dashes
    indent: usize,
    items: Vec<SeqItem>,
}

/// One `- ...` item
#[derive(Debug, Clone, PartialEq)]
pub struct SeqItem {
    leading: Vec<String>,
    body: ItemBody,
    line: Option<usize>,
}

/// What follows a sequence dash
#[derive(Debug, Clone, PartialEq)]
pub enum ItemBody {
    /// `- key: value` with more keys aligned underneath
    Mapping(Mapping),

    /// `- value`
    Scalar { text: String, continuation: Vec<String> },

    /// A bare `-` with its content on the following lines
    Block { text: String, child: Option<Node> },
}

impl Document {
    /// Parse a document
    ///
    /// The text is validated by `serde_yaml` first, so anything returned here
    /// is also well-formed YAML.
    pub fn parse(text: &str) -> Result<Self, YamlError> {
        let (newline, trailing_newline, lines) = parser::split_lines(text);

        if lines.iter().any(|l| !parser::is_trivia(l)) {
            serde_yaml::from_str::<Value>(text).map_err(|e| YamlError::Syntax {
                line: e.location().map(|l| l.line()).unwrap_or(0),
                message: e.to_string(),
            })?;
        }

        Parser::new(lines).parse_document(newline, trailing_newline)
    }

    pub(crate) fn from_parts(
        head: Vec<String>,
        root: Option<Node>,
        tail: Vec<String>,
        newline: &'static str,
        trailing_newline: bool,
    ) -> Self {
        Self {
            head,
            root,
            tail,
            newline,
            trailing_newline,
        }
    }

    /// Empty document
    pub fn new() -> Self {
        Self::from_parts(Vec::new(), None, Vec::new(), "\n", true)
    }

    /// Build a document whose root mapping holds `value`
    pub fn from_value(value: &Value, style: &IndentStyle) -> Result<Self, YamlError> {
        let Value::Mapping(map) = value else {
            return Err(YamlError::Structure {
                key: String::new(),
                message: "document root must be a mapping".to_string(),
            });
        };

        let lines = emit::mapping_lines(map, 0, style);
        let mut doc = Parser::synthetic(lines).parse_document("\n", true)?;
        doc.ensure_root_mapping()?;
        Ok(doc)
    }

    /// Render back to text
    pub fn render(&self) -> String {
        let mut lines: Vec<&str> = self.head.iter().map(String::as_str).collect();
        if let Some(root) = &self.root {
            root.collect(&mut lines);
        }
        lines.extend(self.tail.iter().map(String::as_str));

        let mut out = lines.join(self.newline);
        if self.trailing_newline && !lines.is_empty() {
            out.push_str(self.newline);
        }
        out
    }

    /// Decode the rendered text
    pub fn to_value(&self) -> Result<Value, YamlError> {
        serde_yaml::from_str(&self.render()).map_err(|e| YamlError::Syntax {
            line: e.location().map(|l| l.line()).unwrap_or(0),
            message: e.to_string(),
        })
    }

    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    pub fn root_mut(&mut self) -> Option<&mut Node> {
        self.root.as_mut()
    }

    pub fn root_mapping(&self) -> Option<&Mapping> {
        match &self.root {
            Some(Node::Mapping(m)) => Some(m),
            _ => None,
        }
    }

    pub fn root_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match &mut self.root {
            Some(Node::Mapping(m)) => Some(m),
            _ => None,
        }
    }

    /// No content besides comments
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Root mapping, created if the document is empty
    pub fn ensure_root_mapping(&mut self) -> Result<&mut Mapping, YamlError> {
        let root = self.root.get_or_insert_with(|| Node::Mapping(Mapping::from_parts(0, Vec::new())));
        match root {
            Node::Mapping(m) => Ok(m),
            _ => Err(YamlError::Structure {
                key: String::new(),
                message: "document root is not a mapping".to_string(),
            }),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Node {
    fn collect<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Node::Mapping(m) => m.collect(out),
            Node::Sequence(s) => s.collect(out),
            Node::Raw(lines) => out.extend(lines.iter().map(String::as_str)),
        }
    }
}

impl Mapping {
    pub(crate) fn from_parts(indent: usize, entries: Vec<Entry>) -> Self {
        Self { indent, entries }
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a str>) {
        for entry in &self.entries {
            entry.collect(out);
        }
    }

    pub fn indent(&self) -> usize {
        self.indent
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// Source line of the first entry
    pub fn line(&self) -> Option<usize> {
        self.entries.first().and_then(|e| e.line)
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.key == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Scalar value of `key` as text
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(Entry::as_string)
    }

    /// Absent keys are blank too
    pub fn is_blank(&self, key: &str) -> bool {
        self.get(key).map_or(true, Entry::is_blank)
    }

    pub fn sequence(&self, key: &str) -> Option<&Sequence> {
        match self.get(key)?.child.as_ref()? {
            Node::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn sequence_mut(&mut self, key: &str) -> Option<&mut Sequence> {
        match self.get_mut(key)?.child.as_mut()? {
            Node::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn mapping(&self, key: &str) -> Option<&Mapping> {
        match self.get(key)?.child.as_ref()? {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn mapping_mut(&mut self, key: &str) -> Option<&mut Mapping> {
        match self.get_mut(key)?.child.as_mut()? {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Write `key: value`, replacing the existing value in place
    ///
    /// The key's comments and position are kept. Returns `false` when the
    /// stored value already equals `value`.
    pub fn set(&mut self, key: &str, value: &Value, style: &IndentStyle) -> Result<bool, YamlError> {
        let lines = emit::entry_lines(key, value, self.indent, style);
        let fresh = Parser::synthetic(lines)
            .parse_mapping(self.indent)?
            .entries
            .into_iter()
            .next()
            .ok_or_else(|| YamlError::Structure {
                key: key.to_string(),
                message: "emitter produced no entry".to_string(),
            })?;

        match self.get_mut(key) {
            Some(existing) => {
                if existing.child.is_none() && existing.value().as_ref() == Some(value) {
                    return Ok(false);
                }
                let comment = match (&fresh.child, fresh.continuation.is_empty()) {
                    (None, true) => existing.comment_start().map(|at| existing.head[at..].to_string()),
                    _ => None,
                };
                existing.head.truncate(existing.key_end);
                existing.head.push_str(&fresh.head[fresh.key_end..]);
                if let Some(comment) = comment {
                    existing.head.push_str(&comment);
                }
                existing.continuation = fresh.continuation;
                existing.child = fresh.child;
            }
            None => self.entries.push(fresh),
        }

        Ok(true)
    }

    /// Append `item` to the sequence under `key`, creating it when blank
    pub fn push_to_sequence(&mut self, key: &str, item: &Value, style: &IndentStyle) -> Result<(), YamlError> {
        if let Some(entry) = self.get_mut(key) {
            let blank = entry.is_blank();
            match &mut entry.child {
                Some(Node::Sequence(seq)) => return seq.push(item, style),
                Some(_) => {
                    return Err(YamlError::Structure {
                        key: key.to_string(),
                        message: "expected a sequence, found a mapping".to_string(),
                    })
                }
                None if !blank => {
                    return Err(YamlError::Structure {
                        key: key.to_string(),
                        message: "expected a sequence, found a scalar".to_string(),
                    })
                }
                None => {}
            }
        }

        self.set(key, &Value::Sequence(vec![item.clone()]), style)
            .map(|_| ())
    }
}

impl Entry {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        leading: Vec<String>,
        head: String,
        key_start: usize,
        key_end: usize,
        key: String,
        continuation: Vec<String>,
        child: Option<Node>,
        line: Option<usize>,
    ) -> Self {
        Self {
            leading,
            head,
            key_start,
            key_end,
            key,
            continuation,
            child,
            line,
        }
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.extend(self.leading.iter().map(String::as_str));
        out.push(&self.head);
        out.extend(self.continuation.iter().map(String::as_str));
        if let Some(child) = &self.child {
            child.collect(out);
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Key exactly as written, quotes included
    pub fn raw_key(&self) -> &str {
        &self.head[self.key_start..self.key_end]
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    pub fn leading_lines(&self) -> &[String] {
        &self.leading
    }

    pub fn continuation_lines(&self) -> &[String] {
        &self.continuation
    }

    pub fn child(&self) -> Option<&Node> {
        self.child.as_ref()
    }

    pub fn child_mut(&mut self) -> Option<&mut Node> {
        self.child.as_mut()
    }

    /// Decoded scalar value; `None` for nested blocks and unreadable values
    pub fn value(&self) -> Option<Value> {
        if self.child.is_some() {
            return None;
        }

        let mut text = format!("k{}", &self.head[self.key_end..]);
        for line in &self.continuation {
            text.push('\n');
            text.push_str(line);
        }
        text.push('\n');

        let mut map: serde_yaml::Mapping = serde_yaml::from_str(&text).ok()?;
        map.remove("k")
    }

    /// Byte offset in `head` where an end-of-line comment and its leading
    /// blanks begin
    ///
    /// A `#` only opens a comment if cutting the line there leaves the value
    /// unchanged; that rules out hashes inside quoted scalars.
    fn comment_start(&self) -> Option<usize> {
        if self.child.is_some() || !self.continuation.is_empty() {
            return None;
        }
        let full = self.value()?;
        let rest = &self.head[self.key_end + 1..];

        let mut prev_blank = false;
        for (i, c) in rest.char_indices() {
            if c == '#' && prev_blank {
                let kept = rest[..i].trim_end();
                let cut = serde_yaml::from_str::<serde_yaml::Mapping>(&format!("k:{kept}\n"))
                    .ok()
                    .and_then(|mut m| m.remove("k"));
                if cut.as_ref() == Some(&full) {
                    return Some(self.key_end + 1 + kept.len());
                }
            }
            prev_blank = c == ' ' || c == '\t';
        }
        None
    }

    /// Null, empty or whitespace-only
    pub fn is_blank(&self) -> bool {
        self.child.is_none() && self.value().map_or(false, |v| value_is_blank(&v))
    }

    /// Scalar value as text; numbers and booleans are stringified
    pub fn as_string(&self) -> Option<String> {
        match self.value()? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl Sequence {
    pub(crate) fn from_parts(indent: usize, items: Vec<SeqItem>) -> Self {
        Self { indent, items }
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a str>) {
        for item in &self.items {
            out.extend(item.leading.iter().map(String::as_str));
            match &item.body {
                ItemBody::Mapping(m) => m.collect(out),
                ItemBody::Scalar { text, continuation } => {
                    out.push(text);
                    out.extend(continuation.iter().map(String::as_str));
                }
                ItemBody::Block { text, child } => {
                    out.push(text);
                    if let Some(child) = child {
                        child.collect(out);
                    }
                }
            }
        }
    }

    pub fn indent(&self) -> usize {
        self.indent
    }

    pub fn items(&self) -> &[SeqItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Block mapping items, whether written as `- key: value` or under a bare `-`
    pub fn mappings(&self) -> impl Iterator<Item = &Mapping> {
        self.items.iter().filter_map(SeqItem::as_mapping)
    }

    pub fn mappings_mut(&mut self) -> impl Iterator<Item = &mut Mapping> {
        self.items.iter_mut().filter_map(SeqItem::as_mapping_mut)
    }

    /// First mapping item whose `name` is `name`
    pub fn find_by_name(&self, name: &str) -> Option<&Mapping> {
        self.mappings()
            .find(|m| m.get_str("name").as_deref() == Some(name))
    }

    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut Mapping> {
        self.mappings_mut()
            .find(|m| m.get_str("name").as_deref() == Some(name))
    }

    /// Append an item, following the dash spacing already in use
    pub fn push(&mut self, item: &Value, style: &IndentStyle) -> Result<(), YamlError> {
        let gap = self
            .items
            .iter()
            .find_map(|i| match &i.body {
                ItemBody::Mapping(m) => Some(m.indent.saturating_sub(self.indent)),
                _ => None,
            })
            .unwrap_or_else(|| style.dash_gap());

        let lines = emit::item_lines(item, self.indent, gap, style);
        let fresh = Parser::synthetic(lines).parse_sequence(self.indent)?;
        self.items.extend(fresh.items);
        Ok(())
    }
}

impl SeqItem {
    pub(crate) fn from_parts(leading: Vec<String>, body: ItemBody, line: Option<usize>) -> Self {
        Self { leading, body, line }
    }

    pub fn body(&self) -> &ItemBody {
        &self.body
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match &self.body {
            ItemBody::Mapping(m)
            | ItemBody::Block {
                child: Some(Node::Mapping(m)),
                ..
            } => Some(m),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match &mut self.body {
            ItemBody::Mapping(m)
            | ItemBody::Block {
                child: Some(Node::Mapping(m)),
                ..
            } => Some(m),
            _ => None,
        }
    }

    /// Decoded value of an item the tree cannot navigate into
    ///
    /// Covers flow collections (`- {name: a}`) and plain scalars. `None` for
    /// block items and unreadable text.
    pub fn value(&self) -> Option<Value> {
        let mut text = match &self.body {
            ItemBody::Scalar { text, continuation } => {
                let mut text = text.trim_start().strip_prefix('-')?.to_string();
                for line in continuation {
                    text.push('\n');
                    text.push_str(line);
                }
                text
            }
            ItemBody::Block {
                child: Some(Node::Raw(lines)),
                ..
            } => lines.join("\n"),
            _ => return None,
        };
        text.push('\n');
        serde_yaml::from_str(&text).ok()
    }

    /// The item's `name`, for block and flow mappings alike
    pub fn name(&self) -> Option<String> {
        if let Some(mapping) = self.as_mapping() {
            return mapping.get_str("name");
        }
        match self.value()? {
            Value::Mapping(map) => match map.get("name")? {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            },
            _ => None,
        }
    }
}
