//! Block-style emitter for freshly written values
//!
//! Only new or replaced entries go through here. Output follows the
//! configured [`IndentStyle`] and quotes strings only when a plain scalar
//! would read back differently.

use schemascribe_core::IndentStyle;
use serde_yaml::Value;

const RESERVED: &[&str] = &[
    "null", "~", "true", "false", "yes", "no", "on", "off", "y", "n",
];

fn needs_double_quotes(s: &str) -> bool {
    s.chars().any(|c| c == '\n' || c == '\r' || (c.is_control() && c != '\t'))
}

fn double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn single_quoted(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn can_be_plain(s: &str) -> bool {
    let Some(first) = s.chars().next() else {
        return false;
    };

    if s.trim() != s || s.contains('\t') {
        return false;
    }
    if matches!(
        first,
        '-' | '?' | ':' | ',' | '[' | ']' | '{' | '}' | '#' | '&' | '*' | '!' | '|' | '>' | '\'' | '"' | '%' | '@' | '`'
    ) || first.is_ascii_digit()
        || first == '+'
        || first == '.'
    {
        return false;
    }
    if s.contains(": ") || s.contains(" #") || s.ends_with(':') {
        return false;
    }
    if RESERVED.iter().any(|r| r.eq_ignore_ascii_case(s)) {
        return false;
    }

    // Last word goes to the resolver itself
    matches!(serde_yaml::from_str::<Value>(s), Ok(Value::String(ref read)) if read == s)
}

fn encode_str(s: &str) -> String {
    if needs_double_quotes(s) {
        double_quoted(s)
    } else if can_be_plain(s) {
        s.to_string()
    } else {
        single_quoted(s)
    }
}

/// Render a scalar value as it would appear after `key: `
///
/// Collections fall back to flow style; the block emitters below never pass
/// non-empty ones here.
pub fn encode_scalar(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => encode_str(s),
        Value::Sequence(items) => {
            let inner: Vec<String> = items.iter().map(encode_scalar).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Mapping(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", encode_key_value(k), encode_scalar(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
        Value::Tagged(tagged) => format!("{} {}", tagged.tag, encode_scalar(&tagged.value)),
    }
}

/// Render a mapping key
pub(crate) fn encode_key(key: &str) -> String {
    encode_str(key)
}

fn encode_key_value(key: &Value) -> String {
    match key {
        Value::String(s) => encode_key(s),
        other => encode_scalar(other),
    }
}

fn is_block_collection(value: &Value) -> bool {
    match value {
        Value::Mapping(map) => !map.is_empty(),
        Value::Sequence(items) => !items.is_empty(),
        _ => false,
    }
}

/// Lines of a single `key: value` entry whose key sits at `indent`
pub(crate) fn entry_lines(key: &str, value: &Value, indent: usize, style: &IndentStyle) -> Vec<String> {
    let pad = " ".repeat(indent);
    let key = encode_key(key);

    match value {
        Value::Mapping(map) if !map.is_empty() => {
            let mut lines = vec![format!("{pad}{key}:")];
            lines.extend(mapping_lines(map, indent + style.mapping, style));
            lines
        }
        Value::Sequence(items) if !items.is_empty() => {
            let mut lines = vec![format!("{pad}{key}:")];
            lines.extend(sequence_lines(items, indent + style.offset, style.dash_gap(), style));
            lines
        }
        scalar => vec![format!("{pad}{key}: {}", encode_scalar(scalar))],
    }
}

/// Lines of every entry of `map` at `indent`
pub(crate) fn mapping_lines(map: &serde_yaml::Mapping, indent: usize, style: &IndentStyle) -> Vec<String> {
    map.iter()
        .flat_map(|(k, v)| {
            let key = match k {
                Value::String(s) => s.clone(),
                other => encode_scalar(other),
            };
            entry_lines(&key, v, indent, style)
        })
        .collect()
}

/// Lines of a block sequence whose dashes sit at `dash`
pub(crate) fn sequence_lines(items: &[Value], dash: usize, gap: usize, style: &IndentStyle) -> Vec<String> {
    items
        .iter()
        .flat_map(|item| item_lines(item, dash, gap, style))
        .collect()
}

/// Lines of one sequence item
pub(crate) fn item_lines(item: &Value, dash: usize, gap: usize, style: &IndentStyle) -> Vec<String> {
    let gap = gap.max(2);
    let prefix = format!("{}-{}", " ".repeat(dash), " ".repeat(gap - 1));
    let content = dash + gap;

    match item {
        Value::Mapping(map) if is_block_collection(item) => {
            let mut lines = mapping_lines(map, content, style);
            if let Some(first) = lines.first_mut() {
                first.replace_range(..content, &prefix);
            }
            lines
        }
        Value::Sequence(items) if is_block_collection(item) => {
            let mut lines = vec![format!("{}-", " ".repeat(dash))];
            lines.extend(sequence_lines(items, content, gap, style));
            lines
        }
        scalar => vec![format!("{prefix}{}", encode_scalar(scalar))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn s(text: &str) -> Value {
        Value::String(text.to_string())
    }

    #[test]
    fn plain_strings_stay_plain() {
        assert_eq!(encode_scalar(&s("Order facts")), "Order facts");
        assert_eq!(encode_scalar(&s("PK")), "PK");
        assert_eq!(encode_scalar(&s("Primary key of the table")), "Primary key of the table");
    }

    #[test]
    fn ambiguous_strings_are_quoted() {
        assert_eq!(encode_scalar(&s("")), "''");
        assert_eq!(encode_scalar(&s("yes")), "'yes'");
        assert_eq!(encode_scalar(&s("123")), "'123'");
        assert_eq!(encode_scalar(&s("a: b")), "'a: b'");
        assert_eq!(encode_scalar(&s("it's # here")), "'it''s # here'");
        assert_eq!(encode_scalar(&s(" padded")), "' padded'");
        assert_eq!(encode_scalar(&s("- dash")), "'- dash'");
    }

    #[test]
    fn multiline_strings_are_double_quoted() {
        assert_eq!(encode_scalar(&s("line one\nline \"two\"")), "\"line one\\nline \\\"two\\\"\"");
    }

    #[test]
    fn non_string_scalars() {
        assert_eq!(encode_scalar(&Value::Null), "null");
        assert_eq!(encode_scalar(&Value::Bool(true)), "true");
        assert_eq!(encode_scalar(&serde_yaml::from_str::<Value>("42").unwrap()), "42");
        assert_eq!(encode_scalar(&Value::Sequence(vec![])), "[]");
    }

    #[test]
    fn nested_entry_layout() {
        let value: Value = serde_yaml::from_str(
            "- name: orders\n  description: Order facts\n  columns:\n  - name: id\n    description: PK\n",
        )
        .unwrap();

        let lines = entry_lines("models", &value, 0, &IndentStyle::default());
        assert_eq!(
            lines,
            vec![
                "models:",
                "  - name: orders",
                "    description: Order facts",
                "    columns:",
                "      - name: id",
                "        description: PK",
            ]
        );
    }

    #[test]
    fn scalar_items() {
        let lines = item_lines(&s("pii"), 4, 2, &IndentStyle::default());
        assert_eq!(lines, vec!["    - pii"]);
    }
}
