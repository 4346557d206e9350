use serde_json::Value;

use crate::block::Hint;
use crate::defaults;
use crate::parser::error::BlockError;

/// Non-fatal problems found while normalising a `[hints]` payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeWarning {
    /// The payload was a JSON non-array or plain text; hints default to empty.
    NotAList { found: &'static str },
    /// An entry was neither a string nor an object with `text`; it was skipped.
    BadEntry { index: usize },
}

impl std::fmt::Display for ShapeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeWarning::NotAList { found } => {
                write!(f, "[hints] must be a list, found {}; using no hints", found)
            }
            ShapeWarning::BadEntry { index } => {
                write!(f, "[hints] entry {} has no text; skipped", index)
            }
        }
    }
}

/// Normalise the three accepted hint spellings to `{id, text}`:
/// a JSON array of strings, a JSON array of `{id, text}` objects, or a
/// `- text` bullet list. Any other payload yields no hints and a warning.
pub fn normalize_hints(raw: &str) -> Result<(Vec<Hint>, Vec<ShapeWarning>), BlockError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let parsed = serde_json::from_str::<Value>(raw);
    if let Ok(value) = &parsed {
        return Ok(from_json(value));
    }

    if raw.lines().any(is_bullet) {
        return Ok((from_bullets(raw), Vec::new()));
    }

    if let (Err(err), true) = (&parsed, looks_like_json(raw)) {
        return Err(BlockError::decode("hints", raw, err));
    }

    Ok((Vec::new(), vec![ShapeWarning::NotAList { found: "plain text" }]))
}

fn from_json(value: &Value) -> (Vec<Hint>, Vec<ShapeWarning>) {
    let Value::Array(entries) = value else {
        return (
            Vec::new(),
            vec![ShapeWarning::NotAList {
                found: json_type_name(value),
            }],
        );
    };

    let mut hints = Vec::new();
    let mut warnings = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        let id = defaults::hint_id(hints.len());
        match entry {
            Value::String(text) => hints.push(Hint {
                id,
                text: text.clone(),
            }),
            Value::Object(fields) => match fields.get("text").and_then(Value::as_str) {
                Some(text) => hints.push(Hint {
                    id: match fields.get("id") {
                        Some(Value::String(s)) => s.clone(),
                        Some(Value::Number(n)) => n.to_string(),
                        _ => id,
                    },
                    text: text.to_string(),
                }),
                None => warnings.push(ShapeWarning::BadEntry { index }),
            },
            _ => warnings.push(ShapeWarning::BadEntry { index }),
        }
    }
    (hints, warnings)
}

fn is_bullet(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("- ") || line.starts_with("* ")
}

fn from_bullets(raw: &str) -> Vec<Hint> {
    raw.lines()
        .filter(|line| is_bullet(line))
        .map(|line| line.trim_start()[2..].trim())
        .filter(|text| !text.is_empty())
        .enumerate()
        .map(|(n, text)| Hint {
            id: defaults::hint_id(n),
            text: text.to_string(),
        })
        .collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn looks_like_json(raw: &str) -> bool {
    matches!(raw.chars().next(), Some('[' | '{' | '"'))
}
