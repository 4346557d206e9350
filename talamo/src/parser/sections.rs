use std::collections::BTreeMap;
use std::ops::Range;

use crate::parser::scanner::trim_blank_lines;

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// Collect `key="value"` pairs. Anything that isn't a quoted pair is skipped,
/// and an unclosed quote ends the scan.
pub fn parse_attributes(raw: &str) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    let mut rest = raw;

    while let Some(eq) = rest.find("=\"") {
        let key_start = rest[..eq]
            .rfind(|c: char| !is_key_char(c))
            .map(|p| p + 1)
            .unwrap_or(0);
        let key = &rest[key_start..eq];
        let value_start = eq + 2;
        let Some(len) = rest[value_start..].find('"') else {
            break;
        };
        if !key.is_empty() {
            attrs.insert(
                key.to_string(),
                rest[value_start..value_start + len].to_string(),
            );
        }
        rest = &rest[value_start + len + 1..];
    }

    attrs
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

// ---------------------------------------------------------------------------
// Named sections: `[name]` on its own line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Section<'a> {
    pub name: &'a str,
    /// Body with blank edges trimmed.
    pub text: &'a str,
    /// Byte range of header plus body, relative to the block body.
    pub range: Range<usize>,
}

/// Split a block body into `[name]` sections. A section runs until the next
/// header line or end of body. Text before the first header is dropped.
pub fn split_sections(body: &str) -> Vec<Section<'_>> {
    let mut sections = Vec::new();
    let mut open: Option<(&str, usize, usize)> = None;
    let mut offset = 0;

    for piece in body.split_inclusive('\n') {
        if let Some(name) = section_header(piece) {
            if let Some((name, header_start, text_start)) = open.take() {
                sections.push(section(body, name, header_start, text_start, offset));
            }
            open = Some((name, offset, offset + piece.len()));
        }
        offset += piece.len();
    }

    if let Some((name, header_start, text_start)) = open {
        sections.push(section(body, name, header_start, text_start, body.len()));
    }

    sections
}

fn section<'a>(body: &'a str, name: &'a str, header: usize, text: usize, end: usize) -> Section<'a> {
    Section {
        name,
        text: trim_blank_lines(&body[text..end]),
        range: header..end,
    }
}

/// `[identifier]` alone on a line. `[label="..."]` and JSON lines don't qualify.
fn section_header(line: &str) -> Option<&str> {
    let name = line.trim().strip_prefix('[')?.strip_suffix(']')?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    valid.then_some(name)
}

// ---------------------------------------------------------------------------
// Accordion: `## ` headings
// ---------------------------------------------------------------------------

/// Split on lines starting with `## `; each heading stays with its section.
/// Returns `(title, body)` pairs. A non-blank preamble becomes an item titled
/// by its first line.
pub fn split_accordion(body: &str) -> Vec<(String, String)> {
    let mut chunks: Vec<&str> = Vec::new();
    let mut chunk_start = 0;
    let mut offset = 0;

    for piece in body.split_inclusive('\n') {
        if piece.starts_with("## ") && offset > chunk_start {
            chunks.push(&body[chunk_start..offset]);
            chunk_start = offset;
        }
        offset += piece.len();
    }
    chunks.push(&body[chunk_start..]);

    chunks
        .into_iter()
        .map(trim_blank_lines)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            let (first, rest) = chunk.split_once('\n').unwrap_or((chunk, ""));
            let title = first.strip_prefix("## ").unwrap_or(first).trim();
            (title.to_string(), trim_blank_lines(rest).to_string())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tabs: `[label="X"]` segments
// ---------------------------------------------------------------------------

const LABEL_MARKER: &str = "[label=\"";

/// Each `[label="X"]` starts a tab running to the next marker or end of body.
pub fn split_tabs(body: &str) -> Vec<(String, String)> {
    let starts: Vec<usize> = body.match_indices(LABEL_MARKER).map(|(i, _)| i).collect();
    let mut tabs = Vec::new();

    for (n, &start) in starts.iter().enumerate() {
        let end = starts.get(n + 1).copied().unwrap_or(body.len());
        let segment = &body[start + LABEL_MARKER.len()..end];
        let Some(close) = segment.find("\"]") else {
            continue;
        };
        let label = &segment[..close];
        let content = trim_blank_lines(&segment[close + 2..]);
        tabs.push((label.to_string(), content.trim_start().to_string()));
    }

    tabs
}

// ---------------------------------------------------------------------------
// Flip card: `[front]` / `[back]`
// ---------------------------------------------------------------------------

/// Returns the front and back text, either `None` when its marker is absent
/// or the section is blank. Markers are matched case-insensitively.
pub fn split_flipcard(body: &str) -> (Option<&str>, Option<&str>) {
    // ASCII lowercasing keeps byte offsets aligned with `body`.
    let lower = body.to_ascii_lowercase();
    let front = lower.find("[front]");
    let back = lower.find("[back]");

    (
        front.and_then(|f| marker_text(body, f, "[front]".len(), back)),
        back.and_then(|b| marker_text(body, b, "[back]".len(), front)),
    )
}

fn marker_text(body: &str, start: usize, marker_len: usize, other: Option<usize>) -> Option<&str> {
    let to = other.filter(|&o| o > start).unwrap_or(body.len());
    let text = body[start + marker_len..to].trim();
    (!text.is_empty()).then_some(text)
}
