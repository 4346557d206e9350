use std::ops::Range;

use tracing::{debug, warn};

use crate::block::BlockType;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// A matched `:::type attrs` ... `:::` pair, borrowed from the source.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSpan<'a> {
    pub block_type: BlockType,
    pub attributes_raw: &'a str,
    pub body_raw: &'a str,
    /// Byte offset of `body_raw` within the source.
    pub body_offset: usize,
    /// Offset of the opener line.
    pub start_offset: usize,
    /// Offset just past the matching closer line (or end of document).
    pub end_offset: usize,
    /// False when no closer was found and the body ran to end of document.
    pub terminated: bool,
}

impl BlockSpan<'_> {
    pub fn span(&self) -> Range<usize> {
        self.start_offset..self.end_offset
    }
}

/// One top-level piece of a document, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment<'a> {
    /// Text between fences with surrounding blank lines removed. Never blank.
    Prose { text: &'a str, span: Range<usize> },
    Fence(BlockSpan<'a>),
}

/// Split a document into prose runs and top-level fences.
///
/// Nested fences stay inside their parent's body. Any recognised opener
/// raises the depth and any bare closer lowers it, regardless of which
/// block type is open; an unterminated fence runs to end of document.
pub fn scan(source: &str) -> Vec<Segment<'_>> {
    let lines = split_lines(source);
    let mut segments = Vec::new();
    let mut prose_start = 0;
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];
        let Some((block_type, attributes_raw)) = match_opener(line.text(source)) else {
            i += 1;
            continue;
        };

        push_prose(source, prose_start..line.start, &mut segments);

        let body_offset = line.next;
        let (closer, next_line) = find_closer(source, &lines, i + 1);
        let (body_end, end_offset, terminated) = match closer {
            Some(closer) => (closer.start, closer.next, true),
            None => {
                warn!(
                    block = %block_type,
                    offset = line.start,
                    "unterminated fence runs to end of document"
                );
                (source.len(), source.len(), false)
            }
        };

        let body_raw = strip_line_break(&source[body_offset..body_end.max(body_offset)]);
        debug!(block = %block_type, start = line.start, end = end_offset, "matched fence");

        segments.push(Segment::Fence(BlockSpan {
            block_type,
            attributes_raw,
            body_raw,
            body_offset,
            start_offset: line.start,
            end_offset,
            terminated,
        }));

        prose_start = end_offset;
        i = next_line;
    }

    push_prose(source, prose_start..source.len(), &mut segments);
    segments
}

/// Recognise an opener line: `:::` + known type, then nothing or whitespace + attributes.
pub fn match_opener(line: &str) -> Option<(BlockType, &str)> {
    let rest = line.strip_prefix(":::")?;
    let name_end = rest
        .find(|c: char| c.is_whitespace())
        .unwrap_or(rest.len());
    let block_type = BlockType::from_name(&rest[..name_end])?;
    Some((block_type, rest[name_end..].trim()))
}

/// A closer is `:::` alone on its line, optionally padded with whitespace.
pub fn is_closer(line: &str) -> bool {
    line.trim() == ":::"
}

// ---------------------------------------------------------------------------
// Line table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Line {
    /// Offset of the first byte of the line.
    start: usize,
    /// Offset of the line terminator (or end of document).
    end: usize,
    /// Offset of the first byte of the following line.
    next: usize,
}

impl Line {
    fn text<'a>(&self, source: &'a str) -> &'a str {
        let text = &source[self.start..self.end];
        text.strip_suffix('\r').unwrap_or(text)
    }
}

fn split_lines(source: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut start = 0;
    for piece in source.split_inclusive('\n') {
        let next = start + piece.len();
        let end = if piece.ends_with('\n') { next - 1 } else { next };
        lines.push(Line { start, end, next });
        start = next;
    }
    lines
}

/// Scan forward from `from` with depth 1. Returns the closing line and the
/// index of the line after it, or `None` and the line count.
fn find_closer(source: &str, lines: &[Line], from: usize) -> (Option<Line>, usize) {
    let mut depth = 1usize;
    for (j, line) in lines.iter().enumerate().skip(from) {
        let text = line.text(source);
        if match_opener(text).is_some() {
            depth += 1;
        } else if is_closer(text) {
            depth -= 1;
            if depth == 0 {
                return (Some(*line), j + 1);
            }
        }
    }
    (None, lines.len())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn push_prose<'a>(source: &'a str, range: Range<usize>, segments: &mut Vec<Segment<'a>>) {
    let raw = &source[range.clone()];
    let text = trim_blank_lines(raw);
    if !text.is_empty() {
        segments.push(Segment::Prose { text, span: range });
    }
}

/// Drop leading whitespace-only lines and all trailing whitespace.
/// Indentation on the first content line is kept.
pub fn trim_blank_lines(text: &str) -> &str {
    let mut start = 0;
    for piece in text.split_inclusive('\n') {
        if piece.trim().is_empty() {
            start += piece.len();
        } else {
            break;
        }
    }
    text[start..].trim_end()
}

/// Remove the single line break that precedes a closer line.
fn strip_line_break(body: &str) -> &str {
    match body.strip_suffix('\n') {
        Some(body) => body.strip_suffix('\r').unwrap_or(body),
        None => body,
    }
}
