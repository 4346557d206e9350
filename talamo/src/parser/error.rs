use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use thiserror::Error;

/// Parse diagnostics with source location information.
///
/// None of these abort parsing: warnings mark degraded content, errors mark
/// a block that was replaced by a malformed-block node.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Range<usize>,
    pub file_id: usize,
    pub severity: Severity,
    pub notes: Vec<String>,
}

impl ParseError {
    pub fn error(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        ParseError {
            message: message.into(),
            span,
            file_id,
            severity: Severity::Error,
            notes: Vec::new(),
        }
    }

    pub fn warning(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        ParseError {
            message: message.into(),
            span,
            file_id,
            severity: Severity::Warning,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error | Severity::Bug)
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::new(self.severity)
            .with_message(&self.message)
            .with_labels(vec![Label::primary(self.file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}

/// Failure that makes a single block unusable. The rest of the lesson is unaffected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlockError {
    #[error("invalid JSON in [{section}]: {message}")]
    PayloadDecode {
        section: String,
        message: String,
        /// The offending section text, verbatim.
        raw: String,
    },

    /// Valid JSON that a required section can't use, such as a missing `current`.
    #[error("unexpected shape in [{section}]: {message}")]
    PayloadShape {
        section: String,
        message: String,
        raw: String,
    },

    #[error("missing required section [{section}]")]
    MissingSection { section: String },
}

impl BlockError {
    pub fn decode(section: &str, raw: &str, err: &serde_json::Error) -> Self {
        let (section, message, raw) = (section.to_string(), err.to_string(), raw.to_string());
        if err.is_data() {
            BlockError::PayloadShape { section, message, raw }
        } else {
            BlockError::PayloadDecode { section, message, raw }
        }
    }

    /// The offending section text, when the failure came from one.
    pub fn raw(&self) -> Option<&str> {
        match self {
            BlockError::PayloadDecode { raw, .. } | BlockError::PayloadShape { raw, .. } => Some(raw),
            BlockError::MissingSection { .. } => None,
        }
    }

    pub fn missing(section: &str) -> Self {
        BlockError::MissingSection {
            section: section.to_string(),
        }
    }
}
