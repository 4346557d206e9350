use std::ops::Range;

use talamo::block::BlockType;
use talamo::parser::BlockError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("price {value} in {field} is not a finite number")]
    InvalidPrice { field: &'static str, value: f64 },

    #[error("action \"{0}\" is not offered by this scenario")]
    ActionNotOffered(String),

    #[error("a decision was already made; reset before choosing again")]
    AlreadyDecided,

    #[error("the outcome has not been revealed yet")]
    NotRevealed,

    #[error("no decision to reveal")]
    NothingToReveal,
}

/// Why a single node could not be turned into a widget.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderFailure {
    #[error(transparent)]
    Block(#[from] BlockError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// A render failure tied back to the block it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderError {
    pub failure: RenderFailure,
    pub block_type: Option<BlockType>,
    pub span: Option<Range<usize>>,
}

impl RenderError {
    pub fn new(failure: impl Into<RenderFailure>, block_type: Option<BlockType>) -> Self {
        RenderError {
            failure: failure.into(),
            block_type,
            span: None,
        }
    }

    pub fn with_span(mut self, span: Range<usize>) -> Self {
        self.span = Some(span);
        self
    }
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.block_type {
            Some(block_type) => write!(f, "{} block: {}", block_type, self.failure),
            None => self.failure.fmt(f),
        }
    }
}

impl std::error::Error for RenderError {}
