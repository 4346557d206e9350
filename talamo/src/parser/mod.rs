pub mod builder;
pub mod error;
pub mod hints;
pub mod scanner;
pub mod sections;

pub use error::{BlockError, ParseError};

use tracing::warn;

use crate::Lesson;
use crate::block::{Block, ContentNode, MalformedBlock, ProseNode};
use crate::parser::builder::{BuildContext, build_node};
use crate::parser::scanner::Segment;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse the lesson source. Never fails: structural problems degrade to
    /// best effort, undecodable blocks become [`ContentNode::Malformed`], and
    /// both are reported in [`Lesson::diagnostics`].
    pub fn parse(&self) -> Lesson {
        let mut ctx = BuildContext::new(self.file_id);
        let mut blocks = Vec::new();

        for segment in scanner::scan(&self.source) {
            match segment {
                Segment::Prose { text, span } => blocks.push(Block {
                    node: ContentNode::Prose(ProseNode {
                        markdown: text.to_string(),
                    }),
                    span,
                }),
                Segment::Fence(fence) => {
                    if !fence.terminated {
                        ctx.diagnostics.push(
                            ParseError::warning(
                                format!("`:::{}` is never closed", fence.block_type),
                                fence.start_offset..fence.body_offset,
                                self.file_id,
                            )
                            .with_note("the block runs to the end of the document"),
                        );
                    }

                    let node = match build_node(&fence, &mut ctx) {
                        Ok(node) => node,
                        Err(error) => {
                            if let Some(raw) = error.raw() {
                                warn!(block = %fence.block_type, raw = %raw, "{}", error);
                            } else {
                                warn!(block = %fence.block_type, "{}", error);
                            }
                            ctx.diagnostics.push(ParseError::error(
                                format!("`:::{}` block skipped: {}", fence.block_type, error),
                                fence.span(),
                                self.file_id,
                            ));
                            ContentNode::Malformed(MalformedBlock {
                                block_type: fence.block_type,
                                error,
                                attributes: fence.attributes_raw.to_string(),
                                raw: fence.body_raw.to_string(),
                            })
                        }
                    };
                    blocks.push(Block {
                        node,
                        span: fence.span(),
                    });
                }
            }
        }

        Lesson {
            blocks,
            diagnostics: ctx.diagnostics,
            source_id: self.file_id,
        }
    }
}

/// Parse a document straight to its node sequence, discarding spans and diagnostics.
pub fn tokenize(doc: &str) -> Vec<ContentNode> {
    Parser::new(doc.to_string(), 0).parse().into_nodes()
}
