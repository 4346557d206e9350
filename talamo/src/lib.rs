pub mod block;
pub mod defaults;
pub mod parser;

use std::ops::Range;

use crate::block::{Block, ContentNode, MetaNode, StepNode};
use crate::parser::{ParseError, Parser};

/// A parsed lesson in authored order.
#[derive(Debug, Clone)]
pub struct Lesson {
    /// Every prose run and fence, in source order.
    pub blocks: Vec<Block>,
    /// Warnings and block errors collected while parsing.
    pub diagnostics: Vec<ParseError>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

impl Lesson {
    pub fn nodes(&self) -> impl Iterator<Item = &ContentNode> {
        self.blocks.iter().map(|b| &b.node)
    }

    pub fn into_nodes(self) -> Vec<ContentNode> {
        self.blocks.into_iter().map(|b| b.node).collect()
    }

    /// Blocks shown to the learner (meta and step fences excluded).
    pub fn visual_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| b.node.is_visual())
    }

    pub fn meta(&self) -> Option<&MetaNode> {
        self.nodes().find_map(|n| match n {
            ContentNode::Meta(meta) => Some(meta),
            _ => None,
        })
    }

    pub fn steps(&self) -> impl Iterator<Item = &StepNode> {
        self.nodes().filter_map(|n| match n {
            ContentNode::Step(step) => Some(step),
            _ => None,
        })
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(ParseError::is_error)
    }

    /// Diagnostics raised by fences nested inside display blocks, re-parsed
    /// up to `max_depth` levels. Each one points at the top-level block that
    /// holds it, since nested bodies are trimmed copies of the source.
    pub fn nested_diagnostics(&self, max_depth: usize) -> Vec<ParseError> {
        let mut found = Vec::new();
        for block in &self.blocks {
            collect_nested(&block.node, &block.span, self.source_id, 0, max_depth, &mut found);
        }
        found
    }
}

fn collect_nested(
    node: &ContentNode,
    anchor: &Range<usize>,
    file_id: usize,
    depth: usize,
    max_depth: usize,
    found: &mut Vec<ParseError>,
) {
    if depth + 1 >= max_depth {
        return;
    }
    for body in node.nested_bodies() {
        let inner = Parser::new(body.to_string(), file_id).parse();
        for diagnostic in inner.diagnostics {
            found.push(
                ParseError {
                    span: anchor.clone(),
                    ..diagnostic
                }
                .with_note(format!("nested inside the {} block", node.kind_name())),
            );
        }
        for block in &inner.blocks {
            collect_nested(&block.node, anchor, file_id, depth + 1, max_depth, found);
        }
    }
}
