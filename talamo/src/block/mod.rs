pub mod display;
pub mod scenario;

use std::fmt;
use std::ops::Range;

use crate::defaults;
use crate::parser::error::BlockError;

pub use scenario::{
    Annotation, ChartKind, Dataset, Decision, DecisionFeedback, Hint, MarketContext,
    RevealPolicy, RiskParameters, Rubric, ScenarioContext, ScenarioData, TradeAction,
};

/// The fence types recognised after `:::`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Meta,
    Step,
    Accordion,
    Tabs,
    FlipCard,
    Callout,
    TradingSim,
}

impl BlockType {
    pub const ALL: [BlockType; 7] = [
        BlockType::Meta,
        BlockType::Step,
        BlockType::Accordion,
        BlockType::Tabs,
        BlockType::FlipCard,
        BlockType::Callout,
        BlockType::TradingSim,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        BlockType::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            BlockType::Meta => "meta",
            BlockType::Step => "step",
            BlockType::Accordion => "accordion",
            BlockType::Tabs => "tabs",
            BlockType::FlipCard => "flipcard",
            BlockType::Callout => "callout",
            BlockType::TradingSim => "trading-sim",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A content node together with the byte range it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub node: ContentNode,
    pub span: Range<usize>,
}

/// One entry of the parsed lesson, in authored order.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentNode {
    Prose(ProseNode),
    Accordion(AccordionNode),
    Tabs(TabsNode),
    FlipCard(FlipCardNode),
    Callout(CalloutNode),
    TradingSimV1(TradingSimV1Node),
    TradingSimV2(TradingSimV2Node),
    Meta(MetaNode),
    Step(StepNode),
    /// A fence whose payload could not be decoded. Rendered as a diagnostic card.
    Malformed(MalformedBlock),
}

impl ContentNode {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ContentNode::Prose(_) => "prose",
            ContentNode::Accordion(_) => "accordion",
            ContentNode::Tabs(_) => "tabs",
            ContentNode::FlipCard(_) => "flipcard",
            ContentNode::Callout(_) => "callout",
            ContentNode::TradingSimV1(_) => "trading-sim-v1",
            ContentNode::TradingSimV2(_) => "trading-sim-v2",
            ContentNode::Meta(_) => "meta",
            ContentNode::Step(_) => "step",
            ContentNode::Malformed(_) => "malformed",
        }
    }

    /// Meta and step nodes belong to the pagination layer, not the visual tree.
    pub fn is_visual(&self) -> bool {
        !matches!(self, ContentNode::Meta(_) | ContentNode::Step(_))
    }

    /// Markdown bodies that may hold nested fences.
    pub fn nested_bodies(&self) -> Vec<&str> {
        match self {
            ContentNode::Accordion(accordion) => accordion
                .items
                .iter()
                .map(|item| item.body_markdown.as_str())
                .collect(),
            ContentNode::Tabs(tabs) => tabs
                .items
                .iter()
                .map(|item| item.body_markdown.as_str())
                .collect(),
            ContentNode::FlipCard(card) => vec![card.front_markdown.as_str(), card.back_markdown.as_str()],
            ContentNode::Callout(callout) => vec![callout.body_markdown.as_str()],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProseNode {
    pub markdown: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccordionItem {
    pub title: String,
    pub body_markdown: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccordionNode {
    pub items: Vec<AccordionItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TabItem {
    pub label: String,
    pub body_markdown: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TabsNode {
    pub items: Vec<TabItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlipCardNode {
    pub front_markdown: String,
    pub back_markdown: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalloutKind {
    Info,
    Warning,
    Success,
    Danger,
    Tip,
}

impl CalloutKind {
    /// Unrecognised names fall back to the default kind.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "info" => CalloutKind::Info,
            "warning" => CalloutKind::Warning,
            "success" => CalloutKind::Success,
            "danger" => CalloutKind::Danger,
            "tip" => CalloutKind::Tip,
            _ => defaults::CALLOUT_KIND,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CalloutKind::Info => "info",
            CalloutKind::Warning => "warning",
            CalloutKind::Success => "success",
            CalloutKind::Danger => "danger",
            CalloutKind::Tip => "tip",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalloutNode {
    pub kind: CalloutKind,
    pub body_markdown: String,
}

/// Lesson metadata, consumed by the pagination layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetaNode {
    pub level: Option<String>,
    pub duration_label: Option<String>,
    pub tags: Vec<String>,
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepNode {
    pub title: String,
    pub body_markdown: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradingSimV1Node {
    pub asset: String,
    pub scenario_id: String,
    pub scenario_data: ScenarioData,
    pub question: String,
    pub feedback: DecisionFeedback,
    pub educational_context: Option<String>,
    pub annotations: Option<Vec<Annotation>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradingSimV2Node {
    pub asset: String,
    pub scenario_id: String,
    pub chart_kind: ChartKind,
    pub timeframe: String,
    pub reveal_policy: RevealPolicy,
    pub market: Option<MarketContext>,
    pub risk: Option<RiskParameters>,
    pub dataset: Dataset,
    pub annotations: Option<Vec<Annotation>>,
    pub context: Option<ScenarioContext>,
    pub question: String,
    pub hints: Vec<Hint>,
    pub rubric: Option<Rubric>,
    pub actions: Vec<TradeAction>,
    /// Authored feedback keyed by the suffix of its `[feedback_*]` section.
    pub feedback: std::collections::BTreeMap<String, String>,
}

impl TradingSimV2Node {
    /// Entry price: risk overrides dataset, dataset overrides the current price.
    pub fn entry(&self) -> f64 {
        self.risk
            .as_ref()
            .and_then(|r| r.entry)
            .or(self.dataset.entry)
            .unwrap_or(self.dataset.current)
    }

    pub fn stop_loss(&self) -> Option<f64> {
        self.risk
            .as_ref()
            .and_then(|r| r.stop_loss)
            .or(self.dataset.stop_loss)
    }

    pub fn take_profit(&self) -> Option<f64> {
        self.risk
            .as_ref()
            .and_then(|r| r.take_profit)
            .or(self.dataset.take_profit)
    }

    /// Feedback for an action: literal name, then its direction alias, then
    /// the general entry, then the built-in default.
    pub fn feedback_for(&self, action: TradeAction) -> &str {
        self.feedback
            .get(action.name())
            .or_else(|| self.feedback.get(action.alias()))
            .or_else(|| self.feedback.get("general"))
            .map(String::as_str)
            .unwrap_or_else(|| defaults::feedback(action.alias()))
    }
}

/// A fence whose payload failed to decode; carries enough to show a bounded diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedBlock {
    pub block_type: BlockType,
    pub error: BlockError,
    pub attributes: String,
    /// The block body, verbatim.
    pub raw: String,
}
