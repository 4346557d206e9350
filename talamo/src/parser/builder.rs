use std::collections::BTreeMap;
use std::ops::Range;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::block::{
    AccordionItem, AccordionNode, Annotation, BlockType, CalloutKind, CalloutNode, ChartKind, ContentNode,
    DecisionFeedback, FlipCardNode, MetaNode, RevealPolicy, ScenarioContext, StepNode, TabItem,
    TabsNode, TradeAction, TradingSimV1Node, TradingSimV2Node,
};
use crate::defaults;
use crate::parser::error::{BlockError, ParseError};
use crate::parser::hints::normalize_hints;
use crate::parser::scanner::{BlockSpan, trim_blank_lines};
use crate::parser::sections::{Section, parse_attributes, split_accordion, split_flipcard, split_sections, split_tabs};

const V1_SECTIONS: &[&str] = &[
    "educational_context",
    "scenario_data",
    "annotations",
    "question",
    "feedback_buy",
    "feedback_sell",
    "feedback_skip",
];

const V2_SECTIONS: &[&str] = &[
    "market",
    "risk",
    "dataset",
    "annotations",
    "context",
    "educational_context",
    "hints",
    "rubric",
    "question",
];

/// Collects warnings raised while building nodes.
pub struct BuildContext {
    pub file_id: usize,
    pub diagnostics: Vec<ParseError>,
}

impl BuildContext {
    pub fn new(file_id: usize) -> Self {
        BuildContext {
            file_id,
            diagnostics: Vec::new(),
        }
    }

    fn warn(&mut self, message: String, span: Range<usize>) {
        warn!(offset = span.start, "{}", message);
        self.diagnostics
            .push(ParseError::warning(message, span, self.file_id));
    }
}

/// Turn one matched fence into its typed node.
pub fn build_node(span: &BlockSpan<'_>, ctx: &mut BuildContext) -> Result<ContentNode, BlockError> {
    let attrs = parse_attributes(span.attributes_raw);
    let body = span.body_raw;

    let node = match span.block_type {
        BlockType::Meta => ContentNode::Meta(build_meta(&attrs, body)),
        BlockType::Step => ContentNode::Step(StepNode {
            title: attrs
                .get("title")
                .cloned()
                .unwrap_or_else(|| defaults::STEP_TITLE.to_string()),
            body_markdown: trim_blank_lines(body).to_string(),
        }),
        BlockType::Accordion => {
            let items: Vec<AccordionItem> = split_accordion(body)
                .into_iter()
                .map(|(title, body_markdown)| AccordionItem {
                    title,
                    body_markdown,
                })
                .collect();
            if items.is_empty() {
                ctx.warn("accordion has no `## ` sections".into(), span.span());
            }
            ContentNode::Accordion(AccordionNode { items })
        }
        BlockType::Tabs => {
            let items: Vec<TabItem> = split_tabs(body)
                .into_iter()
                .map(|(label, body_markdown)| TabItem {
                    label,
                    body_markdown,
                })
                .collect();
            if items.is_empty() {
                ctx.warn("tabs block has no [label=\"...\"] sections".into(), span.span());
            }
            ContentNode::Tabs(TabsNode { items })
        }
        BlockType::FlipCard => {
            let (front, back) = split_flipcard(body);
            ContentNode::FlipCard(FlipCardNode {
                front_markdown: front.unwrap_or(defaults::FLIPCARD_FRONT).to_string(),
                back_markdown: back.unwrap_or(defaults::FLIPCARD_BACK).to_string(),
            })
        }
        BlockType::Callout => {
            let kind = match attrs.get("type") {
                Some(name) => {
                    let kind = CalloutKind::from_name(name);
                    if kind.name() != name.trim().to_ascii_lowercase() {
                        ctx.warn(
                            format!("unknown callout type \"{}\", using \"{}\"", name, kind.name()),
                            span.span(),
                        );
                    }
                    kind
                }
                None => defaults::CALLOUT_KIND,
            };
            ContentNode::Callout(CalloutNode {
                kind,
                body_markdown: trim_blank_lines(body).to_string(),
            })
        }
        BlockType::TradingSim => {
            if attrs.get("v").map(|v| v.trim()) == Some("2") {
                ContentNode::TradingSimV2(build_trading_sim_v2(span, &attrs, ctx)?)
            } else {
                ContentNode::TradingSimV1(build_trading_sim_v1(span, &attrs, ctx)?)
            }
        }
    };

    Ok(node)
}

// ---------------------------------------------------------------------------
// Meta
// ---------------------------------------------------------------------------

/// Attributes first, then `key: value` lines in the body.
fn build_meta(attrs: &BTreeMap<String, String>, body: &str) -> MetaNode {
    let mut fields = attrs.clone();
    for line in body.lines() {
        if let Some((key, value)) = line.split_once(':') {
            fields
                .entry(key.trim().to_ascii_lowercase())
                .or_insert_with(|| value.trim().to_string());
        }
    }

    let non_empty = |key: &str| fields.get(key).filter(|v| !v.is_empty()).cloned();
    MetaNode {
        level: non_empty("level"),
        duration_label: non_empty("duration"),
        tags: fields
            .get("tags")
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default(),
        id: non_empty("id"),
    }
}

// ---------------------------------------------------------------------------
// Trading simulator
// ---------------------------------------------------------------------------

struct SectionTable<'a> {
    sections: Vec<Section<'a>>,
    body_offset: usize,
}

impl<'a> SectionTable<'a> {
    fn new(span: &BlockSpan<'a>) -> Self {
        SectionTable {
            sections: split_sections(span.body_raw),
            body_offset: span.body_offset,
        }
    }

    fn get(&self, name: &str) -> Option<&Section<'a>> {
        self.sections.iter().find(|s| s.name == name)
    }

    fn text(&self, name: &str) -> Option<&'a str> {
        self.get(name).map(|s| s.text).filter(|t| !t.is_empty())
    }

    fn absolute(&self, section: &Section<'_>) -> Range<usize> {
        self.body_offset + section.range.start..self.body_offset + section.range.end
    }

    /// Warn once per section the grammar doesn't know.
    fn report_unknown(&self, known: impl Fn(&str) -> bool, ctx: &mut BuildContext) {
        for section in &self.sections {
            if !known(section.name) {
                ctx.warn(
                    format!("unknown section [{}] ignored", section.name),
                    self.absolute(section),
                );
            }
        }
    }

    fn json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, BlockError> {
        match self.text(name) {
            Some(raw) => decode(name, raw).map(Some),
            None => Ok(None),
        }
    }

    fn required_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, BlockError> {
        self.json(name)?.ok_or_else(|| BlockError::missing(name))
    }

    /// Optional JSON whose shape is advisory. Broken syntax still fails the
    /// block; valid JSON of the wrong shape is dropped with a warning.
    fn lenient_json<T: DeserializeOwned>(
        &self,
        name: &str,
        ctx: &mut BuildContext,
    ) -> Result<Option<T>, BlockError> {
        let Some(section) = self.get(name).filter(|s| !s.text.is_empty()) else {
            return Ok(None);
        };
        let value: Value = decode(name, section.text)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Ok(Some(decoded)),
            Err(e) => {
                ctx.warn(format!("[{}] ignored: {}", name, e), self.absolute(section));
                Ok(None)
            }
        }
    }

    /// `[annotations]` keeps every entry it can read and warns about the rest.
    fn annotations(&self, ctx: &mut BuildContext) -> Result<Option<Vec<Annotation>>, BlockError> {
        let Some(section) = self.get("annotations").filter(|s| !s.text.is_empty()) else {
            return Ok(None);
        };
        let value: Value = decode("annotations", section.text)?;
        let Value::Array(entries) = value else {
            ctx.warn(
                "[annotations] must be a list; ignored".into(),
                self.absolute(section),
            );
            return Ok(None);
        };
        let mut annotations = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value(entry) {
                Ok(annotation) => annotations.push(annotation),
                Err(e) => ctx.warn(
                    format!("[annotations] entry {} skipped: {}", index, e),
                    self.absolute(section),
                ),
            }
        }
        Ok(Some(annotations))
    }
}

fn decode<T: DeserializeOwned>(section: &str, raw: &str) -> Result<T, BlockError> {
    serde_json::from_str(raw).map_err(|e| BlockError::decode(section, raw, &e))
}

fn attr_or(attrs: &BTreeMap<String, String>, key: &str, default: &str) -> String {
    attrs
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn build_trading_sim_v1(
    span: &BlockSpan<'_>,
    attrs: &BTreeMap<String, String>,
    ctx: &mut BuildContext,
) -> Result<TradingSimV1Node, BlockError> {
    let table = SectionTable::new(span);
    table.report_unknown(|name| V1_SECTIONS.contains(&name), ctx);

    let scenario_data = table.required_json("scenario_data")?;
    let annotations = table.annotations(ctx)?;

    let fallback = DecisionFeedback::default();
    let feedback = DecisionFeedback {
        buy: table.text("feedback_buy").map(String::from).unwrap_or(fallback.buy),
        sell: table.text("feedback_sell").map(String::from).unwrap_or(fallback.sell),
        skip: table.text("feedback_skip").map(String::from).unwrap_or(fallback.skip),
    };

    Ok(TradingSimV1Node {
        asset: attr_or(attrs, "asset", defaults::ASSET),
        scenario_id: attr_or(attrs, "scenario", defaults::SCENARIO_ID),
        scenario_data,
        question: table
            .text("question")
            .unwrap_or(defaults::QUESTION)
            .to_string(),
        feedback,
        educational_context: table.text("educational_context").map(String::from),
        annotations,
    })
}

fn build_trading_sim_v2(
    span: &BlockSpan<'_>,
    attrs: &BTreeMap<String, String>,
    ctx: &mut BuildContext,
) -> Result<TradingSimV2Node, BlockError> {
    let table = SectionTable::new(span);
    table.report_unknown(
        |name| V2_SECTIONS.contains(&name) || name.starts_with("feedback_"),
        ctx,
    );

    let dataset = table.required_json("dataset")?;
    let market = table.lenient_json("market", ctx)?;
    let risk = table.lenient_json("risk", ctx)?;
    let annotations = table.annotations(ctx)?;
    let rubric = table.lenient_json("rubric", ctx)?;

    let context_section = if table.get("context").is_some() {
        "context"
    } else {
        "educational_context"
    };
    let context = match table.text(context_section) {
        Some(raw) if raw.starts_with('{') => {
            Some(ScenarioContext::Data(decode(context_section, raw)?))
        }
        Some(raw) => Some(ScenarioContext::Text(raw.to_string())),
        None => None,
    };

    let hints = match table.get("hints") {
        Some(section) => {
            let (hints, warnings) = normalize_hints(section.text)?;
            for warning in warnings {
                ctx.warn(warning.to_string(), table.absolute(section));
            }
            hints
        }
        None => Vec::new(),
    };

    let feedback: BTreeMap<String, String> = table
        .sections
        .iter()
        .filter_map(|s| {
            let key = s.name.strip_prefix("feedback_")?;
            (!s.text.is_empty()).then(|| (key.to_string(), s.text.to_string()))
        })
        .collect();

    Ok(TradingSimV2Node {
        asset: attr_or(attrs, "asset", defaults::ASSET),
        scenario_id: attr_or(attrs, "scenario", defaults::SCENARIO_ID),
        chart_kind: parse_enum_attr(attrs, "chart", ChartKind::from_name, defaults::CHART_KIND, span, ctx),
        timeframe: attr_or(attrs, "timeframe", defaults::TIMEFRAME),
        reveal_policy: parse_enum_attr(
            attrs,
            "reveal",
            RevealPolicy::from_name,
            defaults::REVEAL_POLICY,
            span,
            ctx,
        ),
        market,
        risk,
        dataset,
        annotations,
        context,
        question: table
            .text("question")
            .unwrap_or(defaults::QUESTION)
            .to_string(),
        hints,
        rubric,
        actions: parse_actions(attrs.get("actions").map(String::as_str), span, ctx),
        feedback,
    })
}

fn parse_enum_attr<T>(
    attrs: &BTreeMap<String, String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
    default: T,
    span: &BlockSpan<'_>,
    ctx: &mut BuildContext,
) -> T {
    let Some(raw) = attrs.get(key) else {
        return default;
    };
    parse(raw).unwrap_or_else(|| {
        ctx.warn(format!("unknown {} \"{}\", using default", key, raw), span.span());
        default
    })
}

fn parse_actions(raw: Option<&str>, span: &BlockSpan<'_>, ctx: &mut BuildContext) -> Vec<TradeAction> {
    let Some(raw) = raw else {
        return defaults::TRADE_ACTIONS.to_vec();
    };

    let mut actions = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        match TradeAction::from_name(name) {
            Some(action) if !actions.contains(&action) => actions.push(action),
            Some(_) => {}
            None => ctx.warn(format!("unknown trade action \"{}\" dropped", name), span.span()),
        }
    }

    if actions.is_empty() {
        ctx.warn("no usable trade actions, using defaults".into(), span.span());
        return defaults::TRADE_ACTIONS.to_vec();
    }
    actions
}
