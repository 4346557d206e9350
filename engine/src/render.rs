//! Turns parsed nodes into widgets, one at a time.
//!
//! A node that fails to build or to start its simulator becomes a
//! [`Widget::Diagnostic`] in its place; the rest of the lesson still renders.

use std::fmt::Write;
use std::ops::Range;

use pulldown_cmark::{Options, Parser, html};
use talamo::Lesson;
use talamo::block::{
    BlockType, CalloutKind, ContentNode, Decision, TradingSimV1Node, TradingSimV2Node,
};
use talamo::parser::tokenize;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::RenderError;
use crate::session::{Outcome, SimulationSession};

/// Markdown to HTML for prose runs and widget bodies.
pub trait ProseRenderer {
    fn render(&self, markdown: &str) -> String;
}

/// CommonMark with the GFM extensions lessons use.
#[derive(Debug, Clone, Copy)]
pub struct CmarkRenderer {
    options: Options,
}

impl Default for CmarkRenderer {
    fn default() -> Self {
        CmarkRenderer {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS,
        }
    }
}

impl ProseRenderer for CmarkRenderer {
    fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let mut out = String::new();
        html::push_html(&mut out, parser);
        out
    }
}

/// A titled group of widgets: an accordion item or a tab.
#[derive(Debug, Clone)]
pub struct Panel {
    pub title: String,
    pub body: Vec<Widget>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticCard {
    pub title: String,
    pub message: String,
    /// Offending source, cut to the configured length.
    pub excerpt: String,
    pub span: Option<Range<usize>>,
}

#[derive(Debug, Clone)]
pub enum Widget {
    Prose { html: String },
    Accordion { items: Vec<Panel> },
    Tabs { items: Vec<Panel> },
    FlipCard { front: Vec<Widget>, back: Vec<Widget> },
    Callout { kind: CalloutKind, body: Vec<Widget> },
    TradingSimV1(Box<SimulationSession<TradingSimV1Node>>),
    TradingSimV2(Box<SimulationSession<TradingSimV2Node>>),
    Diagnostic(DiagnosticCard),
}

impl Widget {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Widget::Prose { .. } => "prose",
            Widget::Accordion { .. } => "accordion",
            Widget::Tabs { .. } => "tabs",
            Widget::FlipCard { .. } => "flipcard",
            Widget::Callout { .. } => "callout",
            Widget::TradingSimV1(_) => "trading-sim-v1",
            Widget::TradingSimV2(_) => "trading-sim-v2",
            Widget::Diagnostic(_) => "diagnostic",
        }
    }
}

pub struct Renderer<P = CmarkRenderer> {
    config: EngineConfig,
    prose: P,
}

impl Renderer<CmarkRenderer> {
    pub fn new(config: EngineConfig) -> Self {
        Renderer {
            config,
            prose: CmarkRenderer::default(),
        }
    }
}

impl<P: ProseRenderer> Renderer<P> {
    pub fn with_prose(config: EngineConfig, prose: P) -> Self {
        Renderer { config, prose }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Widgets for every visual block of the lesson, in authored order.
    pub fn render_lesson(&self, lesson: &Lesson) -> Vec<Widget> {
        lesson
            .visual_blocks()
            .map(|block| self.contain(&block.node, 0, Some(block.span.clone())))
            .collect()
    }

    /// Same as [`Renderer::render_lesson`] for a bare node list.
    pub fn render_nodes(&self, nodes: &[ContentNode]) -> Vec<Widget> {
        self.render_at(nodes, 0)
    }

    pub fn render_html(&self, lesson: &Lesson) -> String {
        self.to_html(&self.render_lesson(lesson))
    }

    /// Render one node without containment.
    pub fn try_render(&self, node: &ContentNode) -> Result<Widget, RenderError> {
        self.build(node, 0)
    }

    fn render_at(&self, nodes: &[ContentNode], depth: usize) -> Vec<Widget> {
        nodes
            .iter()
            .filter(|n| n.is_visual())
            .map(|n| self.contain(n, depth, None))
            .collect()
    }

    fn contain(&self, node: &ContentNode, depth: usize, span: Option<Range<usize>>) -> Widget {
        match self.build(node, depth) {
            Ok(widget) => widget,
            Err(error) => {
                let error = match span {
                    Some(span) => error.with_span(span),
                    None => error,
                };
                warn!(node = node.kind_name(), depth, "{}", error);
                Widget::Diagnostic(self.diagnostic(node, &error))
            }
        }
    }

    fn build(&self, node: &ContentNode, depth: usize) -> Result<Widget, RenderError> {
        let widget = match node {
            ContentNode::Prose(prose) => Widget::Prose {
                html: self.prose.render(&prose.markdown),
            },
            ContentNode::Accordion(accordion) => Widget::Accordion {
                items: accordion
                    .items
                    .iter()
                    .map(|item| Panel {
                        title: item.title.clone(),
                        body: self.body(&item.body_markdown, depth),
                    })
                    .collect(),
            },
            ContentNode::Tabs(tabs) => Widget::Tabs {
                items: tabs
                    .items
                    .iter()
                    .map(|item| Panel {
                        title: item.label.clone(),
                        body: self.body(&item.body_markdown, depth),
                    })
                    .collect(),
            },
            ContentNode::FlipCard(card) => Widget::FlipCard {
                front: self.body(&card.front_markdown, depth),
                back: self.body(&card.back_markdown, depth),
            },
            ContentNode::Callout(callout) => Widget::Callout {
                kind: callout.kind,
                body: self.body(&callout.body_markdown, depth),
            },
            ContentNode::TradingSimV1(sim) => Widget::TradingSimV1(Box::new(
                SimulationSession::new(sim.clone(), &self.config)
                    .map_err(|e| RenderError::new(e, Some(BlockType::TradingSim)))?,
            )),
            ContentNode::TradingSimV2(sim) => Widget::TradingSimV2(Box::new(
                SimulationSession::new(sim.clone(), &self.config)
                    .map_err(|e| RenderError::new(e, Some(BlockType::TradingSim)))?,
            )),
            ContentNode::Malformed(malformed) => {
                return Err(RenderError::new(
                    malformed.error.clone(),
                    Some(malformed.block_type),
                ));
            }
            // Filtered out by callers; rendering them standalone yields nothing visible.
            ContentNode::Meta(_) | ContentNode::Step(_) => Widget::Prose {
                html: String::new(),
            },
        };
        Ok(widget)
    }

    /// Re-parse a widget body so nested fences render as widgets.
    fn body(&self, markdown: &str, depth: usize) -> Vec<Widget> {
        if depth + 1 >= self.config.max_render_depth {
            debug!(depth, "render depth reached, body kept as prose");
            return vec![Widget::Prose {
                html: self.prose.render(markdown),
            }];
        }
        self.render_at(&tokenize(markdown), depth + 1)
    }

    fn diagnostic(&self, node: &ContentNode, error: &RenderError) -> DiagnosticCard {
        let source = match node {
            ContentNode::Malformed(malformed) => malformed.raw.clone(),
            other => other.to_string(),
        };
        let title = match error.block_type {
            Some(block_type) => format!("Could not display this {} block", block_type),
            None => "Could not display this block".to_string(),
        };
        DiagnosticCard {
            title,
            message: error.failure.to_string(),
            excerpt: excerpt(&source, self.config.diagnostic_excerpt_chars),
            span: error.span.clone(),
        }
    }

    /// Static HTML for rendered widgets.
    pub fn to_html(&self, widgets: &[Widget]) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_all(&mut out, widgets);
        out
    }

    fn write_all(&self, out: &mut String, widgets: &[Widget]) -> std::fmt::Result {
        for widget in widgets {
            self.write_widget(out, widget)?;
        }
        Ok(())
    }

    fn write_widget(&self, out: &mut String, widget: &Widget) -> std::fmt::Result {
        match widget {
            Widget::Prose { html } => out.push_str(html),
            Widget::Accordion { items } => {
                writeln!(out, "<section class=\"accordion\">")?;
                for item in items {
                    writeln!(out, "<details><summary>{}</summary>", escape_html(&item.title))?;
                    self.write_all(out, &item.body)?;
                    writeln!(out, "</details>")?;
                }
                writeln!(out, "</section>")?;
            }
            Widget::Tabs { items } => {
                writeln!(out, "<section class=\"tabs\">")?;
                for item in items {
                    let label = escape_html(&item.title);
                    writeln!(
                        out,
                        "<section class=\"tab\" data-label=\"{}\"><h3>{}</h3>",
                        label, label
                    )?;
                    self.write_all(out, &item.body)?;
                    writeln!(out, "</section>")?;
                }
                writeln!(out, "</section>")?;
            }
            Widget::FlipCard { front, back } => {
                writeln!(out, "<section class=\"flipcard\">\n<div class=\"front\">")?;
                self.write_all(out, front)?;
                writeln!(out, "</div>\n<div class=\"back\">")?;
                self.write_all(out, back)?;
                writeln!(out, "</div>\n</section>")?;
            }
            Widget::Callout { kind, body } => {
                writeln!(out, "<aside class=\"callout callout-{}\">", kind.name())?;
                self.write_all(out, body)?;
                writeln!(out, "</aside>")?;
            }
            Widget::TradingSimV1(session) => self.write_v1(out, session)?,
            Widget::TradingSimV2(session) => self.write_v2(out, session)?,
            Widget::Diagnostic(card) => writeln!(
                out,
                "<div class=\"diagnostic\" role=\"alert\"><strong>{}</strong>\n<p>{}</p>\n<pre>{}</pre></div>",
                escape_html(&card.title),
                escape_html(&card.message),
                escape_html(&card.excerpt),
            )?,
        }
        Ok(())
    }

    fn write_v1(
        &self,
        out: &mut String,
        session: &SimulationSession<TradingSimV1Node>,
    ) -> std::fmt::Result {
        let sim = session.scenario();
        let data = serde_json::to_string(&sim.scenario_data).unwrap_or_default();
        writeln!(
            out,
            "<div class=\"trading-sim\" data-version=\"1\" data-asset=\"{}\" data-scenario-id=\"{}\" data-scenario=\"{}\">",
            escape_html(&sim.asset),
            escape_html(&sim.scenario_id),
            escape_html(&data),
        )?;
        if let Some(context) = &sim.educational_context {
            writeln!(out, "<div class=\"context\">\n{}</div>", self.prose.render(context))?;
        }
        writeln!(out, "<div class=\"question\">\n{}</div>", self.prose.render(&sim.question))?;
        let choices = [Decision::Buy, Decision::Sell, Decision::Skip];
        write_choices(out, choices.iter().map(|d| d.name()))?;
        write_outcome(out, session.outcome().ok())?;
        writeln!(out, "</div>")
    }

    fn write_v2(
        &self,
        out: &mut String,
        session: &SimulationSession<TradingSimV2Node>,
    ) -> std::fmt::Result {
        let sim = session.scenario();
        let data = serde_json::to_string(&sim.dataset).unwrap_or_default();
        writeln!(
            out,
            "<div class=\"trading-sim\" data-version=\"2\" data-asset=\"{}\" data-scenario-id=\"{}\" data-chart=\"{}\" data-timeframe=\"{}\" data-reveal=\"{}\" data-scenario=\"{}\">",
            escape_html(&sim.asset),
            escape_html(&sim.scenario_id),
            sim.chart_kind.name(),
            escape_html(&sim.timeframe),
            sim.reveal_policy.name(),
            escape_html(&data),
        )?;
        writeln!(out, "<div class=\"question\">\n{}</div>", self.prose.render(&sim.question))?;
        if !sim.hints.is_empty() {
            out.push_str("<ul class=\"hints\">\n");
            for hint in &sim.hints {
                writeln!(out, "<li id=\"{}\">{}</li>", escape_html(&hint.id), escape_html(&hint.text))?;
            }
            out.push_str("</ul>\n");
        }
        write_choices(out, sim.actions.iter().map(|a| a.name()))?;
        write_outcome(out, session.outcome().ok())?;
        writeln!(out, "</div>")
    }
}

fn write_choices<'a>(
    out: &mut String,
    names: impl Iterator<Item = &'a str>,
) -> std::fmt::Result {
    for name in names {
        writeln!(out, "<button type=\"button\" data-action=\"{}\">{}</button>", name, name)?;
    }
    Ok(())
}

fn write_outcome(out: &mut String, outcome: Option<&Outcome>) -> std::fmt::Result {
    let Some(outcome) = outcome else {
        return Ok(());
    };
    write!(
        out,
        "<p class=\"outcome\" data-pips=\"{}\" data-correct=\"{}\"",
        outcome.pips, outcome.correct
    )?;
    if let Some(score) = outcome.score {
        write!(out, " data-score=\"{}\"", score)?;
    }
    writeln!(out, ">{}</p>", escape_html(&outcome.feedback))
}

/// First `limit` characters of `source`, with an ellipsis when cut.
pub fn excerpt(source: &str, limit: usize) -> String {
    let source = source.trim();
    match source.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &source[..cut]),
        None => source.to_string(),
    }
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
