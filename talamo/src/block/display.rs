use std::fmt;

use serde::Serialize;

use crate::block::{
    Annotation, BlockType, ContentNode, MetaNode, ScenarioContext, TradingSimV1Node,
    TradingSimV2Node,
};

/// Write nodes back to markup, blank-line separated. Parsing the result
/// yields an equivalent node sequence.
pub fn to_markup(nodes: &[ContentNode]) -> String {
    nodes
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl fmt::Display for ContentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentNode::Prose(prose) => writeln!(f, "{}", prose.markdown),
            ContentNode::Accordion(accordion) => {
                writeln!(f, ":::{}", BlockType::Accordion)?;
                for item in &accordion.items {
                    writeln!(f, "## {}", item.title)?;
                    if !item.body_markdown.is_empty() {
                        writeln!(f, "{}", item.body_markdown)?;
                    }
                }
                writeln!(f, ":::")
            }
            ContentNode::Tabs(tabs) => {
                writeln!(f, ":::{}", BlockType::Tabs)?;
                for item in &tabs.items {
                    writeln!(f, "[label=\"{}\"]", item.label)?;
                    writeln!(f, "{}", item.body_markdown)?;
                }
                writeln!(f, ":::")
            }
            ContentNode::FlipCard(card) => {
                writeln!(f, ":::{}", BlockType::FlipCard)?;
                writeln!(f, "[front]\n{}", card.front_markdown)?;
                writeln!(f, "[back]\n{}", card.back_markdown)?;
                writeln!(f, ":::")
            }
            ContentNode::Callout(callout) => {
                writeln!(f, ":::{} type=\"{}\"", BlockType::Callout, callout.kind.name())?;
                writeln!(f, "{}", callout.body_markdown)?;
                writeln!(f, ":::")
            }
            ContentNode::Meta(meta) => write_meta(f, meta),
            ContentNode::Step(step) => {
                writeln!(f, ":::{} title=\"{}\"", BlockType::Step, step.title)?;
                writeln!(f, "{}", step.body_markdown)?;
                writeln!(f, ":::")
            }
            ContentNode::TradingSimV1(sim) => write_v1(f, sim),
            ContentNode::TradingSimV2(sim) => write_v2(f, sim),
            ContentNode::Malformed(block) => {
                if block.attributes.is_empty() {
                    writeln!(f, ":::{}", block.block_type)?;
                } else {
                    writeln!(f, ":::{} {}", block.block_type, block.attributes)?;
                }
                writeln!(f, "{}", block.raw)?;
                writeln!(f, ":::")
            }
        }
    }
}

fn write_meta(f: &mut fmt::Formatter<'_>, meta: &MetaNode) -> fmt::Result {
    write!(f, ":::{}", BlockType::Meta)?;
    if let Some(level) = &meta.level {
        write!(f, " level=\"{}\"", level)?;
    }
    if let Some(duration) = &meta.duration_label {
        write!(f, " duration=\"{}\"", duration)?;
    }
    if !meta.tags.is_empty() {
        write!(f, " tags=\"{}\"", meta.tags.join(","))?;
    }
    if let Some(id) = &meta.id {
        write!(f, " id=\"{}\"", id)?;
    }
    writeln!(f)?;
    writeln!(f, ":::")
}

fn write_section(f: &mut fmt::Formatter<'_>, name: &str, text: &str) -> fmt::Result {
    writeln!(f, "[{}]", name)?;
    writeln!(f, "{}", text)
}

fn write_json<T: Serialize + ?Sized>(f: &mut fmt::Formatter<'_>, name: &str, value: &T) -> fmt::Result {
    let json = serde_json::to_string_pretty(value).map_err(|_| fmt::Error)?;
    write_section(f, name, &json)
}

fn write_annotations(f: &mut fmt::Formatter<'_>, annotations: &Option<Vec<Annotation>>) -> fmt::Result {
    match annotations {
        Some(annotations) => write_json(f, "annotations", annotations),
        None => Ok(()),
    }
}

fn write_v1(f: &mut fmt::Formatter<'_>, sim: &TradingSimV1Node) -> fmt::Result {
    writeln!(
        f,
        ":::{} asset=\"{}\" scenario=\"{}\"",
        BlockType::TradingSim,
        sim.asset,
        sim.scenario_id
    )?;
    if let Some(context) = &sim.educational_context {
        write_section(f, "educational_context", context)?;
    }
    write_json(f, "scenario_data", &sim.scenario_data)?;
    write_annotations(f, &sim.annotations)?;
    write_section(f, "question", &sim.question)?;
    write_section(f, "feedback_buy", &sim.feedback.buy)?;
    write_section(f, "feedback_sell", &sim.feedback.sell)?;
    write_section(f, "feedback_skip", &sim.feedback.skip)?;
    writeln!(f, ":::")
}

fn write_v2(f: &mut fmt::Formatter<'_>, sim: &TradingSimV2Node) -> fmt::Result {
    let actions: Vec<&str> = sim.actions.iter().map(|a| a.name()).collect();
    writeln!(
        f,
        ":::{} v=\"2\" asset=\"{}\" scenario=\"{}\" chart=\"{}\" timeframe=\"{}\" reveal=\"{}\" actions=\"{}\"",
        BlockType::TradingSim,
        sim.asset,
        sim.scenario_id,
        sim.chart_kind.name(),
        sim.timeframe,
        sim.reveal_policy.name(),
        actions.join(",")
    )?;
    if let Some(market) = &sim.market {
        write_json(f, "market", market)?;
    }
    if let Some(risk) = &sim.risk {
        write_json(f, "risk", risk)?;
    }
    write_json(f, "dataset", &sim.dataset)?;
    write_annotations(f, &sim.annotations)?;
    match &sim.context {
        Some(ScenarioContext::Text(text)) => write_section(f, "context", text)?,
        Some(ScenarioContext::Data(value)) => write_json(f, "context", value)?,
        None => {}
    }
    if !sim.hints.is_empty() {
        write_json(f, "hints", &sim.hints)?;
    }
    if let Some(rubric) = &sim.rubric {
        write_json(f, "rubric", rubric)?;
    }
    write_section(f, "question", &sim.question)?;
    for (key, text) in &sim.feedback {
        write_section(f, &format!("feedback_{}", key), text)?;
    }
    writeln!(f, ":::")
}
