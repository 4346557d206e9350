use std::time::Instant;

use anyhow::{Context, anyhow, bail};
use tracing::debug;
use engine::{EngineConfig, Outcome, Scenario, SimulationSession};
use talamo::Lesson;
use talamo::block::{BlockType, ContentNode, Decision, TradeAction};

/// Run one decision through a fresh session and reveal it immediately.
pub fn play<S: Scenario>(scenario: S, choice: S::Choice, config: &EngineConfig) -> anyhow::Result<Outcome> {
    let config = EngineConfig {
        instant_reveal: true,
        ..config.clone()
    };
    let mut session = SimulationSession::new(scenario, &config)?;
    debug!(scenario = session.scenario().id(), choice = ?choice, "playing decision");
    let now = Instant::now();
    session.choose(choice, now)?;
    session
        .poll(now)
        .cloned()
        .ok_or_else(|| anyhow!("decision was not revealed"))
}

/// The `number`-th (1-based) trading simulator in the lesson, counting malformed ones.
pub fn simulator(lesson: &Lesson, number: usize) -> anyhow::Result<&ContentNode> {
    let simulators: Vec<&ContentNode> = lesson
        .nodes()
        .filter(|n| match n {
            ContentNode::TradingSimV1(_) | ContentNode::TradingSimV2(_) => true,
            ContentNode::Malformed(m) => m.block_type == BlockType::TradingSim,
            _ => false,
        })
        .collect();

    if number == 0 || number > simulators.len() {
        bail!(
            "block {} not found: the lesson has {} trading simulator(s)",
            number,
            simulators.len()
        );
    }
    Ok(simulators[number - 1])
}

/// Play `action` on a simulator node of either version.
pub fn decide(node: &ContentNode, action: &str, config: &EngineConfig) -> anyhow::Result<Outcome> {
    match node {
        ContentNode::TradingSimV1(sim) => {
            let decision = Decision::from_name(action)
                .with_context(|| format!("unknown action \"{}\" (expected buy, sell or skip)", action))?;
            play(sim.clone(), decision, config)
        }
        ContentNode::TradingSimV2(sim) => {
            let action = TradeAction::from_name(action)
                .with_context(|| format!("unknown trade action \"{}\"", action))?;
            play(sim.clone(), action, config)
        }
        ContentNode::Malformed(malformed) => Err(anyhow!(malformed.error.clone())
            .context(format!("the {} block could not be built", malformed.block_type))),
        other => bail!("{} block is not a trading simulator", other.kind_name()),
    }
}
