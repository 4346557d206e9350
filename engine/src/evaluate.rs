//! Pure P&L and scoring math for the trading simulators.
//!
//! Nothing here holds state; the session layer decides when to call it.

use talamo::block::{Decision, Rubric, ScenarioData, TradeAction, TradingSimV2Node};

/// Price difference to pips.
pub const PIP_SCALE: f64 = 10_000.0;

/// Partial credit for staying out of a trade that had a better answer.
pub const SKIP_CREDIT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
    Flat,
}

impl From<Decision> for Direction {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Buy => Direction::Long,
            Decision::Sell => Direction::Short,
            Decision::Skip => Direction::Flat,
        }
    }
}

impl From<TradeAction> for Direction {
    fn from(action: TradeAction) -> Self {
        match action {
            TradeAction::Buy | TradeAction::MarketBuy | TradeAction::LimitBuy => Direction::Long,
            TradeAction::Sell | TradeAction::MarketSell | TradeAction::LimitSell => {
                Direction::Short
            }
            TradeAction::Skip => Direction::Flat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub pips: i64,
    pub correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredEvaluation {
    pub pips: i64,
    pub correct: bool,
    /// `None` when the dataset has no answer key.
    pub score: Option<f64>,
}

/// Last future price, or the decision-time price when there is no future.
pub fn final_price(current: f64, future: &[f64]) -> f64 {
    future.last().copied().unwrap_or(current)
}

/// Round half toward positive infinity.
pub fn round_pips(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Unclipped P&L in pips for holding `direction` from `entry` to `exit`.
pub fn raw_pips(direction: Direction, entry: f64, exit: f64) -> i64 {
    match direction {
        Direction::Long => round_pips((exit - entry) * PIP_SCALE),
        Direction::Short => round_pips((entry - exit) * PIP_SCALE),
        Direction::Flat => 0,
    }
}

/// P&L with take-profit and stop-loss applied to the final price.
///
/// Take-profit is checked first. A level only clips the side it protects: for
/// a long, take-profit above entry and stop-loss below it; mirrored for a
/// short. Missing or wrong-side levels never clip.
pub fn clipped_pips(
    direction: Direction,
    entry: f64,
    exit: f64,
    stop_loss: Option<f64>,
    take_profit: Option<f64>,
) -> i64 {
    match direction {
        Direction::Flat => 0,
        Direction::Long => {
            let tp = take_profit.filter(|tp| *tp > entry);
            let sl = stop_loss.filter(|sl| *sl < entry);
            match (tp, sl) {
                (Some(tp), _) if exit >= tp => round_pips((tp - entry) * PIP_SCALE),
                (_, Some(sl)) if exit <= sl => round_pips(-(entry - sl) * PIP_SCALE),
                _ => raw_pips(direction, entry, exit),
            }
        }
        Direction::Short => {
            let tp = take_profit.filter(|tp| *tp < entry);
            let sl = stop_loss.filter(|sl| *sl > entry);
            match (tp, sl) {
                (Some(tp), _) if exit <= tp => round_pips((entry - tp) * PIP_SCALE),
                (_, Some(sl)) if exit >= sl => round_pips(-(sl - entry) * PIP_SCALE),
                _ => raw_pips(direction, entry, exit),
            }
        }
    }
}

/// v1 outcome: unclipped pips against `entry` (or `current`), and whether the
/// decision matches the answer key.
pub fn evaluate(scenario: &ScenarioData, decision: Decision) -> Evaluation {
    let exit = final_price(scenario.current, &scenario.future);
    let entry = scenario.entry.unwrap_or(scenario.current);
    Evaluation {
        pips: raw_pips(decision.into(), entry, exit),
        correct: decision == scenario.correct_action,
    }
}

/// v2 outcome: pips clipped to the scenario's stop-loss and take-profit, plus a score.
pub fn evaluate_v2(sim: &TradingSimV2Node, action: TradeAction) -> ScoredEvaluation {
    let exit = final_price(sim.dataset.current, &sim.dataset.future);
    let pips = clipped_pips(
        action.into(),
        sim.entry(),
        exit,
        sim.stop_loss(),
        sim.take_profit(),
    );
    let correct_action = sim.dataset.correct_action.as_deref();
    ScoredEvaluation {
        pips,
        correct: correct_action.is_some_and(|c| action_matches(action.name(), c)),
        score: correct_action.map(|c| score(action, c, sim.rubric.as_ref())),
    }
}

/// 1.0 for the right call, [`SKIP_CREDIT`] for skipping, 0 otherwise.
///
/// The rubric is accepted but does not weight the result.
pub fn score(action: TradeAction, correct_action: &str, _rubric: Option<&Rubric>) -> f64 {
    if action_matches(action.name(), correct_action) {
        1.0
    } else if action == TradeAction::Skip {
        SKIP_CREDIT
    } else {
        0.0
    }
}

/// Literal equality, with `market_buy`/`buy` and `market_sell`/`sell` treated as the same.
pub fn action_matches(chosen: &str, correct: &str) -> bool {
    fn canonical(name: &str) -> &str {
        match name {
            "market_buy" => "buy",
            "market_sell" => "sell",
            other => other,
        }
    }
    let correct = correct.trim().to_ascii_lowercase();
    canonical(chosen) == canonical(&correct)
}
