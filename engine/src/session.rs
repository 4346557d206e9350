use std::fmt::Debug;
use std::time::{Duration, Instant};

use talamo::block::{Decision, TradeAction, TradingSimV1Node, TradingSimV2Node};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::SimulationError;
use crate::evaluate::{evaluate, evaluate_v2, final_price};

/// The price path a scenario is played over.
#[derive(Debug, Clone, Copy)]
pub struct PriceSeries<'a> {
    pub historical: &'a [f64],
    pub current: f64,
    pub future: &'a [f64],
}

/// What the learner sees once a decision is revealed.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub pips: i64,
    pub correct: bool,
    /// v2 only, and only when the dataset names a correct action.
    pub score: Option<f64>,
    pub feedback: String,
    pub final_price: f64,
}

/// A playable trading scenario. Implemented by both simulator node versions.
pub trait Scenario {
    type Choice: Copy + PartialEq + Debug;

    fn id(&self) -> &str;

    fn series(&self) -> PriceSeries<'_>;

    /// Entry, stop-loss and take-profit, for price validation.
    fn levels(&self) -> [(&'static str, Option<f64>); 3];

    fn offers(&self, choice: Self::Choice) -> bool;

    fn choice_name(choice: Self::Choice) -> &'static str;

    fn evaluate(&self, choice: Self::Choice) -> Outcome;

    fn reveal_delay(config: &EngineConfig) -> Duration;

    /// Every price must be finite before the scenario can be played.
    fn validate(&self) -> Result<(), SimulationError> {
        let series = self.series();
        let prices = series
            .historical
            .iter()
            .map(|p| ("historical", *p))
            .chain(std::iter::once(("current", series.current)))
            .chain(series.future.iter().map(|p| ("future", *p)))
            .chain(
                self.levels()
                    .into_iter()
                    .filter_map(|(field, value)| value.map(|v| (field, v))),
            );
        for (field, value) in prices {
            if !value.is_finite() {
                return Err(SimulationError::InvalidPrice { field, value });
            }
        }
        Ok(())
    }
}

impl Scenario for TradingSimV1Node {
    type Choice = Decision;

    fn id(&self) -> &str {
        &self.scenario_id
    }

    fn series(&self) -> PriceSeries<'_> {
        PriceSeries {
            historical: &self.scenario_data.historical,
            current: self.scenario_data.current,
            future: &self.scenario_data.future,
        }
    }

    fn levels(&self) -> [(&'static str, Option<f64>); 3] {
        let data = &self.scenario_data;
        [
            ("entry", data.entry),
            ("stopLoss", data.stop_loss),
            ("takeProfit", data.take_profit),
        ]
    }

    fn offers(&self, _choice: Decision) -> bool {
        true
    }

    fn choice_name(choice: Decision) -> &'static str {
        choice.name()
    }

    fn evaluate(&self, choice: Decision) -> Outcome {
        let evaluation = evaluate(&self.scenario_data, choice);
        Outcome {
            pips: evaluation.pips,
            correct: evaluation.correct,
            score: None,
            feedback: self.feedback.for_decision(choice).to_string(),
            final_price: final_price(self.scenario_data.current, &self.scenario_data.future),
        }
    }

    fn reveal_delay(config: &EngineConfig) -> Duration {
        config.reveal_delay_v1()
    }
}

impl Scenario for TradingSimV2Node {
    type Choice = TradeAction;

    fn id(&self) -> &str {
        &self.scenario_id
    }

    fn series(&self) -> PriceSeries<'_> {
        PriceSeries {
            historical: &self.dataset.historical,
            current: self.dataset.current,
            future: &self.dataset.future,
        }
    }

    fn levels(&self) -> [(&'static str, Option<f64>); 3] {
        [
            ("entry", Some(self.entry())),
            ("stopLoss", self.stop_loss()),
            ("takeProfit", self.take_profit()),
        ]
    }

    fn offers(&self, choice: TradeAction) -> bool {
        self.actions.contains(&choice)
    }

    fn choice_name(choice: TradeAction) -> &'static str {
        choice.name()
    }

    fn evaluate(&self, choice: TradeAction) -> Outcome {
        let evaluation = evaluate_v2(self, choice);
        Outcome {
            pips: evaluation.pips,
            correct: evaluation.correct,
            score: evaluation.score,
            feedback: self.feedback_for(choice).to_string(),
            final_price: final_price(self.dataset.current, &self.dataset.future),
        }
    }

    fn reveal_delay(config: &EngineConfig) -> Duration {
        config.reveal_delay_v2()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Phase<C> {
    Idle,
    Deciding { choice: C, since: Instant },
    Revealed { choice: C, outcome: Outcome },
}

/// Snapshot of a session, as a widget would hold it.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState<C> {
    pub user_action: Option<C>,
    pub revealed: bool,
    pub score: Option<f64>,
}

/// One on-screen simulator: `Idle -> Deciding -> Revealed -> (reset) -> Idle`.
///
/// Time is passed in by the caller, so the session never sleeps or spawns.
#[derive(Debug, Clone)]
pub struct SimulationSession<S: Scenario> {
    scenario: S,
    delay: Duration,
    phase: Phase<S::Choice>,
}

impl<S: Scenario> SimulationSession<S> {
    pub fn new(scenario: S, config: &EngineConfig) -> Result<Self, SimulationError> {
        scenario.validate()?;
        Ok(SimulationSession {
            delay: S::reveal_delay(config),
            scenario,
            phase: Phase::Idle,
        })
    }

    pub fn scenario(&self) -> &S {
        &self.scenario
    }

    pub fn reveal_delay(&self) -> Duration {
        self.delay
    }

    /// Lock in a choice. Only valid from `Idle`.
    pub fn choose(&mut self, choice: S::Choice, now: Instant) -> Result<(), SimulationError> {
        if !matches!(self.phase, Phase::Idle) {
            return Err(SimulationError::AlreadyDecided);
        }
        if !self.scenario.offers(choice) {
            return Err(SimulationError::ActionNotOffered(
                S::choice_name(choice).to_string(),
            ));
        }
        debug!(
            scenario = self.scenario.id(),
            action = S::choice_name(choice),
            "deciding"
        );
        self.phase = Phase::Deciding { choice, since: now };
        Ok(())
    }

    /// Advance the reveal timer. Returns the outcome once revealed.
    pub fn poll(&mut self, now: Instant) -> Option<&Outcome> {
        if let Phase::Deciding { since, .. } = self.phase {
            if now.saturating_duration_since(since) >= self.delay {
                self.reveal();
            }
        }
        self.outcome().ok()
    }

    /// Skip whatever remains of the reveal delay.
    pub fn reveal_now(&mut self) -> Result<&Outcome, SimulationError> {
        match self.phase {
            Phase::Idle => return Err(SimulationError::NothingToReveal),
            Phase::Deciding { .. } => self.reveal(),
            Phase::Revealed { .. } => {}
        }
        self.outcome()
    }

    pub fn outcome(&self) -> Result<&Outcome, SimulationError> {
        match &self.phase {
            Phase::Revealed { outcome, .. } => Ok(outcome),
            _ => Err(SimulationError::NotRevealed),
        }
    }

    /// "Try again": clears the choice, the reveal and any score.
    pub fn reset(&mut self) -> Result<(), SimulationError> {
        match self.phase {
            Phase::Deciding { .. } => Err(SimulationError::NotRevealed),
            Phase::Idle => Ok(()),
            Phase::Revealed { .. } => {
                debug!(scenario = self.scenario.id(), "reset");
                self.phase = Phase::Idle;
                Ok(())
            }
        }
    }

    pub fn state(&self) -> SimulationState<S::Choice> {
        match &self.phase {
            Phase::Idle => SimulationState {
                user_action: None,
                revealed: false,
                score: None,
            },
            Phase::Deciding { choice, .. } => SimulationState {
                user_action: Some(*choice),
                revealed: false,
                score: None,
            },
            Phase::Revealed { choice, outcome } => SimulationState {
                user_action: Some(*choice),
                revealed: true,
                score: outcome.score,
            },
        }
    }

    /// Prices drawn on the chart: the future stays hidden until the reveal.
    pub fn visible_prices(&self) -> Vec<f64> {
        let series = self.scenario.series();
        let mut prices = series.historical.to_vec();
        prices.push(series.current);
        if matches!(self.phase, Phase::Revealed { .. }) {
            prices.extend_from_slice(series.future);
        }
        prices
    }

    fn reveal(&mut self) {
        if let Phase::Deciding { choice, .. } = self.phase {
            let outcome = self.scenario.evaluate(choice);
            debug!(
                scenario = self.scenario.id(),
                action = S::choice_name(choice),
                pips = outcome.pips,
                correct = outcome.correct,
                "revealed"
            );
            self.phase = Phase::Revealed { choice, outcome };
        }
    }
}
