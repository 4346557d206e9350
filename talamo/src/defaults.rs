//! Fallback values applied when authored content omits or garbles a field.
//!
//! The block builder is the only consumer; renderers read the resolved
//! values from the nodes instead of re-declaring them.

use crate::block::{CalloutKind, ChartKind, RevealPolicy, TradeAction};

pub const ASSET: &str = "EURUSD";
pub const SCENARIO_ID: &str = "custom";
pub const QUESTION: &str = "Based on the chart, what would you do?";
pub const STEP_TITLE: &str = "Step";

pub const CALLOUT_KIND: CalloutKind = CalloutKind::Info;

pub const FLIPCARD_FRONT: &str = "*(front side is empty)*";
pub const FLIPCARD_BACK: &str = "*(back side is empty)*";

pub const TIMEFRAME: &str = "H1";
pub const CHART_KIND: ChartKind = ChartKind::Line;
pub const REVEAL_POLICY: RevealPolicy = RevealPolicy::AfterDecision;
pub const TRADE_ACTIONS: [TradeAction; 3] = [
    TradeAction::MarketBuy,
    TradeAction::MarketSell,
    TradeAction::Skip,
];

pub const FEEDBACK_BUY: &str = "You chose to buy. Compare your entry with where price went next.";
pub const FEEDBACK_SELL: &str = "You chose to sell. Compare your entry with where price went next.";
pub const FEEDBACK_SKIP: &str =
    "You chose to stay out. Sometimes the best trade is no trade at all.";
pub const FEEDBACK_GENERAL: &str = "Review the outcome and the reasoning behind it.";

/// Default feedback by direction alias (`buy`, `sell`, `skip`), general otherwise.
pub fn feedback(alias: &str) -> &'static str {
    match alias {
        "buy" => FEEDBACK_BUY,
        "sell" => FEEDBACK_SELL,
        "skip" => FEEDBACK_SKIP,
        _ => FEEDBACK_GENERAL,
    }
}

/// Id given to the `n`th hint (zero-based) when the author supplied none.
pub fn hint_id(n: usize) -> String {
    format!("hint-{}", n + 1)
}
