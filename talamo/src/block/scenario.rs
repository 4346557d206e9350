use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// The three choices offered by a v1 simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Buy,
    Sell,
    Skip,
}

impl Decision {
    pub fn name(self) -> &'static str {
        match self {
            Decision::Buy => "buy",
            Decision::Sell => "sell",
            Decision::Skip => "skip",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "buy" => Some(Decision::Buy),
            "sell" => Some(Decision::Sell),
            "skip" => Some(Decision::Skip),
            _ => None,
        }
    }
}

/// Price path and answer key of a v1 scenario (`[scenario_data]`).
///
/// `current` is the price at decision time and sits immediately after
/// `historical`; `future` is revealed after the decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioData {
    #[serde(default)]
    pub historical: Vec<f64>,
    pub current: f64,
    #[serde(default)]
    pub future: Vec<f64>,
    #[serde(alias = "correct_action")]
    pub correct_action: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<f64>,
    #[serde(default, alias = "stop_loss", skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(default, alias = "take_profit", skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
}

/// Price series of a v2 scenario (`[dataset]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub historical: Vec<f64>,
    pub current: f64,
    #[serde(default)]
    pub future: Vec<f64>,
    /// Kept as a string: answer keys may name any action, e.g. `market_buy`.
    #[serde(default, alias = "correct_action", skip_serializing_if = "Option::is_none")]
    pub correct_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<f64>,
    #[serde(default, alias = "stop_loss", skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(default, alias = "take_profit", skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
}

/// Order levels from `[risk]`; any level present here wins over the dataset's.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<f64>,
    #[serde(default, alias = "stop_loss", skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(default, alias = "take_profit", skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
    #[serde(default, alias = "position_size", skip_serializing_if = "Option::is_none")]
    pub position_size: Option<f64>,
    #[serde(default, alias = "risk_reward", skip_serializing_if = "Option::is_none")]
    pub risk_reward: Option<f64>,
}

/// Market description from `[market]`. Any JSON object is accepted; the
/// well-known fields are read through accessors that ignore other types.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketContext {
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl MarketContext {
    pub fn symbol(&self) -> Option<&str> {
        self.fields.get("symbol").and_then(serde_json::Value::as_str)
    }

    pub fn session(&self) -> Option<&str> {
        self.fields.get("session").and_then(serde_json::Value::as_str)
    }

    pub fn spread(&self) -> Option<f64> {
        self.fields.get("spread").and_then(serde_json::Value::as_f64)
    }

    /// `"high"`, `0.8`, ... whatever the author wrote, as display text.
    pub fn volatility(&self) -> Option<String> {
        self.fields.get("volatility").and_then(scalar_text)
    }
}

/// A chart marker. Either `index` (into the concatenated price path) or `price` locates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, alias = "text", deserialize_with = "label_text")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

fn scalar_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Labels are display text; numbers and booleans are written out as-is.
fn label_text<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(String::new()),
        other => scalar_text(&other)
            .ok_or_else(|| serde::de::Error::custom("label must be text, a number or a boolean")),
    }
}

/// `[context]` is markdown unless it is a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioContext {
    Text(String),
    Data(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    pub id: String,
    pub text: String,
}

/// Named scoring weights. Accepted and carried, not applied to the score.
pub type Rubric = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionFeedback {
    pub buy: String,
    pub sell: String,
    pub skip: String,
}

impl DecisionFeedback {
    pub fn for_decision(&self, decision: Decision) -> &str {
        match decision {
            Decision::Buy => &self.buy,
            Decision::Sell => &self.sell,
            Decision::Skip => &self.skip,
        }
    }
}

impl Default for DecisionFeedback {
    fn default() -> Self {
        DecisionFeedback {
            buy: defaults::feedback("buy").to_string(),
            sell: defaults::feedback("sell").to_string(),
            skip: defaults::feedback("skip").to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Candles,
}

impl ChartKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "line" => Some(ChartKind::Line),
            "candles" | "candlestick" => Some(ChartKind::Candles),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Candles => "candles",
        }
    }
}

/// When the future price path becomes visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealPolicy {
    AfterDecision,
    Progressive,
}

impl RevealPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "after_decision" => Some(RevealPolicy::AfterDecision),
            "progressive" => Some(RevealPolicy::Progressive),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RevealPolicy::AfterDecision => "after_decision",
            RevealPolicy::Progressive => "progressive",
        }
    }
}

/// An order a v2 simulator offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeAction {
    Buy,
    Sell,
    MarketBuy,
    MarketSell,
    LimitBuy,
    LimitSell,
    Skip,
}

impl TradeAction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "buy" => Some(TradeAction::Buy),
            "sell" => Some(TradeAction::Sell),
            "market_buy" => Some(TradeAction::MarketBuy),
            "market_sell" => Some(TradeAction::MarketSell),
            "limit_buy" => Some(TradeAction::LimitBuy),
            "limit_sell" => Some(TradeAction::LimitSell),
            "skip" => Some(TradeAction::Skip),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TradeAction::Buy => "buy",
            TradeAction::Sell => "sell",
            TradeAction::MarketBuy => "market_buy",
            TradeAction::MarketSell => "market_sell",
            TradeAction::LimitBuy => "limit_buy",
            TradeAction::LimitSell => "limit_sell",
            TradeAction::Skip => "skip",
        }
    }

    /// Direction alias used for feedback lookup: `buy`, `sell` or `skip`.
    pub fn alias(self) -> &'static str {
        match self {
            TradeAction::Buy | TradeAction::MarketBuy | TradeAction::LimitBuy => "buy",
            TradeAction::Sell | TradeAction::MarketSell | TradeAction::LimitSell => "sell",
            TradeAction::Skip => "skip",
        }
    }
}
