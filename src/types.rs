//! Core types shared by the decision pipeline and its collaborators

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TraderError;

/// Cash and last trade price for one instrument, read fresh every cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub last_price: Decimal,
    pub cash: Decimal,
}

impl Quote {
    /// Build a quote, rejecting values no broker should ever report
    pub fn new(symbol: &str, last_price: Decimal, cash: Decimal) -> Result<Self, TraderError> {
        if last_price <= Decimal::ZERO {
            return Err(TraderError::InvalidQuote {
                symbol: symbol.to_string(),
                reason: format!("last price must be positive, got {}", last_price),
            });
        }
        if cash < Decimal::ZERO {
            return Err(TraderError::InvalidQuote {
                symbol: symbol.to_string(),
                reason: format!("cash must not be negative, got {}", cash),
            });
        }
        Ok(Self {
            symbol: symbol.to_string(),
            last_price,
            cash,
        })
    }
}

/// Sentiment label produced by a classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentLabel::Positive => write!(f, "positive"),
            SentimentLabel::Negative => write!(f, "negative"),
            SentimentLabel::Neutral => write!(f, "neutral"),
        }
    }
}

impl FromStr for SentimentLabel {
    type Err = TraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(SentimentLabel::Positive),
            "negative" => Ok(SentimentLabel::Negative),
            "neutral" => Ok(SentimentLabel::Neutral),
            other => Err(TraderError::InvalidSentiment(format!(
                "unknown label '{}'",
                other
            ))),
        }
    }
}

/// Unvalidated classifier output as it comes off the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSentiment {
    pub probability: f64,
    pub label: String,
}

/// Validated classifier output: probability in [0, 1] and a known label
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SentimentReading {
    pub probability: f64,
    pub label: SentimentLabel,
}

impl SentimentReading {
    pub fn new(probability: f64, label: SentimentLabel) -> Result<Self, TraderError> {
        // NaN fails both comparisons, so it is rejected here too
        if !(0.0..=1.0).contains(&probability) {
            return Err(TraderError::InvalidSentiment(format!(
                "probability {} outside [0, 1]",
                probability
            )));
        }
        Ok(Self { probability, label })
    }
}

impl TryFrom<RawSentiment> for SentimentReading {
    type Error = TraderError;

    fn try_from(raw: RawSentiment) -> Result<Self, Self::Error> {
        let label = raw.label.parse()?;
        SentimentReading::new(raw.probability, label)
    }
}

/// What the sentiment says to do, before position state is considered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeIntent {
    None,
    OpenLong,
    OpenShort,
}

/// Direction of the last executed entry for an instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    None,
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::None => write!(f, "none"),
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Position direction this side opens
    pub fn direction(self) -> Direction {
        match self {
            OrderSide::Buy => Direction::Long,
            OrderSide::Sell => Direction::Short,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// Market entry with attached take-profit and stop-loss exits
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BracketOrder {
    pub symbol: String,
    pub quantity: u64,
    pub side: OrderSide,
    pub take_profit_price: Decimal,
    pub stop_loss_price: Decimal,
}

/// Acknowledgement returned by a broker for an accepted order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: String,
    pub status: String,
}

/// Why a cycle ended without submitting anything
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    InsufficientCapital {
        cash: Decimal,
        last_price: Decimal,
        quantity: u64,
    },
    NoSignal {
        intent: TradeIntent,
        reading: SentimentReading,
    },
    AlreadyPositioned {
        direction: Direction,
    },
}

/// Result of one completed trading cycle
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Skipped(SkipReason),
    Entered {
        order: BracketOrder,
        flattened: bool,
        receipt: OrderReceipt,
    },
}

impl CycleOutcome {
    pub fn submitted(&self) -> bool {
        matches!(self, CycleOutcome::Entered { .. })
    }
}
