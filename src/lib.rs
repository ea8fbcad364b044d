//! Sentiment Trader Library
//!
//! News-sentiment driven decision engine for a single instrument: sizes a
//! position from available cash, turns a headline sentiment reading into an
//! intent, and submits bracket orders while tracking the open direction.

pub mod alpaca;
pub mod backtest;
pub mod bracket;
pub mod broker;
pub mod config;
pub mod controller;
pub mod error;
pub mod news;
pub mod paper;
pub mod position;
pub mod sentiment;
pub mod signal;
pub mod sizing;
pub mod types;


// Re-export main types for convenience
pub use alpaca::AlpacaClient;
pub use backtest::{BacktestReport, Bar};
pub use bracket::BracketOrderBuilder;
pub use broker::{Broker, NewsSource, SentimentOracle};
pub use config::{BracketMultipliers, BrokerConfig, StrategyConfig, TraderConfig, TradingMode};
pub use controller::{TradingCycleController, NEWS_LOOKBACK_DAYS};
pub use error::{Stage, TraderError};
pub use news::HeadlineArchive;
pub use paper::PaperBroker;
pub use position::{PositionStateMachine, Transition};
pub use sentiment::{HttpSentimentOracle, LexiconSentimentOracle};
pub use signal::SignalEvaluator;
pub use sizing::PositionSizer;
pub use types::{
    BracketOrder, CycleOutcome, Direction, OrderReceipt, OrderSide, Quote, RawSentiment,
    SentimentLabel, SentimentReading, SkipReason, TradeIntent,
};
