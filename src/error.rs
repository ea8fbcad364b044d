//! Error types for the trading cycle

use std::fmt;

/// Collaborator call that failed during a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Cash,
    LastPrice,
    Datetime,
    News,
    Sentiment,
    Liquidate,
    SubmitOrder,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Cash => "cash lookup",
            Stage::LastPrice => "last price lookup",
            Stage::Datetime => "datetime lookup",
            Stage::News => "news fetch",
            Stage::Sentiment => "sentiment classification",
            Stage::Liquidate => "liquidation",
            Stage::SubmitOrder => "order submission",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TraderError {
    #[error("{stage} failed: {message}")]
    Collaborator { stage: Stage, message: String },

    #[error("invalid sentiment output: {0}")]
    InvalidSentiment(String),

    #[error("invalid quote for {symbol}: {reason}")]
    InvalidQuote { symbol: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TraderError {
    /// Wrap an adapter error, keeping the full context chain in the message
    pub fn collaborator(stage: Stage, err: anyhow::Error) -> Self {
        TraderError::Collaborator {
            stage,
            message: format!("{:#}", err),
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            TraderError::Collaborator { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for TraderError {
    fn from(err: config::ConfigError) -> Self {
        TraderError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TraderError>;
