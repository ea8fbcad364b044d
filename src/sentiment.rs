//! Sentiment oracles
//!
//! `HttpSentimentOracle` forwards headlines to a classifier service and returns
//! its `{probability, label}` answer untouched. `LexiconSentimentOracle` is an
//! offline keyword classifier for paper runs and backtests.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::broker::SentimentOracle;
use crate::types::{RawSentiment, SentimentLabel};

/// Remote classifier reached over HTTP
pub struct HttpSentimentOracle {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    headlines: &'a [String],
}

impl HttpSentimentOracle {
    pub fn new(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl SentimentOracle for HttpSentimentOracle {
    async fn classify(&self, headlines: &[String]) -> anyhow::Result<RawSentiment> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ClassifyRequest { headlines })
            .send()
            .await
            .with_context(|| format!("POST {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Classifier returned {} - {}", status, text));
        }

        let raw: RawSentiment = response.json().await.context("decoding classifier response")?;
        debug!(
            "Classifier: {} headlines -> {} @ {}",
            headlines.len(),
            raw.label,
            raw.probability
        );
        Ok(raw)
    }

    fn name(&self) -> &str {
        "http"
    }
}

const POSITIVE_WORDS: &[&str] = &[
    "beat", "beats", "surge", "surges", "soar", "soars", "rally", "rallies", "gain",
    "gains", "record", "upgrade", "upgraded", "growth", "strong", "bullish", "profit",
    "outperform", "jump", "jumps", "rise", "rises",
];

const NEGATIVE_WORDS: &[&str] = &[
    "miss", "misses", "plunge", "plunges", "slump", "slumps", "fall", "falls", "drop",
    "drops", "loss", "losses", "downgrade", "downgraded", "weak", "bearish", "recession",
    "lawsuit", "crash", "crashes", "sell-off", "selloff", "cut", "cuts",
];

/// Keyword vote classifier
///
/// Each headline votes positive, negative, or neutral by comparing keyword
/// counts. The label is the majority vote (ties go to neutral) and the
/// probability is the share of headlines that voted for it. No headlines
/// yields neutral with probability 0.
#[derive(Debug, Clone, Default)]
pub struct LexiconSentimentOracle;

impl LexiconSentimentOracle {
    pub fn new() -> Self {
        Self
    }

    fn vote(headline: &str) -> SentimentLabel {
        let lower = headline.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !(c.is_alphanumeric() || c == '-'))
            .filter(|w| !w.is_empty())
            .collect();

        let positive = words.iter().filter(|w| POSITIVE_WORDS.contains(w)).count();
        let negative = words.iter().filter(|w| NEGATIVE_WORDS.contains(w)).count();

        match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => SentimentLabel::Positive,
            std::cmp::Ordering::Less => SentimentLabel::Negative,
            std::cmp::Ordering::Equal => SentimentLabel::Neutral,
        }
    }

    pub fn score(headlines: &[String]) -> RawSentiment {
        if headlines.is_empty() {
            return RawSentiment {
                probability: 0.0,
                label: SentimentLabel::Neutral.to_string(),
            };
        }

        let (mut positive, mut negative, mut neutral) = (0usize, 0usize, 0usize);
        for headline in headlines {
            match Self::vote(headline) {
                SentimentLabel::Positive => positive += 1,
                SentimentLabel::Negative => negative += 1,
                SentimentLabel::Neutral => neutral += 1,
            }
        }

        let (label, votes) = if positive > negative && positive > neutral {
            (SentimentLabel::Positive, positive)
        } else if negative > positive && negative > neutral {
            (SentimentLabel::Negative, negative)
        } else {
            (SentimentLabel::Neutral, neutral)
        };

        RawSentiment {
            probability: votes as f64 / headlines.len() as f64,
            label: label.to_string(),
        }
    }
}

#[async_trait]
impl SentimentOracle for LexiconSentimentOracle {
    async fn classify(&self, headlines: &[String]) -> anyhow::Result<RawSentiment> {
        Ok(Self::score(headlines))
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headlines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_window_is_neutral_zero() {
        let raw = LexiconSentimentOracle::score(&[]);
        assert_eq!(raw.probability, 0.0);
        assert_eq!(raw.label, "neutral");
    }

    #[test]
    fn test_unanimous_positive() {
        let raw = LexiconSentimentOracle::score(&headlines(&[
            "Stocks rally as earnings beat estimates",
            "S&P 500 hits record on strong jobs data",
        ]));
        assert_eq!(raw.label, "positive");
        assert_eq!(raw.probability, 1.0);
    }

    #[test]
    fn test_majority_negative() {
        let raw = LexiconSentimentOracle::score(&headlines(&[
            "Markets plunge on recession fears",
            "Tech shares drop after downgrade",
            "Fed holds rates steady",
            "Retailer misses revenue forecast",
        ]));
        assert_eq!(raw.label, "negative");
        assert_eq!(raw.probability, 0.75);
    }

    #[test]
    fn test_tie_is_neutral() {
        let raw = LexiconSentimentOracle::score(&headlines(&[
            "Shares surge",
            "Shares plunge",
        ]));
        assert_eq!(raw.label, "neutral");
    }

    #[test]
    fn test_http_oracle_builds() {
        let oracle = HttpSentimentOracle::new("http://localhost:8000/classify", Duration::from_secs(5));
        assert!(oracle.is_ok());
        assert_eq!(oracle.unwrap().name(), "http");
    }
}
