//! Sentiment to trade intent mapping

use tracing::debug;

use crate::types::{SentimentLabel, SentimentReading, TradeIntent};

/// Maps a sentiment reading to an intent using a fixed confidence threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalEvaluator {
    threshold: f64,
}

impl SignalEvaluator {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// The probability must be strictly greater than the threshold; a reading
    /// exactly at the threshold is not acted on. Assumes probability in [0, 1].
    pub fn evaluate(&self, reading: &SentimentReading) -> TradeIntent {
        let intent = evaluate(reading.probability, reading.label, self.threshold);
        debug!(
            "Sentiment {} @ {:.4} vs threshold {} -> {:?}",
            reading.label, reading.probability, self.threshold, intent
        );
        intent
    }
}

pub fn evaluate(probability: f64, label: SentimentLabel, threshold: f64) -> TradeIntent {
    if probability <= threshold {
        return TradeIntent::None;
    }
    match label {
        SentimentLabel::Positive => TradeIntent::OpenLong,
        SentimentLabel::Negative => TradeIntent::OpenShort,
        SentimentLabel::Neutral => TradeIntent::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABELS: [SentimentLabel; 3] = [
        SentimentLabel::Positive,
        SentimentLabel::Negative,
        SentimentLabel::Neutral,
    ];

    #[test]
    fn test_threshold_is_exclusive() {
        for label in LABELS {
            assert_eq!(evaluate(0.999, label, 0.999), TradeIntent::None);
            assert_eq!(evaluate(0.5, label, 0.999), TradeIntent::None);
            assert_eq!(evaluate(0.0, label, 0.0), TradeIntent::None);
        }
    }

    #[test]
    fn test_confident_labels() {
        assert_eq!(
            evaluate(0.9995, SentimentLabel::Positive, 0.999),
            TradeIntent::OpenLong
        );
        assert_eq!(
            evaluate(0.9995, SentimentLabel::Negative, 0.999),
            TradeIntent::OpenShort
        );
        assert_eq!(
            evaluate(0.9995, SentimentLabel::Neutral, 0.999),
            TradeIntent::None
        );
    }

    #[test]
    fn test_evaluator_uses_reading() {
        let evaluator = SignalEvaluator::new(0.9);
        let reading = SentimentReading::new(0.95, SentimentLabel::Negative).unwrap();
        assert_eq!(evaluator.evaluate(&reading), TradeIntent::OpenShort);
        assert_eq!(evaluator.threshold(), 0.9);
    }
}
