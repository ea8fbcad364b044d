//! Call-recording collaborators for driving the controller without a broker

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use sentiment_trader::{
    BracketOrder, Broker, NewsSource, OrderReceipt, RawSentiment, SentimentOracle, TraderConfig,
    TradingCycleController,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Every collaborator call, in the order the controller made it
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetCash,
    GetLastPrice(String),
    GetDatetime,
    GetNews {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    Classify(usize),
    SubmitOrder(BracketOrder),
    Liquidate(String),
}

/// Shared call log handed to each mock
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> Vec<BracketOrder> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SubmitOrder(order) => Some(order),
                _ => None,
            })
            .collect()
    }

    pub fn liquidations(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Liquidate(_)))
            .count()
    }

    /// Order-relevant calls only (submissions and liquidations)
    pub fn order_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::SubmitOrder(_) | Call::Liquidate(_)))
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Broker with scripted account data and switchable failures
pub struct MockBroker {
    pub cash: Decimal,
    pub last_price: Decimal,
    pub now: DateTime<Utc>,
    pub fail_cash: bool,
    pub fail_submit: bool,
    pub fail_liquidate: bool,
    log: CallLog,
    next_order_id: u64,
}

impl MockBroker {
    pub fn new(cash: i64, last_price: i64, log: CallLog) -> Self {
        Self {
            cash: Decimal::from(cash),
            last_price: Decimal::from(last_price),
            now: Utc.with_ymd_and_hms(2023, 6, 15, 14, 30, 0).unwrap(),
            fail_cash: false,
            fail_submit: false,
            fail_liquidate: false,
            log,
            next_order_id: 1,
        }
    }
}

#[async_trait]
impl Broker for MockBroker {
    async fn get_cash(&self) -> anyhow::Result<Decimal> {
        self.log.push(Call::GetCash);
        if self.fail_cash {
            anyhow::bail!("account endpoint unavailable");
        }
        Ok(self.cash)
    }

    async fn get_last_price(&self, symbol: &str) -> anyhow::Result<Decimal> {
        self.log.push(Call::GetLastPrice(symbol.to_string()));
        Ok(self.last_price)
    }

    async fn get_datetime(&self) -> anyhow::Result<DateTime<Utc>> {
        self.log.push(Call::GetDatetime);
        Ok(self.now)
    }

    async fn submit_order(&mut self, order: &BracketOrder) -> anyhow::Result<OrderReceipt> {
        self.log.push(Call::SubmitOrder(order.clone()));
        if self.fail_submit {
            anyhow::bail!("order rejected: insufficient buying power");
        }
        let order_id = format!("mock-{}", self.next_order_id);
        self.next_order_id += 1;
        Ok(OrderReceipt {
            order_id,
            status: "accepted".to_string(),
        })
    }

    async fn liquidate_position(&mut self, symbol: &str) -> anyhow::Result<()> {
        self.log.push(Call::Liquidate(symbol.to_string()));
        if self.fail_liquidate {
            anyhow::bail!("position close rejected");
        }
        Ok(())
    }
}

/// News source returning the same headlines for any range
pub struct MockNews {
    headlines: Vec<String>,
    fail: bool,
    log: CallLog,
}

impl MockNews {
    pub fn new(headlines: &[&str], log: CallLog) -> Self {
        Self {
            headlines: headlines.iter().map(|h| h.to_string()).collect(),
            fail: false,
            log,
        }
    }

    pub fn failing(log: CallLog) -> Self {
        Self {
            headlines: Vec::new(),
            fail: true,
            log,
        }
    }
}

#[async_trait]
impl NewsSource for MockNews {
    async fn get_news(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<String>> {
        self.log.push(Call::GetNews {
            symbol: symbol.to_string(),
            start,
            end,
        });
        if self.fail {
            anyhow::bail!("news service timed out");
        }
        Ok(self.headlines.clone())
    }
}

/// Classifier that replays scripted readings, repeating the last one
pub struct ScriptedOracle {
    readings: Mutex<VecDeque<RawSentiment>>,
    last: Mutex<Option<RawSentiment>>,
    log: CallLog,
}

impl ScriptedOracle {
    pub fn new(readings: Vec<RawSentiment>, log: CallLog) -> Self {
        Self {
            readings: Mutex::new(readings.into()),
            last: Mutex::new(None),
            log,
        }
    }
}

#[async_trait]
impl SentimentOracle for ScriptedOracle {
    async fn classify(&self, headlines: &[String]) -> anyhow::Result<RawSentiment> {
        self.log.push(Call::Classify(headlines.len()));
        let next = self.readings.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(reading) = next {
            *last = Some(reading);
        }
        last.clone()
            .ok_or_else(|| anyhow::anyhow!("no scripted sentiment"))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn raw(probability: f64, label: &str) -> RawSentiment {
    RawSentiment {
        probability,
        label: label.to_string(),
    }
}

pub type MockController = TradingCycleController<MockBroker, MockNews, ScriptedOracle>;

/// Controller over mocks with the default strategy configuration
pub fn controller(
    cash: i64,
    last_price: i64,
    readings: Vec<RawSentiment>,
) -> (MockController, CallLog) {
    controller_with_config(&TraderConfig::default(), cash, last_price, readings)
}

pub fn controller_with_config(
    config: &TraderConfig,
    cash: i64,
    last_price: i64,
    readings: Vec<RawSentiment>,
) -> (MockController, CallLog) {
    let log = CallLog::default();
    let broker = MockBroker::new(cash, last_price, log.clone());
    let news = MockNews::new(&["Stocks rally as earnings beat estimates"], log.clone());
    let oracle = ScriptedOracle::new(readings, log.clone());
    let controller = TradingCycleController::new(config, broker, news, oracle).unwrap();
    (controller, log)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_oracle_repeats_last() {
        let log = CallLog::default();
        let oracle = ScriptedOracle::new(vec![raw(0.2, "neutral"), raw(0.9, "negative")], log.clone());

        assert_eq!(oracle.classify(&[]).await.unwrap(), raw(0.2, "neutral"));
        assert_eq!(oracle.classify(&[]).await.unwrap(), raw(0.9, "negative"));
        assert_eq!(oracle.classify(&[]).await.unwrap(), raw(0.9, "negative"));
        assert_eq!(log.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_broker_records_failed_submission() {
        let log = CallLog::default();
        let mut broker = MockBroker::new(1_000, 10, log.clone());
        broker.fail_submit = true;

        let order = BracketOrder {
            symbol: "SPY".to_string(),
            quantity: 1,
            side: sentiment_trader::OrderSide::Buy,
            take_profit_price: Decimal::from(12),
            stop_loss_price: Decimal::from(9),
        };
        assert!(broker.submit_order(&order).await.is_err());
        assert_eq!(log.submissions().len(), 1);
    }
}
