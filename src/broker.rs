//! Collaborator boundaries consumed by the trading cycle
//!
//! Every call is awaited to completion before the cycle moves on; implementations
//! report failure through `anyhow::Result` and the controller tags it with the
//! stage that failed.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::types::{BracketOrder, OrderReceipt, RawSentiment};

/// Account, market data and order entry
#[async_trait]
pub trait Broker: Send + Sync {
    async fn get_cash(&self) -> anyhow::Result<Decimal>;

    async fn get_last_price(&self, symbol: &str) -> anyhow::Result<Decimal>;

    async fn get_datetime(&self) -> anyhow::Result<DateTime<Utc>>;

    /// Returns only once the broker has accepted or rejected the order
    async fn submit_order(&mut self, order: &BracketOrder) -> anyhow::Result<OrderReceipt>;

    /// Close the entire holding in `symbol` at market; succeeds when already flat
    async fn liquidate_position(&mut self, symbol: &str) -> anyhow::Result<()>;
}

/// Headline lookup for a symbol over an inclusive date range
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn get_news(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<String>>;
}

/// Opaque headline classifier
#[async_trait]
pub trait SentimentOracle: Send + Sync {
    async fn classify(&self, headlines: &[String]) -> anyhow::Result<RawSentiment>;

    fn name(&self) -> &str;
}

#[async_trait]
impl<T: SentimentOracle + ?Sized> SentimentOracle for Box<T> {
    async fn classify(&self, headlines: &[String]) -> anyhow::Result<RawSentiment> {
        (**self).classify(headlines).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
