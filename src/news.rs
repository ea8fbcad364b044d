//! In-memory headline archive for paper runs and backtests

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::broker::NewsSource;

/// Dated headlines per symbol, returned in date order
#[derive(Debug, Clone, Default)]
pub struct HeadlineArchive {
    items: BTreeMap<(String, NaiveDate), Vec<String>>,
}

impl HeadlineArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, symbol: &str, date: NaiveDate, headline: &str) {
        self.items
            .entry((symbol.to_string(), date))
            .or_default()
            .push(headline.to_string());
    }

    pub fn headlines(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<String> {
        if start > end {
            return Vec::new();
        }
        self.items
            .range((symbol.to_string(), start)..=(symbol.to_string(), end))
            .flat_map(|(_, headlines)| headlines.iter().cloned())
            .collect()
    }
}

#[async_trait]
impl NewsSource for HeadlineArchive {
    async fn get_news(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<String>> {
        Ok(self.headlines(symbol, start, end))
    }
}
