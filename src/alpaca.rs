//! Alpaca REST adapter - account, market data, bracket orders and news

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::broker::{Broker, NewsSource};
use crate::config::{BrokerConfig, TradingMode};
use crate::types::{BracketOrder, OrderReceipt, OrderSide};

const NEWS_PAGE_LIMIT: usize = 50;
const MAX_NEWS_PAGES: usize = 20;

/// Client for the Alpaca trading and market data APIs
pub struct AlpacaClient {
    client: Client,
    trading_url: String,
    data_url: String,
}

impl AlpacaClient {
    /// Create a client for the given trading mode
    pub fn new(config: &BrokerConfig, mode: TradingMode) -> anyhow::Result<Self> {
        Self::with_urls(
            &config.trading_url(mode),
            &config.data_url,
            &config.api_key_id,
            &config.api_secret_key,
            config.request_timeout(),
        )
    }

    pub fn with_urls(
        trading_url: &str,
        data_url: &str,
        key_id: &str,
        secret_key: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apca-api-key-id",
            HeaderValue::from_str(key_id).context("invalid API key id")?,
        );
        let mut secret = HeaderValue::from_str(secret_key).context("invalid API secret")?;
        secret.set_sensitive(true);
        headers.insert("apca-api-secret-key", secret);

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            trading_url: trading_url.trim_end_matches('/').to_string(),
            data_url: data_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> anyhow::Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    async fn fetch_news_page(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        page_token: Option<&str>,
    ) -> anyhow::Result<NewsResponse> {
        let url = format!("{}/v1beta1/news", self.data_url);
        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();
        let limit = NEWS_PAGE_LIMIT.to_string();

        let mut query = vec![
            ("symbols", symbol),
            ("start", start.as_str()),
            ("end", end.as_str()),
            ("limit", limit.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("page_token", token));
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }
}

impl AlpacaClient {
    /// Cancel every open order in `symbol`, bracket legs included
    async fn cancel_open_orders(&self, symbol: &str) -> anyhow::Result<usize> {
        let url = format!("{}/v2/orders", self.trading_url);
        let response = self
            .client
            .get(&url)
            .query(&[("status", "open"), ("symbols", symbol)])
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;
        let response = ensure_success(response).await?;
        let open: Vec<OpenOrder> = response.json().await?;

        for order in &open {
            let cancel_url = format!("{}/v2/orders/{}", self.trading_url, order.id);
            let response = self
                .client
                .delete(&cancel_url)
                .send()
                .await
                .with_context(|| format!("DELETE {}", cancel_url))?;

            // Legs go away with their parent and then report gone or not cancelable
            match response.status() {
                StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
                    debug!("Order {} already closed", order.id);
                }
                _ => {
                    ensure_success(response).await?;
                }
            }
        }

        if !open.is_empty() {
            info!("Cancelled {} open {} orders", open.len(), symbol);
        }
        Ok(open.len())
    }
}

async fn ensure_success(response: Response) -> anyhow::Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().clone();
    let text = response.text().await.unwrap_or_default();
    Err(anyhow!("{} returned {} - {}", url.path(), status, text))
}

#[async_trait]
impl Broker for AlpacaClient {
    async fn get_cash(&self) -> anyhow::Result<Decimal> {
        let account: AccountResponse = self
            .get_json(&format!("{}/v2/account", self.trading_url))
            .await?;
        Ok(account.cash)
    }

    async fn get_last_price(&self, symbol: &str) -> anyhow::Result<Decimal> {
        let latest: LatestTradeResponse = self
            .get_json(&format!("{}/v2/stocks/{}/trades/latest", self.data_url, symbol))
            .await?;
        Ok(latest.trade.price)
    }

    async fn get_datetime(&self) -> anyhow::Result<DateTime<Utc>> {
        let clock: ClockResponse = self
            .get_json(&format!("{}/v2/clock", self.trading_url))
            .await?;
        Ok(clock.timestamp)
    }

    async fn submit_order(&mut self, order: &BracketOrder) -> anyhow::Result<OrderReceipt> {
        let url = format!("{}/v2/orders", self.trading_url);
        let request = OrderRequest::bracket(order);
        debug!("Submitting order {}", request.client_order_id);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("POST {}", url))?;
        let response = ensure_success(response).await?;
        let accepted: OrderResponse = response.json().await?;

        info!("Order {} accepted with status {}", accepted.id, accepted.status);
        Ok(OrderReceipt {
            order_id: accepted.id,
            status: accepted.status,
        })
    }

    async fn liquidate_position(&mut self, symbol: &str) -> anyhow::Result<()> {
        // Open bracket legs hold the shares, so the close is rejected until they go
        self.cancel_open_orders(symbol).await?;

        let url = format!("{}/v2/positions/{}", self.trading_url, symbol);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .with_context(|| format!("DELETE {}", url))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("No open {} position to close", symbol);
            return Ok(());
        }
        ensure_success(response).await?;
        info!("Closed {} position", symbol);
        Ok(())
    }
}

#[async_trait]
impl NewsSource for AlpacaClient {
    async fn get_news(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<String>> {
        let mut headlines = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_NEWS_PAGES {
            let page = self
                .fetch_news_page(symbol, start, end, page_token.as_deref())
                .await?;
            headlines.extend(page.news.into_iter().map(|item| item.headline));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(headlines)
    }
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    cash: Decimal,
}

#[derive(Debug, Deserialize)]
struct ClockResponse {
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct LatestTradeResponse {
    trade: LatestTrade,
}

#[derive(Debug, Deserialize)]
struct LatestTrade {
    #[serde(rename = "p")]
    price: Decimal,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    news: Vec<NewsItem>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsItem {
    headline: String,
}

#[derive(Debug, Serialize)]
struct OrderRequest {
    symbol: String,
    qty: String,
    side: OrderSide,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: &'static str,
    order_class: &'static str,
    take_profit: TakeProfitLeg,
    stop_loss: StopLossLeg,
    client_order_id: String,
}

#[derive(Debug, Serialize)]
struct TakeProfitLeg {
    limit_price: String,
}

#[derive(Debug, Serialize)]
struct StopLossLeg {
    stop_price: String,
}

/// Equity price tick: cents at or above $1, four decimals below
fn to_tick(price: Decimal) -> String {
    let dp = if price >= Decimal::ONE { 2 } else { 4 };
    price.round_dp(dp).to_string()
}

impl OrderRequest {
    fn bracket(order: &BracketOrder) -> Self {
        Self {
            symbol: order.symbol.clone(),
            qty: order.quantity.to_string(),
            side: order.side,
            order_type: "market",
            time_in_force: "gtc",
            order_class: "bracket",
            take_profit: TakeProfitLeg {
                limit_price: to_tick(order.take_profit_price),
            },
            stop_loss: StopLossLeg {
                stop_price: to_tick(order.stop_loss_price),
            },
            client_order_id: Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenOrder {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    status: String,
}
