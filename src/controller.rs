//! Trading cycle controller - one decision per scheduled tick

use chrono::Duration as ChronoDuration;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::bracket::BracketOrderBuilder;
use crate::broker::{Broker, NewsSource, SentimentOracle};
use crate::config::TraderConfig;
use crate::error::{Result, Stage, TraderError};
use crate::position::PositionStateMachine;
use crate::signal::SignalEvaluator;
use crate::sizing::PositionSizer;
use crate::types::{CycleOutcome, Quote, SentimentReading, SkipReason, TradeIntent};

/// Days of headlines fed to the classifier, ending today
pub const NEWS_LOOKBACK_DAYS: i64 = 3;

/// Runs the decision pipeline for a single instrument
pub struct TradingCycleController<B, N, S> {
    symbol: String,
    broker: B,
    news: N,
    oracle: S,
    sizer: PositionSizer,
    evaluator: SignalEvaluator,
    brackets: BracketOrderBuilder,
    position: PositionStateMachine,
    cycle_count: u64,
}

impl<B, N, S> TradingCycleController<B, N, S>
where
    B: Broker,
    N: NewsSource,
    S: SentimentOracle,
{
    pub fn new(config: &TraderConfig, broker: B, news: N, oracle: S) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            symbol: config.strategy.symbol.clone(),
            broker,
            news,
            oracle,
            sizer: PositionSizer::new(config.strategy.risk_fraction)?,
            evaluator: SignalEvaluator::new(config.strategy.confidence_threshold),
            brackets: BracketOrderBuilder::new(config.brackets),
            position: PositionStateMachine::new(),
            cycle_count: 0,
        })
    }

    /// Start from a position state carried over from elsewhere
    pub fn with_position(mut self, position: PositionStateMachine) -> Self {
        self.position = position;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn position(&self) -> PositionStateMachine {
        self.position
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn broker_mut(&mut self) -> &mut B {
        &mut self.broker
    }

    /// Run cycles on a fixed interval until Ctrl-C
    pub async fn run(mut self, every: Duration) -> anyhow::Result<()> {
        info!(
            "Trading {} every {:?} with {} sentiment",
            self.symbol,
            every,
            self.oracle.name()
        );

        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_cycle().await {
                        Ok(outcome) => debug!("Cycle {} outcome: {:?}", self.cycle_count, outcome),
                        Err(e) => error!("Trading cycle error: {}", e),
                    }
                }
                _ = &mut shutdown => {
                    info!(
                        "Shutdown requested after {} cycles, last direction {}",
                        self.cycle_count,
                        self.position.direction()
                    );
                    return Ok(());
                }
            }
        }
    }

    /// Run one cycle: quote, size, sentiment, intent, transition, submit.
    ///
    /// Collaborator failures abort the cycle. Position state only changes for
    /// steps the broker confirmed, so a reversal whose entry fails ends flat.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        self.cycle_count += 1;
        debug!("Cycle {} for {}", self.cycle_count, self.symbol);

        let quote = self.fetch_quote().await?;
        let quantity = self.sizer.size(quote.cash, quote.last_price)?;
        let reading = self.fetch_sentiment().await?;
        let intent = self.evaluator.evaluate(&reading);

        info!(
            "{} | cash {} | last {} | qty {} | sentiment {} @ {:.4} | intent {:?}",
            self.symbol,
            quote.cash,
            quote.last_price,
            quantity,
            reading.label,
            reading.probability,
            intent
        );

        if quote.cash <= quote.last_price || quantity == 0 {
            debug!("Insufficient capital, skipping");
            return Ok(CycleOutcome::Skipped(SkipReason::InsufficientCapital {
                cash: quote.cash,
                last_price: quote.last_price,
                quantity,
            }));
        }

        if intent == TradeIntent::None {
            return Ok(CycleOutcome::Skipped(SkipReason::NoSignal { intent, reading }));
        }

        let transition = self.position.plan(intent);
        let side = match transition.entry {
            Some(side) => side,
            None => {
                debug!("Already {}, no new order", self.position.direction());
                return Ok(CycleOutcome::Skipped(SkipReason::AlreadyPositioned {
                    direction: self.position.direction(),
                }));
            }
        };

        if transition.flatten {
            info!(
                "Flattening {} position in {} before {}",
                self.position.direction(),
                self.symbol,
                side
            );
            self.broker
                .liquidate_position(&self.symbol)
                .await
                .map_err(|e| TraderError::collaborator(Stage::Liquidate, e))?;
            self.position.record_flatten();
        }

        let order = self
            .brackets
            .build(&self.symbol, side, quote.last_price, quantity);

        let receipt = match self.broker.submit_order(&order).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(
                    "{} {} x{} failed, position now {}",
                    side,
                    self.symbol,
                    quantity,
                    self.position.direction()
                );
                return Err(TraderError::collaborator(Stage::SubmitOrder, e));
            }
        };
        self.position.record_entry(side);

        info!(
            "Submitted {} {} x{} | TP {} | SL {} | order {} ({})",
            order.side,
            order.symbol,
            order.quantity,
            order.take_profit_price,
            order.stop_loss_price,
            receipt.order_id,
            receipt.status
        );

        Ok(CycleOutcome::Entered {
            order,
            flattened: transition.flatten,
            receipt,
        })
    }

    async fn fetch_quote(&self) -> Result<Quote> {
        let cash = self
            .broker
            .get_cash()
            .await
            .map_err(|e| TraderError::collaborator(Stage::Cash, e))?;
        let last_price = self
            .broker
            .get_last_price(&self.symbol)
            .await
            .map_err(|e| TraderError::collaborator(Stage::LastPrice, e))?;

        Quote::new(&self.symbol, last_price, cash)
    }

    async fn fetch_sentiment(&self) -> Result<SentimentReading> {
        let now = self
            .broker
            .get_datetime()
            .await
            .map_err(|e| TraderError::collaborator(Stage::Datetime, e))?;
        let end = now.date_naive();
        let start = end - ChronoDuration::days(NEWS_LOOKBACK_DAYS);

        let headlines = self
            .news
            .get_news(&self.symbol, start, end)
            .await
            .map_err(|e| TraderError::collaborator(Stage::News, e))?;
        debug!(
            "{} headlines for {} between {} and {}",
            headlines.len(),
            self.symbol,
            start,
            end
        );

        let raw = self
            .oracle
            .classify(&headlines)
            .await
            .map_err(|e| TraderError::collaborator(Stage::Sentiment, e))?;

        SentimentReading::try_from(raw)
    }
}
