//! Paper broker - simulated fills at the last price
//!
//! Entries fill immediately at the current price. Each position carries the
//! bracket of its latest entry; `advance` moves the clock and price and closes
//! the position at the take-profit or stop-loss level it crosses.

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::broker::Broker;
use crate::types::{BracketOrder, OrderReceipt, OrderSide};

/// Open paper position; negative quantity is a short
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaperPosition {
    pub symbol: String,
    pub quantity: i64,
    pub avg_entry_price: Decimal,
    pub take_profit: Decimal,
    pub stop_loss: Decimal,
}

impl PaperPosition {
    pub fn is_long(&self) -> bool {
        self.quantity > 0
    }

    /// Exit level crossed by `price`, if any
    fn triggered_exit(&self, price: Decimal) -> Option<(Decimal, FillReason)> {
        if self.is_long() {
            if price >= self.take_profit {
                return Some((self.take_profit, FillReason::TakeProfit));
            }
            if price <= self.stop_loss {
                return Some((self.stop_loss, FillReason::StopLoss));
            }
        } else {
            if price <= self.take_profit {
                return Some((self.take_profit, FillReason::TakeProfit));
            }
            if price >= self.stop_loss {
                return Some((self.stop_loss, FillReason::StopLoss));
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FillReason {
    Entry,
    Liquidation,
    TakeProfit,
    StopLoss,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fill {
    pub order_id: String,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u64,
    pub price: Decimal,
    pub reason: FillReason,
}

pub struct PaperBroker {
    cash: Decimal,
    clock: DateTime<Utc>,
    prices: HashMap<String, Decimal>,
    positions: HashMap<String, PaperPosition>,
    fills: Vec<Fill>,
}

impl PaperBroker {
    pub fn new(starting_cash: Decimal, start: DateTime<Utc>) -> Self {
        Self {
            cash: starting_cash,
            clock: start,
            prices: HashMap::new(),
            positions: HashMap::new(),
            fills: Vec::new(),
        }
    }

    /// Set a price without moving the clock or checking exits
    pub fn set_price(&mut self, symbol: &str, price: Decimal) {
        self.prices.insert(symbol.to_string(), price);
    }

    /// Move to `timestamp` with a new `price` for `symbol`, closing a position
    /// whose bracket the price crossed. Returns the exit fill, if any.
    pub fn advance(&mut self, timestamp: DateTime<Utc>, symbol: &str, price: Decimal) -> Option<Fill> {
        self.clock = timestamp;
        self.set_price(symbol, price);

        let (exit_price, reason) = self.positions.get(symbol)?.triggered_exit(price)?;
        let position = self.positions.remove(symbol)?;
        let fill = self.close(position, exit_price, reason);
        info!(
            "Bracket exit {:?}: {} {} x{} @ {}",
            reason, fill.side, fill.symbol, fill.quantity, fill.price
        );
        Some(fill)
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock
    }

    pub fn position(&self, symbol: &str) -> Option<&PaperPosition> {
        self.positions.get(symbol)
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    /// Cash plus marked value of open positions (shorts count as liabilities)
    pub fn equity(&self) -> Decimal {
        let marked: Decimal = self
            .positions
            .values()
            .map(|pos| {
                let price = self
                    .prices
                    .get(&pos.symbol)
                    .copied()
                    .unwrap_or(pos.avg_entry_price);
                Decimal::from(pos.quantity) * price
            })
            .sum();
        self.cash + marked
    }

    fn price(&self, symbol: &str) -> anyhow::Result<Decimal> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| anyhow!("no price for {}", symbol))
    }

    fn close(&mut self, position: PaperPosition, price: Decimal, reason: FillReason) -> Fill {
        let quantity = position.quantity.unsigned_abs();
        // Selling a long credits cash, covering a short debits it
        self.cash += Decimal::from(position.quantity) * price;

        let side = if position.is_long() {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        };
        self.record_fill(&position.symbol, side, quantity, price, reason)
    }

    fn record_fill(
        &mut self,
        symbol: &str,
        side: OrderSide,
        quantity: u64,
        price: Decimal,
        reason: FillReason,
    ) -> Fill {
        let fill = Fill {
            order_id: Uuid::new_v4().to_string(),
            timestamp: self.clock,
            symbol: symbol.to_string(),
            side,
            quantity,
            price,
            reason,
        };
        self.fills.push(fill.clone());
        fill
    }
}

#[async_trait]
impl Broker for PaperBroker {
    async fn get_cash(&self) -> anyhow::Result<Decimal> {
        Ok(self.cash)
    }

    async fn get_last_price(&self, symbol: &str) -> anyhow::Result<Decimal> {
        self.price(symbol)
    }

    async fn get_datetime(&self) -> anyhow::Result<DateTime<Utc>> {
        Ok(self.clock)
    }

    async fn submit_order(&mut self, order: &BracketOrder) -> anyhow::Result<OrderReceipt> {
        if order.quantity == 0 {
            bail!("order quantity must be positive");
        }
        let price = self.price(&order.symbol)?;
        let signed = i64::try_from(order.quantity)
            .with_context(|| format!("quantity {} too large", order.quantity))?;
        let notional = Decimal::from(order.quantity) * price;

        let delta = match order.side {
            OrderSide::Buy => {
                if notional > self.cash {
                    bail!(
                        "insufficient buying power: need {}, have {}",
                        notional,
                        self.cash
                    );
                }
                self.cash -= notional;
                signed
            }
            OrderSide::Sell => {
                self.cash += notional;
                -signed
            }
        };

        let position = self
            .positions
            .entry(order.symbol.clone())
            .or_insert_with(|| PaperPosition {
                symbol: order.symbol.clone(),
                quantity: 0,
                avg_entry_price: price,
                take_profit: order.take_profit_price,
                stop_loss: order.stop_loss_price,
            });

        let old_qty = position.quantity;
        let new_qty = old_qty + delta;
        if old_qty == 0 || old_qty.signum() != new_qty.signum() {
            position.avg_entry_price = price;
        } else if new_qty.abs() > old_qty.abs() {
            let total_cost = Decimal::from(old_qty.abs()) * position.avg_entry_price
                + Decimal::from(delta.abs()) * price;
            position.avg_entry_price = total_cost / Decimal::from(new_qty.abs());
        }
        position.quantity = new_qty;
        position.take_profit = order.take_profit_price;
        position.stop_loss = order.stop_loss_price;

        if new_qty == 0 {
            self.positions.remove(&order.symbol);
        }

        let fill = self.record_fill(
            &order.symbol,
            order.side,
            order.quantity,
            price,
            FillReason::Entry,
        );
        debug!(
            "Paper fill {} {} x{} @ {} | cash {}",
            fill.side, fill.symbol, fill.quantity, fill.price, self.cash
        );

        Ok(OrderReceipt {
            order_id: fill.order_id,
            status: "filled".to_string(),
        })
    }

    async fn liquidate_position(&mut self, symbol: &str) -> anyhow::Result<()> {
        if !self.positions.contains_key(symbol) {
            debug!("No {} position to liquidate", symbol);
            return Ok(());
        }
        let price = self.price(symbol)?;
        if let Some(position) = self.positions.remove(symbol) {
            let fill = self.close(position, price, FillReason::Liquidation);
            info!(
                "Liquidated {} x{} @ {} | cash {}",
                fill.symbol, fill.quantity, fill.price, self.cash
            );
        }
        Ok(())
    }
}
