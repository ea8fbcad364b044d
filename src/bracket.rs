//! Bracket order price synthesis

use rust_decimal::Decimal;

use crate::config::BracketMultipliers;
use crate::types::{BracketOrder, OrderSide};

/// Builds entry orders with take-profit and stop-loss exits around the last price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketOrderBuilder {
    multipliers: BracketMultipliers,
}

impl BracketOrderBuilder {
    pub fn new(multipliers: BracketMultipliers) -> Self {
        Self { multipliers }
    }

    /// Prices are exact decimal products of `last_price`; no rounding is applied.
    /// A zero quantity still produces an order; rejecting it is the caller's job.
    pub fn build(
        &self,
        symbol: &str,
        side: OrderSide,
        last_price: Decimal,
        quantity: u64,
    ) -> BracketOrder {
        let (take_profit, stop_loss) = match side {
            OrderSide::Buy => (self.multipliers.buy_take_profit, self.multipliers.buy_stop_loss),
            OrderSide::Sell => (
                self.multipliers.sell_take_profit,
                self.multipliers.sell_stop_loss,
            ),
        };

        BracketOrder {
            symbol: symbol.to_string(),
            quantity,
            side,
            take_profit_price: last_price * take_profit,
            stop_loss_price: last_price * stop_loss,
        }
    }
}

impl Default for BracketOrderBuilder {
    fn default() -> Self {
        Self::new(BracketMultipliers::default())
    }
}
