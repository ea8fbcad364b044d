//! Position sizing under a risk-fraction constraint

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::TraderError;

/// Turns available cash into a whole-unit order quantity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSizer {
    risk_fraction: Decimal,
}

impl PositionSizer {
    /// `risk_fraction` must be in (0, 1]
    pub fn new(risk_fraction: Decimal) -> Result<Self, TraderError> {
        if risk_fraction <= Decimal::ZERO || risk_fraction > Decimal::ONE {
            return Err(TraderError::Config(format!(
                "risk_fraction must be in (0, 1], got {}",
                risk_fraction
            )));
        }
        Ok(Self { risk_fraction })
    }

    pub fn risk_fraction(&self) -> Decimal {
        self.risk_fraction
    }

    /// Quantity to trade: `cash * risk_fraction / last_price` rounded half-to-even.
    ///
    /// A .5 remainder rounds to the even neighbour (2.5 -> 2, 3.5 -> 4). The result
    /// is capped at the number of whole units the cash can actually pay for, so it
    /// never exceeds `floor(cash / last_price)`. Zero is a valid answer meaning the
    /// cash cannot cover a unit.
    pub fn size(&self, cash: Decimal, last_price: Decimal) -> Result<u64, TraderError> {
        if last_price <= Decimal::ZERO {
            return Err(TraderError::InvalidQuote {
                symbol: String::new(),
                reason: format!("last price must be positive, got {}", last_price),
            });
        }
        if cash < Decimal::ZERO {
            return Err(TraderError::InvalidQuote {
                symbol: String::new(),
                reason: format!("cash must not be negative, got {}", cash),
            });
        }

        let out_of_range = || TraderError::InvalidQuote {
            symbol: String::new(),
            reason: format!(
                "quantity for cash {} at price {} is out of range",
                cash, last_price
            ),
        };

        let target = cash
            .checked_mul(self.risk_fraction)
            .and_then(|budget| budget.checked_div(last_price))
            .ok_or_else(out_of_range)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
        let affordable = cash.checked_div(last_price).ok_or_else(out_of_range)?.floor();

        target.min(affordable).to_u64().ok_or_else(out_of_range)
    }
}
