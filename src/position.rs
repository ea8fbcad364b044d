//! Per-instrument position state machine
//!
//! Tracks the direction of the last executed entry. A reversal is a two-step
//! protocol: liquidate, then enter. Each step is recorded only after the broker
//! confirms it, so the state always reflects what actually executed.

use tracing::debug;

use crate::types::{Direction, OrderSide, TradeIntent};

/// Steps required to act on an intent from the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Liquidate the current holding before entering
    pub flatten: bool,
    /// New entry to submit, if any
    pub entry: Option<OrderSide>,
}

impl Transition {
    pub const HOLD: Transition = Transition {
        flatten: false,
        entry: None,
    };

    pub fn is_hold(&self) -> bool {
        !self.flatten && self.entry.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionStateMachine {
    last_direction: Direction,
}

impl PositionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a previously owned state
    pub fn with_direction(direction: Direction) -> Self {
        Self {
            last_direction: direction,
        }
    }

    pub fn direction(&self) -> Direction {
        self.last_direction
    }

    /// Decide what to do for an intent without changing state
    pub fn plan(&self, intent: TradeIntent) -> Transition {
        match (self.last_direction, intent) {
            (_, TradeIntent::None) => Transition::HOLD,
            (Direction::Long, TradeIntent::OpenLong) => Transition::HOLD,
            (Direction::Short, TradeIntent::OpenShort) => Transition::HOLD,
            (Direction::None, TradeIntent::OpenLong) => Transition {
                flatten: false,
                entry: Some(OrderSide::Buy),
            },
            (Direction::None, TradeIntent::OpenShort) => Transition {
                flatten: false,
                entry: Some(OrderSide::Sell),
            },
            (Direction::Short, TradeIntent::OpenLong) => Transition {
                flatten: true,
                entry: Some(OrderSide::Buy),
            },
            (Direction::Long, TradeIntent::OpenShort) => Transition {
                flatten: true,
                entry: Some(OrderSide::Sell),
            },
        }
    }

    /// Record a confirmed liquidation
    pub fn record_flatten(&mut self) {
        debug!("Position state: {} -> none (flattened)", self.last_direction);
        self.last_direction = Direction::None;
    }

    /// Record a confirmed entry
    pub fn record_entry(&mut self, side: OrderSide) {
        let next = side.direction();
        debug!("Position state: {} -> {}", self.last_direction, next);
        self.last_direction = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        let cases = [
            (Direction::None, TradeIntent::OpenLong, false, Some(OrderSide::Buy)),
            (Direction::None, TradeIntent::OpenShort, false, Some(OrderSide::Sell)),
            (Direction::None, TradeIntent::None, false, None),
            (Direction::Long, TradeIntent::OpenLong, false, None),
            (Direction::Long, TradeIntent::OpenShort, true, Some(OrderSide::Sell)),
            (Direction::Long, TradeIntent::None, false, None),
            (Direction::Short, TradeIntent::OpenLong, true, Some(OrderSide::Buy)),
            (Direction::Short, TradeIntent::OpenShort, false, None),
            (Direction::Short, TradeIntent::None, false, None),
        ];

        for (state, intent, flatten, entry) in cases {
            let machine = PositionStateMachine::with_direction(state);
            let transition = machine.plan(intent);
            assert_eq!(transition.flatten, flatten, "{:?} + {:?}", state, intent);
            assert_eq!(transition.entry, entry, "{:?} + {:?}", state, intent);
        }
    }

    #[test]
    fn test_plan_does_not_mutate() {
        let machine = PositionStateMachine::new();
        let _ = machine.plan(TradeIntent::OpenLong);
        assert_eq!(machine.direction(), Direction::None);
    }

    #[test]
    fn test_reversal_recording() {
        let mut machine = PositionStateMachine::with_direction(Direction::Long);
        let transition = machine.plan(TradeIntent::OpenShort);
        assert!(transition.flatten);

        machine.record_flatten();
        assert_eq!(machine.direction(), Direction::None);

        machine.record_entry(OrderSide::Sell);
        assert_eq!(machine.direction(), Direction::Short);
    }

    #[test]
    fn test_hold() {
        assert!(Transition::HOLD.is_hold());
        let machine = PositionStateMachine::with_direction(Direction::Short);
        assert!(machine.plan(TradeIntent::OpenShort).is_hold());
    }
}
