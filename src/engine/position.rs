use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::PriceObservation;

/// Which outcome token a position holds.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PositionSide {
    /// Long the YES token: profits when the observed price rises.
    #[default]
    Yes,
    /// Long the NO token, priced at `1 - price`: profits when the observed price falls.
    No,
}

impl PositionSide {
    /// Returns the price paid or received for this side's token.
    pub fn trade_price(&self, observation: &PriceObservation) -> f64 {
        match self {
            Self::Yes => observation.price(),
            Self::No => 1.0 - observation.price(),
        }
    }
}

/// An open simulated position.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    market_id: String,
    side: PositionSide,
    entry_price: f64,
    entry_time: DateTime<Utc>,
    entry_index: usize,
    shares: f64,
    cost: f64,
}

impl Position {
    /// Opens a position committing `cost` at the side's trade price.
    /// The caller guarantees a positive trade price.
    pub(crate) fn open(observation: &PriceObservation, side: PositionSide, entry_index: usize, cost: f64) -> Self {
        let entry_price = side.trade_price(observation);
        Self {
            side,
            cost,
            entry_price,
            entry_index,
            shares: cost / entry_price,
            entry_time: observation.timestamp(),
            market_id: observation.market_id().to_owned(),
        }
    }

    /// Returns the market identifier.
    pub fn market_id(&self) -> &str {
        &self.market_id
    }

    /// Returns the side.
    pub fn side(&self) -> PositionSide {
        self.side
    }

    /// Returns the price paid per share.
    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    /// Returns the entry time.
    pub fn entry_time(&self) -> DateTime<Utc> {
        self.entry_time
    }

    /// Returns the index of the observation that opened the position.
    pub fn entry_index(&self) -> usize {
        self.entry_index
    }

    /// Returns the number of shares held.
    pub fn shares(&self) -> f64 {
        self.shares
    }

    /// Returns the capital committed to the position.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Estimates the profit/loss if the position is closed at `exit_price`.
    pub fn estimate_pnl(&self, exit_price: f64) -> f64 {
        (exit_price - self.entry_price) * self.shares
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::DateTime;

    #[test]
    fn no_side_uses_complement_price() {
        let observation = PriceObservation::from(("M1", DateTime::default(), 0.8));
        let position = Position::open(&observation, PositionSide::No, 0, 2.0);
        assert!((position.entry_price() - 0.2).abs() < 1e-12);
        assert!((position.shares() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn estimate_pnl_long_yes() {
        let observation = PriceObservation::from(("M1", DateTime::default(), 0.4));
        let position = Position::open(&observation, PositionSide::Yes, 3, 40.0);
        assert!((position.estimate_pnl(0.5) - 10.0).abs() < 1e-9);
        assert!((position.estimate_pnl(0.3) + 10.0).abs() < 1e-9);
        assert_eq!(position.entry_index(), 3);
    }
}
