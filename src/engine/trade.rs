use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::{Position, PositionSide};

/// Seconds in a day, for holding period conversion.
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Why a position was closed.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The exit rule fired.
    Signal,
    /// The market's observations ran out and the position was force-closed.
    EndOfStream,
}

/// A completed round trip.
///
/// Trades are only produced by the engine. With the `serde` feature they
/// serialize for export but cannot be read back.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    market_id: String,
    side: PositionSide,
    entry_price: f64,
    exit_price: f64,
    entry_time: DateTime<Utc>,
    exit_time: DateTime<Utc>,
    #[cfg_attr(feature = "serde", serde(skip))]
    entry_index: usize,
    shares: f64,
    pnl: f64,
    roi: f64,
    exit_reason: ExitReason,
}

impl Trade {
    pub(crate) fn close(position: Position, exit_price: f64, exit_time: DateTime<Utc>, exit_reason: ExitReason) -> Self {
        let pnl = position.estimate_pnl(exit_price);
        // pnl / (entry_price * shares), without the share count rounding
        let roi = (exit_price - position.entry_price()) / position.entry_price();
        Self {
            pnl,
            roi,
            exit_time,
            exit_price,
            exit_reason,
            side: position.side(),
            shares: position.shares(),
            entry_time: position.entry_time(),
            entry_index: position.entry_index(),
            entry_price: position.entry_price(),
            market_id: position.market_id().to_owned(),
        }
    }

    /// Returns the market identifier.
    pub fn market_id(&self) -> &str {
        &self.market_id
    }

    /// Returns the side traded.
    pub fn side(&self) -> PositionSide {
        self.side
    }

    /// Returns the entry price.
    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    /// Returns the exit price.
    pub fn exit_price(&self) -> f64 {
        self.exit_price
    }

    /// Returns the entry time.
    pub fn entry_time(&self) -> DateTime<Utc> {
        self.entry_time
    }

    /// Returns the exit time.
    pub fn exit_time(&self) -> DateTime<Utc> {
        self.exit_time
    }

    pub(crate) fn entry_index(&self) -> usize {
        self.entry_index
    }

    /// Returns the number of shares.
    pub fn shares(&self) -> f64 {
        self.shares
    }

    /// Returns the realized profit/loss: `(exit - entry) * shares`.
    pub fn pnl(&self) -> f64 {
        self.pnl
    }

    /// Returns the simple return on the cost basis.
    pub fn roi(&self) -> f64 {
        self.roi
    }

    /// Returns why the trade was closed.
    pub fn exit_reason(&self) -> ExitReason {
        self.exit_reason
    }

    /// Returns the holding period in fractional days.
    pub fn holding_days(&self) -> f64 {
        (self.exit_time - self.entry_time).num_seconds() as f64 / SECONDS_PER_DAY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PriceObservation;

    use chrono::Duration;

    #[test]
    fn close_computes_pnl_and_roi() {
        let entry_time = DateTime::from_timestamp_secs(1_700_000_000).unwrap();
        let observation = PriceObservation::from(("M1", entry_time, 0.20));
        let position = Position::open(&observation, PositionSide::Yes, 0, 10.0);
        let trade = Trade::close(position, 0.75, entry_time + Duration::days(3), ExitReason::Signal);

        assert!((trade.pnl() - 27.5).abs() < 1e-9);
        assert!((trade.roi() - 2.75).abs() < 1e-9);
        assert!((trade.holding_days() - 3.0).abs() < 1e-12);
        assert_eq!(trade.exit_reason(), ExitReason::Signal);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn exports_without_replay_index() {
        let entry_time = DateTime::from_timestamp_secs(1_700_000_000).unwrap();
        let observation = PriceObservation::from(("M1", entry_time, 0.20));
        let position = Position::open(&observation, PositionSide::Yes, 7, 10.0);
        let trade = Trade::close(position, 0.75, entry_time + Duration::days(3), ExitReason::EndOfStream);

        let json = serde_json::to_value(&trade).unwrap();
        assert_eq!(json["market_id"], "M1");
        assert_eq!(json["exit_reason"], "end_of_stream");
        assert!(json.get("entry_index").is_none());
    }
}
