//! # PM-BACKTEST: Replay Prediction-Market Strategies
//!
//! **pm-backtest** replays prediction-market price histories (Polymarket, Kalshi, or any
//! source of probability-style prices) against entry and exit rules, and reports
//! trade-level and portfolio-level performance.
//!
//! ## Core Components
//! | Component              | Description                                                                  |
//! |------------------------|------------------------------------------------------------------------------|
//! | **`PriceObservation`** | A `(market_id, timestamp, price)` print, with optional volume and liquidity. |
//! | **`Predicate`**        | Serializable entry/exit rules (thresholds and combinators).                  |
//! | **`PositionSizing`**   | Fraction of the free capital committed to a new position.                    |
//! | **`Trade`**            | A closed round trip with pnl and return.                                     |
//! | **`BacktestEngine`**   | Replays observations, one open position per market at most.                  |
//! | **`PerformanceMetrics`** | Win rate, average return, Sharpe ratio, max drawdown, profit factor.       |
//! | **`Optimizer`**        | Parallel parameter sweeps over rules.                                        |
//!
//! ## Replay Rules
//! - Each market is either FLAT or OPEN.
//! - An OPEN market closes when the exit rule fires; the same observation never re-opens it.
//! - A FLAT market opens when the entry rule fires and sizing commits a non-zero fraction.
//! - Observations must be sorted by time within each market. The engine does not sort.
//! - Positions still open at the end are force-closed at the market's last price by default
//!   ([`config::EndOfStream`]).
//!
//! ## Getting Started
//! ```rust
//! use pm_backtest::prelude::*;
//! use chrono::{DateTime, Duration};
//!
//! let t0 = DateTime::from_timestamp_secs(1_700_000_000).unwrap();
//! let observations = vec![
//!     PriceObservation::from(("M1", t0, 0.20)),
//!     PriceObservation::from(("M1", t0 + Duration::days(1), 0.25)),
//!     PriceObservation::from(("M1", t0 + Duration::days(2), 0.75)),
//! ];
//!
//! // Initialize with $1,000 and buy YES below 30c, sell above 70c
//! let mut engine = BacktestEngine::new(BacktestConfig::default()).unwrap();
//! let trades = engine
//!     .run_strategy(
//!         &observations,
//!         &Predicate::PriceBelow(0.30),
//!         &Predicate::PriceAbove(0.70),
//!         &PositionSizing::Fixed(0.1),
//!     )
//!     .unwrap();
//!
//! assert_eq!(trades.len(), 1);
//!
//! #[cfg(feature = "metrics")]
//! {
//!     let metrics = compute_metrics(&trades);
//!     println!("{metrics}");
//! }
//! ```
//!
//! ## Features
//! | Feature     | Description                                                   |
//! |-------------|---------------------------------------------------------------|
//! | `metrics`   | Performance metrics (default).                                |
//! | `serde`     | Serialize rules, trades and metrics; load JSON price history. |
//! | `optimizer` | Parallel per-market replay and parameter sweeps with `rayon`. |
//!
//! ## Logging
//! The crate emits [`tracing`](https://crates.io/crates/tracing) events: `debug` per
//! position transition, `info` per finished run, `warn` per forced close. Install a
//! subscriber to see them.
//!
//! ## License
//! MIT
#![warn(missing_docs)]

/// Run configuration.
pub mod config;

/// Core replay engine components: observations, rules, positions, trades.
pub mod engine;

/// Error types for the library.
pub mod errors;

/// Utility functions: ordering checks and JSON I/O.
pub mod utils;

/// Performance metrics: win rate, Sharpe ratio, drawdown, etc.
#[cfg(feature = "metrics")]
pub mod metrics;

/// Strategy parameter optimization.
#[cfg(feature = "optimizer")]
pub mod optimizer;

/// Re-exports of commonly used types and traits for convenience.
pub mod prelude {
    pub use super::*;
    pub use crate::config::*;
    pub use crate::engine::*;
    pub use crate::errors::*;

    #[cfg(feature = "metrics")]
    pub use crate::metrics::*;

    #[cfg(feature = "optimizer")]
    pub use crate::optimizer::*;
}
