//! Core replay engine components.
//!
//! This module provides the fundamental types for backtesting:
//! - `PriceObservation`: a price print for one market.
//! - `Predicate` / `PositionSizing`: entry, exit and sizing rules.
//! - `Position`: an open simulated position.
//! - `Trade`: a closed round trip.
//! - `Wallet`: the capital pool positions are sized against.
//! - `BacktestEngine`: replays observations and produces trades.

mod observation;
mod position;
mod rules;
mod trade;
mod wallet;


use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{BacktestConfig, EndOfStream};
use crate::errors::{Error, Result};

pub use observation::*;
pub use position::*;
pub use rules::*;
pub use trade::*;
pub use wallet::*;

/// A state transition of one market, recorded in replay order.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// FLAT -> OPEN.
    Opened {
        /// Market identifier.
        market_id: String,
        /// Observation time.
        datetime: DateTime<Utc>,
        /// Entry price of the traded side.
        price: f64,
    },
    /// OPEN -> FLAT, a trade was emitted.
    Closed {
        /// Market identifier.
        market_id: String,
        /// Observation time.
        datetime: DateTime<Utc>,
        /// Exit price of the traded side.
        price: f64,
        /// Why the position closed.
        reason: ExitReason,
    },
    /// OPEN -> FLAT at end of stream, no trade emitted.
    Discarded {
        /// Market identifier.
        market_id: String,
        /// Time of the market's last observation.
        datetime: DateTime<Utc>,
    },
}

impl Event {
    /// Returns the market the transition belongs to.
    pub fn market_id(&self) -> &str {
        match self {
            Self::Opened { market_id, .. } | Self::Closed { market_id, .. } | Self::Discarded { market_id, .. } => {
                market_id
            }
        }
    }
}

/// Per-market replay state.
#[derive(Default)]
struct MarketState<'a> {
    position: Option<Position>,
    last: Option<(usize, &'a PriceObservation)>,
}

/// Replays price observations against entry/exit rules.
///
/// Observations must be sorted ascending by timestamp within each market.
/// The engine never sorts: unsorted input is a caller error and yields
/// unspecified trades. See [`crate::utils::is_time_ordered`].
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: BacktestConfig,
    wallet: Wallet,
    events: Vec<Event>,
}

impl std::ops::Deref for BacktestEngine {
    type Target = Wallet;

    fn deref(&self) -> &Self::Target {
        &self.wallet
    }
}

impl BacktestEngine {
    /// Creates a new engine.
    ///
    /// ### Returns
    /// The engine, or an error if the starting capital is not positive.
    ///
    /// ### Example
    /// ```rust
    /// use pm_backtest::prelude::*;
    ///
    /// let engine = BacktestEngine::new(BacktestConfig::default().initial_capital(500.0)).unwrap();
    /// assert_eq!(engine.capital(), 500.0);
    /// ```
    pub fn new(config: BacktestConfig) -> Result<Self> {
        config.validate()?;
        let wallet = Wallet::new(config.initial_capital)?;
        Ok(Self {
            config,
            wallet,
            events: Vec::new(),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Returns the state transitions recorded by the last run.
    pub fn events(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Replays `observations` and returns the completed trades in entry order.
    ///
    /// For each observation, an open market closes when `exit_rule` fires; a
    /// flat market opens when `entry_rule` fires and `position_sizing` returns
    /// a non-zero fraction of the free capital. A market makes at most one
    /// transition per observation, so an exit is never followed by a re-entry
    /// on the same print.
    ///
    /// Every run starts from the configured capital. A failed run leaves the
    /// engine reset, with no recorded transitions.
    ///
    /// ### Returns
    /// The trades, or an error if a price is non-finite, a sizing fraction
    /// falls outside `[0, 1]`, or the observation limit is exceeded.
    ///
    /// ### Example
    /// ```rust
    /// use pm_backtest::prelude::*;
    /// use chrono::{DateTime, Duration};
    ///
    /// let t0 = DateTime::from_timestamp_secs(1_700_000_000).unwrap();
    /// let observations = vec![
    ///     PriceObservation::from(("M1", t0, 0.20)),
    ///     PriceObservation::from(("M1", t0 + Duration::days(1), 0.25)),
    ///     PriceObservation::from(("M1", t0 + Duration::days(2), 0.75)),
    /// ];
    ///
    /// let mut engine = BacktestEngine::new(BacktestConfig::default()).unwrap();
    /// let trades = engine
    ///     .run_strategy(
    ///         &observations,
    ///         &Predicate::PriceBelow(0.30),
    ///         &Predicate::PriceAbove(0.70),
    ///         &PositionSizing::Fixed(0.1),
    ///     )
    ///     .unwrap();
    ///
    /// assert_eq!(trades.len(), 1);
    /// assert!((trades[0].roi() - 2.75).abs() < 1e-9);
    /// ```
    pub fn run_strategy<E, X, S>(
        &mut self,
        observations: &[PriceObservation],
        entry_rule: &E,
        exit_rule: &X,
        position_sizing: &S,
    ) -> Result<Vec<Trade>>
    where
        E: Rule + ?Sized,
        X: Rule + ?Sized,
        S: Sizing + ?Sized,
    {
        self.check_limit(observations.len())?;
        self.replay(observations.iter().enumerate(), entry_rule, exit_rule, position_sizing)
    }

    /// Validates `rules` and replays `observations` with them.
    pub fn run_rule_set(&mut self, observations: &[PriceObservation], rules: &RuleSet) -> Result<Vec<Trade>> {
        rules.validate()?;
        self.run_strategy(observations, &rules.entry, &rules.exit, &rules.sizing)
    }

    /// Same as [`run_strategy`](Self::run_strategy), with markets replayed on
    /// worker threads.
    ///
    /// Each market gets its own capital pool seeded with the configured
    /// capital, so sizing never sees another market's positions. Trades are
    /// returned in entry order. Transitions are not recorded.
    #[cfg(feature = "optimizer")]
    pub fn run_strategy_par<E, X, S>(
        &self,
        observations: &[PriceObservation],
        entry_rule: &E,
        exit_rule: &X,
        position_sizing: &S,
    ) -> Result<Vec<Trade>>
    where
        E: Rule + Sync + ?Sized,
        X: Rule + Sync + ?Sized,
        S: Sizing + Sync + ?Sized,
    {
        use rayon::prelude::*;

        self.check_limit(observations.len())?;
        let markets = crate::utils::partition_by_market(observations);

        let mut trades = markets
            .par_iter()
            .map(|market| {
                let mut engine = Self::new(self.config.clone())?;
                engine.replay(market.iter().copied(), entry_rule, exit_rule, position_sizing)
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();

        trades.sort_by_key(Trade::entry_index);
        Ok(trades)
    }

    /// Resets the engine to its starting capital.
    pub fn reset(&mut self) {
        self.wallet.reset();
        self.events = Vec::new();
    }

    fn check_limit(&self, len: usize) -> Result<()> {
        if let Some(limit) = self.config.max_observations
            && len > limit
        {
            return Err(Error::IterationLimit(limit));
        }
        Ok(())
    }

    fn replay<'a, I, E, X, S>(&mut self, observations: I, entry_rule: &E, exit_rule: &X, position_sizing: &S) -> Result<Vec<Trade>>
    where
        I: IntoIterator<Item = (usize, &'a PriceObservation)>,
        E: Rule + ?Sized,
        X: Rule + ?Sized,
        S: Sizing + ?Sized,
    {
        self.reset();
        let mut markets: BTreeMap<&'a str, MarketState<'a>> = BTreeMap::new();
        let mut trades = Vec::new();
        let mut count = 0usize;

        for (index, observation) in observations {
            count += 1;
            let price = observation.price();
            if !price.is_finite() {
                return self.abort(Error::NonFinitePrice {
                    market_id: observation.market_id().to_owned(),
                    price,
                });
            }

            let state = markets.entry(observation.market_id()).or_default();
            state.last = Some((index, observation));

            match state.position.take() {
                Some(position) => {
                    if exit_rule.evaluate(observation) {
                        trades.push(self.close_position(position, observation, ExitReason::Signal));
                    } else {
                        state.position = Some(position);
                    }
                }
                None => {
                    if entry_rule.evaluate(observation) {
                        state.position = match self.open_position(index, observation, position_sizing) {
                            Ok(position) => position,
                            Err(err) => return self.abort(err),
                        };
                    }
                }
            }
        }

        for state in markets.into_values() {
            let Some(position) = state.position else {
                continue;
            };
            match (self.config.end_of_stream, state.last) {
                (EndOfStream::ForceClose, Some((index, last))) if index > position.entry_index() => {
                    warn!(
                        market_id = %position.market_id(),
                        price = last.price(),
                        "force-closing position at end of stream"
                    );
                    trades.push(self.close_position(position, last, ExitReason::EndOfStream));
                }
                (_, last) => {
                    let datetime = last.map_or(position.entry_time(), |(_, o)| o.timestamp());
                    self.discard_position(position, datetime);
                }
            }
        }

        trades.sort_by_key(Trade::entry_index);
        info!(
            observations = count,
            trades = trades.len(),
            capital = self.wallet.capital(),
            pnl = self.wallet.realized_pnl(),
            "backtest finished"
        );
        Ok(trades)
    }

    /// Drops a half-finished run so the wallet and event log read as fresh.
    fn abort<T>(&mut self, err: Error) -> Result<T> {
        warn!(error = %err, "backtest aborted");
        self.reset();
        Err(err)
    }

    /// Opens a position, or returns `None` when sizing commits nothing.
    fn open_position<S>(&mut self, index: usize, observation: &PriceObservation, sizing: &S) -> Result<Option<Position>>
    where
        S: Sizing + ?Sized,
    {
        let side = self.config.side;
        let entry_price = side.trade_price(observation);
        if entry_price <= 0.0 {
            debug!(market_id = %observation.market_id(), entry_price, "entry skipped: no positive price");
            return Ok(None);
        }

        let free = self.wallet.free_capital();
        let fraction = sizing.fraction(observation, free);
        if !(0.0..=1.0).contains(&fraction) {
            return Err(Error::InvalidPositionSize(fraction));
        }
        if fraction == 0.0 || free <= 0.0 {
            debug!(market_id = %observation.market_id(), fraction, free, "entry skipped: nothing to commit");
            return Ok(None);
        }

        let cost = self.wallet.commit(fraction)?;
        let position = Position::open(observation, side, index, cost);
        debug!(
            market_id = %position.market_id(),
            price = entry_price,
            shares = position.shares(),
            cost,
            "position opened"
        );
        self.events.push(Event::Opened {
            market_id: position.market_id().to_owned(),
            datetime: position.entry_time(),
            price: entry_price,
        });
        Ok(Some(position))
    }

    /// Closes a position at `observation` and settles it.
    fn close_position(&mut self, position: Position, observation: &PriceObservation, reason: ExitReason) -> Trade {
        let exit_price = position.side().trade_price(observation);
        let cost = position.cost();
        let trade = Trade::close(position, exit_price, observation.timestamp(), reason);
        self.wallet.settle(cost, trade.pnl());
        debug!(
            market_id = %trade.market_id(),
            price = exit_price,
            pnl = trade.pnl(),
            roi = trade.roi(),
            ?reason,
            "position closed"
        );
        self.events.push(Event::Closed {
            market_id: trade.market_id().to_owned(),
            datetime: trade.exit_time(),
            price: exit_price,
            reason,
        });
        trade
    }

    fn discard_position(&mut self, position: Position, datetime: DateTime<Utc>) {
        self.wallet.release(position.cost());
        debug!(market_id = %position.market_id(), "open position discarded at end of stream");
        self.events.push(Event::Discarded {
            market_id: position.market_id().to_owned(),
            datetime,
        });
    }
}
