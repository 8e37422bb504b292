//! Performance metrics for backtesting.
//!
//! This module provides tools to calculate, from a trade sequence:
//! - Win rate
//! - Average return
//! - Sharpe ratio (daily-compounded, annualized)
//! - Max drawdown of the compounded return curve
//! - Profit factor
//!
//! It needs the `metrics` feature (enabled by default).

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::Trade;

/// Trading days used to annualize the Sharpe ratio.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Shortest holding period, in days, used when converting a trade return to a daily return.
pub const MIN_HOLDING_DAYS: f64 = 1.0;

// Dispersion below this is treated as zero variance.
const MIN_STDDEV: f64 = 1e-12;

/// Aggregate statistics for a trade sequence.
///
/// An empty sequence gives all-zero values and `profit_factor = None`;
/// check [`is_empty`](Self::is_empty) before interpreting them.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PerformanceMetrics {
    /// Number of trades.
    pub trades: usize,
    /// Share of trades with a positive pnl, in `[0, 1]`.
    pub win_rate: f64,
    /// Mean simple return per trade.
    pub avg_return: f64,
    /// Annualized Sharpe ratio of daily returns, zero risk-free rate.
    pub sharpe: f64,
    /// Worst peak-to-trough decline of the compounded curve, `<= 0`.
    pub max_drawdown: f64,
    /// Sum of trade pnl.
    pub total_pnl: f64,
    /// Gross profit over gross loss. `None` without a losing trade.
    pub profit_factor: Option<f64>,
    /// Mean holding period in days.
    pub avg_holding_days: f64,
}

impl PerformanceMetrics {
    /// Returns `true` when no trade contributed to the metrics.
    pub fn is_empty(&self) -> bool {
        self.trades == 0
    }
}

impl From<&[Trade]> for PerformanceMetrics {
    fn from(trades: &[Trade]) -> Self {
        compute_metrics(trades)
    }
}

/// Computes the performance metrics of `trades`, taken in sequence order.
///
/// ### Example
/// ```rust
/// use pm_backtest::prelude::*;
///
/// let metrics = compute_metrics(&[]);
/// assert!(metrics.is_empty());
/// assert_eq!(metrics.sharpe, 0.0);
/// ```
pub fn compute_metrics(trades: &[Trade]) -> PerformanceMetrics {
    if trades.is_empty() {
        debug!("no trades: metrics are zeroed");
        return PerformanceMetrics::default();
    }

    let count = trades.len() as f64;
    let wins = trades.iter().filter(|t| t.pnl() > 0.0).count();
    let returns = trades.iter().map(Trade::roi).collect::<Vec<_>>();

    let (gross_profit, gross_loss) = trades.iter().fold((0.0, 0.0), |(profit, loss), t| {
        if t.pnl() > 0.0 {
            (profit + t.pnl(), loss)
        } else {
            (profit, loss - t.pnl())
        }
    });

    PerformanceMetrics {
        trades: trades.len(),
        win_rate: wins as f64 / count,
        avg_return: mean(&returns),
        sharpe: sharpe_ratio(trades),
        max_drawdown: max_drawdown(&returns),
        total_pnl: trades.iter().map(Trade::pnl).sum(),
        profit_factor: (gross_loss > 0.0).then(|| gross_profit / gross_loss),
        avg_holding_days: trades.iter().map(Trade::holding_days).sum::<f64>() / count,
    }
}

/// Converts a trade return into the equivalent daily compounded return.
pub fn daily_return(roi: f64, holding_days: f64) -> f64 {
    (1.0 + roi).powf(1.0 / holding_days.max(MIN_HOLDING_DAYS)) - 1.0
}

/// Builds the compounded return curve, starting at `1.0`.
pub fn equity_curve(trades: &[Trade]) -> Vec<f64> {
    let mut curve = Vec::with_capacity(trades.len() + 1);
    curve.push(1.0);
    let mut equity = 1.0;
    for trade in trades {
        equity *= 1.0 + trade.roi();
        curve.push(equity);
    }
    curve
}

fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

fn stddev(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    let var = data.iter().map(|r| (r - m).powi(2)).sum::<f64>() / data.len() as f64;
    var.sqrt()
}

fn sharpe_ratio(trades: &[Trade]) -> f64 {
    let daily = trades
        .iter()
        .map(|t| daily_return(t.roi(), t.holding_days()))
        .collect::<Vec<_>>();
    let sd = stddev(&daily);
    if sd < MIN_STDDEV || !sd.is_finite() {
        return 0.0;
    }
    mean(&daily) / sd * TRADING_DAYS_PER_YEAR.sqrt()
}

fn max_drawdown(returns: &[f64]) -> f64 {
    let mut equity = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut worst = 0.0_f64;

    for roi in returns {
        equity *= 1.0 + roi;
        peak = peak.max(equity);
        if peak > 0.0 {
            worst = worst.min((equity - peak) / peak);
        }
    }

    worst
}

impl fmt::Display for PerformanceMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Backtest Metrics ===")?;
        writeln!(f, "Trades: {}", self.trades)?;
        writeln!(f, "Total P&L: {:.2}", self.total_pnl)?;
        writeln!(f, "Avg Holding: {:.2} days", self.avg_holding_days)?;
        #[allow(clippy::writeln_empty_string)]
        writeln!(f, "")?;
        writeln!(f, "Win Rate: {:.2}%", self.win_rate * 100.0)?;
        writeln!(f, "Avg Return: {:.2}%", self.avg_return * 100.0)?;
        writeln!(f, "Max Drawdown: {:.2}%", self.max_drawdown * 100.0)?;
        match self.profit_factor {
            Some(pf) => writeln!(f, "Profit Factor: {pf:.2}")?,
            None => writeln!(f, "Profit Factor: n/a")?,
        }
        write!(f, "Sharpe Ratio (risk-free rate = 0.0): {:.2}", self.sharpe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    use approx::assert_relative_eq;
    use chrono::{DateTime, Duration};

    /// Runs a single-market replay where each `(entry, exit, days)` leg
    /// becomes one trade.
    fn trades_from_legs(legs: &[(f64, f64, i64)]) -> Vec<Trade> {
        let legs = legs
            .iter()
            .map(|&(entry, exit, days)| (entry, exit, Duration::days(days)))
            .collect::<Vec<_>>();
        trades_from_spans(&legs)
    }

    fn trades_from_spans(legs: &[(f64, f64, Duration)]) -> Vec<Trade> {
        let mut t = DateTime::from_timestamp_secs(1_700_000_000).unwrap();
        let mut observations = Vec::new();
        for &(entry, exit, held) in legs {
            observations.push(PriceObservation::from(("M1", t, entry)));
            t += held;
            observations.push(PriceObservation::from(("M1", t, exit)));
            t += Duration::days(1);
        }
        // alternate entry/exit by position in the stream
        let entries = observations
            .iter()
            .step_by(2)
            .map(|o| (o.timestamp(), o.price()))
            .collect::<Vec<_>>();
        let entry = move |o: &PriceObservation| entries.contains(&(o.timestamp(), o.price()));

        let mut engine = BacktestEngine::new(BacktestConfig::default()).unwrap();
        engine
            .run_strategy(&observations, &entry, &Predicate::Always, &PositionSizing::Fixed(0.1))
            .unwrap()
    }

    #[test]
    fn empty_trades() {
        let metrics = compute_metrics(&[]);
        assert!(metrics.is_empty());
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.avg_return, 0.0);
        assert_eq!(metrics.sharpe, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.profit_factor, None);
    }

    #[test]
    fn win_rate_and_avg_return() {
        let trades = trades_from_legs(&[(0.20, 0.30, 1), (0.50, 0.40, 1)]);
        let metrics = compute_metrics(&trades);
        assert_eq!(metrics.trades, 2);
        assert_relative_eq!(metrics.win_rate, 0.5);
        // (0.5 + -0.2) / 2
        assert_relative_eq!(metrics.avg_return, 0.15, epsilon = 1e-12);
    }

    #[test]
    fn single_trade_has_zero_sharpe() {
        let trades = trades_from_legs(&[(0.20, 0.30, 2)]);
        let metrics = compute_metrics(&trades);
        assert_eq!(metrics.sharpe, 0.0);
        assert_eq!(metrics.profit_factor, None);
    }

    #[test]
    fn identical_returns_have_zero_sharpe() {
        let trades = trades_from_legs(&[(0.20, 0.30, 1), (0.20, 0.30, 1), (0.20, 0.30, 1)]);
        assert_eq!(compute_metrics(&trades).sharpe, 0.0);
    }

    #[test]
    fn sharpe_positive_for_mostly_winning() {
        let trades = trades_from_legs(&[(0.20, 0.30, 1), (0.40, 0.44, 2), (0.50, 0.48, 1)]);
        assert!(compute_metrics(&trades).sharpe > 0.0);
    }

    #[test]
    fn sharpe_annualizes_population_stddev_of_daily_returns() {
        let trades = trades_from_legs(&[(0.20, 0.30, 1), (0.40, 0.44, 2), (0.50, 0.48, 1)]);
        assert_relative_eq!(trades[1].holding_days(), 2.0);

        let daily = [0.5, 1.1_f64.sqrt() - 1.0, -0.04];
        let m = daily.iter().sum::<f64>() / 3.0;
        let sd = (daily.iter().map(|r| (r - m).powi(2)).sum::<f64>() / 3.0).sqrt();
        let expected = m / sd * 252.0_f64.sqrt();

        let sharpe = compute_metrics(&trades).sharpe;
        assert_relative_eq!(sharpe, expected, epsilon = 1e-9);
        assert_relative_eq!(sharpe, 11.39, epsilon = 0.01);
    }

    #[test]
    fn sharpe_floors_short_holds_to_one_day() {
        // 6h and 12h holds compound as full days: daily returns equal roi
        let trades = trades_from_spans(&[(0.20, 0.30, Duration::hours(6)), (0.50, 0.40, Duration::hours(12))]);
        assert!(trades.iter().all(|t| t.holding_days() < MIN_HOLDING_DAYS));

        // mean 0.15, population sd 0.35
        let expected = 0.15 / 0.35 * 252.0_f64.sqrt();
        assert_relative_eq!(compute_metrics(&trades).sharpe, expected, epsilon = 1e-9);
    }

    #[test]
    fn max_drawdown_from_compounded_curve() {
        // +50%, -50%, +10%: curve 1.0, 1.5, 0.75, 0.825 -> peak 1.5, trough 0.75
        let trades = trades_from_legs(&[(0.20, 0.30, 1), (0.60, 0.30, 1), (0.50, 0.55, 1)]);
        let metrics = compute_metrics(&trades);
        assert_relative_eq!(metrics.max_drawdown, -0.5, epsilon = 1e-9);
    }

    #[test]
    fn max_drawdown_zero_without_losses() {
        let trades = trades_from_legs(&[(0.20, 0.30, 1), (0.30, 0.35, 1)]);
        assert_eq!(compute_metrics(&trades).max_drawdown, 0.0);
    }

    #[test]
    fn profit_factor() {
        let trades = trades_from_legs(&[(0.20, 0.40, 1), (0.50, 0.40, 1)]);
        let metrics = compute_metrics(&trades);
        let gains = trades[0].pnl();
        let losses = -trades[1].pnl();
        assert_relative_eq!(metrics.profit_factor.unwrap(), gains / losses, epsilon = 1e-12);
    }

    #[test]
    fn daily_return_compounding() {
        // 21% over two days is 10% per day
        assert_relative_eq!(daily_return(0.21, 2.0), 0.1, epsilon = 1e-12);
        // intraday holds count as one day
        assert_relative_eq!(daily_return(0.05, 0.25), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn equity_curve_compounds() {
        let trades = trades_from_legs(&[(0.20, 0.30, 1), (0.60, 0.30, 1)]);
        let curve = equity_curve(&trades);
        assert_eq!(curve.len(), 3);
        assert_relative_eq!(curve[2], 0.75, epsilon = 1e-12);
    }

    #[test]
    fn display_report() {
        let trades = trades_from_legs(&[(0.20, 0.30, 1)]);
        let report = compute_metrics(&trades).to_string();
        assert!(report.starts_with("=== Backtest Metrics ==="));
        assert!(report.contains("Win Rate: 100.00%"));
        assert!(report.contains("Profit Factor: n/a"));
    }
}
