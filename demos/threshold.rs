//! # Buy-the-Dip Threshold Strategy
//!
//! Buys YES when a market trades below 30c on real volume, and sells once it
//! recovers above 60c or collapses below 10c.
mod utils;

use std::error::Error;

use pm_backtest::prelude::*;

fn main() -> std::result::Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let observations = utils::example_observations();
    let config = BacktestConfig::default().initial_capital(1_000.0);
    let mut engine = BacktestEngine::new(config)?;

    let entry = Predicate::PriceBelow(0.30).and(Predicate::VolumeAbove(1_200.0));
    let exit = Predicate::PriceAbove(0.60).or(Predicate::PriceBelow(0.10));
    // 5% of free capital, never more than $50 per position
    let sizing = |_: &PriceObservation, capital: f64| (50.0 / capital).min(0.05);

    let trades = engine.run_strategy(&observations, &entry, &exit, &sizing)?;

    println!("observations {}", observations.len());
    println!("trades {}", trades.len());
    for trade in trades.iter().take(5) {
        println!(
            "{:>14} {:.3} -> {:.3} ({:+.2}%) {:?}",
            trade.market_id(),
            trade.entry_price(),
            trade.exit_price(),
            trade.roi() * 100.0,
            trade.exit_reason()
        );
    }

    let capital = engine.capital();
    println!("capital {capital:.2} (start {:.2})", engine.initial_capital());

    #[cfg(feature = "metrics")]
    {
        let metrics = compute_metrics(&trades);
        println!("\n{metrics}");
    }

    #[cfg(feature = "serde")]
    {
        pm_backtest::utils::write_json("threshold_trades.json", &trades)?;
    }

    Ok(())
}
