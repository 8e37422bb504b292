//! # Fade the Favorite (NO side)
//!
//! Buys NO when YES looks overpriced above 75c and exits once YES falls back
//! below 50c. Positions still open at the end are dropped instead of marked.
mod utils;

use std::error::Error;

use pm_backtest::prelude::*;

fn main() -> std::result::Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let observations = utils::example_observations();
    let config = BacktestConfig::default()
        .initial_capital(2_000.0)
        .side(PositionSide::No)
        .end_of_stream(EndOfStream::Discard);

    let rules = RuleSet::new(
        Predicate::PriceAbove(0.75),
        Predicate::PriceBelow(0.50),
        PositionSizing::Stake(100.0),
    );

    let mut engine = BacktestEngine::new(config)?;
    let trades = engine.run_rule_set(&observations, &rules)?;

    let discarded = engine.events().filter(|e| matches!(e, Event::Discarded { .. })).count();
    println!("trades {} (discarded {discarded})", trades.len());
    println!("capital {:.2}", engine.capital());

    #[cfg(feature = "metrics")]
    println!("\n{}", compute_metrics(&trades));

    Ok(())
}
