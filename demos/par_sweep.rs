//! # Parallel Threshold Sweep
//!
//! Sweeps entry/exit thresholds in parallel and prints the best combinations
//! by Sharpe ratio.
mod utils;

use std::sync::Arc;

use pm_backtest::prelude::*;

const ENTRIES: [f64; 5] = [0.10, 0.15, 0.20, 0.25, 0.30];
const EXITS: [f64; 5] = [0.55, 0.60, 0.65, 0.70, 0.75];

struct Thresholds;

impl ParameterCombination for Thresholds {
    type Output = (f64, f64);

    fn generate() -> Vec<Self::Output> {
        ENTRIES
            .iter()
            .flat_map(|&entry| EXITS.iter().map(move |&exit| (entry, exit)))
            .collect()
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let observations = Arc::from_iter(utils::example_observations());
    let opt = Optimizer::<Thresholds>::new(observations, BacktestConfig::default());

    let mut result = opt.with_filter(
        |&(entry, exit)| {
            Ok(RuleSet::new(
                Predicate::PriceBelow(entry),
                Predicate::PriceAbove(exit),
                PositionSizing::Fixed(0.1),
            ))
        },
        |metrics| metrics.trades >= 3,
    )?;

    result.sort_by(|(_, m1), (_, m2)| m2.sharpe.partial_cmp(&m1.sharpe).unwrap_or(std::cmp::Ordering::Equal));

    println!("\n=== TOP {} threshold pairs ===", result.len().min(5));
    for ((entry, exit), metrics) in result.iter().take(5) {
        println!(
            "buy < {entry:.2} / sell > {exit:.2} | trades {} | win {:.1}% | sharpe {:.2} | dd {:.2}%",
            metrics.trades,
            metrics.win_rate * 100.0,
            metrics.sharpe,
            metrics.max_drawdown * 100.0
        );
    }

    Ok(())
}
