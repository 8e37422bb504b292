//! Strategy parameter optimization.
//!
//! This module sweeps rule parameters over a fixed observation set.
//! The `Optimizer` struct replays every combination, while the
//! `ParameterCombination` trait defines how to generate parameter sets.

use std::marker::PhantomData;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::info;

use crate::config::BacktestConfig;
use crate::engine::{BacktestEngine, PriceObservation, RuleSet};
use crate::errors::Result;
use crate::metrics::{PerformanceMetrics, compute_metrics};

/// Trait defining how to generate parameter combinations for optimization.
///
/// Implement this trait for your parameter types to define how combinations should be generated.
/// The associated type `Output` represents a single parameter combination (e.g., a tuple of thresholds).
pub trait ParameterCombination: Sync {
    /// Type representing a single parameter combination (e.g., `(f64, f64)`).
    type Output: Clone + Send + Sync;

    /// Generates all possible parameter combinations to test.
    fn generate() -> Vec<Self::Output>;
}

/// Replays a rule family over every parameter combination.
pub struct Optimizer<PC: ParameterCombination> {
    data: Arc<[PriceObservation]>,
    config: BacktestConfig,
    _marker: PhantomData<PC>,
}

impl<PC: ParameterCombination> Optimizer<PC> {
    /// Creates a new `Optimizer`.
    ///
    /// # Arguments
    /// * `data` - Observations, time-ordered per market.
    /// * `config` - Configuration shared by every run.
    pub fn new(data: Arc<[PriceObservation]>, config: BacktestConfig) -> Self {
        Self {
            data,
            config,
            _marker: PhantomData,
        }
    }

    /// Replays every combination and returns its metrics, in generation order.
    ///
    /// # Arguments
    /// * `combinator` - Builds the rules for one parameter combination.
    ///
    /// # Errors
    /// Returns the first error raised by the combinator or a replay.
    pub fn with<C>(&self, combinator: C) -> Result<Vec<(PC::Output, PerformanceMetrics)>>
    where
        C: Fn(&PC::Output) -> Result<RuleSet> + Sync,
    {
        self.with_filter(combinator, |_| true)
    }

    /// Like [`with`](Self::with), keeping only combinations whose metrics pass `filter`.
    pub fn with_filter<C, F>(&self, combinator: C, filter: F) -> Result<Vec<(PC::Output, PerformanceMetrics)>>
    where
        C: Fn(&PC::Output) -> Result<RuleSet> + Sync,
        F: Fn(&PerformanceMetrics) -> bool + Sync,
    {
        let num_cpus = num_cpus::get();
        let combinations = PC::generate();
        let chunk_size = combinations.len().div_ceil(num_cpus).max(1);

        let results = combinations
            .par_chunks(chunk_size)
            .map::<_, Result<_>>(|par_combinations| {
                let mut engine = BacktestEngine::new(self.config.clone())?;
                let mut local_results = Vec::with_capacity(par_combinations.len());

                for param_set in par_combinations {
                    let rules = combinator(param_set)?;
                    let trades = engine.run_rule_set(&self.data, &rules)?;
                    let metrics = compute_metrics(&trades);
                    if filter(&metrics) {
                        local_results.push((param_set.clone(), metrics));
                    }
                }

                Ok(local_results)
            })
            .collect::<Result<Vec<_>>>()
            .map(|chunks| chunks.into_iter().flatten().collect::<Vec<_>>())?;

        info!(
            combinations = combinations.len(),
            kept = results.len(),
            "parameter sweep finished"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{PositionSizing, Predicate};

    use chrono::{DateTime, Duration};

    struct Thresholds;

    impl ParameterCombination for Thresholds {
        type Output = (f64, f64);

        fn generate() -> Vec<Self::Output> {
            let entries = [0.10, 0.20, 0.30, 0.40];
            let exits = [0.60, 0.70, 0.80];
            entries
                .iter()
                .flat_map(|&entry| exits.iter().map(move |&exit| (entry, exit)))
                .collect()
        }
    }

    fn get_data() -> Arc<[PriceObservation]> {
        let t0 = DateTime::from_timestamp_secs(1_700_000_000).unwrap();
        [0.50, 0.35, 0.25, 0.15, 0.40, 0.65, 0.75, 0.85, 0.55]
            .iter()
            .enumerate()
            .map(|(i, &p)| PriceObservation::from(("M1", t0 + Duration::hours(i as i64), p)))
            .collect()
    }

    fn combinator(&(entry, exit): &(f64, f64)) -> Result<RuleSet> {
        Ok(RuleSet::new(
            Predicate::PriceBelow(entry),
            Predicate::PriceAbove(exit),
            PositionSizing::Fixed(0.5),
        ))
    }

    #[test]
    fn sweep_keeps_generation_order() {
        let opt = Optimizer::<Thresholds>::new(get_data(), BacktestConfig::default());
        let result = opt.with(combinator).unwrap();

        assert_eq!(result.len(), 12);
        assert_eq!(result[0].0, (0.10, 0.60));
        assert_eq!(result[11].0, (0.40, 0.80));
        // nothing trades below 0.10
        assert!(result[0].1.is_empty());
        // 0.35 entry, 0.65 exit
        let (_, metrics) = result.iter().find(|(p, _)| *p == (0.40, 0.60)).unwrap();
        assert_eq!(metrics.trades, 1);
        assert!(metrics.total_pnl > 0.0);
    }

    #[test]
    fn sweep_with_filter() {
        let opt = Optimizer::<Thresholds>::new(get_data(), BacktestConfig::default());
        let result = opt.with_filter(combinator, |m| !m.is_empty()).unwrap();
        assert!(result.iter().all(|(_, m)| m.trades > 0));
        assert_eq!(result.len(), 9);
    }

    #[test]
    fn sweep_propagates_invalid_rules() {
        let opt = Optimizer::<Thresholds>::new(get_data(), BacktestConfig::default());
        let result = opt.with(|_| Ok(RuleSet::new(Predicate::PriceBetween(0.9, 0.1), Predicate::Never, PositionSizing::All)));
        assert!(result.is_err());
    }
}
