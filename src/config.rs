//! Run configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::PositionSide;
use crate::errors::{Error, Result};

/// What happens to positions still open when a market's observations run out.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum EndOfStream {
    /// Close at the market's last observed price.
    ///
    /// A position opened on the market's final observation has no later price
    /// and is discarded instead.
    #[default]
    ForceClose,
    /// Drop the position and return its cost basis.
    Discard,
}

/// Backtest configuration.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    /// Starting capital, shared by all markets in a sequential run.
    pub initial_capital: f64,
    /// Outcome token bought on entry.
    pub side: PositionSide,
    /// End-of-stream policy for open positions.
    pub end_of_stream: EndOfStream,
    /// Rejects runs longer than this many observations.
    pub max_observations: Option<usize>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 1_000.0,
            side: PositionSide::Yes,
            end_of_stream: EndOfStream::ForceClose,
            max_observations: None,
        }
    }
}

impl BacktestConfig {
    /// Sets the starting capital.
    pub fn initial_capital(mut self, capital: f64) -> Self {
        self.initial_capital = capital;
        self
    }

    /// Sets the traded side.
    pub fn side(mut self, side: PositionSide) -> Self {
        self.side = side;
        self
    }

    /// Sets the end-of-stream policy.
    pub fn end_of_stream(mut self, policy: EndOfStream) -> Self {
        self.end_of_stream = policy;
        self
    }

    /// Sets the observation limit.
    pub fn max_observations(mut self, limit: usize) -> Self {
        self.max_observations = Some(limit);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.initial_capital <= 0.0 || !self.initial_capital.is_finite() {
            return Err(Error::NegZeroCapital(self.initial_capital));
        }
        Ok(())
    }

    /// Reads a configuration from a JSON file. Missing fields take defaults.
    #[cfg(feature = "serde")]
    pub fn from_json_file(filepath: impl AsRef<std::path::Path>) -> Result<Self> {
        use std::{fs::File, io::BufReader};

        let file = File::open(filepath)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }
}
