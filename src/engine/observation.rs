use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// A single price print for one market.
///
/// Prices are probability-style values, usually in `(0, 1)`. Only finiteness
/// is checked, and only when the observation is replayed.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PriceObservation {
    market_id: String,
    timestamp: DateTime<Utc>,
    price: f64,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    volume: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    liquidity: Option<f64>,
}

impl<S: Into<String>> From<(S, DateTime<Utc>, f64)> for PriceObservation {
    fn from((market_id, timestamp, price): (S, DateTime<Utc>, f64)) -> Self {
        Self {
            market_id: market_id.into(),
            timestamp,
            price,
            volume: None,
            liquidity: None,
        }
    }
}

impl PriceObservation {
    /// Returns the market identifier.
    pub fn market_id(&self) -> &str {
        &self.market_id
    }

    /// Returns the observation time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the observed price.
    pub fn price(&self) -> f64 {
        self.price
    }

    /// Returns the traded volume, if known.
    pub fn volume(&self) -> Option<f64> {
        self.volume
    }

    /// Returns the resting liquidity, if known.
    pub fn liquidity(&self) -> Option<f64> {
        self.liquidity
    }
}

/// Builder for [`PriceObservation`].
#[derive(Debug, Default)]
pub struct ObservationBuilder {
    market_id: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    price: Option<f64>,
    volume: Option<f64>,
    liquidity: Option<f64>,
}

impl ObservationBuilder {
    /// Starts an empty builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets the market identifier.
    pub fn market_id(mut self, market_id: impl Into<String>) -> Self {
        self.market_id = Some(market_id.into());
        self
    }

    /// Sets the observation time.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the price.
    pub fn price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    /// Sets the volume.
    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Sets the liquidity.
    pub fn liquidity(mut self, liquidity: f64) -> Self {
        self.liquidity = Some(liquidity);
        self
    }

    /// Builds the observation.
    ///
    /// ### Returns
    /// An error if the market, timestamp or price is missing, or if volume or
    /// liquidity is negative.
    pub fn build(self) -> Result<PriceObservation> {
        let market_id = self
            .market_id
            .ok_or_else(|| Error::InvalidObservation("missing market id".to_owned()))?;
        let timestamp = self
            .timestamp
            .ok_or_else(|| Error::InvalidObservation(format!("missing timestamp for {market_id}")))?;
        let price = self
            .price
            .ok_or_else(|| Error::InvalidObservation(format!("missing price for {market_id}")))?;

        if let Some(volume) = self.volume
            && volume < 0.0
        {
            return Err(Error::InvalidObservation(format!("negative volume {volume} for {market_id}")));
        }
        if let Some(liquidity) = self.liquidity
            && liquidity < 0.0
        {
            return Err(Error::InvalidObservation(format!(
                "negative liquidity {liquidity} for {market_id}"
            )));
        }

        Ok(PriceObservation {
            market_id,
            timestamp,
            price,
            volume: self.volume,
            liquidity: self.liquidity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_full_observation() {
        let observation = ObservationBuilder::builder()
            .market_id("will-it-rain")
            .timestamp(DateTime::from_timestamp_secs(1_700_000_000).unwrap())
            .price(0.42)
            .volume(1_500.0)
            .liquidity(320.0)
            .build()
            .unwrap();

        assert_eq!(observation.market_id(), "will-it-rain");
        assert_eq!(observation.price(), 0.42);
        assert_eq!(observation.volume(), Some(1_500.0));
        assert_eq!(observation.liquidity(), Some(320.0));
    }

    #[test]
    fn build_without_price() {
        let result = ObservationBuilder::builder()
            .market_id("M1")
            .timestamp(DateTime::default())
            .build();
        assert!(matches!(result, Err(Error::InvalidObservation(_))));
    }

    #[test]
    fn build_with_negative_volume() {
        let result = ObservationBuilder::builder()
            .market_id("M1")
            .timestamp(DateTime::default())
            .price(0.5)
            .volume(-1.0)
            .build();
        assert!(matches!(result, Err(Error::InvalidObservation(_))));
    }

    #[test]
    fn from_tuple() {
        let observation = PriceObservation::from(("M1", DateTime::default(), 0.3));
        assert_eq!(observation.market_id(), "M1");
        assert_eq!(observation.volume(), None);
    }
}
