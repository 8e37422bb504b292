//! Entry/exit predicates and position sizing.
//!
//! Rules are plain data ([`Predicate`], [`PositionSizing`]) so they can be
//! stored, serialized and swept by the optimizer. Closures still work through
//! the blanket [`Rule`] and [`Sizing`] implementations.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::PriceObservation;
use crate::errors::{Error, Result};

/// A pure predicate over a single observation.
pub trait Rule {
    /// Returns `true` when the rule fires for `observation`.
    fn evaluate(&self, observation: &PriceObservation) -> bool;
}

impl<F> Rule for F
where
    F: Fn(&PriceObservation) -> bool,
{
    fn evaluate(&self, observation: &PriceObservation) -> bool {
        self(observation)
    }
}

/// Decides how much of the free capital a new position commits.
pub trait Sizing {
    /// Returns the fraction of `capital` to commit. Must be in `[0, 1]`.
    fn fraction(&self, observation: &PriceObservation, capital: f64) -> f64;
}

impl<F> Sizing for F
where
    F: Fn(&PriceObservation, f64) -> f64,
{
    fn fraction(&self, observation: &PriceObservation, capital: f64) -> f64 {
        self(observation, capital)
    }
}

/// Comparison rules over price, volume and liquidity.
///
/// Volume and liquidity rules evaluate to `false` when the observation does
/// not carry the field.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `price < threshold`
    PriceBelow(f64),
    /// `price > threshold`
    PriceAbove(f64),
    /// `low <= price <= high`
    PriceBetween(f64, f64),
    /// `volume > threshold`
    VolumeAbove(f64),
    /// `liquidity > threshold`
    LiquidityAbove(f64),
    /// Every inner predicate holds. Empty is `true`.
    All(Vec<Predicate>),
    /// At least one inner predicate holds. Empty is `false`.
    Any(Vec<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
    /// Always fires.
    Always,
    /// Never fires.
    Never,
}

impl Predicate {
    /// Checks thresholds are finite and ranges are not inverted.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::PriceBelow(t) | Self::PriceAbove(t) | Self::VolumeAbove(t) | Self::LiquidityAbove(t) => {
                if !t.is_finite() {
                    return Err(Error::InvalidPredicate(format!("non-finite threshold {t}")));
                }
                Ok(())
            }
            Self::PriceBetween(low, high) => {
                if !low.is_finite() || !high.is_finite() || low > high {
                    return Err(Error::InvalidPredicate(format!("bad price range [{low}, {high}]")));
                }
                Ok(())
            }
            Self::All(inner) | Self::Any(inner) => inner.iter().try_for_each(Predicate::validate),
            Self::Not(inner) => inner.validate(),
            Self::Always | Self::Never => Ok(()),
        }
    }

    /// Combines with `other`, both must hold.
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Self::All(mut inner) => {
                inner.push(other);
                Self::All(inner)
            }
            this => Self::All(vec![this, other]),
        }
    }

    /// Combines with `other`, either may hold.
    pub fn or(self, other: Predicate) -> Self {
        match self {
            Self::Any(mut inner) => {
                inner.push(other);
                Self::Any(inner)
            }
            this => Self::Any(vec![this, other]),
        }
    }

    /// Negates the predicate.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }
}

impl Rule for Predicate {
    fn evaluate(&self, observation: &PriceObservation) -> bool {
        let price = observation.price();
        match self {
            Self::PriceBelow(threshold) => price < *threshold,
            Self::PriceAbove(threshold) => price > *threshold,
            Self::PriceBetween(low, high) => price >= *low && price <= *high,
            Self::VolumeAbove(threshold) => observation.volume().is_some_and(|v| v > *threshold),
            Self::LiquidityAbove(threshold) => observation.liquidity().is_some_and(|l| l > *threshold),
            Self::All(inner) => inner.iter().all(|p| p.evaluate(observation)),
            Self::Any(inner) => inner.iter().any(|p| p.evaluate(observation)),
            Self::Not(inner) => !inner.evaluate(observation),
            Self::Always => true,
            Self::Never => false,
        }
    }
}

/// Built-in sizing rules.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionSizing {
    /// Commit a fixed fraction of the free capital.
    Fixed(f64),
    /// Commit a fixed cash amount, capped at the free capital.
    Stake(f64),
    /// Commit all free capital.
    All,
}

impl Default for PositionSizing {
    fn default() -> Self {
        Self::Fixed(0.1)
    }
}

impl Sizing for PositionSizing {
    fn fraction(&self, _observation: &PriceObservation, capital: f64) -> f64 {
        match self {
            Self::Fixed(fraction) => *fraction,
            Self::Stake(amount) => {
                if capital <= 0.0 {
                    0.0
                } else {
                    (amount / capital).min(1.0)
                }
            }
            Self::All => 1.0,
        }
    }
}

/// A complete, serializable set of rules for one run.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    /// Opens a position on a flat market.
    pub entry: Predicate,
    /// Closes the open position.
    pub exit: Predicate,
    /// Sizes new positions.
    #[cfg_attr(feature = "serde", serde(default))]
    pub sizing: PositionSizing,
}

impl RuleSet {
    /// Creates a rule set.
    pub fn new(entry: Predicate, exit: Predicate, sizing: PositionSizing) -> Self {
        Self { entry, exit, sizing }
    }

    /// Validates both predicates.
    pub fn validate(&self) -> Result<()> {
        self.entry.validate()?;
        self.exit.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::DateTime;

    fn observation(price: f64) -> PriceObservation {
        PriceObservation::from(("M1", DateTime::default(), price))
    }

    #[test]
    fn price_thresholds_are_strict() {
        assert!(Predicate::PriceBelow(0.3).evaluate(&observation(0.2)));
        assert!(!Predicate::PriceBelow(0.3).evaluate(&observation(0.3)));
        assert!(Predicate::PriceAbove(0.7).evaluate(&observation(0.75)));
        assert!(!Predicate::PriceAbove(0.7).evaluate(&observation(0.7)));
    }

    #[test]
    fn price_between_is_inclusive() {
        let rule = Predicate::PriceBetween(0.4, 0.6);
        assert!(rule.evaluate(&observation(0.4)));
        assert!(rule.evaluate(&observation(0.6)));
        assert!(!rule.evaluate(&observation(0.61)));
    }

    #[test]
    fn missing_volume_never_fires() {
        assert!(!Predicate::VolumeAbove(0.0).evaluate(&observation(0.5)));
        assert!(!Predicate::LiquidityAbove(0.0).evaluate(&observation(0.5)));
    }

    #[test]
    fn combinators() {
        let rule = Predicate::PriceBelow(0.3).and(Predicate::PriceAbove(0.1));
        assert!(rule.evaluate(&observation(0.2)));
        assert!(!rule.evaluate(&observation(0.05)));

        let rule = Predicate::PriceBelow(0.1).or(Predicate::PriceAbove(0.9));
        assert!(rule.evaluate(&observation(0.95)));
        assert!(!rule.evaluate(&observation(0.5)));

        assert!(Predicate::Never.not().evaluate(&observation(0.5)));
        assert!(Predicate::All(vec![]).evaluate(&observation(0.5)));
        assert!(!Predicate::Any(vec![]).evaluate(&observation(0.5)));
    }

    #[test]
    fn validate_rejects_inverted_range() {
        assert!(Predicate::PriceBetween(0.6, 0.4).validate().is_err());
        assert!(Predicate::Not(Box::new(Predicate::PriceAbove(f64::NAN))).validate().is_err());
        assert!(Predicate::PriceBetween(0.4, 0.6).validate().is_ok());
    }

    #[test]
    fn closure_rules() {
        let rule = |o: &PriceObservation| o.price() < 0.5;
        assert!(rule.evaluate(&observation(0.4)));
        let sizing = |_: &PriceObservation, _: f64| 0.25;
        assert_eq!(sizing.fraction(&observation(0.4), 100.0), 0.25);
    }

    #[test]
    fn stake_is_capped_by_capital() {
        let obs = observation(0.5);
        assert_eq!(PositionSizing::Stake(50.0).fraction(&obs, 200.0), 0.25);
        assert_eq!(PositionSizing::Stake(500.0).fraction(&obs, 200.0), 1.0);
        assert_eq!(PositionSizing::Stake(50.0).fraction(&obs, 0.0), 0.0);
        assert_eq!(PositionSizing::All.fraction(&obs, 10.0), 1.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn predicate_json() {
        let rule: Predicate = serde_json::from_str(r#"{"all":[{"price_below":0.3},{"volume_above":100.0}]}"#).unwrap();
        assert_eq!(
            rule,
            Predicate::All(vec![Predicate::PriceBelow(0.3), Predicate::VolumeAbove(100.0)])
        );
    }
}
