use crate::errors::{Error, Result};

/// Capital pool shared by every market in a run.
#[derive(Debug, Clone)]
pub struct Wallet {
    // Starting capital used for reset
    initial_capital: f64,
    // Cash not committed to open positions
    free: f64,
    // Cost basis of open positions
    locked: f64,
    // Number of open positions
    open: usize,
    // Cumulative realized profit/loss
    realized_pnl: f64,
}

impl Wallet {
    /// Creates a new wallet with the given starting capital.
    /// Non-positive capital is rejected.
    pub fn new(capital: f64) -> Result<Self> {
        if capital <= 0.0 || !capital.is_finite() {
            return Err(Error::NegZeroCapital(capital));
        }

        Ok(Self {
            free: capital,
            locked: 0.0,
            open: 0,
            realized_pnl: 0.0,
            initial_capital: capital,
        })
    }

    /// Returns the starting capital.
    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    /// Returns the capital: free cash plus cost basis of open positions.
    pub fn capital(&self) -> f64 {
        self.free + self.locked
    }

    /// Returns the cash available for new positions.
    pub fn free_capital(&self) -> f64 {
        self.free
    }

    /// Returns the cost basis of open positions.
    pub fn locked(&self) -> f64 {
        self.locked
    }

    /// Returns the cumulative realized profit/loss.
    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    /// Commits `fraction` of the free cash and returns the amount committed.
    pub(crate) fn commit(&mut self, fraction: f64) -> Result<f64> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(Error::InvalidPositionSize(fraction));
        }
        let amount = self.free * fraction;
        self.free -= amount;
        self.locked += amount;
        self.open += 1;
        Ok(amount)
    }

    /// Settles a closed position: returns its cost basis plus `pnl` to the free cash.
    pub(crate) fn settle(&mut self, cost: f64, pnl: f64) {
        self.unlock(cost);
        self.free += cost + pnl;
        self.realized_pnl += pnl;
    }

    /// Returns a dropped position's cost basis to the free cash.
    pub(crate) fn release(&mut self, cost: f64) {
        self.unlock(cost);
        self.free += cost;
    }

    // Rounding residue is dropped once nothing is open.
    fn unlock(&mut self, cost: f64) {
        self.open = self.open.saturating_sub(1);
        if self.open == 0 {
            self.locked = 0.0;
        } else {
            self.locked -= cost;
        }
    }

    /// Resets the wallet to its starting capital.
    pub(crate) fn reset(&mut self) {
        self.locked = 0.0;
        self.open = 0;
        self.realized_pnl = 0.0;
        self.free = self.initial_capital;
    }
}

#[cfg(test)]
#[test]
fn new_wallet_valid_capital() {
    let wallet = Wallet::new(100.0).unwrap();
    assert_eq!(wallet.capital(), 100.0);
    assert_eq!(wallet.free_capital(), 100.0);
    assert_eq!(wallet.locked, 0.0);
}

#[cfg(test)]
#[test]
fn new_wallet_invalid_capital() {
    let result = Wallet::new(0.0);
    assert!(matches!(result, Err(Error::NegZeroCapital(_))));

    let result = Wallet::new(-10.0);
    assert!(matches!(result, Err(Error::NegZeroCapital(_))));

    let result = Wallet::new(f64::INFINITY);
    assert!(matches!(result, Err(Error::NegZeroCapital(_))));
}

#[cfg(test)]
#[test]
fn commit_out_of_range() {
    let mut wallet = Wallet::new(100.0).unwrap();
    assert!(matches!(wallet.commit(1.5), Err(Error::InvalidPositionSize(_))));
    assert!(matches!(wallet.commit(-0.1), Err(Error::InvalidPositionSize(_))));
    assert!(matches!(wallet.commit(f64::NAN), Err(Error::InvalidPositionSize(_))));
    assert_eq!(wallet.free_capital(), 100.0);
}

#[cfg(test)]
#[test]
fn commit_and_settle_profit() {
    let mut wallet = Wallet::new(100.0).unwrap();

    let cost = wallet.commit(0.2).unwrap();
    assert_eq!(cost, 20.0);
    assert_eq!(wallet.free_capital(), 80.0);
    assert_eq!(wallet.locked(), 20.0);
    assert_eq!(wallet.capital(), 100.0);

    wallet.settle(cost, 10.0);
    assert_eq!(wallet.free_capital(), 110.0);
    assert_eq!(wallet.locked(), 0.0);
    assert_eq!(wallet.realized_pnl(), 10.0);
}

#[cfg(test)]
#[test]
fn commit_and_settle_loss() {
    let mut wallet = Wallet::new(100.0).unwrap();
    let cost = wallet.commit(0.5).unwrap();
    wallet.settle(cost, -20.0);
    assert_eq!(wallet.capital(), 80.0);
    assert_eq!(wallet.realized_pnl(), -20.0);
}

#[cfg(test)]
#[test]
fn release_restores_cash() {
    let mut wallet = Wallet::new(100.0).unwrap();
    let cost = wallet.commit(0.25).unwrap();
    wallet.release(cost);
    assert_eq!(wallet.free_capital(), 100.0);
    assert_eq!(wallet.realized_pnl(), 0.0);
}

#[cfg(test)]
#[test]
fn reset_wallet() {
    let mut wallet = Wallet::new(100.0).unwrap();
    let cost = wallet.commit(0.2).unwrap();
    wallet.settle(cost, 5.0);
    wallet.commit(0.5).unwrap();

    wallet.reset();
    assert_eq!(wallet.locked, 0.0);
    assert_eq!(wallet.capital(), 100.0);
    assert_eq!(wallet.realized_pnl(), 0.0);
}

#[cfg(test)]
#[test]
fn locked_is_zero_once_flat() {
    let mut wallet = Wallet::new(1000.0).unwrap();
    let mut costs = Vec::new();
    for fraction in [0.25, 0.1, 0.3, 0.07, 0.33] {
        costs.push(wallet.commit(fraction).unwrap());
    }
    // close out of order with uneven pnl
    for (i, cost) in costs.into_iter().rev().enumerate() {
        wallet.settle(cost, cost * 0.137 * (i as f64 - 1.7));
    }
    assert_eq!(wallet.locked(), 0.0);
    assert_eq!(wallet.free_capital(), wallet.capital());
    approx::assert_relative_eq!(wallet.capital(), 1000.0 + wallet.realized_pnl(), epsilon = 1e-9);
}
