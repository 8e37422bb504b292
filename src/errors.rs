pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The sizing rule returned a fraction outside `[0, 1]` (or NaN).
    #[error("Position size must be a fraction in [0, 1] (got: {0})")]
    InvalidPositionSize(f64),

    /// An observation carried a NaN or infinite price.
    #[error("Non-finite price {price} for market {market_id}")]
    NonFinitePrice {
        /// Market the observation belongs to.
        market_id: String,
        /// The offending price.
        price: f64,
    },

    /// The starting capital is not positive. Sizing requires a positive pool.
    #[error("Capital must be positive (got: {0})")]
    NegZeroCapital(f64),

    /// The observation stream is longer than the configured limit.
    #[error("Observation limit exceeded: more than {0} observations")]
    IterationLimit(usize),

    /// An observation could not be built.
    #[error("Invalid observation: {0}")]
    InvalidObservation(String),

    /// A predicate is malformed (e.g. inverted bounds).
    #[error("Invalid predicate: {0}")]
    InvalidPredicate(String),

    /// A custom error message.
    #[error("{0}")]
    Msg(String),

    /// I/O error occurred.
    // utils.rs
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error occurred.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
