//! Result and Error types for the utils crate

/// Type alias for `Result<T, utils::Error>`
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for `vsans_utils`
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("no values to reduce")]
    EmptySlice,

    #[error("values include NaN or infinity")]
    NonFiniteValues,

    #[error("{value} is outside of the edges [{lower}, {upper}]")]
    OutOfBounds { value: f64, lower: f64, upper: f64 },

    #[error("{found} bin edges given, at least {required} needed")]
    TooFewEdges { found: usize, required: usize },
}
