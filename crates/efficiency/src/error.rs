//! Result and Error types for vsans-efficiency

use crate::CrossSection;

/// Type alias for `Result<T, efficiency::Error>`
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `vsans-efficiency` crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("efficiency matrix is singular (determinant {determinant:e})")]
    SingularMatrix { determinant: f64 },

    #[error("no exposures for the {0} cross-section")]
    MissingCrossSection(CrossSection),

    #[error("polarizer efficiency ratio PSM/S must be non-negative (PSM={psm}, S={analyzer})")]
    InvalidPolarizerEfficiency { psm: f64, analyzer: f64 },

    #[error("cross-section arrays differ in length (expected {expected:?}, found {found:?})")]
    StackLengthMismatch { expected: usize, found: usize },

    #[error("failed to query the He3 cell library")]
    Decay(#[from] vsans_decay::Error),
}
