//! Result and Error types for vsans-binning

use vsans_geometry::Panel;

/// Type alias for `Result<T, binning::Error>`
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `vsans-binning` crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid Q range ({q_min} to {q_max})")]
    InvalidRange { q_min: f64, q_max: f64 },

    #[error("at least one Q bin is required")]
    ZeroBins,

    #[error("no intensities supplied for {0}")]
    MissingIntensity(Panel),

    #[error("intensity for {panel} is {found:?} but the panel is {expected:?}")]
    ShapeMismatch {
        panel: Panel,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error(transparent)]
    Geometry(#[from] vsans_geometry::Error),
}
