//! Result and Error types for vsans-mask

use vsans_geometry::Panel;

/// Type alias for `Result<T, mask::Error>`
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `vsans-mask` crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("mask for {panel} is {found:?} but the panel is {expected:?}")]
    ShapeMismatch {
        panel: Panel,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("sector half width must be positive (found {0} degrees)")]
    InvalidHalfWidth(f64),

    #[error(transparent)]
    Geometry(#[from] vsans_geometry::Error),
}
