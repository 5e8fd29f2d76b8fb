//! Result and Error types for vsans-geometry

use crate::Panel;

/// Type alias for `Result<T, geometry::Error>`
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `vsans-geometry` crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("wavelength must be positive and finite (found {0})")]
    MissingWavelength(f64),

    #[error("zero or negative flight path \"{name}\" ({value} cm)")]
    ZeroFlightPath { name: &'static str, value: f64 },

    #[error("pixel pitch for {panel} must be positive (x={x} mm, y={y} mm)")]
    InvalidPixelSize { panel: Panel, x: f64, y: f64 },

    #[error("no geometry for panel {0}")]
    MissingPanel(Panel),

    #[error("unknown panel \"{0}\"")]
    UnknownPanel(String),

    #[error("inconsistent pixel grid (expected {expected:?} values, found {found:?})")]
    GridShapeMismatch { expected: usize, found: usize },

    #[error("failed to find the Q extent of the panels")]
    QExtent(#[from] vsans_utils::Error),
}
