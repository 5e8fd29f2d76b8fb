//! Separation of the four polarized cross-sections
//!
//! With a polarizing supermirror and flipper before the sample and a He3
//! analyzer after it, every measured spin channel is a mixture of the four
//! true cross-sections. The mixing is described by a 4x4 matrix built from
//! the cell polarization at each exposure time and the polarizer
//! efficiencies.
//!
//! ```rust
//! # use nalgebra::Matrix4;
//! # use vsans_efficiency::EfficiencyMatrix;
//! let matrix = EfficiencyMatrix::from_matrix(Matrix4::new(
//!     4.0, 0.1, 0.2, 0.0,
//!     0.1, 4.0, 0.0, 0.2,
//!     0.2, 0.0, 4.0, 0.1,
//!     0.0, 0.2, 0.1, 4.0,
//! ));
//!
//! let measured = matrix.apply([10.0, 1.0, 12.0, 2.0]);
//! let corrected = matrix
//!     .correct([&[measured[0]], &[measured[1]], &[measured[2]], &[measured[3]]])
//!     .unwrap();
//!
//! assert!((corrected[2][0] - 12.0).abs() < 1e-9);
//! ```
//!
//! The supermirror efficiency is calibrated once per experiment from
//! [CalibrationQuartet] transmissions, see [PolarizerEfficiency].

mod cross_section;
mod error;
mod matrix;
mod polarizer;

#[doc(inline)]
pub use cross_section::{CrossSection, SpinState};

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use matrix::{
    row_coefficients, EfficiencyMatrix, ExposureTimes, DEFAULT_ANALYZER_EFFICIENCY,
};

#[doc(inline)]
pub use polarizer::{CalibrationQuartet, PolarizerEfficiency, QuartetEntry};
