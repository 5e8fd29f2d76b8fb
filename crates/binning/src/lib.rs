//! Reduction of masked VSANS panels to 1-D profiles
//!
//! The [Binner] histograms the |Q| of every selected pixel into equal width
//! bins described by [BinSettings], keeping front and middle carriages apart.
//! A bin reports its mean intensity and an uncertainty chosen by
//! [UncertaintyMode]:
//!
//! - `statistical` propagates the per-pixel uncertainty in quadrature
//! - `pixel-variance` uses the spread of pixel intensities about the mean
//!
//! Bins without any contributing pixel are left out of the [Profile].
//!
//! ```rust, no_run
//! # use vsans_binning::{BinSettings, Binner, IntensityMap, UncertaintyMode};
//! # use vsans_geometry::QGrid;
//! # use vsans_mask::MaskSet;
//! # fn grid() -> QGrid { unimplemented!() }
//! # fn data() -> IntensityMap { unimplemented!() }
//! let grid = grid();
//! let mask = MaskSet::all_selected(&grid);
//! let settings = BinSettings::new(0.005, 0.145, 150, UncertaintyMode::PixelVariance).unwrap();
//!
//! let profile = Binner::new(settings, &grid, &mask).bin(&data()).unwrap();
//! ```

mod binner;
mod error;
mod profile;
mod settings;

#[doc(inline)]
pub use binner::{Binner, IntensityMap, PanelIntensity};

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use profile::{Profile, ProfilePoint};

#[doc(inline)]
pub use settings::{BinSettings, UncertaintyMode};
