//! Pixel selection masks for the VSANS panels
//!
//! Every binning operation uses the AND of several mask layers:
//!
//! - a measured mask, thresholded from a calibration exposure or supplied
//!   externally per configuration
//! - a shadow mask of fixed obstructions
//! - a beamstop mask around the direct beam
//! - an angular [Sector]
//!
//! Each layer is a [MaskSet]. A missing measured mask simply means that
//! layer selects everything.
//!
//! ```rust, no_run
//! # use vsans_geometry::QGrid;
//! # use vsans_mask::{shadow_mask, MaskSet, Sector, SectorKind};
//! # fn grid() -> QGrid { unimplemented!() }
//! let grid = grid();
//! let sector = Sector::new(SectorKind::Vertical, 10.0).unwrap();
//!
//! let combined = MaskSet::combine_all([
//!     &shadow_mask(&grid),
//!     &sector.mask(&grid),
//! ]).unwrap();
//! ```

mod error;
mod geometric;
mod library;
mod mask_set;
mod measured;
mod sector;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use geometric::{beamstop_mask, shadow_mask};

#[doc(inline)]
pub use library::{MaskKind, MaskLibrary};

#[doc(inline)]
pub use mask_set::MaskSet;

#[doc(inline)]
pub use measured::{external_mask, threshold_mask, Thresholds};

#[doc(inline)]
pub use sector::{Sector, SectorKind};
