//! Detector geometry and momentum transfer for the VSANS carriages
//!
//! The instrument has two detector carriages, front and middle, each made of
//! four panels arranged around the beam. Every panel is a rectangular grid
//! of pixels that is mapped once per instrument configuration onto a
//! momentum transfer field.
//!
//! ## Core concepts
//!
//! A [Panel] identifies one of the eight panels, and knows its [Carriage] and
//! [Position]. Per-pixel values are held in a [PixelGrid], and anything held
//! per panel lives in a [PanelMap].
//!
//! The [InstrumentGeometry] metadata of one representative exposure is
//! enough to build a [QGrid], which holds for every panel a [PanelQ] with
//! the Q vector components, |Q|, the perpendicular and parallel resolution,
//! the in-plane azimuth and the distance of each pixel from the beam centre.
//!
//! ```rust, no_run
//! # use vsans_geometry::{InstrumentGeometry, Panel, QGrid};
//! # fn geometry() -> InstrumentGeometry { unimplemented!() }
//! let grid = QGrid::from_geometry(&geometry()).unwrap();
//!
//! // |Q| for the first pixel of the middle-top panel
//! let q = grid.panel(Panel::MT).unwrap().q[(0, 0)];
//! ```
//!
//! ## Units
//!
//! Distances are in centimetres, except for the pixel pitch, panel gap,
//! spatial calibration and beamstop diameter which are recorded in
//! millimetres in the raw metadata and converted internally. Wavelength is
//! in Angstrom, giving Q in inverse Angstrom.

mod error;
mod grid;
mod metadata;
mod panel;
mod qgrid;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use grid::{PanelMap, PixelGrid};

#[doc(inline)]
pub use metadata::{InstrumentGeometry, PanelGeometry};

#[doc(inline)]
pub use panel::{Carriage, Panel, Position};

#[doc(inline)]
pub use qgrid::{PanelQ, PixelQ, QGrid};
