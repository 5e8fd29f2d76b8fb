//! Batch reduction of polarized VSANS experiments
//!
//! The pipeline takes every exposure of an experiment from a [FrameStore]
//! and a [ReductionConfig], and works through the following stages:
//!
//! 1. The [Catalogue] sorts exposures into samples, configurations and
//!    spin [Channel]s, and collects analyzer cell measurements and
//!    polarizer calibrations.
//! 2. [Transmissions] fit the analyzer cells, calibrate the supermirror and
//!    find the absolute scale of every sample.
//! 3. Every sample x configuration x kind unit is scaled to absolute
//!    intensity, separated into cross-sections where possible, masked and
//!    binned into sector profiles.
//! 4. [write_outputs] writes the 2-D and 1-D tables and the analyzer cell
//!    summary.
//!
//! Units fail on their own. A missing frame or a singular efficiency matrix
//! marks the unit failed in its [UnitReport] and the batch carries on.
//!
//! ```rust, no_run
//! # use vsans_pipeline::{read_config, write_outputs, FrameStore, Pipeline};
//! let config = read_config("./reduction.json").unwrap();
//! let store = FrameStore::read_dir("./frames").unwrap();
//!
//! let mut output = Pipeline::new(&config, &store).run().unwrap();
//! write_outputs(&mut output, "./reduced", config.per_panel_output).unwrap();
//!
//! for unit in output.failed() {
//!     println!("{}: {}", unit.report, unit.report.state());
//! }
//! ```

mod config;
mod error;
mod frame;
mod grouping;
mod masks;
mod output;
mod reduce;
mod scaling;
mod transmission;
mod unit;

#[doc(inline)]
pub use config::{read_config, EmptyPolicy, LowQOffsets, ManualCell, ReductionConfig};

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use frame::{
    read_frame, CellMetadata, CellPosition, ConfigSignature, DetectorFrame, FrameStore, Intent,
    Purpose,
};

#[doc(inline)]
pub use grouping::{
    sample_name, BlockedBeamFiles, Catalogue, CellRecord, Channel, Exposure, He3Pair,
    QuartetFiles, SampleGroup,
};

#[doc(inline)]
pub use masks::{mask_kind, read_masks, register_mask, MaskFile};

#[doc(inline)]
pub use output::{
    write_combined, write_full_polarization, write_outputs, write_profile,
    write_two_dimensional, DECAY_SUMMARY,
};

#[doc(inline)]
pub use reduce::{
    ChannelData, ConfigSetup, MaskLayers, Pipeline, ReductionOutput, SectorMasks, SectorProfile,
    UnitOutput,
};

#[doc(inline)]
pub use scaling::{blocked_beam_rates, read_flat_field, AbsoluteScaler, FlatField};

#[doc(inline)]
pub use transmission::{Transmissions, MONITOR_NORMALISATION};

#[doc(inline)]
pub use unit::{UnitKind, UnitReport, UnitState};
