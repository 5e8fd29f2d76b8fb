//! Result and Error types for vsans-pipeline

// standard library
use std::path::PathBuf;

// external crates
use vsans_geometry::Panel;

/// Type alias for `Result<T, pipeline::Error>`
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `vsans-pipeline` crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to read or write file")]
    Io(#[from] std::io::Error),

    #[error("failed to parse \"{path}\"")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse JSON input")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("frame {0} is not in the store")]
    MissingFrame(u32),

    #[error("duplicate frame number {0}")]
    DuplicateFrame(u32),

    #[error("frame {file} has no counts for {panel}")]
    MissingPanelCounts { file: u32, panel: Panel },

    #[error("frame {file} has non-positive {name} ({value})")]
    InvalidNormalisation {
        file: u32,
        name: &'static str,
        value: f64,
    },

    #[error("frame {file} counts for {panel} are {found:?} but the panel is {expected:?}")]
    PanelShapeMismatch {
        file: u32,
        panel: Panel,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("flat field for {panel} has non-positive value {value}")]
    InvalidFlatField { panel: Panel, value: f64 },

    #[error("no representative frame for configuration {0}")]
    MissingConfiguration(String),

    #[error("zero transmission denominator for frame {0}")]
    ZeroTransmission(u32),

    #[error("unit has no exposures for {0}")]
    EmptyChannel(String),

    #[error(transparent)]
    Geometry(#[from] vsans_geometry::Error),

    #[error(transparent)]
    Decay(#[from] vsans_decay::Error),

    #[error(transparent)]
    Efficiency(#[from] vsans_efficiency::Error),

    #[error(transparent)]
    Mask(#[from] vsans_mask::Error),

    #[error(transparent)]
    Binning(#[from] vsans_binning::Error),
}
