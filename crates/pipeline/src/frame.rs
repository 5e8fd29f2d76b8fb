// standard library
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

// crate modules
use crate::error::{Error, Result};

// external crates
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use vsans_efficiency::SpinState;
use vsans_geometry::{InstrumentGeometry, Panel, PanelMap, PixelGrid};

/// What an exposure was taken for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Purpose {
    /// Scattering
    Scatt,
    /// Direct beam transmission
    Trans,
    /// Transmission through the analyzer cell
    He3,
}

/// Role of the sample position during an exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Intent {
    /// A real sample
    Sample,
    /// Empty sample holder
    #[serde(alias = "Empty Cell")]
    Empty,
    /// Beam blocked at the sample position
    #[serde(rename = "Blocked Beam", alias = "BlockedBeam")]
    BlockedBeam,
    /// Nothing in the beam
    #[serde(rename = "Open Beam", alias = "OpenBeam")]
    OpenBeam,
}

/// Position of the analyzer cell during a He3 transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CellPosition {
    /// Cell in the beam
    #[serde(rename = "HeIN")]
    In,
    /// Cell out of the beam
    #[serde(rename = "HeOUT")]
    Out,
}

impl CellPosition {
    /// Tag the instrument appends to He3 descriptions
    ///
    /// ```rust
    /// # use vsans_pipeline::CellPosition;
    /// assert_eq!(CellPosition::from_description("Empty HeOUT "), Some(CellPosition::Out));
    /// assert_eq!(CellPosition::from_description("Empty HeIN"), Some(CellPosition::In));
    /// assert_eq!(CellPosition::from_description("Empty"), None);
    /// ```
    pub fn from_description(description: &str) -> Option<Self> {
        let description = description.trim_end();
        if description.ends_with("HeOUT") {
            Some(Self::Out)
        } else if description.ends_with("HeIN") {
            Some(Self::In)
        } else {
            None
        }
    }
}

/// Instrument settings that define a configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfigSignature {
    /// Number of guides in the beam, or `None` for converging beams
    #[serde(default)]
    pub guides: Option<u32>,
    /// Requested front carriage position (cm)
    pub front_distance: f64,
    /// Requested middle carriage position (cm)
    pub middle_distance: f64,
    /// Wavelength (Angstrom)
    pub wavelength: f64,
}

impl ConfigSignature {
    /// Unique identifier of the configuration
    ///
    /// ```rust
    /// # use vsans_pipeline::ConfigSignature;
    /// let signature = ConfigSignature {
    ///     guides: Some(4),
    ///     front_distance: 400.7,
    ///     middle_distance: 1900.0,
    ///     wavelength: 6.0,
    /// };
    /// assert_eq!(signature.id(), "4Gd400cmF1900cmM6.0000Ang");
    ///
    /// let converging = ConfigSignature { guides: None, ..signature };
    /// assert_eq!(converging.id(), "CvB400cmF1900cmM6.0000Ang");
    /// ```
    pub fn id(&self) -> String {
        let guides = match self.guides {
            Some(n) => format!("{n}Gd"),
            None => "CvB".to_string(),
        };
        format!(
            "{guides}{}cmF{}cmM{:.4}Ang",
            self.front_distance.trunc() as i64,
            self.middle_distance.trunc() as i64,
            self.wavelength
        )
    }
}

/// Analyzer cell recorded with a He3 exposure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellMetadata {
    /// Name of the cell
    pub name: String,
    /// Unix time the cell was inserted (ms)
    pub insert_timestamp_ms: f64,
    /// Opacity at 1 Angstrom
    pub opacity: f64,
    /// Empty cell glass transmission
    pub glass_transmission: f64,
}

impl CellMetadata {
    /// Insertion time in hours
    pub fn insert_time(&self) -> f64 {
        self.insert_timestamp_ms / 3.6e6
    }
}

/// One exposure of the instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorFrame {
    /// Run number, increasing with time
    pub file_number: u32,
    /// Free text sample description
    pub description: String,
    /// Configuration key written into descriptions by the instrument
    #[serde(default)]
    pub config_key: String,
    /// What the exposure was for
    pub purpose: Purpose,
    /// Role of the sample position
    pub intent: Intent,
    /// Front polarizer state
    #[serde(default = "unpolarized")]
    pub front_polarization: SpinState,
    /// Back analyzer state
    #[serde(default = "unpolarized")]
    pub back_polarization: SpinState,
    /// Monitor counts
    pub monitor: f64,
    /// Collection time (s)
    pub count_time: f64,
    /// Unix time at the end of the exposure (s)
    pub end_time: f64,
    /// Number of attenuators in the beam
    #[serde(default)]
    pub attenuators: u32,
    /// Configuration signature
    pub signature: ConfigSignature,
    /// Sample temperature setpoint (K)
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Applied voltage (V)
    #[serde(default)]
    pub voltage: Option<f64>,
    /// Analyzer cell metadata, when a cell is installed
    #[serde(default)]
    pub cell: Option<CellMetadata>,
    /// Cell position of a He3 transmission, taken from the description
    /// when not recorded
    #[serde(default)]
    pub cell_position: Option<CellPosition>,
    /// Full geometry metadata
    pub geometry: InstrumentGeometry,
    /// Raw counts per panel
    pub counts: PanelMap<PixelGrid<f64>>,
}

fn unpolarized() -> SpinState {
    SpinState::Unpolarized
}

impl DetectorFrame {
    /// Configuration identifier
    pub fn config_id(&self) -> String {
        self.signature.id()
    }

    /// Mid-point of the exposure (hours)
    pub fn mid_time(&self) -> f64 {
        (self.end_time - self.count_time / 2.0) / 3600.0
    }

    /// Start of the exposure (hours)
    pub fn start_time(&self) -> f64 {
        (self.end_time - self.count_time) / 3600.0
    }

    /// Raw counts of one panel
    pub fn panel_counts(&self, panel: Panel) -> Result<&PixelGrid<f64>> {
        self.counts.get(&panel).ok_or(Error::MissingPanelCounts {
            file: self.file_number,
            panel,
        })
    }

    /// Monitor counts, checked for normalisation
    pub fn checked_monitor(&self) -> Result<f64> {
        positive(self.file_number, "monitor counts", self.monitor)
    }

    /// Count time, checked for normalisation
    pub fn checked_count_time(&self) -> Result<f64> {
        positive(self.file_number, "count time", self.count_time)
    }

    /// True for a scattering exposure taken with the analyzer in place
    pub fn has_back_polarization(&self) -> bool {
        self.back_polarization != SpinState::Unpolarized
    }
}

fn positive(file: u32, name: &'static str, value: f64) -> Result<f64> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(Error::InvalidNormalisation { file, name, value })
    }
}

impl Display for DetectorFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} {:?} {:?} \"{}\" {}",
            self.file_number,
            self.purpose,
            self.intent,
            self.description,
            self.config_id()
        )
    }
}

/// Every exposure of an experiment, keyed by file number
///
/// Iteration is always in ascending file number, which is also the order
/// the exposures were taken in.
#[derive(Debug, Clone, Default)]
pub struct FrameStore {
    frames: BTreeMap<u32, DetectorFrame>,
}

impl FrameStore {
    /// Collect frames built in memory
    ///
    /// He3 transmissions without a recorded cell position are tagged from
    /// their description here, once.
    ///
    /// ```rust
    /// # use vsans_pipeline::FrameStore;
    /// let store = FrameStore::from_frames(Vec::new()).unwrap();
    /// assert!(store.is_empty());
    /// assert!(store.get(12).is_err());
    /// ```
    pub fn from_frames(frames: impl IntoIterator<Item = DetectorFrame>) -> Result<Self> {
        let mut store = BTreeMap::new();
        for mut frame in frames {
            let number = frame.file_number;
            if frame.purpose == Purpose::He3 && frame.cell_position.is_none() {
                frame.cell_position = CellPosition::from_description(&frame.description);
                trace!("{number}: cell position {:?}", frame.cell_position);
            }
            if store.insert(number, frame).is_some() {
                return Err(Error::DuplicateFrame(number));
            }
        }
        Ok(Self { frames: store })
    }

    /// Read every `*.json` frame in a directory
    pub fn read_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let mut paths = fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect::<Vec<_>>();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            trace!("reading {}", path.display());
            frames.push(read_frame(path)?);
        }

        let store = Self::from_frames(frames)?;
        info!(
            "{} frames read from {}",
            store.len(),
            dir.as_ref().display()
        );
        Ok(store)
    }

    /// Frame by file number
    pub fn get(&self, file_number: u32) -> Result<&DetectorFrame> {
        self.frames
            .get(&file_number)
            .ok_or(Error::MissingFrame(file_number))
    }

    /// True if the store holds the frame
    pub fn contains(&self, file_number: u32) -> bool {
        self.frames.contains_key(&file_number)
    }

    /// Frames in ascending file number
    pub fn iter(&self) -> impl Iterator<Item = &DetectorFrame> {
        self.frames.values()
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True if there are no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Read a single JSON frame
pub fn read_frame<P: AsRef<Path>>(path: P) -> Result<DetectorFrame> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let frame: DetectorFrame = serde_json::from_reader(reader).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("read frame {frame}");
    Ok(frame)
}
