// standard library
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// crate modules
use crate::error::{Error, Result};

// external crates
use log::debug;
use serde::{Deserialize, Serialize};
use vsans_binning::UncertaintyMode;
use vsans_efficiency::DEFAULT_ANALYZER_EFFICIENCY;
use vsans_geometry::Panel;
use vsans_mask::{SectorKind, Thresholds};

/// Substitution of missing spin states for empty-cell measurements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyPolicy {
    /// Missing cross-sections stay missing
    #[default]
    Disabled,
    /// Fill a missing DD from UU (and vice versa), UD from DU (and vice versa)
    MirrorSpinStates,
}

/// Constant background subtracted from middle carriage profiles
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LowQOffsets {
    /// Applied to UD and DU
    pub spin_flip: f64,
    /// Applied to UU and DD
    pub non_spin_flip: f64,
    /// Applied to unpolarized scattering
    pub unpolarized: f64,
}

/// Analyzer cell entered by hand rather than read from frame metadata
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManualCell {
    /// First He3 frame measured with this cell
    pub start_file: u32,
    /// Opacity times wavelength
    pub mu: f64,
    /// Empty cell glass transmission
    pub te: f64,
}

/// Every user setting of a reduction
///
/// All fields are optional in the JSON file and default to the standard
/// settings for the instrument.
///
/// ```rust
/// # use vsans_pipeline::{EmptyPolicy, ReductionConfig};
/// # use vsans_geometry::Panel;
/// let config: ReductionConfig = serde_json::from_str(r#"{
///     "target_bins": 100,
///     "empty_policy": "mirror-spin-states"
/// }"#).unwrap();
///
/// assert_eq!(config.target_bins, 100);
/// assert_eq!(config.empty_policy, EmptyPolicy::MirrorSpinStates);
/// assert_eq!(config.transmission_panel, Panel::MR);
/// assert_eq!(config.min_count_time, 59.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    /// Panel the direct beam falls on for transmission measurements
    pub transmission_panel: Panel,
    /// Half width of every sector (degrees)
    pub sector_half_width: f64,
    /// Sectors to produce 1-D profiles for
    pub sectors: Vec<SectorKind>,
    /// Use the calibrated supermirror efficiency, otherwise PSM = PF = 1
    pub polarization_correction: bool,
    /// Absolute lower Q limit (1/A)
    pub q_min: f64,
    /// Absolute upper Q limit (1/A)
    pub q_max: f64,
    /// Bins for the full detector Q extent
    pub target_bins: usize,
    /// Estimator for binned uncertainties
    pub uncertainty_mode: UncertaintyMode,
    /// Middle carriage background per channel kind
    pub low_q_offsets: LowQOffsets,
    /// Analyzer efficiency used in the efficiency matrix
    pub analyzer_efficiency: f64,
    /// Thresholds for masks measured from calibration exposures
    pub thresholds: Thresholds,
    /// Calibration exposures to threshold, one per configuration
    pub measured_mask_files: Vec<u32>,
    /// Exposures shorter than this are ignored (s)
    pub min_count_time: f64,
    /// Exposures to ignore entirely
    pub excluded_files: Vec<u32>,
    /// Exposures to treat as blocked beam regardless of their intent
    pub blocked_beam_files: Vec<u32>,
    /// Exposures to treat as empty regardless of their intent
    pub empty_files: Vec<u32>,
    /// Substitution policy for empty-cell measurements
    pub empty_policy: EmptyPolicy,
    /// Cells entered by hand, replacing the recorded cell metadata
    pub manual_cells: Vec<ManualCell>,
    /// Also write one 2-D table per panel
    pub per_panel_output: bool,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            transmission_panel: Panel::MR,
            sector_half_width: 10.0,
            sectors: vec![SectorKind::Horizontal, SectorKind::Vertical],
            polarization_correction: true,
            q_min: 0.005,
            q_max: 0.145,
            target_bins: 150,
            uncertainty_mode: UncertaintyMode::Statistical,
            low_q_offsets: LowQOffsets::default(),
            analyzer_efficiency: DEFAULT_ANALYZER_EFFICIENCY,
            thresholds: Thresholds::default(),
            measured_mask_files: Vec::new(),
            min_count_time: 59.0,
            excluded_files: Vec::new(),
            blocked_beam_files: Vec::new(),
            empty_files: Vec::new(),
            empty_policy: EmptyPolicy::Disabled,
            manual_cells: Vec::new(),
            per_panel_output: false,
        }
    }
}

impl ReductionConfig {
    /// True if cells are entered by hand
    pub fn is_manual_he3(&self) -> bool {
        !self.manual_cells.is_empty()
    }

    /// Check settings that serde can not
    pub fn validate(&self) -> Result<()> {
        if !(self.sector_half_width > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "sector half width must be positive, found {}",
                self.sector_half_width
            )));
        }

        if !(self.q_max > self.q_min && self.q_min >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "Q limits must satisfy 0 <= q_min < q_max, found {} to {}",
                self.q_min, self.q_max
            )));
        }

        if self.target_bins == 0 {
            return Err(Error::InvalidConfig("target bins must be at least 1".into()));
        }

        if !(self.analyzer_efficiency > 0.0 && self.analyzer_efficiency <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "analyzer efficiency must be in (0, 1], found {}",
                self.analyzer_efficiency
            )));
        }

        if let Some(cell) = self
            .manual_cells
            .iter()
            .find(|c| !(c.mu > 0.0 && c.te > 0.0))
        {
            return Err(Error::InvalidConfig(format!(
                "manual cell starting at {} has non-physical Mu={} Te={}",
                cell.start_file, cell.mu, cell.te
            )));
        }

        Ok(())
    }
}

/// Read and validate a JSON configuration file
///
/// ```rust, no_run
/// # use vsans_pipeline::read_config;
/// let config = read_config("./reduction.json").unwrap();
/// println!("{} sectors", config.sectors.len());
/// ```
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<ReductionConfig> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let config: ReductionConfig =
        serde_json::from_reader(reader).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    debug!("{config:?}");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ReductionConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.is_manual_he3());
        assert_eq!(config.sectors.len(), 2);
    }

    #[test]
    fn inverted_limits_are_rejected() {
        let config = ReductionConfig {
            q_min: 0.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn sectors_and_offsets_from_json() {
        let config: ReductionConfig = serde_json::from_str(
            r#"{
                "sectors": [{"kind": "circular"}, {"kind": "custom", "primary": 30.0}],
                "low_q_offsets": {"spin_flip": 0.01},
                "uncertainty_mode": "pixel-variance"
            }"#,
        )
        .unwrap();

        assert_eq!(config.sectors[0], SectorKind::Circular);
        assert_eq!(config.low_q_offsets.spin_flip, 0.01);
        assert_eq!(config.low_q_offsets.unpolarized, 0.0);
        assert_eq!(config.uncertainty_mode, UncertaintyMode::PixelVariance);
    }
}
