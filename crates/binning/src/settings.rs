// standard library
use std::fmt::Display;

// crate modules
use crate::error::{Error, Result};

// external crates
use log::debug;
use serde::{Deserialize, Serialize};
use vsans_utils::linspace;

/// Estimator for the uncertainty of a binned intensity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UncertaintyMode {
    /// Per-pixel counting uncertainty in quadrature, divided by pixel count
    #[default]
    Statistical,
    /// Spread of pixel intensities about the bin mean
    PixelVariance,
}

impl Display for UncertaintyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Statistical => write!(f, "statistical"),
            Self::PixelVariance => write!(f, "pixel-variance"),
        }
    }
}

/// Equal width Q bins
///
/// Profiles report Q at the bin centre, half a bin above the lower edge,
/// and the mean |Q| of the contributing pixels separately as `mean_q`.
///
/// ```rust
/// # use vsans_binning::{BinSettings, UncertaintyMode};
/// let settings = BinSettings::new(0.0, 0.04, 2, UncertaintyMode::Statistical).unwrap();
/// assert_eq!(settings.edges(), vec![0.0, 0.02, 0.04]);
/// assert!((settings.centre(1) - 0.03).abs() < 1e-15);
///
/// assert!(BinSettings::new(0.1, 0.01, 2, UncertaintyMode::Statistical).is_err());
/// assert!(BinSettings::new(0.0, 0.01, 0, UncertaintyMode::Statistical).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinSettings {
    q_min: f64,
    q_max: f64,
    bins: usize,
    mode: UncertaintyMode,
}

impl BinSettings {
    /// Bins between `q_min` and `q_max` (inclusive)
    pub fn new(q_min: f64, q_max: f64, bins: usize, mode: UncertaintyMode) -> Result<Self> {
        if !(q_min.is_finite() && q_max.is_finite() && q_max > q_min) {
            return Err(Error::InvalidRange { q_min, q_max });
        }

        if bins == 0 {
            return Err(Error::ZeroBins);
        }

        Ok(Self {
            q_min,
            q_max,
            bins,
            mode,
        })
    }

    /// Bins for a configuration from the Q extent the detector sees
    ///
    /// The range is the detector extent clipped to the absolute limits, and
    /// the target bin count is scaled by the fraction of the extent kept,
    /// with a minimum of one bin.
    ///
    /// ```rust
    /// # use vsans_binning::{BinSettings, UncertaintyMode};
    /// let settings = BinSettings::from_q_extent(
    ///     (0.002, 0.2),
    ///     (0.005, 0.145),
    ///     150,
    ///     UncertaintyMode::Statistical,
    /// ).unwrap();
    ///
    /// assert_eq!(settings.q_min(), 0.005);
    /// assert_eq!(settings.q_max(), 0.145);
    /// assert_eq!(settings.bins(), 106);
    /// ```
    pub fn from_q_extent(
        extent: (f64, f64),
        limits: (f64, f64),
        target_bins: usize,
        mode: UncertaintyMode,
    ) -> Result<Self> {
        let (calc_min, calc_max) = extent;
        let q_min = limits.0.max(calc_min);
        let q_max = limits.1.min(calc_max);

        if !(calc_max > calc_min) {
            return Err(Error::InvalidRange {
                q_min: calc_min,
                q_max: calc_max,
            });
        }

        let fraction = (q_max - q_min) / (calc_max - calc_min);
        let bins = ((target_bins as f64 * fraction) as usize).max(1);
        debug!("{bins} Q bins from {q_min:.5} to {q_max:.5} 1/A");

        Self::new(q_min, q_max, bins, mode)
    }

    /// Lower Q limit
    pub fn q_min(&self) -> f64 {
        self.q_min
    }

    /// Upper Q limit
    pub fn q_max(&self) -> f64 {
        self.q_max
    }

    /// Number of bins
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Uncertainty estimator
    pub fn mode(&self) -> UncertaintyMode {
        self.mode
    }

    /// Same bins with a different estimator
    pub fn with_mode(self, mode: UncertaintyMode) -> Self {
        Self { mode, ..self }
    }

    /// The `bins + 1` bin edges
    pub fn edges(&self) -> Vec<f64> {
        linspace(self.q_min, self.q_max, self.bins + 1)
    }

    /// Centre of a bin
    pub fn centre(&self, bin: usize) -> f64 {
        let width = (self.q_max - self.q_min) / self.bins as f64;
        self.q_min + (bin as f64 + 0.5) * width
    }
}
