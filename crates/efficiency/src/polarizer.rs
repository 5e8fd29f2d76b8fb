// crate modules
use crate::error::Result;
use crate::CrossSection;

// external crates
use log::{debug, info};
use serde::{Deserialize, Serialize};
use vsans_decay::CellLibrary;

/// One cross-section measurement of a calibration quartet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuartetEntry {
    /// Transmission relative to the supermirror-only measurement
    pub transmission: f64,
    /// Time of the exposure mid-point (hours)
    pub time: f64,
}

/// Polarized transmission measured in all four spin states
///
/// Taken through the analyzer cell without a sample, these separate the
/// supermirror polarizing efficiency from the cell polarization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationQuartet {
    /// Up, up
    pub uu: QuartetEntry,
    /// Down, up
    pub du: QuartetEntry,
    /// Down, down
    pub dd: QuartetEntry,
    /// Up, down
    pub ud: QuartetEntry,
}

impl CalibrationQuartet {
    /// Entry for one cross-section
    pub fn entry(&self, cross_section: CrossSection) -> &QuartetEntry {
        match cross_section {
            CrossSection::UU => &self.uu,
            CrossSection::DU => &self.du,
            CrossSection::DD => &self.dd,
            CrossSection::UD => &self.ud,
        }
    }
}

/// Efficiencies of the front polarizer and flipper
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarizerEfficiency {
    /// Supermirror polarizing efficiency
    pub psm: f64,
    /// Flipper efficiency
    pub pf: f64,
}

impl PolarizerEfficiency {
    /// Perfect polarizer and flipper
    pub fn ideal() -> Self {
        Self { psm: 1.0, pf: 1.0 }
    }

    /// Average the supermirror efficiency over calibration quartets
    ///
    /// For every quartet and cross-section the cell library is queried at
    /// the exposure time. Non spin-flip states give `(T/UT - 1)/NP`, spin-flip
    /// states `(1 - T/UT)/NP`. PSM is a quarter of the sum of the four
    /// per-cross-section averages. The flipper is taken as perfect.
    ///
    /// Without any quartets the polarizer is assumed ideal.
    pub fn from_quartets(quartets: &[CalibrationQuartet], cells: &CellLibrary) -> Result<Self> {
        if quartets.is_empty() {
            info!("no polarized calibration quartets, assuming PSM = PF = 1");
            return Ok(Self::ideal());
        }

        let mut psm = 0.0;
        for cross_section in CrossSection::ALL {
            let mut sum = 0.0;
            for quartet in quartets {
                let entry = quartet.entry(cross_section);
                let state = cells.query(entry.time)?;
                let ratio = entry.transmission / state.unpolarized_transmission;
                sum += if cross_section.is_spin_flip() {
                    (1.0 - ratio) / state.neutron_pol
                } else {
                    (ratio - 1.0) / state.neutron_pol
                };
            }
            let average = sum / quartets.len() as f64;
            debug!("PSM from {cross_section}: {average:.5}");
            psm += 0.25 * average;
        }

        info!(
            "supermirror efficiency PSM = {psm:.5} from {} quartet(s)",
            quartets.len()
        );
        Ok(Self { psm, pf: 1.0 })
    }
}

impl Default for PolarizerEfficiency {
    fn default() -> Self {
        Self::ideal()
    }
}
