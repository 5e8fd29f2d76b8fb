// standard library
use std::fmt::Display;

// crate modules
use crate::cell::{CellObservation, HeCell};

// external crates
use serde::{Deserialize, Serialize};

/// Neutron polarization and transmissions of a cell at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarizationState {
    /// He3 atomic polarization
    pub atomic_pol: f64,
    /// Neutron polarization, `tanh(Mu P)`
    pub neutron_pol: f64,
    /// Unpolarized-beam transmission, `Te exp(-Mu) cosh(Mu P)`
    pub unpolarized_transmission: f64,
    /// Transmission of the majority spin state
    pub t_major: f64,
    /// Transmission of the minority spin state
    pub t_minor: f64,
}

/// Fitted, read-only decay of one analyzer cell
///
/// ```rust
/// # use vsans_decay::HeCell;
/// let mut cell = HeCell::new("Burgundy", 100.0, 3.105, 0.86).unwrap();
/// cell.add_observation(0.0, 0.9);
/// let curve = cell.fit().unwrap();
///
/// // a single observation cannot show decay
/// assert!(curve.is_low_confidence());
/// assert_eq!(curve.gamma(), 1000.0);
///
/// // query by absolute time, 100 hours being the insertion
/// let state = curve.state_at(100.0);
/// assert!((state.unpolarized_transmission - 0.9).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayCurve {
    name: String,
    insert_time: f64,
    mu: f64,
    te: f64,
    p0: f64,
    gamma: f64,
    low_confidence: bool,
    observations: Vec<CellObservation>,
}

impl DecayCurve {
    /// Decay constant (hours) assumed when there is nothing to fit
    pub const PLACEHOLDER_GAMMA: f64 = 1000.0;

    pub(crate) fn new(cell: &HeCell, p0: f64, gamma: f64, low_confidence: bool) -> Self {
        Self {
            name: cell.name().to_string(),
            insert_time: cell.insert_time(),
            mu: cell.mu(),
            te: cell.te(),
            p0,
            gamma,
            low_confidence,
            observations: cell.observations().to_vec(),
        }
    }

    /// Cell name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insertion time (hours)
    pub fn insert_time(&self) -> f64 {
        self.insert_time
    }

    /// Opacity-wavelength product
    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// Empty-cell glass transmission
    pub fn te(&self) -> f64 {
        self.te
    }

    /// Atomic polarization at insertion
    pub fn p0(&self) -> f64 {
        self.p0
    }

    /// Decay constant (hours)
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// True when the fit fell back to the no-decay placeholder
    pub fn is_low_confidence(&self) -> bool {
        self.low_confidence
    }

    /// Observations the curve was fitted to
    pub fn observations(&self) -> &[CellObservation] {
        &self.observations
    }

    /// Neutron polarization of the cell at insertion, `tanh(Mu P0)`
    pub fn initial_cell_polarization(&self) -> f64 {
        (self.mu * self.p0).tanh()
    }

    /// State at an absolute time in hours
    pub fn state_at(&self, time: f64) -> PolarizationState {
        self.state_after(time - self.insert_time)
    }

    /// State a number of hours after insertion
    pub fn state_after(&self, elapsed: f64) -> PolarizationState {
        let atomic_pol = self.p0 * (-elapsed / self.gamma).exp();
        let floor = self.te * (-self.mu).exp();

        PolarizationState {
            atomic_pol,
            neutron_pol: (self.mu * atomic_pol).tanh(),
            unpolarized_transmission: floor * (self.mu * atomic_pol).cosh(),
            t_major: self.te * (-self.mu * (1.0 - atomic_pol)).exp(),
            t_minor: self.te * (-self.mu * (1.0 + atomic_pol)).exp(),
        }
    }
}

impl Display for DecayCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}: PCell0 = {:.4}, P0 = {:.4}, gamma = {:.2} h from {} observation(s){}",
            self.name,
            self.initial_cell_polarization(),
            self.p0,
            self.gamma,
            self.observations.len(),
            if self.low_confidence {
                " [low confidence]"
            } else {
                ""
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spin_transmissions_average_to_unpolarized() {
        let mut cell = HeCell::new("Maverick", 0.0, 3.0, 0.88).unwrap();
        cell.add_observation(0.0, 0.1);
        cell.add_observation(24.0, 0.08);
        let curve = cell.fit().unwrap();

        let state = curve.state_after(12.0);
        let mean = 0.5 * (state.t_major + state.t_minor);
        assert!((mean - state.unpolarized_transmission).abs() < 1e-12);
        assert!(state.neutron_pol > 0.0 && state.neutron_pol < 1.0);
    }
}
