// crate modules
use crate::error::{Error, Result};
use crate::fit::fit_exponential;
use crate::DecayCurve;

// external crates
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// One measured transmission of a polarized cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellObservation {
    /// Hours since the cell was inserted
    pub elapsed: f64,
    /// Measured unpolarized-beam transmission
    pub transmission: f64,
}

/// A He3 analyzer cell collecting transmission measurements
///
/// Mu and Te are fixed when the cell is created. Observations are only ever
/// appended, and once every HeIN/HeOUT pair has been ingested the cell is
/// fitted into an immutable [DecayCurve].
///
/// ```rust
/// # use vsans_decay::HeCell;
/// let mut cell = HeCell::new("Burgundy", 12.0, 3.105, 0.86).unwrap();
/// cell.add_observation(0.0, 0.9);
/// cell.add_observation(10.0, 0.7);
///
/// let curve = cell.fit().unwrap();
/// assert!(curve.gamma() > 0.0);
/// assert!(!curve.is_low_confidence());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeCell {
    name: String,
    insert_time: f64,
    mu: f64,
    te: f64,
    observations: Vec<CellObservation>,
}

impl HeCell {
    /// Create an empty cell
    ///
    /// `insert_time` is the absolute insertion time in hours, `mu` the
    /// opacity-wavelength product and `te` the empty-cell glass transmission.
    pub fn new(name: impl Into<String>, insert_time: f64, mu: f64, te: f64) -> Result<Self> {
        let name = name.into();
        if !(mu > 0.0 && mu.is_finite() && te > 0.0 && te.is_finite()) {
            return Err(Error::InvalidCellParameters { name, mu, te });
        }

        Ok(Self {
            name,
            insert_time,
            mu,
            te,
            observations: Vec::new(),
        })
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

    /// Observations in the order they were added
    pub fn observations(&self) -> &[CellObservation] {
        &self.observations
    }

    /// Append a validated HeOUT/HeIN measurement
    pub fn add_observation(&mut self, elapsed: f64, transmission: f64) {
        debug!(
            "{}: observation {} at {elapsed:.3} h, T = {transmission:.5}",
            self.name,
            self.observations.len() + 1
        );
        self.observations.push(CellObservation {
            elapsed,
            transmission,
        });
    }

    /// Atomic polarization implied by a measured transmission
    ///
    /// Inverts `T = Te exp(-Mu) cosh(Mu P)`. Transmissions below the fully
    /// depolarized floor `Te exp(-Mu)` have no real solution.
    ///
    /// ```rust
    /// # use vsans_decay::HeCell;
    /// let cell = HeCell::new("Burgundy", 0.0, 3.0, 0.9).unwrap();
    /// let floor = 0.9 * (-3.0_f64).exp();
    ///
    /// assert_eq!(cell.linearise(floor).unwrap(), 0.0);
    /// assert!(cell.linearise(0.5 * floor).is_err());
    /// ```
    pub fn linearise(&self, transmission: f64) -> Result<f64> {
        let floor = self.te * (-self.mu).exp();
        let ratio = transmission / floor;
        if !(ratio >= 1.0) {
            return Err(Error::TransmissionOutOfRange {
                transmission,
                floor,
            });
        }
        Ok(ratio.acosh() / self.mu)
    }

    /// Fit the atomic polarization decay `P(t) = P0 exp(-t/gamma)`
    ///
    /// With fewer than two observations at distinct times the cell is
    /// treated as not yet decaying: `P0` is the first linearised
    /// observation, `gamma` a long placeholder, and the curve is flagged as
    /// low confidence. Data that is spread in time but does not decay gets
    /// the same placeholder with its own warning.
    pub fn fit(&self) -> Result<DecayCurve> {
        let Some(first) = self.observations.first() else {
            return Err(Error::NoObservations(self.name.clone()));
        };

        let times = self
            .observations
            .iter()
            .map(|o| o.elapsed)
            .collect::<Vec<f64>>();
        let polarization = self
            .observations
            .iter()
            .map(|o| self.linearise(o.transmission))
            .collect::<Result<Vec<f64>>>()?;

        // observations are in file order, so the first is the earliest
        let p0 = polarization[0];
        let gamma = DecayCurve::PLACEHOLDER_GAMMA;

        let distinct = times
            .iter()
            .any(|t| (t - first.elapsed).abs() > f64::EPSILON);
        if !distinct {
            warn!(
                "{}: {} observation(s) at one time, assuming no decay (P0 = {p0:.4}, gamma = {gamma} h)",
                self.name,
                polarization.len(),
            );
            return Ok(DecayCurve::new(self, p0, gamma, true));
        }

        let (p0, gamma, low_confidence) = match fit_exponential(&times, &polarization) {
            Some((p0, gamma)) => (p0, gamma, false),
            None => {
                warn!(
                    "{}: polarization does not decay over {} observations, assuming no decay (P0 = {p0:.4}, gamma = {gamma} h)",
                    self.name,
                    polarization.len(),
                );
                (p0, gamma, true)
            }
        };

        Ok(DecayCurve::new(self, p0, gamma, low_confidence))
    }
}
