// standard library
use std::collections::BTreeMap;

// crate modules
use crate::error::{Error, Result};
use crate::{CrossSection, PolarizerEfficiency};

// external crates
use log::{debug, trace};
use nalgebra::{Matrix4, Vector4};
use vsans_decay::CellLibrary;

/// Fixed efficiency of the analyzer used in the matrix
pub const DEFAULT_ANALYZER_EFFICIENCY: f64 = 0.9985;

/// Exposure times (hours) of every file in each cross-section group
pub type ExposureTimes = BTreeMap<CrossSection, Vec<f64>>;

/// Relative determinant below which a matrix counts as singular
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Mixing coefficients of the true cross-sections in one measured channel
///
/// `c` is the neutron polarization of the cell, `x` the square root of the
/// supermirror to analyzer efficiency ratio, and `s` the analyzer
/// efficiency. Columns are in [CrossSection::ALL] order.
///
/// ```rust
/// # use vsans_efficiency::{row_coefficients, CrossSection};
/// // a perfect instrument does not mix spin states
/// let row = row_coefficients(CrossSection::UU, 1.0, 1.0, 1.0);
/// assert_eq!(row, [4.0, 0.0, 0.0, 0.0]);
/// ```
pub fn row_coefficients(measured: CrossSection, c: f64, x: f64, s: f64) -> [f64; 4] {
    let sx2 = s * x * x;
    let sx = s * x;

    // the four combinations of the polarizer and flipper terms
    let pp = c * (sx2 + x) + sx + 1.0;
    let mp = c * (-sx2 + x) - sx + 1.0;
    let pm = c * (sx2 - x) - sx + 1.0;
    let mm = c * (-sx2 - x) + sx + 1.0;

    match measured {
        CrossSection::UU => [pp, mp, pm, mm],
        CrossSection::DU => [mp, pp, mm, pm],
        CrossSection::DD => [pm, mm, pp, mp],
        CrossSection::UD => [mm, pm, mp, pp],
    }
}

/// Linear map from true to measured spin cross-sections
///
/// Rows are the measured channels and columns the true cross-sections,
/// both in [CrossSection::ALL] order. Inverting the matrix recovers the true
/// cross-sections pixel by pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct EfficiencyMatrix {
    matrix: Matrix4<f64>,
}

impl EfficiencyMatrix {
    /// Full polarization matrix for one sample and configuration
    ///
    /// Every exposure of a cross-section adds its mixing row, weighted by
    /// the unpolarized cell transmission at the exposure time and normalised
    /// by the number of exposures in that cross-section.
    pub fn build(
        times: &ExposureTimes,
        cells: &CellLibrary,
        polarizer: &PolarizerEfficiency,
        analyzer: f64,
    ) -> Result<Self> {
        let ratio = polarizer.psm / analyzer;
        if !(ratio >= 0.0) {
            return Err(Error::InvalidPolarizerEfficiency {
                psm: polarizer.psm,
                analyzer,
            });
        }
        let x = ratio.sqrt();

        let mut matrix = Matrix4::<f64>::zeros();
        for cross_section in CrossSection::ALL {
            let exposures = exposure_times(times, cross_section)?;
            let n = exposures.len() as f64;

            for time in exposures {
                let state = cells.query(*time)?;
                let row = row_coefficients(cross_section, state.neutron_pol, x, analyzer);
                trace!(
                    "{cross_section} at {time:.3} h: NP = {:.5}, UT = {:.5}",
                    state.neutron_pol,
                    state.unpolarized_transmission
                );

                let weight = state.unpolarized_transmission / n;
                for (j, coefficient) in row.iter().enumerate() {
                    matrix[(cross_section.index(), j)] += coefficient * weight;
                }
            }
        }

        debug!("efficiency matrix: {matrix}");
        Ok(Self { matrix })
    }

    /// Wrap an existing matrix
    pub fn from_matrix(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }

    /// The mixing matrix itself
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    /// Measured channels for a set of true cross-sections
    pub fn apply(&self, true_values: [f64; 4]) -> [f64; 4] {
        (self.matrix * Vector4::from(true_values)).into()
    }

    /// Dense inverse of the matrix
    ///
    /// A matrix whose determinant is negligible relative to the size of its
    /// entries is reported as singular rather than inverted.
    ///
    /// ```rust
    /// # use nalgebra::Matrix4;
    /// # use vsans_efficiency::EfficiencyMatrix;
    /// let identity = EfficiencyMatrix::from_matrix(Matrix4::identity());
    /// assert_eq!(identity.inverse().unwrap(), Matrix4::identity());
    ///
    /// let singular = EfficiencyMatrix::from_matrix(Matrix4::from_element(1.0));
    /// assert!(singular.inverse().is_err());
    /// ```
    pub fn inverse(&self) -> Result<Matrix4<f64>> {
        let determinant = self.matrix.determinant();
        let scale = self.matrix.amax();

        if !determinant.is_finite()
            || scale == 0.0
            || determinant.abs() <= SINGULAR_TOLERANCE * scale.powi(4)
        {
            return Err(Error::SingularMatrix { determinant });
        }

        self.matrix
            .try_inverse()
            .ok_or(Error::SingularMatrix { determinant })
    }

    /// Separate the true cross-sections of every pixel
    ///
    /// Takes the measured arrays in [CrossSection::ALL] order and returns the
    /// corrected arrays in the same order.
    pub fn correct(&self, measured: [&[f64]; 4]) -> Result<[Vec<f64>; 4]> {
        let prefactor = self.inverse()?;

        let expected = measured[0].len();
        if let Some(found) = measured.iter().map(|m| m.len()).find(|n| *n != expected) {
            return Err(Error::StackLengthMismatch { expected, found });
        }

        let mut corrected: [Vec<f64>; 4] = Default::default();
        for c in corrected.iter_mut() {
            c.reserve(expected);
        }

        for pixel in 0..expected {
            let raw = Vector4::new(
                measured[0][pixel],
                measured[1][pixel],
                measured[2][pixel],
                measured[3][pixel],
            );
            let result = prefactor * raw;
            for (c, value) in corrected.iter_mut().zip(result.iter()) {
                c.push(*value);
            }
        }

        Ok(corrected)
    }
}

fn exposure_times(times: &ExposureTimes, cross_section: CrossSection) -> Result<&[f64]> {
    match times.get(&cross_section) {
        Some(t) if !t.is_empty() => Ok(t),
        _ => Err(Error::MissingCrossSection(cross_section)),
    }
}
