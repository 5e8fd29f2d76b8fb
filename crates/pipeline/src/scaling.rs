//! Absolute scaling of scattering exposures

// standard library
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// crate modules
use crate::error::{Error, Result};
use crate::frame::FrameStore;
use crate::grouping::{Catalogue, Exposure};
use crate::transmission::MONITOR_NORMALISATION;

// external crates
use log::{debug, info, trace};
use vsans_binning::{IntensityMap, PanelIntensity};
use vsans_geometry::{Panel, PanelMap, PixelGrid, QGrid};

/// Per-pixel detector sensitivity
///
/// Panels without a map have a sensitivity of one everywhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatField {
    panels: PanelMap<PixelGrid<f64>>,
}

impl FlatField {
    /// Uniform sensitivity on every panel
    pub fn unity() -> Self {
        Self::default()
    }

    /// Sensitivity maps for some or all panels
    ///
    /// ```rust
    /// # use vsans_geometry::{Panel, PanelMap, PixelGrid};
    /// # use vsans_pipeline::FlatField;
    /// let flat = FlatField::from_panels(PanelMap::from([
    ///     (Panel::FL, PixelGrid::filled(2, 2, 0.9)),
    /// ])).unwrap();
    ///
    /// assert_eq!(flat.value(Panel::FL, 1, 1), 0.9);
    /// assert_eq!(flat.value(Panel::ML, 0, 0), 1.0);
    ///
    /// let broken = PanelMap::from([(Panel::FL, PixelGrid::filled(1, 1, 0.0))]);
    /// assert!(FlatField::from_panels(broken).is_err());
    /// ```
    pub fn from_panels(panels: PanelMap<PixelGrid<f64>>) -> Result<Self> {
        for (panel, grid) in &panels {
            if let Some(value) = grid.values().iter().find(|v| !(**v > 0.0 && v.is_finite())) {
                return Err(Error::InvalidFlatField {
                    panel: *panel,
                    value: *value,
                });
            }
        }
        Ok(Self { panels })
    }

    /// Sensitivity of one pixel
    pub fn value(&self, panel: Panel, i: usize, j: usize) -> f64 {
        self.panels
            .get(&panel)
            .and_then(|grid| grid.get(i, j))
            .copied()
            .unwrap_or(1.0)
    }

    /// True if no panel has a sensitivity map
    pub fn is_unity(&self) -> bool {
        self.panels.is_empty()
    }
}

/// Read a flat field stored as JSON panel grids
pub fn read_flat_field<P: AsRef<Path>>(path: P) -> Result<FlatField> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let panels: PanelMap<PixelGrid<f64>> =
        serde_json::from_reader(reader).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    info!(
        "Flat field for {} panels read from {}",
        panels.len(),
        path.display()
    );
    FlatField::from_panels(panels)
}

/// Mean blocked beam count rate of every panel (counts/s)
///
/// Uses the scattering blocked beam of the configuration, else the
/// transmission one. Without either the map is empty and no background is
/// subtracted.
pub fn blocked_beam_rates(
    store: &FrameStore,
    catalogue: &Catalogue,
    config: &str,
) -> Result<PanelMap<f64>> {
    let Some(file) = catalogue
        .blocked_beam(config)
        .and_then(|files| files.for_scattering())
    else {
        info!("No blocked beam for {config}, background not subtracted");
        return Ok(PanelMap::new());
    };

    let frame = store.get(file)?;
    let count_time = frame.checked_count_time()?;

    let rates = frame
        .counts
        .iter()
        .filter(|(_, grid)| !grid.is_empty())
        .map(|(panel, grid)| (*panel, grid.sum() / grid.len() as f64 / count_time))
        .collect::<PanelMap<f64>>();

    debug!("{config}: blocked beam rates from {file}: {rates:?}");
    Ok(rates)
}

/// Converts raw counts into absolute intensity for one configuration
#[derive(Debug, Clone, Copy)]
pub struct AbsoluteScaler<'a> {
    grid: &'a QGrid,
    flat: &'a FlatField,
    rates: &'a PanelMap<f64>,
}

impl<'a> AbsoluteScaler<'a> {
    /// Scaler for the panels of `grid`
    pub fn new(grid: &'a QGrid, flat: &'a FlatField, rates: &'a PanelMap<f64>) -> Self {
        Self { grid, flat, rates }
    }

    /// Combine the exposures of one channel into absolute intensity
    ///
    /// Every exposure contributes `(raw - t*BB)/(N*flat*Omega) * (1e8/MON)/ABS`
    /// and the uncertainty is `sqrt(sum raw*(1e8/MON)^2)/ABS/(N*flat*Omega)`.
    pub fn scale(
        &self,
        store: &FrameStore,
        exposures: &[Exposure],
        abs_scale: f64,
    ) -> Result<IntensityMap> {
        let Some(first) = exposures.first() else {
            return Err(Error::EmptyChannel("scattering".into()));
        };
        trace!(
            "scaling {} exposures from {} with ABS = {abs_scale:.5e}",
            exposures.len(),
            first.file
        );

        let n = exposures.len() as f64;
        let mut data = IntensityMap::new();

        for (panel, q) in self.grid.panels() {
            let (nx, ny) = q.shape();
            let omega = self.grid.solid_angle(panel)?;
            let bb_rate = self.rates.get(&panel).copied().unwrap_or_default();

            let mut signal = vec![0.0; nx * ny];
            let mut variance = vec![0.0; nx * ny];

            for exposure in exposures {
                let frame = store.get(exposure.file)?;
                let raw = frame.panel_counts(panel)?;
                if raw.shape() != (nx, ny) {
                    return Err(Error::PanelShapeMismatch {
                        file: frame.file_number,
                        panel,
                        expected: (nx, ny),
                        found: raw.shape(),
                    });
                }

                let norm = MONITOR_NORMALISATION / frame.checked_monitor()?;
                let background = frame.count_time * bb_rate;
                for (k, value) in raw.values().iter().enumerate() {
                    signal[k] += (value - background) * norm;
                    variance[k] += value * norm * norm;
                }
            }

            let denominator =
                PixelGrid::from_fn(nx, ny, |i, j| n * self.flat.value(panel, i, j) * omega);
            let intensity = PixelGrid::from_vec(nx, ny, signal)?
                .zip_map(&denominator, |s, d| s / d / abs_scale)?;
            let uncertainty = PixelGrid::from_vec(nx, ny, variance)?
                .zip_map(&denominator, |v, d| v.max(0.0).sqrt() / abs_scale / d)?;

            data.insert(
                panel,
                PanelIntensity {
                    intensity,
                    uncertainty,
                },
            );
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_field_defaults_to_one() {
        let flat = FlatField::unity();
        assert!(flat.is_unity());
        assert_eq!(flat.value(Panel::MB, 10, 3), 1.0);
    }

    #[test]
    fn flat_field_outside_grid_is_one() {
        let flat =
            FlatField::from_panels(PanelMap::from([(Panel::FT, PixelGrid::filled(1, 1, 2.0))]))
                .unwrap();
        assert_eq!(flat.value(Panel::FT, 0, 0), 2.0);
        assert_eq!(flat.value(Panel::FT, 4, 0), 1.0);
    }
}
