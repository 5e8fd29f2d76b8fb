// crate modules
use crate::error::{Error, Result};
use crate::{BinSettings, Profile, ProfilePoint, UncertaintyMode};

// external crates
use itertools::izip;
use log::{debug, trace};
use vsans_geometry::{Carriage, Panel, PanelMap, PixelGrid, QGrid};
use vsans_mask::MaskSet;
use vsans_utils::SliceExt;

/// Intensity and its uncertainty for every pixel of one panel
#[derive(Debug, Clone, PartialEq)]
pub struct PanelIntensity {
    /// Per-pixel intensity
    pub intensity: PixelGrid<f64>,
    /// Per-pixel one sigma uncertainty
    pub uncertainty: PixelGrid<f64>,
}

/// Intensities for every panel
pub type IntensityMap = PanelMap<PanelIntensity>;

/// One in-range pixel
#[derive(Debug, Clone, Copy)]
struct Sample {
    bin: usize,
    q: f64,
    intensity: f64,
    uncertainty: f64,
    resolution: f64,
    kept: bool,
}

/// Running sums of one bin
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    intensity: f64,
    variance: f64,
    q: f64,
    q_resolution: f64,
    pixels: usize,
    reference: usize,
    deviation: f64,
}

/// Reduces masked panels into a 1-D profile
///
/// Front and middle carriages are accumulated separately, as they have
/// different resolutions, and the profile lists the middle carriage first.
#[derive(Debug, Clone, Copy)]
pub struct Binner<'a> {
    settings: BinSettings,
    grid: &'a QGrid,
    selection: &'a MaskSet,
    reference: Option<&'a MaskSet>,
}

impl<'a> Binner<'a> {
    /// Bin pixels of `grid` selected by `selection`
    pub fn new(settings: BinSettings, grid: &'a QGrid, selection: &'a MaskSet) -> Self {
        Self {
            settings,
            grid,
            selection,
            reference: None,
        }
    }

    /// Selection before shadow and beamstop removal
    ///
    /// When set, every point reports the fraction of its reference pixels
    /// that survive in the final selection. Otherwise the shadow factor is 1.
    pub fn with_shadow_reference(mut self, reference: &'a MaskSet) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Bin settings in use
    pub fn settings(&self) -> &BinSettings {
        &self.settings
    }

    /// Histogram every panel with intensities into the profile
    pub fn bin(&self, data: &IntensityMap) -> Result<Profile> {
        let edges = self.settings.edges();
        let n = self.settings.bins();

        let mut points = Vec::new();
        for carriage in [Carriage::Middle, Carriage::Front] {
            let mut sums = vec![Accumulator::default(); n];

            let panels = Panel::on_carriage(carriage)
                .filter(|p| data.contains_key(p))
                .collect::<Vec<Panel>>();

            for panel in &panels {
                self.accumulate(*panel, data, &edges, &mut sums)?;
            }

            if self.settings.mode() == UncertaintyMode::PixelVariance {
                for panel in &panels {
                    self.accumulate_deviation(*panel, data, &edges, &mut sums)?;
                }
            }

            let before = points.len();
            points.extend(
                sums.iter()
                    .enumerate()
                    .filter(|(_, s)| s.pixels > 0)
                    .map(|(bin, s)| self.point(carriage, bin, s)),
            );
            debug!(
                "{} carriage: {} non-empty bins from {} panel(s)",
                carriage.long_name(),
                points.len() - before,
                panels.len()
            );
        }

        Ok(Profile::new(points))
    }

    /// Visit every in-range pixel of a panel that is selected or part of
    /// the shadow reference
    fn visit(
        &self,
        panel: Panel,
        data: &IntensityMap,
        edges: &[f64],
        mut f: impl FnMut(Sample),
    ) -> Result<()> {
        let q = self.grid.panel(panel)?;
        let values = data.get(&panel).ok_or(Error::MissingIntensity(panel))?;

        for grid in [&values.intensity, &values.uncertainty] {
            if grid.shape() != q.shape() {
                return Err(Error::ShapeMismatch {
                    panel,
                    expected: q.shape(),
                    found: grid.shape(),
                });
            }
        }

        for (((i, j), q), perp, parl, intensity, uncertainty) in izip!(
            q.q.indexed_iter(),
            q.sigma_perp.values(),
            q.sigma_parl.values(),
            values.intensity.values(),
            values.uncertainty.values()
        ) {
            let Ok(bin) = edges.find_bin_exclusive(*q) else {
                continue;
            };

            let kept = self.selection.is_selected(panel, i, j);
            let in_reference = self
                .reference
                .map(|r| r.is_selected(panel, i, j))
                .unwrap_or(false);

            if kept || in_reference {
                f(Sample {
                    bin,
                    q: *q,
                    intensity: *intensity,
                    uncertainty: *uncertainty,
                    resolution: perp.hypot(*parl),
                    kept,
                });
            }
        }

        Ok(())
    }

    fn accumulate(
        &self,
        panel: Panel,
        data: &IntensityMap,
        edges: &[f64],
        sums: &mut [Accumulator],
    ) -> Result<()> {
        let mut selected = 0;
        self.visit(panel, data, edges, |p| {
            let s = &mut sums[p.bin];
            s.reference += 1;
            if p.kept {
                s.intensity += p.intensity;
                s.variance += p.uncertainty * p.uncertainty;
                s.q += p.q;
                s.q_resolution += p.resolution;
                s.pixels += 1;
                selected += 1;
            }
        })?;
        trace!("{panel}: {selected} pixels binned");
        Ok(())
    }

    fn accumulate_deviation(
        &self,
        panel: Panel,
        data: &IntensityMap,
        edges: &[f64],
        sums: &mut [Accumulator],
    ) -> Result<()> {
        self.visit(panel, data, edges, |p| {
            let s = &mut sums[p.bin];
            if p.kept {
                let mean = s.intensity / s.pixels as f64;
                s.deviation += (p.intensity - mean).powi(2);
            }
        })
    }

    fn point(&self, carriage: Carriage, bin: usize, s: &Accumulator) -> ProfilePoint {
        let n = s.pixels as f64;
        let uncertainty = match self.settings.mode() {
            UncertaintyMode::Statistical => s.variance.sqrt() / n,
            UncertaintyMode::PixelVariance => (s.deviation / n).sqrt(),
        };

        let shadow = match self.reference {
            Some(_) if s.reference > 0 => (n / s.reference as f64).min(1.0),
            _ => 1.0,
        };

        ProfilePoint {
            carriage,
            bin,
            q: self.settings.centre(bin),
            intensity: s.intensity / n,
            uncertainty,
            q_resolution: s.q_resolution / n,
            mean_q: s.q / n,
            pixels: s.pixels,
            shadow,
        }
    }
}
