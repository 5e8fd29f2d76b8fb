// standard library
use std::f64::consts::PI;

// crate modules
use crate::error::Result;
use crate::{Carriage, InstrumentGeometry, Panel, PanelMap, PixelGrid};

// external crates
use log::{debug, trace};
use vsans_utils::SliceExt;

/// Standard gravity (cm/s^2)
const GRAVITY: f64 = 981.0;

/// Neutron wavelength to velocity conversion used by the gravity term
const VELOCITY_CONSTANT: f64 = 252.77;

/// Momentum transfer and resolution of a single pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelQ {
    /// Q component along x (1/A)
    pub qx: f64,
    /// Q component along y (1/A)
    pub qy: f64,
    /// Q component along the beam (1/A)
    pub qz: f64,
    /// |Q| (1/A)
    pub q: f64,
    /// Perpendicular Q resolution (1/A)
    pub sigma_perp: f64,
    /// Parallel Q resolution including gravity (1/A)
    pub sigma_parl: f64,
    /// In-plane azimuth from +x (degrees, -180 to 180)
    pub azimuth: f64,
    /// Distance from the beam centre (cm)
    pub radius: f64,
}

impl PixelQ {
    /// Combined resolution, perpendicular and parallel in quadrature
    pub fn resolution(&self) -> f64 {
        self.sigma_perp.hypot(self.sigma_parl)
    }
}

/// Per-pixel Q fields for one panel, each shaped like the panel data
#[derive(Debug, Clone, PartialEq)]
pub struct PanelQ {
    /// Q component along x
    pub qx: PixelGrid<f64>,
    /// Q component along y
    pub qy: PixelGrid<f64>,
    /// Q component along the beam
    pub qz: PixelGrid<f64>,
    /// |Q|
    pub q: PixelGrid<f64>,
    /// Perpendicular resolution
    pub sigma_perp: PixelGrid<f64>,
    /// Parallel resolution
    pub sigma_parl: PixelGrid<f64>,
    /// In-plane azimuth (degrees)
    pub azimuth: PixelGrid<f64>,
    /// Distance from the beam centre (cm)
    pub radius: PixelGrid<f64>,
}

impl PanelQ {
    fn from_pixels(pixels: PixelGrid<PixelQ>) -> Self {
        Self {
            qx: pixels.map(|p| p.qx),
            qy: pixels.map(|p| p.qy),
            qz: pixels.map(|p| p.qz),
            q: pixels.map(|p| p.q),
            sigma_perp: pixels.map(|p| p.sigma_perp),
            sigma_parl: pixels.map(|p| p.sigma_parl),
            azimuth: pixels.map(|p| p.azimuth),
            radius: pixels.map(|p| p.radius),
        }
    }

    /// Shape of every field as `(nx, ny)`
    pub fn shape(&self) -> (usize, usize) {
        self.q.shape()
    }

    /// Collect the fields of a single pixel
    pub fn pixel(&self, i: usize, j: usize) -> PixelQ {
        PixelQ {
            qx: self.qx[(i, j)],
            qy: self.qy[(i, j)],
            qz: self.qz[(i, j)],
            q: self.q[(i, j)],
            sigma_perp: self.sigma_perp[(i, j)],
            sigma_parl: self.sigma_parl[(i, j)],
            azimuth: self.azimuth[(i, j)],
            radius: self.radius[(i, j)],
        }
    }

    /// Combined resolution for every pixel
    pub fn resolution(&self) -> PixelGrid<f64> {
        PixelGrid::from_fn(self.q.nx(), self.q.ny(), |i, j| {
            self.sigma_perp[(i, j)].hypot(self.sigma_parl[(i, j)])
        })
    }
}

/// Momentum transfer field of every panel for one configuration
///
/// Built once from the metadata of a representative exposure and shared by
/// reference by every sample measured in that configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct QGrid {
    panels: PanelMap<PanelQ>,
    solid_angle: PanelMap<f64>,
    beamstop_radius: f64,
    wavelength: f64,
}

impl QGrid {
    /// Derive the Q field of every panel
    ///
    /// Fails on a missing wavelength, a zero flight path, or missing panel
    /// metadata.
    pub fn from_geometry(geometry: &InstrumentGeometry) -> Result<Self> {
        geometry.validate()?;

        let mut panels = PanelMap::new();
        let mut solid_angle = PanelMap::new();

        for panel in Panel::ALL {
            let panel_q = panel_q(geometry, panel)?;
            let omega = geometry.panel(panel)?.solid_angle(panel.position());
            debug!(
                "{} mapped to Q, {}x{} pixels, solid angle {:.4e} sr",
                panel.long_name(),
                panel_q.q.nx(),
                panel_q.q.ny(),
                omega
            );
            panels.insert(panel, panel_q);
            solid_angle.insert(panel, omega);
        }

        Ok(Self {
            panels,
            solid_angle,
            beamstop_radius: geometry.beamstop_radius(),
            wavelength: geometry.wavelength,
        })
    }

    /// Assemble a grid from precomputed panel fields
    ///
    /// Useful for synthetic detectors, where the Q field is known directly.
    pub fn from_panels(
        panels: PanelMap<PanelQ>,
        solid_angle: PanelMap<f64>,
        beamstop_radius: f64,
        wavelength: f64,
    ) -> Self {
        Self {
            panels,
            solid_angle,
            beamstop_radius,
            wavelength,
        }
    }

    /// Q fields for one panel
    pub fn panel(&self, panel: Panel) -> Result<&PanelQ> {
        self.panels
            .get(&panel)
            .ok_or(crate::Error::MissingPanel(panel))
    }

    /// All panels in file order
    pub fn panels(&self) -> impl Iterator<Item = (Panel, &PanelQ)> {
        self.panels.iter().map(|(p, q)| (*p, q))
    }

    /// Solid angle of one pixel on a panel (sr)
    pub fn solid_angle(&self, panel: Panel) -> Result<f64> {
        self.solid_angle
            .get(&panel)
            .copied()
            .ok_or(crate::Error::MissingPanel(panel))
    }

    /// Beamstop shadow radius (cm)
    pub fn beamstop_radius(&self) -> f64 {
        self.beamstop_radius
    }

    /// Wavelength the grid was computed for (Angstrom)
    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    /// Pixel grid shape of a panel
    pub fn shape(&self, panel: Panel) -> Result<(usize, usize)> {
        Ok(self.panel(panel)?.shape())
    }

    /// Usable Q extent of the configuration
    ///
    /// The lower end is the smallest |Q| seen by the middle carriage and the
    /// upper end the largest |Q| seen by the front carriage.
    pub fn q_extent(&self) -> Result<(f64, f64)> {
        let carriage_q = |carriage: Carriage| -> Vec<f64> {
            self.panels()
                .filter(|(p, _)| p.carriage() == carriage)
                .flat_map(|(_, q)| q.q.values().iter().copied())
                .collect()
        };

        let q_min = carriage_q(Carriage::Middle).try_min()?;
        let q_max = carriage_q(Carriage::Front).try_max()?;
        Ok((q_min, q_max))
    }
}

/// Closed form Q and resolution for every pixel on a panel
fn panel_q(geometry: &InstrumentGeometry, panel: Panel) -> Result<PanelQ> {
    let metadata = geometry.panel(panel)?;
    let position = panel.position();

    let (xpix, ypix) = metadata.pixel_pitch();
    let (x0, y0) = metadata.origin(position);
    let z = metadata.real_distance(position);

    let lambda = geometry.wavelength;
    let l1 = geometry.source_aperture_to_sample;
    let l2 = geometry.flight_path(panel.carriage());
    let r1 = geometry.source_aperture;
    let r2 = geometry.sample_aperture;

    let k = 2.0 * PI / lambda;
    let inv_lp = 1.0 / l1 + 1.0 / l2;
    let prefactor = k * k / 12.0;
    let apertures = 3.0 * (r1 / l1).powi(2) + 3.0 * (r2 * inv_lp).powi(2);

    let wl = lambda * 1.0e-8;
    let a = -0.5 * GRAVITY * l2 * (l1 + l2) * VELOCITY_CONSTANT.powi(2);
    let spread = (geometry.wavelength_spread * k / l2).powi(2) / 6.0;

    trace!("{panel}: origin ({x0:.4}, {y0:.4}) cm, z = {z:.3} cm");

    let pixels = PixelGrid::from_fn(metadata.pixels_x, metadata.pixels_y, |i, j| {
        let x = x0 - metadata.beam_center_x + i as f64 * xpix;
        let y = y0 - metadata.beam_center_y + j as f64 * ypix;

        let radius = (x * x + y * y).sqrt();
        let theta = radius.atan2(z) / 2.0;
        let phi = y.atan2(x);
        let (sin_phi, cos_phi) = phi.sin_cos();

        let q = 4.0 * PI / lambda * theta.sin();

        let sigma_d_perp = sin_phi * xpix + cos_phi * ypix;
        let sigma_d_parl = cos_phi * xpix + sin_phi * ypix;
        let gravity =
            spread * (radius * radius - 4.0 * a * sin_phi * wl * wl + 4.0 * a * a * wl.powi(4));

        let var_perp = prefactor * (apertures + (sigma_d_perp / l2).powi(2));
        let var_parl = prefactor * (apertures + (sigma_d_parl / l2).powi(2)) + gravity;

        PixelQ {
            qx: q * theta.cos() * cos_phi,
            qy: q * theta.cos() * sin_phi,
            qz: q * theta.sin(),
            q,
            sigma_perp: var_perp.sqrt(),
            sigma_parl: var_parl.sqrt(),
            azimuth: phi.to_degrees(),
            radius,
        }
    });

    Ok(PanelQ::from_pixels(pixels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PanelGeometry;

    fn geometry(wavelength: f64) -> InstrumentGeometry {
        let panel = |distance: f64| PanelGeometry {
            pixels_x: 4,
            pixels_y: 6,
            beam_center_x: 0.0,
            beam_center_y: 0.0,
            distance,
            x_pixel_size: 8.4,
            y_pixel_size: 4.0,
            panel_gap: 3.5,
            spatial_calibration: -10.0,
            setback: 0.0,
            vertical_offset: 0.0,
            lateral_offset: 0.0,
        };

        InstrumentGeometry {
            wavelength,
            wavelength_spread: 0.12,
            beamstop_diameter: 50.8,
            source_aperture: 1.5,
            sample_aperture: 0.635,
            source_aperture_to_sample: 1500.0,
            sample_to_front_detector: 400.0,
            sample_to_middle_detector: 1900.0,
            panels: Panel::ALL
                .into_iter()
                .map(|p| match p.carriage() {
                    Carriage::Front => (p, panel(400.0)),
                    Carriage::Middle => (p, panel(1900.0)),
                })
                .collect(),
        }
    }

    #[test]
    fn components_recombine_to_magnitude() {
        let grid = QGrid::from_geometry(&geometry(6.0)).unwrap();
        for (_, panel) in grid.panels() {
            for i in 0..panel.q.nx() {
                for j in 0..panel.q.ny() {
                    let p = panel.pixel(i, j);
                    let norm = (p.qx * p.qx + p.qy * p.qy + p.qz * p.qz).sqrt();
                    assert!((norm - p.q).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn zero_wavelength_is_fatal() {
        assert!(QGrid::from_geometry(&geometry(0.0)).is_err());
    }

    #[test]
    fn zero_flight_path_is_fatal() {
        let mut g = geometry(6.0);
        g.source_aperture_to_sample = 0.0;
        assert!(QGrid::from_geometry(&g).is_err());
    }

    #[test]
    fn computed_once_is_identical() {
        let g = geometry(6.0);
        assert_eq!(QGrid::from_geometry(&g).unwrap(), QGrid::from_geometry(&g).unwrap());
    }

    #[test]
    fn middle_extent_starts_lower() {
        let grid = QGrid::from_geometry(&geometry(6.0)).unwrap();
        let (q_min, q_max) = grid.q_extent().unwrap();
        assert!(q_min < q_max);
    }
}
