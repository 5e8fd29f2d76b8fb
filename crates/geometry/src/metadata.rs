// crate modules
use crate::error::{Error, Result};
use crate::{Carriage, Panel, PanelMap, Position};

// external crates
use serde::{Deserialize, Serialize};

/// Geometry metadata recorded for a single detector panel
///
/// Pixel pitch, panel gap and the spatial calibration coefficient are kept
/// in millimetres exactly as written by the instrument. Everything else is in
/// centimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelGeometry {
    /// Number of pixels along x
    pub pixels_x: usize,
    /// Number of pixels along y
    pub pixels_y: usize,
    /// Beam centre x (cm)
    pub beam_center_x: f64,
    /// Beam centre y (cm)
    pub beam_center_y: f64,
    /// Sample to carriage distance (cm)
    pub distance: f64,
    /// Pixel pitch along x (mm)
    pub x_pixel_size: f64,
    /// Pixel pitch along y (mm)
    pub y_pixel_size: f64,
    /// Gap between the panel pair (mm)
    pub panel_gap: f64,
    /// Fixed coordinate across the tubes from the spatial calibration (mm)
    pub spatial_calibration: f64,
    /// Extra distance behind the carriage for top/bottom panels (cm)
    #[serde(default)]
    pub setback: f64,
    /// Vertical offset of top/bottom panels (cm)
    #[serde(default)]
    pub vertical_offset: f64,
    /// Lateral offset of left/right panels (cm)
    #[serde(default)]
    pub lateral_offset: f64,
}

impl PanelGeometry {
    /// Pixel pitch `(x, y)` in cm
    pub fn pixel_pitch(&self) -> (f64, f64) {
        (self.x_pixel_size / 10.0, self.y_pixel_size / 10.0)
    }

    /// Sample to panel distance in cm, including setback for top/bottom
    pub fn real_distance(&self, position: Position) -> f64 {
        if position.is_horizontal_pair() {
            self.distance + self.setback
        } else {
            self.distance
        }
    }

    /// Real-space coordinate of pixel (0, 0) before beam centre correction
    ///
    /// Top and bottom panels are offset vertically and sit on a fixed
    /// horizontal coordinate, left and right panels the other way around.
    pub fn origin(&self, position: Position) -> (f64, f64) {
        let (xpix, ypix) = self.pixel_pitch();
        let gap = self.panel_gap / 10.0;
        let coefficient = self.spatial_calibration / 10.0;
        let (nx, ny) = (self.pixels_x as f64, self.pixels_y as f64);

        match position {
            Position::Top => (coefficient, 0.5 * ypix + self.vertical_offset + gap / 2.0),
            Position::Bottom => (
                coefficient,
                self.vertical_offset - (ny - 0.5) * ypix - gap / 2.0,
            ),
            Position::Left => (
                self.lateral_offset - (nx - 0.5) * xpix - gap / 2.0,
                coefficient,
            ),
            Position::Right => (0.5 * xpix + self.lateral_offset + gap / 2.0, coefficient),
        }
    }

    /// Solid angle subtended by one pixel (sr)
    pub fn solid_angle(&self, position: Position) -> f64 {
        let (xpix, ypix) = self.pixel_pitch();
        let z = self.real_distance(position);
        (xpix / z) * (ypix / z)
    }

    fn validate(&self, panel: Panel) -> Result<()> {
        if !(self.x_pixel_size > 0.0 && self.y_pixel_size > 0.0) {
            return Err(Error::InvalidPixelSize {
                panel,
                x: self.x_pixel_size,
                y: self.y_pixel_size,
            });
        }

        if !(self.real_distance(panel.position()) > 0.0) {
            return Err(Error::ZeroFlightPath {
                name: "sample to panel",
                value: self.real_distance(panel.position()),
            });
        }

        Ok(())
    }
}

/// Geometry metadata of one representative exposure
///
/// Everything needed to map every pixel of every panel onto momentum
/// transfer and its resolution.
///
/// ```rust
/// # use vsans_geometry::{Carriage, InstrumentGeometry};
/// let geometry = InstrumentGeometry {
///     wavelength: 6.0,
///     wavelength_spread: 0.12,
///     beamstop_diameter: 50.8,
///     source_aperture: 1.5,
///     sample_aperture: 0.635,
///     source_aperture_to_sample: 1500.0,
///     sample_to_front_detector: 400.0,
///     sample_to_middle_detector: 1900.0,
///     panels: Default::default(),
/// };
///
/// assert_eq!(geometry.flight_path(Carriage::Middle), 1900.0);
/// assert!((geometry.beamstop_radius() - 2.54).abs() < 1e-12);
///
/// // no panels recorded
/// assert!(geometry.validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentGeometry {
    /// Neutron wavelength (Angstrom)
    pub wavelength: f64,
    /// Fractional wavelength spread (FWHM)
    pub wavelength_spread: f64,
    /// Beamstop diameter (mm)
    pub beamstop_diameter: f64,
    /// Source aperture radius (cm)
    pub source_aperture: f64,
    /// Sample aperture radius (cm)
    pub sample_aperture: f64,
    /// Source aperture to sample distance (cm)
    pub source_aperture_to_sample: f64,
    /// Sample to front carriage distance (cm)
    pub sample_to_front_detector: f64,
    /// Sample to middle carriage distance (cm)
    pub sample_to_middle_detector: f64,
    /// Per-panel geometry
    pub panels: PanelMap<PanelGeometry>,
}

impl InstrumentGeometry {
    /// Sample to detector flight path for a carriage (cm)
    pub fn flight_path(&self, carriage: Carriage) -> f64 {
        match carriage {
            Carriage::Front => self.sample_to_front_detector,
            Carriage::Middle => self.sample_to_middle_detector,
        }
    }

    /// Beamstop shadow radius (cm)
    pub fn beamstop_radius(&self) -> f64 {
        self.beamstop_diameter / 20.0
    }

    /// Geometry of a single panel
    pub fn panel(&self, panel: Panel) -> Result<&PanelGeometry> {
        self.panels.get(&panel).ok_or(Error::MissingPanel(panel))
    }

    /// Check the metadata describes a usable configuration
    ///
    /// A missing or non-positive wavelength, a zero flight path, or a
    /// missing panel are fatal for every sample of the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.wavelength.is_finite() && self.wavelength > 0.0) {
            return Err(Error::MissingWavelength(self.wavelength));
        }

        for (name, value) in [
            ("source aperture to sample", self.source_aperture_to_sample),
            ("sample to front detector", self.sample_to_front_detector),
            ("sample to middle detector", self.sample_to_middle_detector),
        ] {
            if !(value > 0.0) {
                return Err(Error::ZeroFlightPath { name, value });
            }
        }

        for panel in Panel::ALL {
            self.panel(panel)?.validate(panel)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> PanelGeometry {
        PanelGeometry {
            pixels_x: 48,
            pixels_y: 128,
            beam_center_x: 0.0,
            beam_center_y: 0.0,
            distance: 400.0,
            x_pixel_size: 8.4,
            y_pixel_size: 4.0,
            panel_gap: 3.5,
            spatial_calibration: -260.0,
            setback: 41.0,
            vertical_offset: 1.0,
            lateral_offset: -2.0,
        }
    }

    #[test]
    fn setback_only_for_top_and_bottom() {
        let p = panel();
        assert_eq!(p.real_distance(Position::Top), 441.0);
        assert_eq!(p.real_distance(Position::Bottom), 441.0);
        assert_eq!(p.real_distance(Position::Left), 400.0);
    }

    #[test]
    fn origins_follow_panel_side() {
        let p = panel();

        let (x, y) = p.origin(Position::Top);
        assert_eq!(x, -26.0);
        assert!((y - (0.2 + 1.0 + 0.175)).abs() < 1e-12);

        let (x, y) = p.origin(Position::Right);
        assert!((x - (0.42 - 2.0 + 0.175)).abs() < 1e-12);
        assert_eq!(y, -26.0);

        let (x, _) = p.origin(Position::Left);
        assert!((x - (-2.0 - 47.5 * 0.84 - 0.175)).abs() < 1e-12);
    }

    #[test]
    fn solid_angle_uses_real_distance() {
        let p = panel();
        let expected = (0.84 / 441.0) * (0.4 / 441.0);
        assert!((p.solid_angle(Position::Top) - expected).abs() < 1e-18);
    }
}
