// standard library
use std::fmt::Display;

// crate modules
use crate::error::{Error, Result};
use crate::MaskSet;

// external crates
use serde::{Deserialize, Serialize};
use vsans_geometry::QGrid;

/// Named angular slices of the detector plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SectorKind {
    /// Along the horizontal axis, both sides of the beam
    Horizontal,
    /// Along the vertical axis, both sides of the beam
    Vertical,
    /// Along the 45 degree diagonal, both sides of the beam
    Diagonal,
    /// Along the 135 degree diagonal, both sides of the beam
    AntiDiagonal,
    /// Every azimuth
    Circular,
    /// Any primary angle, optionally mirrored through the beam
    Custom {
        /// Primary angle (degrees)
        primary: f64,
        /// Include the diametrically opposite slice
        #[serde(default)]
        both_sides: bool,
    },
}

impl SectorKind {
    /// Name used in output file names
    pub fn name(&self) -> String {
        match self {
            Self::Horizontal => "Horizontal".to_string(),
            Self::Vertical => "Vertical".to_string(),
            Self::Diagonal => "Diagonal".to_string(),
            Self::AntiDiagonal => "AntiDiagonal".to_string(),
            Self::Circular => "Circular".to_string(),
            Self::Custom { primary, .. } => format!("Sector{primary}"),
        }
    }
}

impl Display for SectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Angular selection around a primary angle
///
/// Azimuths are compared modulo 360 degrees so slices spanning the 0/360
/// boundary have no gap.
///
/// ```rust
/// # use vsans_mask::{Sector, SectorKind};
/// let sector = Sector::new(SectorKind::Horizontal, 10.0).unwrap();
/// assert!(sector.contains(5.0));
/// assert!(sector.contains(-5.0));
/// assert!(sector.contains(355.0));
/// assert!(sector.contains(175.0));
/// assert!(!sector.contains(90.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sector {
    kind: SectorKind,
    half_width: f64,
}

impl Sector {
    /// Sector of the given kind and half width (degrees)
    pub fn new(kind: SectorKind, half_width: f64) -> Result<Self> {
        if !(half_width > 0.0) {
            return Err(Error::InvalidHalfWidth(half_width));
        }
        Ok(Self { kind, half_width })
    }

    /// Kind of sector
    pub fn kind(&self) -> SectorKind {
        self.kind
    }

    /// Half width (degrees)
    pub fn half_width(&self) -> f64 {
        self.half_width
    }

    /// Primary and optional secondary angles, `None` for circular
    pub fn angles(&self) -> Option<(f64, Option<f64>)> {
        let (primary, both_sides) = match self.kind {
            SectorKind::Horizontal => (0.0, true),
            SectorKind::Vertical => (90.0, true),
            SectorKind::Diagonal => (45.0, true),
            SectorKind::AntiDiagonal => (135.0, true),
            SectorKind::Circular => return None,
            SectorKind::Custom {
                primary,
                both_sides,
            } => (primary, both_sides),
        };

        let secondary = both_sides.then(|| {
            let angle = primary + 180.0;
            if angle > 360.0 {
                angle - 360.0
            } else {
                angle
            }
        });

        Some((primary, secondary))
    }

    /// True if an azimuth (degrees) falls inside the sector
    pub fn contains(&self, azimuth: f64) -> bool {
        let Some((primary, secondary)) = self.angles() else {
            return true;
        };

        within(azimuth, primary, self.half_width)
            || secondary.is_some_and(|s| within(azimuth, s, self.half_width))
    }

    /// Selection of every pixel whose azimuth lies inside the sector
    pub fn mask(&self, grid: &QGrid) -> MaskSet {
        MaskSet::from_fn(grid, |panel, (i, j)| {
            grid.panel(panel)
                .map(|q| self.contains(q.azimuth[(i, j)]))
                .unwrap_or(false)
        })
    }
}

fn within(azimuth: f64, centre: f64, half_width: f64) -> bool {
    (azimuth - centre).abs() <= half_width
        || (azimuth + 360.0 - centre).abs() <= half_width
        || (azimuth - 360.0 - centre).abs() <= half_width
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secondary_wraps_past_full_turn() {
        let sector = Sector::new(
            SectorKind::Custom {
                primary: 270.0,
                both_sides: true,
            },
            5.0,
        )
        .unwrap();
        assert_eq!(sector.angles(), Some((270.0, Some(90.0))));
        assert!(sector.contains(-90.0));
        assert!(sector.contains(92.0));
    }

    #[test]
    fn single_sided_custom() {
        let sector = Sector::new(
            SectorKind::Custom {
                primary: 30.0,
                both_sides: false,
            },
            5.0,
        )
        .unwrap();
        assert!(sector.contains(33.0));
        assert!(!sector.contains(-150.0));
    }

    #[test]
    fn circular_keeps_everything() {
        let sector = Sector::new(SectorKind::Circular, 1.0).unwrap();
        assert!(sector.contains(-179.0) && sector.contains(123.0));
    }

    #[test]
    fn zero_width_is_rejected() {
        assert!(Sector::new(SectorKind::Vertical, 0.0).is_err());
    }
}
