// crate modules
use crate::MaskSet;

// external crates
use serde::{Deserialize, Serialize};
use vsans_geometry::{Carriage, PanelMap, PixelGrid};

/// Count thresholds for building a mask from a calibration exposure
///
/// Pixels at or above the threshold of their carriage are kept. A carriage
/// without a threshold is left fully selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Threshold for front carriage panels
    #[serde(default)]
    pub front: Option<f64>,
    /// Threshold for middle carriage panels
    #[serde(default)]
    pub middle: Option<f64>,
}

impl Thresholds {
    /// Threshold for one carriage
    pub fn for_carriage(&self, carriage: Carriage) -> Option<f64> {
        match carriage {
            Carriage::Front => self.front,
            Carriage::Middle => self.middle,
        }
    }

    /// True if neither carriage is thresholded
    pub fn is_empty(&self) -> bool {
        self.front.is_none() && self.middle.is_none()
    }
}

/// Mask measured from the counts of a calibration exposure
///
/// ```rust
/// # use vsans_geometry::{Panel, PanelMap, PixelGrid};
/// # use vsans_mask::{threshold_mask, Thresholds};
/// let counts = PanelMap::from([
///     (Panel::FT, PixelGrid::from_vec(1, 3, vec![0.0, 5.0, 20.0]).unwrap()),
///     (Panel::MT, PixelGrid::from_vec(1, 2, vec![0.0, 1.0]).unwrap()),
/// ]);
/// let thresholds = Thresholds { front: Some(5.0), middle: None };
///
/// let mask = threshold_mask(&counts, &thresholds);
/// assert_eq!(mask.panel(Panel::FT).unwrap().values(), &[false, true, true]);
/// assert!(mask.panel(Panel::MT).is_none());
/// ```
pub fn threshold_mask(counts: &PanelMap<PixelGrid<f64>>, thresholds: &Thresholds) -> MaskSet {
    let panels = counts
        .iter()
        .filter_map(|(panel, grid)| {
            let threshold = thresholds.for_carriage(panel.carriage())?;
            Some((*panel, grid.map(|v| *v >= threshold)))
        })
        .collect();
    MaskSet::from_panels(panels)
}

/// Mask from an externally supplied array
///
/// Zero-valued pixels are kept and anything else is removed.
///
/// ```rust
/// # use vsans_geometry::{Panel, PanelMap, PixelGrid};
/// # use vsans_mask::external_mask;
/// let raw = PanelMap::from([
///     (Panel::ML, PixelGrid::from_vec(2, 1, vec![0.0, 1.0]).unwrap()),
/// ]);
/// let mask = external_mask(&raw);
/// assert_eq!(mask.panel(Panel::ML).unwrap().values(), &[true, false]);
/// ```
pub fn external_mask(raw: &PanelMap<PixelGrid<f64>>) -> MaskSet {
    let panels = raw
        .iter()
        .map(|(panel, grid)| (*panel, grid.map(|v| *v == 0.0)))
        .collect();
    MaskSet::from_panels(panels)
}
