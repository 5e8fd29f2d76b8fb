// crate modules
use crate::error::{Error, Result};

// external crates
use vsans_geometry::{Panel, PanelMap, PixelGrid, QGrid};

/// Boolean pixel selection for every panel of a configuration
///
/// `true` keeps a pixel, `false` removes it. Layers combine by logical AND,
/// so the order of combination never changes the result. A panel absent
/// from a layer is treated as fully selected by that layer.
///
/// ```rust
/// # use vsans_geometry::{Panel, PanelMap, PixelGrid};
/// # use vsans_mask::MaskSet;
/// let a = MaskSet::from_panels(PanelMap::from([
///     (Panel::MT, PixelGrid::from_vec(1, 3, vec![true, true, false]).unwrap()),
/// ]));
/// let b = MaskSet::from_panels(PanelMap::from([
///     (Panel::MT, PixelGrid::from_vec(1, 3, vec![false, true, true]).unwrap()),
/// ]));
///
/// let combined = a.combine(&b).unwrap();
/// assert_eq!(combined.selected_count(), 1);
/// assert_eq!(combined, b.combine(&a).unwrap());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaskSet {
    panels: PanelMap<PixelGrid<bool>>,
}

impl MaskSet {
    /// Wrap per-panel selections
    pub fn from_panels(panels: PanelMap<PixelGrid<bool>>) -> Self {
        Self { panels }
    }

    /// Every pixel of every panel selected
    pub fn all_selected(grid: &QGrid) -> Self {
        Self::from_fn(grid, |_, _| true)
    }

    /// Build a selection by evaluating `f(panel, (i, j))` for every pixel
    pub fn from_fn(grid: &QGrid, mut f: impl FnMut(Panel, (usize, usize)) -> bool) -> Self {
        let panels = grid
            .panels()
            .map(|(panel, q)| {
                let (nx, ny) = q.shape();
                (panel, PixelGrid::from_fn(nx, ny, |i, j| f(panel, (i, j))))
            })
            .collect();
        Self { panels }
    }

    /// Selection for one panel, if this layer covers it
    pub fn panel(&self, panel: Panel) -> Option<&PixelGrid<bool>> {
        self.panels.get(&panel)
    }

    /// Panels covered by this layer
    pub fn panels(&self) -> impl Iterator<Item = (Panel, &PixelGrid<bool>)> {
        self.panels.iter().map(|(p, m)| (*p, m))
    }

    /// True if the pixel is kept, pixels on uncovered panels are kept
    pub fn is_selected(&self, panel: Panel, i: usize, j: usize) -> bool {
        match self.panels.get(&panel) {
            Some(mask) => mask.get(i, j).copied().unwrap_or(false),
            None => true,
        }
    }

    /// Logical AND of two layers
    pub fn combine(&self, other: &MaskSet) -> Result<MaskSet> {
        let mut panels = self.panels.clone();

        for (panel, mask) in &other.panels {
            let combined = match panels.get(panel) {
                Some(existing) => existing
                    .zip_map(mask, |a, b| *a && *b)
                    .map_err(|_| Error::ShapeMismatch {
                        panel: *panel,
                        expected: existing.shape(),
                        found: mask.shape(),
                    })?,
                None => mask.clone(),
            };
            panels.insert(*panel, combined);
        }

        Ok(Self { panels })
    }

    /// Logical AND of any number of layers
    pub fn combine_all<'a>(layers: impl IntoIterator<Item = &'a MaskSet>) -> Result<MaskSet> {
        layers
            .into_iter()
            .try_fold(MaskSet::default(), |acc, layer| acc.combine(layer))
    }

    /// Check every covered panel matches the shape of the Q grid
    pub fn check_conformal(&self, grid: &QGrid) -> Result<()> {
        for (panel, mask) in &self.panels {
            let expected = grid.shape(*panel)?;
            if mask.shape() != expected {
                return Err(Error::ShapeMismatch {
                    panel: *panel,
                    expected,
                    found: mask.shape(),
                });
            }
        }
        Ok(())
    }

    /// Number of selected pixels across all covered panels
    pub fn selected_count(&self) -> usize {
        self.panels
            .values()
            .map(|m| m.values().iter().filter(|v| **v).count())
            .sum()
    }
}
