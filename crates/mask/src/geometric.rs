// crate modules
use crate::MaskSet;

// external crates
use vsans_geometry::{Panel, QGrid};

/// Pixels shadowed by fixed obstructions in front of each panel
///
/// The zones are pixel index ranges measured on the instrument. Pixels
/// inside a zone are removed.
///
/// | panel   | removed                                  |
/// |---------|------------------------------------------|
/// | MT, MB  | `\|i - 64\| <= 2`                        |
/// | ML      | `\|j - 68\| <= 50`, except `\|i - 26\| <= 1` |
/// | MR      | `\|j - 68\| <= 50`                       |
/// | FT, FB  | `\|i - 64\| <= 40`                       |
pub fn shadow_mask(grid: &QGrid) -> MaskSet {
    MaskSet::from_fn(grid, |panel, (i, j)| !in_shadow(panel, i, j))
}

fn in_shadow(panel: Panel, i: usize, j: usize) -> bool {
    let near = |index: usize, centre: usize, width: usize| index.abs_diff(centre) <= width;

    match panel {
        Panel::MT | Panel::MB => near(i, 64, 2),
        Panel::ML => near(j, 68, 50) && !near(i, 26, 1),
        Panel::MR => near(j, 68, 50),
        Panel::FT | Panel::FB => near(i, 64, 40),
        Panel::FL | Panel::FR => false,
    }
}

/// Pixels behind the beamstop
///
/// Removes every pixel closer to the beam centre than the beamstop radius.
pub fn beamstop_mask(grid: &QGrid) -> MaskSet {
    let radius = grid.beamstop_radius();
    MaskSet::from_fn(grid, |panel, (i, j)| {
        grid.panel(panel)
            .map(|q| q.radius[(i, j)] >= radius)
            .unwrap_or(true)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_zones() {
        assert!(in_shadow(Panel::MT, 62, 0));
        assert!(!in_shadow(Panel::MT, 61, 0));
        assert!(in_shadow(Panel::ML, 0, 18));
        assert!(!in_shadow(Panel::ML, 26, 68));
        assert!(!in_shadow(Panel::MR, 0, 119));
        assert!(in_shadow(Panel::FB, 24, 10));
        assert!(!in_shadow(Panel::FL, 64, 68));
    }
}
