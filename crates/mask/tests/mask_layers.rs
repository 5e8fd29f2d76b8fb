//! Integration tests for combining mask layers

use rstest::{fixture, rstest};
use vsans_geometry::{
    Carriage, InstrumentGeometry, Panel, PanelGeometry, PanelMap, PixelGrid, QGrid,
};
use vsans_mask::{
    beamstop_mask, external_mask, shadow_mask, threshold_mask, MaskSet, Sector, SectorKind,
    Thresholds,
};

#[fixture]
fn grid() -> QGrid {
    let panel = |distance: f64| PanelGeometry {
        pixels_x: 8,
        pixels_y: 10,
        beam_center_x: 0.0,
        beam_center_y: 0.0,
        distance,
        x_pixel_size: 8.4,
        y_pixel_size: 4.0,
        panel_gap: 3.5,
        spatial_calibration: -20.0,
        setback: 0.0,
        vertical_offset: 0.0,
        lateral_offset: 0.0,
    };

    let geometry = InstrumentGeometry {
        wavelength: 6.0,
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
    };

    QGrid::from_geometry(&geometry).unwrap()
}

/// Deterministic pseudo-random layer
fn scattered(grid: &QGrid, seed: usize) -> MaskSet {
    MaskSet::from_fn(grid, |panel, (i, j)| {
        (i * 7 + j * 3 + panel as usize * 5 + seed) % (seed % 4 + 2) != 0
    })
}

#[rstest]
fn combination_is_commutative_and_associative(grid: QGrid) {
    let a = scattered(&grid, 1);
    let b = scattered(&grid, 6);
    let c = sector(SectorKind::Diagonal).mask(&grid);

    let abc = a.combine(&b).unwrap().combine(&c).unwrap();
    let cab = c.combine(&a).unwrap().combine(&b).unwrap();
    let a_bc = a.combine(&b.combine(&c).unwrap()).unwrap();
    let all = MaskSet::combine_all([&b, &c, &a]).unwrap();

    assert_eq!(abc, cab);
    assert_eq!(abc, a_bc);
    assert_eq!(abc, all);
}

#[rstest]
fn all_selected_is_the_identity(grid: QGrid) {
    let a = scattered(&grid, 3);
    let identity = MaskSet::all_selected(&grid);
    assert_eq!(a.combine(&identity).unwrap(), a);
    assert_eq!(identity.selected_count(), 8 * 8 * 10);
}

#[rstest]
fn mismatched_shapes_are_rejected(grid: QGrid) {
    let wrong = MaskSet::from_panels(PanelMap::from([(Panel::MT, PixelGrid::filled(3, 3, true))]));
    assert!(MaskSet::all_selected(&grid).combine(&wrong).is_err());
    assert!(wrong.check_conformal(&grid).is_err());
    assert!(shadow_mask(&grid).check_conformal(&grid).is_ok());
}

fn sector(kind: SectorKind) -> Sector {
    Sector::new(kind, 10.0).unwrap()
}

#[rstest]
#[case(SectorKind::Horizontal)] // case 1
#[case(SectorKind::Vertical)] // case 2
#[case(SectorKind::Diagonal)] // case 3
#[case(SectorKind::AntiDiagonal)] // case 4
fn sector_masks_follow_azimuth(grid: QGrid, #[case] kind: SectorKind) {
    let slice = sector(kind);
    let mask = slice.mask(&grid);

    for (panel, q) in grid.panels() {
        for ((i, j), azimuth) in q.azimuth.indexed_iter() {
            assert_eq!(mask.is_selected(panel, i, j), slice.contains(*azimuth));
        }
    }

    let circular = sector(SectorKind::Circular).mask(&grid);
    assert!(mask.selected_count() < circular.selected_count());
}

#[rstest]
fn beamstop_removes_pixels_near_the_beam(grid: QGrid) {
    let mask = beamstop_mask(&grid);
    for (panel, q) in grid.panels() {
        for ((i, j), r) in q.radius.indexed_iter() {
            assert_eq!(mask.is_selected(panel, i, j), *r >= 2.54);
        }
    }
}

#[rstest]
fn measured_layers_from_counts() {
    let counts = PanelMap::from([
        (Panel::MB, PixelGrid::from_vec(2, 2, vec![0.0, 3.0, 9.0, 1.0]).unwrap()),
        (Panel::FB, PixelGrid::from_vec(2, 2, vec![0.0, 3.0, 9.0, 1.0]).unwrap()),
    ]);

    let thresholds = Thresholds {
        front: Some(1.0),
        middle: Some(4.0),
    };
    let mask = threshold_mask(&counts, &thresholds);
    assert_eq!(mask.panel(Panel::MB).unwrap().values(), &[false, false, true, false]);
    assert_eq!(mask.panel(Panel::FB).unwrap().values(), &[false, true, true, true]);

    let external = external_mask(&counts);
    assert_eq!(external.selected_count(), 2);
}

#[rstest]
fn sector_kinds_read_from_json() {
    let kinds: Vec<SectorKind> = serde_json::from_str(
        r#"[{"kind": "horizontal"}, {"kind": "anti-diagonal"}, {"kind": "custom", "primary": 30.0}]"#,
    )
    .unwrap();

    assert_eq!(kinds[0], SectorKind::Horizontal);
    assert_eq!(kinds[1], SectorKind::AntiDiagonal);
    assert_eq!(
        kinds[2],
        SectorKind::Custom {
            primary: 30.0,
            both_sides: false
        }
    );
}
