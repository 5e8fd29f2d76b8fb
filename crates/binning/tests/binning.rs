//! Integration tests for the binning engine

use rstest::{fixture, rstest};
use vsans_binning::{
    BinSettings, Binner, IntensityMap, PanelIntensity, Profile, UncertaintyMode,
};
use vsans_geometry::{Carriage, Panel, PanelMap, PanelQ, PixelGrid, QGrid};
use vsans_mask::MaskSet;

/// Panel Q fields with a given |Q| per pixel
fn panel_q(nx: usize, ny: usize, q: Vec<f64>) -> PanelQ {
    let zeros = PixelGrid::filled(nx, ny, 0.0);
    PanelQ {
        qx: zeros.clone(),
        qy: zeros.clone(),
        qz: zeros.clone(),
        q: PixelGrid::from_vec(nx, ny, q).unwrap(),
        sigma_perp: PixelGrid::filled(nx, ny, 3.0e-4),
        sigma_parl: PixelGrid::filled(nx, ny, 4.0e-4),
        azimuth: zeros.clone(),
        radius: PixelGrid::filled(nx, ny, 10.0),
    }
}

fn grid(panels: Vec<(Panel, PanelQ)>) -> QGrid {
    let solid_angle = panels.iter().map(|(p, _)| (*p, 1.0e-5)).collect();
    QGrid::from_panels(panels.into_iter().collect(), solid_angle, 2.54, 6.0)
}

fn uniform(nx: usize, ny: usize, intensity: f64, uncertainty: f64) -> PanelIntensity {
    PanelIntensity {
        intensity: PixelGrid::filled(nx, ny, intensity),
        uncertainty: PixelGrid::filled(nx, ny, uncertainty),
    }
}

#[fixture]
fn two_by_two() -> QGrid {
    grid(vec![(Panel::MT, panel_q(2, 2, vec![0.01, 0.01, 0.03, 0.03]))])
}

#[rstest]
#[case(UncertaintyMode::Statistical, 50.0_f64.sqrt())] // case 1
#[case(UncertaintyMode::PixelVariance, 0.0)] // case 2
fn uniform_counts_split_evenly(
    two_by_two: QGrid,
    #[case] mode: UncertaintyMode,
    #[case] expected_uncertainty: f64,
) {
    let settings = BinSettings::new(0.0, 0.04, 2, mode).unwrap();
    let mask = MaskSet::all_selected(&two_by_two);
    let data = IntensityMap::from([(Panel::MT, uniform(2, 2, 100.0, 10.0))]);

    let profile = Binner::new(settings, &two_by_two, &mask).bin(&data).unwrap();

    assert_eq!(profile.len(), 2);
    for point in profile.points() {
        assert_eq!(point.intensity, 100.0);
        assert_eq!(point.pixels, 2);
        assert_eq!(point.carriage, Carriage::Middle);
        assert!((point.uncertainty - expected_uncertainty).abs() < 1e-12);
    }
    assert!((profile.points()[0].mean_q - 0.01).abs() < 1e-15);
    assert!((profile.points()[1].q - 0.03).abs() < 1e-15);
}

#[rstest]
fn pixel_variance_measures_spread(two_by_two: QGrid) {
    let settings = BinSettings::new(0.0, 0.04, 2, UncertaintyMode::PixelVariance).unwrap();
    let mask = MaskSet::all_selected(&two_by_two);
    let data = IntensityMap::from([(
        Panel::MT,
        PanelIntensity {
            intensity: PixelGrid::from_vec(2, 2, vec![90.0, 110.0, 100.0, 100.0]).unwrap(),
            uncertainty: PixelGrid::filled(2, 2, 10.0),
        },
    )]);

    let profile = Binner::new(settings, &two_by_two, &mask).bin(&data).unwrap();
    assert_eq!(profile.points()[0].intensity, 100.0);
    assert_eq!(profile.points()[0].uncertainty, 10.0);
    assert_eq!(profile.points()[1].uncertainty, 0.0);
}

#[rstest]
fn q_is_the_bin_centre_and_mean_q_the_pixels() {
    let offset = grid(vec![(Panel::MT, panel_q(1, 2, vec![0.012, 0.014]))]);
    let settings = BinSettings::new(0.0, 0.04, 2, UncertaintyMode::Statistical).unwrap();
    let mask = MaskSet::all_selected(&offset);
    let data = IntensityMap::from([(Panel::MT, uniform(1, 2, 5.0, 1.0))]);

    let profile = Binner::new(settings, &offset, &mask).bin(&data).unwrap();
    assert_eq!(profile.len(), 1);
    let point = &profile.points()[0];
    assert_eq!(point.q, settings.centre(0));
    assert!((point.q - 0.01).abs() < 1e-15);
    assert!((point.mean_q - 0.013).abs() < 1e-12);
}

#[rstest]
fn empty_bins_are_dropped(two_by_two: QGrid) {
    let settings = BinSettings::new(0.0, 0.04, 3, UncertaintyMode::Statistical).unwrap();
    let mask = MaskSet::all_selected(&two_by_two);
    let data = IntensityMap::from([(Panel::MT, uniform(2, 2, 1.0, 1.0))]);

    let profile = Binner::new(settings, &two_by_two, &mask).bin(&data).unwrap();
    assert_eq!(profile.points().iter().map(|p| p.bin).collect::<Vec<_>>(), vec![0, 2]);
    assert!(profile.points().iter().all(|p| p.intensity.is_finite()));
}

#[rstest]
#[case(1)] // case 1
#[case(7)] // case 2
#[case(25)] // case 3
fn pixel_counts_are_conserved(#[case] bins: usize) {
    let q = |offset: f64| (0..30).map(|n| offset + 0.001 * n as f64).collect::<Vec<_>>();
    let grid = grid(vec![
        (Panel::ML, panel_q(5, 6, q(0.005))),
        (Panel::MR, panel_q(5, 6, q(0.006))),
        (Panel::FT, panel_q(6, 5, q(0.02))),
        (Panel::FB, panel_q(6, 5, q(0.0205))),
    ]);

    let mask = MaskSet::from_fn(&grid, |panel, (i, j)| (i + j + panel as usize) % 3 != 0);
    let data = grid
        .panels()
        .map(|(p, q)| (p, uniform(q.q.nx(), q.q.ny(), 5.0, 1.0)))
        .collect::<IntensityMap>();

    let settings = BinSettings::new(0.005, 0.05, bins, UncertaintyMode::Statistical).unwrap();
    let profile = Binner::new(settings, &grid, &mask).bin(&data).unwrap();

    assert_eq!(profile.total_pixels(), mask.selected_count());

    // middle carriage first
    let carriages = profile.points().iter().map(|p| p.carriage).collect::<Vec<_>>();
    let mut sorted = carriages.clone();
    sorted.sort();
    assert_eq!(carriages, sorted);
}

#[rstest]
fn shadow_factor_from_reference(two_by_two: QGrid) {
    let settings = BinSettings::new(0.0, 0.04, 2, UncertaintyMode::Statistical).unwrap();
    let reference = MaskSet::all_selected(&two_by_two);
    let selection = MaskSet::from_panels(PanelMap::from([(
        Panel::MT,
        PixelGrid::from_vec(2, 2, vec![true, false, true, true]).unwrap(),
    )]));
    let data = IntensityMap::from([(Panel::MT, uniform(2, 2, 100.0, 10.0))]);

    let profile = Binner::new(settings, &two_by_two, &selection)
        .with_shadow_reference(&reference)
        .bin(&data)
        .unwrap();

    assert_eq!(profile.points()[0].shadow, 0.5);
    assert_eq!(profile.points()[0].pixels, 1);
    assert_eq!(profile.points()[1].shadow, 1.0);
}

#[rstest]
fn mismatched_intensity_is_rejected(two_by_two: QGrid) {
    let settings = BinSettings::new(0.0, 0.04, 2, UncertaintyMode::Statistical).unwrap();
    let mask = MaskSet::all_selected(&two_by_two);
    let data = IntensityMap::from([(Panel::MT, uniform(3, 2, 1.0, 1.0))]);
    assert!(Binner::new(settings, &two_by_two, &mask).bin(&data).is_err());
}

#[rstest]
fn spin_flip_channels_combine(two_by_two: QGrid) {
    let settings = BinSettings::new(0.0, 0.04, 2, UncertaintyMode::Statistical).unwrap();
    let mask = MaskSet::all_selected(&two_by_two);
    let bin = |value: f64| {
        let data = IntensityMap::from([(Panel::MT, uniform(2, 2, value, 2.0))]);
        Binner::new(settings, &two_by_two, &mask).bin(&data).unwrap()
    };

    let (ud, du) = (bin(3.0), bin(4.0));
    let sf = Profile::spin_flip(&ud, &du);
    assert_eq!(sf.len(), 2);
    assert_eq!(sf.points()[0].intensity, 7.0);
    assert!((sf.points()[0].uncertainty - 2.0).abs() < 1e-12);
}

#[rstest]
fn uncertainty_mode_reads_kebab_case() {
    let mode: UncertaintyMode = serde_json::from_str(r#""pixel-variance""#).unwrap();
    assert_eq!(mode, UncertaintyMode::PixelVariance);
}
