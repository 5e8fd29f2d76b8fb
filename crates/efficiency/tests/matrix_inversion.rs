//! Integration tests for building, inverting and applying efficiency matrices

use nalgebra::Matrix4;
use rstest::{fixture, rstest};
use vsans_decay::{CellLibrary, HeCell};
use vsans_efficiency::{
    CalibrationQuartet, CrossSection, EfficiencyMatrix, Error, ExposureTimes,
    PolarizerEfficiency, QuartetEntry, DEFAULT_ANALYZER_EFFICIENCY,
};

#[fixture]
fn cells() -> CellLibrary {
    let mut cell = HeCell::new("Burgundy", 0.0, 3.105, 0.86).unwrap();
    cell.add_observation(0.0, 0.12);
    cell.add_observation(40.0, 0.09);
    CellLibrary::from_cells(&[cell]).unwrap()
}

#[fixture]
fn times() -> ExposureTimes {
    ExposureTimes::from([
        (CrossSection::UU, vec![1.0, 5.0]),
        (CrossSection::DU, vec![2.0]),
        (CrossSection::DD, vec![3.0, 6.0, 7.0]),
        (CrossSection::UD, vec![4.0]),
    ])
}

#[rstest]
#[case([100.0, 3.0, 80.0, 2.5])] // case 1
#[case([1.0e-3, 4.0e2, 7.0, 0.0])] // case 2
#[case([-5.0, 12.0, 0.3, 9.9])] // case 3
fn round_trip_recovers_true_cross_sections(
    cells: CellLibrary,
    times: ExposureTimes,
    #[case] truth: [f64; 4],
) {
    let polarizer = PolarizerEfficiency {
        psm: 0.985,
        pf: 1.0,
    };
    let matrix =
        EfficiencyMatrix::build(&times, &cells, &polarizer, DEFAULT_ANALYZER_EFFICIENCY).unwrap();

    let measured = matrix.apply(truth);
    let corrected = matrix
        .correct([&[measured[0]], &[measured[1]], &[measured[2]], &[measured[3]]])
        .unwrap();

    let scale = truth.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    for (c, t) in corrected.iter().zip(truth) {
        assert!((c[0] - t).abs() <= 1e-9 * scale);
    }
}

#[rstest]
fn identical_rows_fail_as_singular() {
    let matrix = EfficiencyMatrix::from_matrix(Matrix4::new(
        1.0, 0.2, 0.1, 0.0, //
        1.0, 0.2, 0.1, 0.0, //
        0.1, 0.0, 1.0, 0.2, //
        0.0, 0.1, 0.2, 1.0, //
    ));

    let pixels = [1.0, 2.0, 3.0];
    let result = matrix.correct([&pixels, &pixels, &pixels, &pixels]);
    assert!(matches!(result, Err(Error::SingularMatrix { .. })));
}

#[rstest]
fn missing_cross_section_is_reported(cells: CellLibrary, mut times: ExposureTimes) {
    times.remove(&CrossSection::UD);
    let result = EfficiencyMatrix::build(
        &times,
        &cells,
        &PolarizerEfficiency::ideal(),
        DEFAULT_ANALYZER_EFFICIENCY,
    );
    assert!(matches!(
        result,
        Err(Error::MissingCrossSection(CrossSection::UD))
    ));
}

#[rstest]
#[case(0.95)] // case 1
#[case(0.99)] // case 2
fn quartets_recover_supermirror_efficiency(cells: CellLibrary, #[case] psm: f64) {
    let entry = |cross_section: CrossSection, time: f64| {
        let state = cells.query(time).unwrap();
        let sign = if cross_section.is_spin_flip() { -1.0 } else { 1.0 };
        QuartetEntry {
            transmission: state.unpolarized_transmission * (1.0 + sign * state.neutron_pol * psm),
            time,
        }
    };

    let quartets = [2.0, 20.0]
        .iter()
        .map(|t| CalibrationQuartet {
            uu: entry(CrossSection::UU, *t),
            du: entry(CrossSection::DU, t + 0.1),
            dd: entry(CrossSection::DD, t + 0.2),
            ud: entry(CrossSection::UD, t + 0.3),
        })
        .collect::<Vec<_>>();

    let polarizer = PolarizerEfficiency::from_quartets(&quartets, &cells).unwrap();
    assert!((polarizer.psm - psm).abs() < 1e-12);
    assert_eq!(polarizer.pf, 1.0);
}

#[rstest]
fn no_quartets_means_ideal_polarizer(cells: CellLibrary) {
    let polarizer = PolarizerEfficiency::from_quartets(&[], &cells).unwrap();
    assert_eq!(polarizer, PolarizerEfficiency::ideal());
}
