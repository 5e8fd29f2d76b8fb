//! Integration tests for grouping and batch reduction of synthetic frames

use rstest::{fixture, rstest};
use vsans_efficiency::{CrossSection, EfficiencyMatrix, SpinState};
use vsans_geometry::{Carriage, InstrumentGeometry, Panel, PanelGeometry, PanelMap, PixelGrid};
use vsans_pipeline::{
    write_outputs, Catalogue, CellMetadata, CellPosition, Channel, ConfigSignature, DetectorFrame,
    EmptyPolicy, FrameStore, Intent, ManualCell, Pipeline, Purpose, ReductionConfig,
    Transmissions, UnitKind, UnitState, MONITOR_NORMALISATION,
};
use vsans_mask::MaskLibrary;

use SpinState::*;

/// Power of two so monitor ratios are exact
const MONITOR: f64 = 1_048_576.0;

const CONFIG: &str = "CvB400cmF1900cmM6.0000Ang";

fn panel(distance: f64) -> PanelGeometry {
    PanelGeometry {
        pixels_x: 48,
        pixels_y: 128,
        beam_center_x: -1.3,
        beam_center_y: 0.6,
        distance,
        x_pixel_size: 8.4,
        y_pixel_size: 4.0,
        panel_gap: 3.5,
        spatial_calibration: -250.0,
        setback: 41.0,
        vertical_offset: 0.5,
        lateral_offset: -0.5,
    }
}

#[fixture]
fn geometry() -> InstrumentGeometry {
    InstrumentGeometry {
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
    }
}

fn uniform(value: f64) -> PanelMap<PixelGrid<f64>> {
    Panel::ALL
        .into_iter()
        .map(|p| (p, PixelGrid::filled(48, 128, value)))
        .collect()
}

/// Frame in the reference configuration, taken `number` hours after zero
fn frame(
    number: u32,
    description: &str,
    purpose: Purpose,
    spins: (SpinState, SpinState),
    counts: f64,
) -> DetectorFrame {
    DetectorFrame {
        file_number: number,
        description: description.to_string(),
        config_key: String::new(),
        purpose,
        intent: Intent::Sample,
        front_polarization: spins.0,
        back_polarization: spins.1,
        monitor: MONITOR,
        count_time: 600.0,
        end_time: 3600.0 * number as f64,
        attenuators: 0,
        signature: ConfigSignature {
            guides: None,
            front_distance: 400.0,
            middle_distance: 1900.0,
            wavelength: 6.0,
        },
        temperature: None,
        voltage: None,
        cell: None,
        cell_position: None,
        geometry: geometry(),
        counts: uniform(counts),
    }
}

fn scatt(number: u32, description: &str, spins: (SpinState, SpinState)) -> DetectorFrame {
    frame(number, description, Purpose::Scatt, spins, 10.0)
}

fn spins(cross_section: CrossSection) -> (SpinState, SpinState) {
    match cross_section {
        CrossSection::UU => (Up, Up),
        CrossSection::DU => (Down, Up),
        CrossSection::DD => (Down, Down),
        CrossSection::UD => (Up, Down),
    }
}

fn store(frames: Vec<DetectorFrame>) -> FrameStore {
    FrameStore::from_frames(frames).unwrap()
}

#[rstest]
fn unpolarized_sample_is_emitted() {
    let store = store(vec![
        scatt(1, "Silica", (Unpolarized, Unpolarized)),
        frame(2, "Silica", Purpose::Trans, (Unpolarized, Unpolarized), 5.0),
    ]);
    let config = ReductionConfig::default();

    let mut output = Pipeline::new(&config, &store).run().unwrap();
    assert_eq!(output.units.len(), 1);

    let unit = &output.units[0];
    assert_eq!(unit.report.kind, UnitKind::Unpolarized);
    assert_eq!(unit.report.sample, "Silica_naV_naK");
    assert_eq!(unit.report.state(), &UnitState::MaskedAndBinned);
    assert_eq!(unit.channels[0].profiles.len(), 2);
    assert!(output.configurations.contains_key(CONFIG));

    let dir = std::env::temp_dir().join("vsans_pipeline_unpolarized");
    std::fs::create_dir_all(&dir).unwrap();
    let written = write_outputs(&mut output, &dir, false).unwrap();

    assert!(output.units[0].report.is_emitted());
    assert_eq!(written.len(), 3);
    assert!(dir
        .join(format!("Silica_naV_naK_{CONFIG}_Unpol_2D.txt"))
        .exists());
    assert!(dir
        .join(format!("Silica_naV_naK_{CONFIG}_Unpol_Horizontal.txt"))
        .exists());
}

#[rstest]
fn abs_scale_from_transmission_or_unity() {
    let store = store(vec![
        scatt(1, "Silica", (Unpolarized, Unpolarized)),
        frame(2, "Silica", Purpose::Trans, (Unpolarized, Unpolarized), 5.0),
        scatt(3, "Water", (Unpolarized, Unpolarized)),
    ]);
    let config = ReductionConfig::default();
    let catalogue = Catalogue::build(&store, &config);
    let masks = MaskLibrary::default();
    let transmissions = Transmissions::new(&store, &catalogue, &masks, Panel::MR);

    let groups = catalogue.samples_in(CONFIG).collect::<Vec<_>>();
    assert_eq!(groups.len(), 2);

    let silica = groups.iter().find(|g| g.name.starts_with("Silica")).unwrap();
    let expected = 5.0 * 48.0 * 128.0 * MONITOR_NORMALISATION / MONITOR;
    let scale = transmissions.abs_scale(silica, Channel::Unpolarized);
    assert!((scale - expected).abs() < 1e-9 * expected);

    // polarized channels fall back to the unpolarized transmission
    let scale = transmissions.abs_scale(silica, Channel::Full(CrossSection::UU));
    assert!((scale - expected).abs() < 1e-9 * expected);

    let water = groups.iter().find(|g| g.name.starts_with("Water")).unwrap();
    assert_eq!(transmissions.abs_scale(water, Channel::Unpolarized), 1.0);
}

#[rstest]
fn missing_counts_fail_only_that_unit() {
    let mut broken = scatt(2, "Broken", (Unpolarized, Unpolarized));
    broken.counts.remove(&Panel::FT);

    let store = store(vec![scatt(1, "Silica", (Unpolarized, Unpolarized)), broken]);
    let config = ReductionConfig::default();
    let output = Pipeline::new(&config, &store).run().unwrap();

    assert_eq!(output.units.len(), 2);
    let failed = output.failed().collect::<Vec<_>>();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].report.sample.starts_with("Broken"));
    assert!(failed[0].channels.is_empty());
}

#[rstest]
fn full_polarization_without_cells_passes_through() {
    let frames = CrossSection::ALL
        .into_iter()
        .enumerate()
        .map(|(n, cs)| scatt(n as u32 + 1, "MnSi", spins(cs)))
        .collect();
    let store = store(frames);
    let config = ReductionConfig::default();

    let output = Pipeline::new(&config, &store).run().unwrap();
    assert_eq!(output.units.len(), 1);

    let unit = &output.units[0];
    assert_eq!(unit.report.kind, UnitKind::FullPolarization);
    assert!(unit.report.history().contains(&UnitState::Passthrough));
    assert!(!unit.is_polarization_corrected());
    assert_eq!(unit.channels.len(), 4);
    assert_eq!(unit.channels[2].channel, Channel::Full(CrossSection::DD));
}

#[rstest]
#[case(EmptyPolicy::Disabled, true)] // case 1
#[case(EmptyPolicy::MirrorSpinStates, false)] // case 2
fn empty_policy_fills_missing_states(#[case] policy: EmptyPolicy, #[case] fails: bool) {
    let mut frames = vec![
        scatt(1, "Empty", spins(CrossSection::UU)),
        scatt(2, "Empty", spins(CrossSection::DU)),
    ];
    for frame in frames.iter_mut() {
        frame.intent = Intent::Empty;
    }
    let store = store(frames);
    let config = ReductionConfig {
        empty_policy: policy,
        ..Default::default()
    };

    let output = Pipeline::new(&config, &store).run().unwrap();
    assert_eq!(output.units.len(), 1);
    assert_eq!(output.units[0].report.is_failed(), fails);
}

#[rstest]
fn quartets_and_cell_pairs_are_grouped() {
    let cell = CellMetadata {
        name: "Burgundy".to_string(),
        insert_timestamp_ms: 3.6e6 * 9.0,
        opacity: 0.5175,
        glass_transmission: 0.86,
    };
    let he3 = |number: u32, description: &str, attenuators: u32| {
        let mut frame = frame(number, description, Purpose::He3, (Unpolarized, Unpolarized), 5.0);
        frame.cell = Some(cell.clone());
        frame.attenuators = attenuators;
        frame
    };

    let mut frames = CrossSection::ALL
        .into_iter()
        .enumerate()
        .map(|(n, cs)| frame(10 + n as u32, "T_SM", Purpose::Trans, spins(cs), 3.0))
        .collect::<Vec<_>>();
    frames.push(frame(14, "T_SM", Purpose::Trans, (Up, Unpolarized), 4.0));
    frames.push(he3(20, "Empty HeOUT", 0));
    frames.push(he3(21, "Empty HeIN", 0));
    frames.push(he3(22, "Empty HeIN", 2));

    let store = store(frames);
    let catalogue = Catalogue::build(&store, &ReductionConfig::default());

    assert_eq!(catalogue.quartets().len(), 1);
    assert_eq!(catalogue.quartets()[0].supermirror, 14);
    assert_eq!(catalogue.quartets()[0].exposures[1].file, 11);

    assert_eq!(catalogue.cells().len(), 1);
    let record = &catalogue.cells()[0];
    assert!((record.mu - 0.5175 * 6.0).abs() < 1e-12);
    assert_eq!(record.pairs.len(), 1);
    assert_eq!((record.pairs[0].out_file, record.pairs[0].in_file), (20, 21));
}

#[rstest]
fn degenerate_cell_makes_unit_fail() {
    let (mu, te): (f64, f64) = (3.0, 0.9);
    let floor = te * (-mu).exp();

    // a single transmission sitting exactly on the depolarized floor
    let he3 = |number: u32, description: &str, value: f64| {
        let mut frame = frame(number, description, Purpose::He3, (Unpolarized, Unpolarized), 0.0);
        if let Some(grid) = frame.counts.get_mut(&Panel::MR) {
            grid[(10, 60)] = value;
        }
        frame
    };

    let mut frames = vec![he3(1, "Empty HeOUT", 1.0), he3(2, "Empty HeIN", floor)];
    frames.extend(
        CrossSection::ALL
            .into_iter()
            .enumerate()
            .map(|(n, cs)| scatt(n as u32 + 3, "MnSi", spins(cs))),
    );
    frames.push(scatt(7, "Silica", (Unpolarized, Unpolarized)));
    let store = store(frames);

    let config = ReductionConfig {
        manual_cells: vec![ManualCell {
            start_file: 1,
            mu,
            te,
        }],
        ..Default::default()
    };

    let output = Pipeline::new(&config, &store).run().unwrap();
    assert_eq!(output.cells.len(), 1);
    assert_eq!(output.cells.iter().next().unwrap().p0(), 0.0);

    let full = output
        .units
        .iter()
        .find(|u| u.report.kind == UnitKind::FullPolarization)
        .unwrap();
    match full.report.state() {
        UnitState::Failed(reason) => assert!(reason.contains("singular")),
        state => panic!("expected a failed unit, found {state}"),
    }

    // the rest of the batch carries on
    let silica = output
        .units
        .iter()
        .find(|u| u.report.sample.starts_with("Silica"))
        .unwrap();
    assert_eq!(silica.report.state(), &UnitState::MaskedAndBinned);
}

/// He3 transmission through a cell inserted at time zero
fn cell_frame(number: u32, position: CellPosition, counts: f64) -> DetectorFrame {
    let description = match position {
        CellPosition::In => "Empty HeIN",
        CellPosition::Out => "Empty HeOUT",
    };
    let mut frame = frame(number, description, Purpose::He3, (Unpolarized, Unpolarized), counts);
    frame.cell = Some(CellMetadata {
        name: "Burgundy".to_string(),
        insert_timestamp_ms: 0.0,
        opacity: 0.5175,
        glass_transmission: 0.86,
    });
    frame
}

/// One fitted cell followed by the four spin states of MnSi
fn polarized_frames(counts: [f64; 4]) -> Vec<DetectorFrame> {
    let mut frames = vec![
        cell_frame(1, CellPosition::Out, 10.0),
        cell_frame(2, CellPosition::In, 2.0),
    ];
    frames.extend(
        CrossSection::ALL
            .into_iter()
            .zip(counts)
            .enumerate()
            .map(|(n, (cs, value))| {
                frame(n as u32 + 3, "MnSi", Purpose::Scatt, spins(cs), value)
            }),
    );
    frames
}

#[rstest]
#[case(true)] // case 1
#[case(false)] // case 2
fn cell_correction_recovers_cross_sections(#[case] polarization_correction: bool) {
    let truth = [4.0, 1.0, 3.0, 0.5];
    let config = ReductionConfig {
        polarization_correction,
        ..Default::default()
    };

    // the mixing only depends on the cell and the exposure times
    let layout = store(polarized_frames([1.0; 4]));
    let reference = Pipeline::new(&config, &layout).run().unwrap();
    assert_eq!(reference.cells.len(), 1);
    assert_eq!(reference.polarizer.psm, 1.0);

    let catalogue = Catalogue::build(&layout, &config);
    let group = catalogue
        .samples_in(CONFIG)
        .find(|g| g.name.starts_with("MnSi"))
        .unwrap();
    let matrix = EfficiencyMatrix::build(
        &group.exposure_times(),
        &reference.cells,
        &reference.polarizer,
        config.analyzer_efficiency,
    )
    .unwrap();

    let store = store(polarized_frames(matrix.apply(truth)));
    let mut output = Pipeline::new(&config, &store).run().unwrap();

    let unit = output
        .units
        .iter()
        .find(|u| u.report.kind == UnitKind::FullPolarization)
        .unwrap();
    assert!(unit.is_polarization_corrected());
    assert_eq!(unit.report.state(), &UnitState::MaskedAndBinned);

    let grid = &output.configurations[CONFIG].grid;
    let norm = MONITOR_NORMALISATION / MONITOR;
    for (channel, expected) in unit.channels.iter().zip(truth) {
        for panel in [Panel::MR, Panel::FT] {
            let omega = grid.solid_angle(panel).unwrap();
            let value = channel.data[&panel].intensity[(5, 40)] * omega / norm;
            assert!(
                (value - expected).abs() < 1e-9 * expected,
                "{:?} {panel}: {value} != {expected}",
                channel.channel
            );
        }
    }

    let dir = std::env::temp_dir().join(format!(
        "vsans_pipeline_corrected_{polarization_correction}"
    ));
    std::fs::create_dir_all(&dir).unwrap();
    write_outputs(&mut output, &dir, false).unwrap();
    assert!(dir
        .join(format!("MnSi_naV_naK_{CONFIG}_FullPol_Horizontal.txt"))
        .exists());
}

#[rstest]
fn recorded_cell_position_replaces_description() {
    let tagged = |number: u32, position: Option<CellPosition>| {
        let mut frame = cell_frame(number, CellPosition::Out, 5.0);
        frame.description = "Empty".to_string();
        frame.cell_position = position;
        frame
    };

    let store = store(vec![
        tagged(1, Some(CellPosition::Out)),
        tagged(2, Some(CellPosition::In)),
        tagged(3, None),
        cell_frame(4, CellPosition::In, 5.0),
    ]);
    assert_eq!(store.get(3).unwrap().cell_position, None);
    assert_eq!(store.get(4).unwrap().cell_position, Some(CellPosition::In));

    let catalogue = Catalogue::build(&store, &ReductionConfig::default());
    let pairs = &catalogue.cells()[0].pairs;
    assert_eq!(pairs.len(), 2);
    assert_eq!((pairs[0].out_file, pairs[0].in_file), (1, 2));
    assert_eq!((pairs[1].out_file, pairs[1].in_file), (1, 4));
}
