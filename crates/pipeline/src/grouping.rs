//! Sorting of exposures into samples, configurations and analyzer cells

// standard library
use std::collections::BTreeMap;
use std::fmt::Display;

// crate modules
use crate::config::{EmptyPolicy, ReductionConfig};
use crate::frame::{CellPosition, DetectorFrame, FrameStore, Intent, Purpose};

// external crates
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use vsans_efficiency::{CrossSection, ExposureTimes, SpinState};

/// Tags written into descriptions that are not part of the sample name
const DESCRIPTION_TAGS: [&str; 17] = [
    "T_UU", "T_DU", "T_DD", "T_UD", "T_SM", "T_NP", "HeIN", "HeOUT", "S_UU", "S_DU", "S_DD",
    "S_UD", "S_NP", "S_HeU", "S_HeD", "S_SMU", "S_SMD",
];

/// Spin configuration of an exposure
///
/// ```rust
/// # use vsans_pipeline::Channel;
/// # use vsans_efficiency::{CrossSection, SpinState};
/// use SpinState::*;
/// assert_eq!(Channel::from_spins(Unpolarized, Unpolarized), Some(Channel::Unpolarized));
/// assert_eq!(Channel::from_spins(Down, Unpolarized), Some(Channel::HalfDown));
/// assert_eq!(Channel::from_spins(Up, Down), Some(Channel::Full(CrossSection::UD)));
/// assert_eq!(Channel::from_spins(Unpolarized, Up), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// No polarizer or analyzer
    Unpolarized,
    /// Front polarizer up, no analyzer
    HalfUp,
    /// Front polarizer down, no analyzer
    HalfDown,
    /// Front polarizer and analyzer
    Full(CrossSection),
}

impl Channel {
    /// Channel measured with the given front and back states
    pub fn from_spins(front: SpinState, back: SpinState) -> Option<Self> {
        match (front, back) {
            (SpinState::Unpolarized, SpinState::Unpolarized) => Some(Self::Unpolarized),
            (SpinState::Up, SpinState::Unpolarized) => Some(Self::HalfUp),
            (SpinState::Down, SpinState::Unpolarized) => Some(Self::HalfDown),
            (front, back) => CrossSection::from_spins(front, back).map(Self::Full),
        }
    }

    /// Short label used in file names
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unpolarized => "Unpol",
            Self::HalfUp => "U",
            Self::HalfDown => "D",
            Self::Full(cs) => cs.name(),
        }
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A scattering exposure and its mid-point time (hours)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Exposure {
    /// File number
    pub file: u32,
    /// Mid-point of the exposure (hours)
    pub time: f64,
}

impl Exposure {
    fn from_frame(frame: &DetectorFrame) -> Self {
        Self {
            file: frame.file_number,
            time: frame.mid_time(),
        }
    }
}

/// Every exposure of one sample in one configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGroup {
    /// Sample name with voltage and temperature suffix
    pub name: String,
    /// Configuration identifier
    pub config: String,
    /// Intent of the first exposure seen
    pub intent: Intent,
    /// Scattering exposures per channel, in file order
    pub scattering: BTreeMap<Channel, Vec<Exposure>>,
    /// Transmission file numbers per channel, in file order
    pub transmission: BTreeMap<Channel, Vec<u32>>,
}

impl SampleGroup {
    fn new(name: String, config: String, intent: Intent) -> Self {
        Self {
            name,
            config,
            intent,
            scattering: BTreeMap::new(),
            transmission: BTreeMap::new(),
        }
    }

    /// Scattering exposures of a channel, empty if there are none
    pub fn exposures(&self, channel: Channel) -> &[Exposure] {
        self.scattering
            .get(&channel)
            .map(|e| e.as_slice())
            .unwrap_or_default()
    }

    /// True if all four cross-sections were measured
    pub fn has_full_polarization(&self) -> bool {
        CrossSection::ALL
            .iter()
            .all(|cs| !self.exposures(Channel::Full(*cs)).is_empty())
    }

    /// True if any cross-section was measured
    pub fn has_any_cross_section(&self) -> bool {
        CrossSection::ALL
            .iter()
            .any(|cs| !self.exposures(Channel::Full(*cs)).is_empty())
    }

    /// Exposure times of the polarized cross-sections
    pub fn exposure_times(&self) -> ExposureTimes {
        CrossSection::ALL
            .iter()
            .filter_map(|cs| {
                let exposures = self.exposures(Channel::Full(*cs));
                (!exposures.is_empty())
                    .then(|| (*cs, exposures.iter().map(|e| e.time).collect()))
            })
            .collect()
    }
}

/// Blocked beam exposures of one configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockedBeamFiles {
    /// Scattering exposures
    pub scattering: Vec<u32>,
    /// Transmission and He3 exposures
    pub transmission: Vec<u32>,
}

impl BlockedBeamFiles {
    /// Blocked beam for transmissions, preferring a transmission exposure
    pub fn for_transmission(&self) -> Option<u32> {
        self.transmission
            .first()
            .or(self.scattering.first())
            .copied()
    }

    /// Blocked beam for scattering, preferring a scattering exposure
    pub fn for_scattering(&self) -> Option<u32> {
        self.scattering
            .first()
            .or(self.transmission.first())
            .copied()
    }
}

/// Matched cell-out and cell-in transmission exposures
#[derive(Debug, Clone, PartialEq)]
pub struct He3Pair {
    /// Exposure without the cell
    pub out_file: u32,
    /// Exposure through the cell
    pub in_file: u32,
    /// Configuration both were taken in
    pub config: String,
    /// Time since the cell was inserted (hours)
    pub elapsed: f64,
}

/// An analyzer cell and the transmission pairs measured through it
#[derive(Debug, Clone, PartialEq)]
pub struct CellRecord {
    /// Name of the cell
    pub name: String,
    /// Insertion time (hours)
    pub insert_time: f64,
    /// Opacity times wavelength
    pub mu: f64,
    /// Empty cell glass transmission
    pub te: f64,
    /// Transmission pairs in file order
    pub pairs: Vec<He3Pair>,
}

/// Polarized transmissions in all four states plus the supermirror only
#[derive(Debug, Clone, PartialEq)]
pub struct QuartetFiles {
    /// Configuration of all five exposures
    pub config: String,
    /// Cross-section exposures in [CrossSection::ALL] order
    pub exposures: [Exposure; 4],
    /// Supermirror only exposure
    pub supermirror: u32,
}

/// Configuration and the exposure chosen to describe its geometry
#[derive(Debug, Clone, PartialEq)]
struct Representative {
    file: u32,
    scattering: bool,
}

/// Last state of a polarized transmission, for quartet matching
#[derive(Debug, Clone)]
struct PolarizedTransmission {
    exposure: Exposure,
    config: String,
    attenuators: u32,
}

/// Last cell-out exposure, for pairing with the next cell-in exposure
#[derive(Debug, Clone)]
struct CellOut {
    file: u32,
    config: String,
    attenuators: u32,
    sample: String,
}

/// Exposures sorted by role
///
/// Built once from the frame store, walking frames in ascending file number
/// so that pairings follow the order of measurement.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    configurations: BTreeMap<String, Representative>,
    blocked_beam: BTreeMap<String, BlockedBeamFiles>,
    samples: BTreeMap<(String, String), SampleGroup>,
    cells: Vec<CellRecord>,
    quartets: Vec<QuartetFiles>,
}

impl Catalogue {
    /// Sort every usable frame of the store
    pub fn build(store: &FrameStore, config: &ReductionConfig) -> Self {
        let mut builder = Builder {
            config,
            catalogue: Catalogue::default(),
            polarized: BTreeMap::new(),
            cell_out: None,
            current_cell: None,
        };

        for frame in store.iter() {
            builder.visit(frame);
        }

        let mut catalogue = builder.catalogue;
        if config.empty_policy == EmptyPolicy::MirrorSpinStates {
            catalogue.mirror_empty_spin_states();
        }

        info!(
            "{} configuration(s), {} sample group(s), {} cell(s), {} calibration quartet(s)",
            catalogue.configurations.len(),
            catalogue.samples.len(),
            catalogue.cells.len(),
            catalogue.quartets.len()
        );
        catalogue
    }

    /// Configuration identifiers in order
    pub fn configurations(&self) -> impl Iterator<Item = &str> {
        self.configurations.keys().map(|k| k.as_str())
    }

    /// Exposure describing the geometry of a configuration
    pub fn representative(&self, config: &str) -> Option<u32> {
        self.configurations.get(config).map(|r| r.file)
    }

    /// Blocked beam exposures of a configuration
    pub fn blocked_beam(&self, config: &str) -> Option<&BlockedBeamFiles> {
        self.blocked_beam.get(config)
    }

    /// Sample groups of one configuration
    pub fn samples_in<'a>(&'a self, config: &'a str) -> impl Iterator<Item = &'a SampleGroup> {
        self.samples
            .iter()
            .filter(move |((c, _), _)| c == config)
            .map(|(_, group)| group)
    }

    /// Every sample group, by configuration then name
    pub fn samples(&self) -> impl Iterator<Item = &SampleGroup> {
        self.samples.values()
    }

    /// Analyzer cells in insertion order
    pub fn cells(&self) -> &[CellRecord] {
        &self.cells
    }

    /// Calibration quartets in file order
    pub fn quartets(&self) -> &[QuartetFiles] {
        &self.quartets
    }

    /// Fill missing cross-sections of empty-cell groups from the reversed state
    fn mirror_empty_spin_states(&mut self) {
        for group in self
            .samples
            .values_mut()
            .filter(|g| g.intent == Intent::Empty)
        {
            for cs in CrossSection::ALL {
                let missing = Channel::Full(cs);
                let source = Channel::Full(cs.reversed());
                if group.scattering.contains_key(&missing) {
                    continue;
                }
                if let Some(exposures) = group.scattering.get(&source).cloned() {
                    info!(
                        "{} {}: {missing} filled from {source}",
                        group.name, group.config
                    );
                    group.scattering.insert(missing, exposures);
                }
            }
        }
    }
}

/// Mutable state while walking the store
struct Builder<'a> {
    config: &'a ReductionConfig,
    catalogue: Catalogue,
    polarized: BTreeMap<CrossSection, PolarizedTransmission>,
    cell_out: Option<CellOut>,
    current_cell: Option<usize>,
}

impl Builder<'_> {
    fn visit(&mut self, frame: &DetectorFrame) {
        let number = frame.file_number;

        if self.config.excluded_files.contains(&number) {
            debug!("{number}: excluded");
            return;
        }
        if frame.count_time <= self.config.min_count_time {
            trace!("{number}: count time {} s too short", frame.count_time);
            return;
        }
        if frame.description.contains("Align") {
            debug!("{number}: alignment scan skipped");
            return;
        }

        let intent = if self.config.blocked_beam_files.contains(&number) {
            Intent::BlockedBeam
        } else if self.config.empty_files.contains(&number) {
            Intent::Empty
        } else {
            frame.intent
        };

        let config = frame.config_id();
        self.register_configuration(&config, frame);

        if intent == Intent::BlockedBeam {
            let entry = self.catalogue.blocked_beam.entry(config).or_default();
            match frame.purpose {
                Purpose::Scatt => entry.scattering.push(number),
                Purpose::Trans | Purpose::He3 => entry.transmission.push(number),
            }
            return;
        }

        let name = sample_name(
            &frame.description,
            &frame.config_key,
            frame.temperature,
            frame.voltage,
        );

        let channel = Channel::from_spins(frame.front_polarization, frame.back_polarization);
        match frame.purpose {
            Purpose::Scatt => match channel {
                Some(channel) => self
                    .group(&name, &config, intent)
                    .scattering
                    .entry(channel)
                    .or_default()
                    .push(Exposure::from_frame(frame)),
                None => warn!(
                    "{number}: no channel for front {:?} and back {:?}, skipped",
                    frame.front_polarization, frame.back_polarization
                ),
            },
            Purpose::Trans => self.visit_transmission(frame, channel, &name, &config, intent),
            Purpose::He3 => self.visit_he3(frame, &name, &config, intent),
        }
    }

    /// First scattering exposure of a configuration wins, else the first seen
    fn register_configuration(&mut self, config: &str, frame: &DetectorFrame) {
        let scattering = frame.purpose == Purpose::Scatt;
        let candidate = Representative {
            file: frame.file_number,
            scattering,
        };

        match self.catalogue.configurations.get_mut(config) {
            None => {
                debug!("{}: new configuration {config}", frame.file_number);
                self.catalogue
                    .configurations
                    .insert(config.to_string(), candidate);
            }
            Some(existing) if scattering && !existing.scattering => *existing = candidate,
            Some(_) => {}
        }
    }

    fn group(&mut self, name: &str, config: &str, intent: Intent) -> &mut SampleGroup {
        self.catalogue
            .samples
            .entry((config.to_string(), name.to_string()))
            .or_insert_with(|| SampleGroup::new(name.to_string(), config.to_string(), intent))
    }

    fn visit_transmission(
        &mut self,
        frame: &DetectorFrame,
        channel: Option<Channel>,
        name: &str,
        config: &str,
        intent: Intent,
    ) {
        let Some(channel) = channel else {
            warn!("{}: transmission with no channel, skipped", frame.file_number);
            return;
        };

        match channel {
            Channel::Full(cs) => {
                self.polarized.insert(
                    cs,
                    PolarizedTransmission {
                        exposure: Exposure::from_frame(frame),
                        config: config.to_string(),
                        attenuators: frame.attenuators,
                    },
                );
            }
            _ => {
                self.group(name, config, intent)
                    .transmission
                    .entry(channel)
                    .or_default()
                    .push(frame.file_number);

                if channel == Channel::HalfUp {
                    self.match_quartet(frame, config);
                }
            }
        }
    }

    /// A supermirror exposure four files after UU closes a quartet
    fn match_quartet(&mut self, frame: &DetectorFrame, config: &str) {
        let Some(uu) = self.polarized.get(&CrossSection::UU) else {
            return;
        };
        if frame.file_number.checked_sub(uu.exposure.file) != Some(4) {
            return;
        }

        let members = CrossSection::ALL
            .iter()
            .map(|cs| self.polarized.get(cs))
            .collect::<Option<Vec<_>>>();

        let Some(members) = members else {
            warn!(
                "{}: supermirror transmission without all four spin states",
                frame.file_number
            );
            return;
        };

        if members
            .iter()
            .any(|m| m.config != config || m.attenuators != frame.attenuators)
        {
            warn!(
                "{}: calibration quartet spans configurations or attenuators, dropped",
                frame.file_number
            );
            return;
        }

        let exposures = [
            members[0].exposure,
            members[1].exposure,
            members[2].exposure,
            members[3].exposure,
        ];
        debug!(
            "{}: calibration quartet {:?}",
            frame.file_number,
            exposures.map(|e| e.file)
        );
        self.catalogue.quartets.push(QuartetFiles {
            config: config.to_string(),
            exposures,
            supermirror: frame.file_number,
        });
    }

    fn visit_he3(&mut self, frame: &DetectorFrame, name: &str, config: &str, intent: Intent) {
        let number = frame.file_number;

        if frame.cell_position == Some(CellPosition::Out) {
            // cell-out exposures double as unpolarized transmissions
            self.group(name, config, intent)
                .transmission
                .entry(Channel::Unpolarized)
                .or_default()
                .push(number);
        }

        self.select_cell(frame);

        match frame.cell_position {
            Some(CellPosition::Out) => {
                self.cell_out = Some(CellOut {
                    file: number,
                    config: config.to_string(),
                    attenuators: frame.attenuators,
                    sample: name.to_string(),
                });
            }
            Some(CellPosition::In) => self.pair_cell_in(frame, name, config),
            None => debug!("{number}: He3 exposure without a cell position"),
        }
    }

    /// Find or start the cell an exposure was taken with
    fn select_cell(&mut self, frame: &DetectorFrame) {
        let cells = &mut self.catalogue.cells;

        if self.config.is_manual_he3() {
            if let Some(manual) = self
                .config
                .manual_cells
                .iter()
                .find(|c| c.start_file == frame.file_number)
            {
                let insert_time = frame.start_time();
                info!(
                    "{}: manual cell inserted at {insert_time:.3} h",
                    frame.file_number
                );
                cells.push(CellRecord {
                    name: format!("Manual{}", manual.start_file),
                    insert_time,
                    mu: manual.mu,
                    te: manual.te,
                    pairs: Vec::new(),
                });
                self.current_cell = Some(cells.len() - 1);
            }
            return;
        }

        let Some(meta) = &frame.cell else {
            warn!("{}: He3 exposure without cell metadata", frame.file_number);
            self.current_cell = None;
            return;
        };

        let insert_time = meta.insert_time();
        let index = match cells.iter().position(|c| c.insert_time == insert_time) {
            Some(index) => index,
            None => {
                let mu = meta.opacity * frame.signature.wavelength;
                info!(
                    "{}: cell {} inserted at {insert_time:.3} h (Mu = {mu:.4}, Te = {:.4})",
                    frame.file_number, meta.name, meta.glass_transmission
                );
                cells.push(CellRecord {
                    name: meta.name.clone(),
                    insert_time,
                    mu,
                    te: meta.glass_transmission,
                    pairs: Vec::new(),
                });
                cells.len() - 1
            }
        };
        self.current_cell = Some(index);
    }

    fn pair_cell_in(&mut self, frame: &DetectorFrame, name: &str, config: &str) {
        let number = frame.file_number;

        let Some(out) = &self.cell_out else {
            warn!("{number}: HeIN without a preceding HeOUT, dropped");
            return;
        };

        if out.config != config || out.attenuators != frame.attenuators || out.sample != name {
            warn!(
                "{number}: HeIN does not match HeOUT {} (configuration, attenuators or sample), dropped",
                out.file
            );
            return;
        }

        let Some(index) = self.current_cell else {
            warn!("{number}: HeIN with no known cell, dropped");
            return;
        };

        let cell = &mut self.catalogue.cells[index];
        let pair = He3Pair {
            out_file: out.file,
            in_file: number,
            config: config.to_string(),
            elapsed: frame.mid_time() - cell.insert_time,
        };
        trace!("{}: pair {} -> {}", cell.name, pair.out_file, pair.in_file);
        cell.pairs.push(pair);
    }
}

/// Sample name from a free text description
///
/// The configuration key, polarization tags, temperature and voltage strings
/// and spaces are removed, then the voltage and temperature are appended.
///
/// ```rust
/// # use vsans_pipeline::sample_name;
/// let name = sample_name("MnSi 300K 5V S_UU 4Gd400", "4Gd400", Some(300.0), Some(5.0));
/// assert_eq!(name, "MnSi_5V_300K");
///
/// let name = sample_name("Empty Cell HeOUT", "", None, None);
/// assert_eq!(name, "EmptyCell_naV_naK");
/// ```
pub fn sample_name(
    description: &str,
    config_key: &str,
    temperature: Option<f64>,
    voltage: Option<f64>,
) -> String {
    let mut name = if config_key.is_empty() {
        description.to_string()
    } else {
        description.replace(config_key, "")
    };

    for tag in DESCRIPTION_TAGS {
        name = name.replace(tag, "");
    }

    let temperature = temperature.map(|t| t.to_string());
    let voltage = voltage.map(|v| v.to_string());

    for (value, unit) in [(&temperature, 'K'), (&voltage, 'V')] {
        let Some(value) = value else {
            continue;
        };
        for pattern in [
            format!("{value} {unit},"),
            format!("{value} {unit}"),
            format!("{value}{unit},"),
            format!("{value}{unit}"),
            value.to_string(),
        ] {
            name = name.replace(&pattern, "");
        }
    }

    name.retain(|c| c != ' ');
    format!(
        "{name}_{}V_{}K",
        voltage.as_deref().unwrap_or("na"),
        temperature.as_deref().unwrap_or("na")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_labels() {
        assert_eq!(Channel::Unpolarized.to_string(), "Unpol");
        assert_eq!(Channel::Full(CrossSection::DU).label(), "DU");
        assert!(Channel::Unpolarized < Channel::Full(CrossSection::UU));
    }

    #[test]
    fn tags_are_stripped() {
        assert_eq!(sample_name("Fe3O4 T_SM", "", None, None), "Fe3O4_naV_naK");
        assert_eq!(
            sample_name("Fe3O4 10 K, S_DD", "", Some(10.0), None),
            "Fe3O4_naV_10K"
        );
    }

    #[test]
    fn blocked_beam_preference() {
        let files = BlockedBeamFiles {
            scattering: vec![10],
            transmission: vec![11, 12],
        };
        assert_eq!(files.for_transmission(), Some(11));
        assert_eq!(files.for_scattering(), Some(10));

        let scattering_only = BlockedBeamFiles {
            scattering: vec![10],
            transmission: vec![],
        };
        assert_eq!(scattering_only.for_transmission(), Some(10));
        assert_eq!(BlockedBeamFiles::default().for_scattering(), None);
    }
}
