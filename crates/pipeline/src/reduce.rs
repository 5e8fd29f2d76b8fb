//! Reduction of every sample in every configuration

// standard library
use std::collections::BTreeMap;

// crate modules
use crate::config::ReductionConfig;
use crate::error::{Error, Result};
use crate::frame::FrameStore;
use crate::grouping::{Catalogue, Channel, SampleGroup};
use crate::scaling::{blocked_beam_rates, AbsoluteScaler, FlatField};
use crate::transmission::Transmissions;
use crate::unit::{UnitKind, UnitReport, UnitState};

// external crates
use itertools::Itertools;
use log::{debug, info, warn};
use vsans_binning::{BinSettings, Binner, IntensityMap, PanelIntensity, Profile};
use vsans_decay::CellLibrary;
use vsans_efficiency::{CrossSection, EfficiencyMatrix, PolarizerEfficiency};
use vsans_geometry::{Panel, PanelMap, PixelGrid, QGrid};
use vsans_mask::{
    beamstop_mask, shadow_mask, threshold_mask, MaskKind, MaskLibrary, MaskSet, Sector,
    SectorKind,
};

/// Selection and shadow reference of one sector
#[derive(Debug, Clone)]
pub struct SectorMasks {
    /// Sector the masks belong to
    pub sector: SectorKind,
    /// Pixels binned: measured, external, sector, shadow and beamstop layers
    pub selection: MaskSet,
    /// Pixels the shadow factor is measured against: everything but shadow
    /// and beamstop
    pub reference: MaskSet,
}

/// Combined mask layers for one mask kind
#[derive(Debug, Clone)]
pub struct MaskLayers {
    /// Every layer except the sector, used to flag 2-D output
    pub general: MaskSet,
    /// Per sector selections
    pub sectors: Vec<SectorMasks>,
}

/// Everything shared by the units of one configuration
#[derive(Debug, Clone)]
pub struct ConfigSetup {
    /// Configuration identifier
    pub id: String,
    /// Q field of every panel
    pub grid: QGrid,
    /// Q binning
    pub settings: BinSettings,
    /// Blocked beam count rates per panel
    pub rates: PanelMap<f64>,
    /// Layers built on the standard scattering mask
    pub standard: MaskLayers,
    /// Layers built on the solenoid scattering mask
    pub solenoid: MaskLayers,
}

impl ConfigSetup {
    /// Layers for a unit kind
    pub fn layers(&self, kind: UnitKind) -> &MaskLayers {
        match kind {
            UnitKind::FullPolarization => &self.solenoid,
            _ => &self.standard,
        }
    }
}

/// Sector profile of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct SectorProfile {
    /// Sector the profile was binned in
    pub sector: SectorKind,
    /// Binned intensity
    pub profile: Profile,
}

/// Reduced data of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelData {
    /// Channel the data came from
    pub channel: Channel,
    /// Absolute, and for full polarization corrected, 2-D intensity
    pub data: IntensityMap,
    /// One profile per configured sector
    pub profiles: Vec<SectorProfile>,
}

impl ChannelData {
    /// Profile of a sector
    pub fn profile(&self, sector: SectorKind) -> Option<&Profile> {
        self.profiles
            .iter()
            .find(|p| p.sector == sector)
            .map(|p| &p.profile)
    }
}

/// One unit and whatever it produced before finishing or failing
#[derive(Debug, Clone)]
pub struct UnitOutput {
    /// State history
    pub report: UnitReport,
    /// Reduced channels, empty for a failed unit
    pub channels: Vec<ChannelData>,
}

impl UnitOutput {
    /// True if the cross-sections were separated by the efficiency matrix
    pub fn is_polarization_corrected(&self) -> bool {
        self.report.history().contains(&UnitState::PolCorrected)
    }
}

/// Result of a whole reduction
#[derive(Debug, Clone)]
pub struct ReductionOutput {
    /// Fitted analyzer cells
    pub cells: CellLibrary,
    /// Calibrated polarizer
    pub polarizer: PolarizerEfficiency,
    /// Shared data of every configuration that could be set up
    pub configurations: BTreeMap<String, ConfigSetup>,
    /// Every unit in processing order
    pub units: Vec<UnitOutput>,
}

impl ReductionOutput {
    /// Units that failed
    pub fn failed(&self) -> impl Iterator<Item = &UnitOutput> {
        self.units.iter().filter(|u| u.report.is_failed())
    }
}

/// Batch reduction of a frame store
///
/// ```rust
/// # use vsans_pipeline::{FrameStore, Pipeline, ReductionConfig};
/// let config = ReductionConfig::default();
/// let store = FrameStore::default();
///
/// let output = Pipeline::new(&config, &store).run().unwrap();
/// assert!(output.units.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline<'a> {
    config: &'a ReductionConfig,
    store: &'a FrameStore,
    masks: MaskLibrary,
    flat: FlatField,
}

impl<'a> Pipeline<'a> {
    /// Pipeline without external masks and a unity flat field
    pub fn new(config: &'a ReductionConfig, store: &'a FrameStore) -> Self {
        Self {
            config,
            store,
            masks: MaskLibrary::default(),
            flat: FlatField::unity(),
        }
    }

    /// Use externally supplied masks
    pub fn with_masks(mut self, masks: MaskLibrary) -> Self {
        self.masks = masks;
        self
    }

    /// Use a detector sensitivity map
    pub fn with_flat_field(mut self, flat: FlatField) -> Self {
        self.flat = flat;
        self
    }

    /// Reduce every unit of every configuration
    ///
    /// Failures of a unit, or of a whole configuration, are recorded in the
    /// unit reports and do not stop the batch.
    pub fn run(&self) -> Result<ReductionOutput> {
        let catalogue = Catalogue::build(self.store, self.config);
        let transmissions = Transmissions::new(
            self.store,
            &catalogue,
            &self.masks,
            self.config.transmission_panel,
        );

        let cells = CellLibrary::from_cells(&transmissions.cells())?;
        info!("{} analyzer cell(s) fitted", cells.len());
        let polarizer = self.polarizer(&transmissions, &cells);

        let mut configurations = BTreeMap::new();
        let mut units = Vec::new();

        for config in catalogue.configurations() {
            let setup = match self.configure(&catalogue, config) {
                Ok(setup) => setup,
                Err(e) => {
                    warn!("Configuration {config} failed: {e}");
                    for group in catalogue.samples_in(config) {
                        for kind in unit_kinds(group) {
                            let mut report = UnitReport::new(&group.name, config, kind);
                            report.fail(&e);
                            units.push(UnitOutput {
                                report,
                                channels: Vec::new(),
                            });
                        }
                    }
                    continue;
                }
            };

            let reducer = UnitReducer {
                config: self.config,
                store: self.store,
                setup: &setup,
                transmissions: &transmissions,
                cells: &cells,
                polarizer: &polarizer,
                flat: &self.flat,
            };

            for group in catalogue.samples_in(config) {
                for kind in unit_kinds(group) {
                    units.push(reducer.reduce(group, kind));
                }
            }

            configurations.insert(config.to_string(), setup);
        }

        let failed = units.iter().filter(|u| u.report.is_failed()).count();
        info!("{} units reduced, {failed} failed", units.len());

        Ok(ReductionOutput {
            cells,
            polarizer,
            configurations,
            units,
        })
    }

    /// Supermirror efficiency, ideal unless the correction is enabled and
    /// calibrated
    fn polarizer(
        &self,
        transmissions: &Transmissions,
        cells: &CellLibrary,
    ) -> PolarizerEfficiency {
        if !self.config.polarization_correction {
            info!("Polarization correction disabled, assuming PSM = PF = 1");
            return PolarizerEfficiency::ideal();
        }
        if cells.is_empty() {
            info!("No analyzer cells, assuming PSM = PF = 1");
            return PolarizerEfficiency::ideal();
        }

        match PolarizerEfficiency::from_quartets(&transmissions.quartets(), cells) {
            Ok(polarizer) => polarizer,
            Err(e) => {
                warn!("Supermirror calibration failed, assuming PSM = PF = 1: {e}");
                PolarizerEfficiency::ideal()
            }
        }
    }

    /// Q grid, binning, blocked beam and masks of one configuration
    fn configure(&self, catalogue: &Catalogue, id: &str) -> Result<ConfigSetup> {
        let file = catalogue
            .representative(id)
            .ok_or_else(|| Error::MissingConfiguration(id.to_string()))?;
        let frame = self.store.get(file)?;
        debug!("{id}: geometry from frame {file}");

        let grid = QGrid::from_geometry(&frame.geometry)?;
        let settings = BinSettings::from_q_extent(
            grid.q_extent()?,
            (self.config.q_min, self.config.q_max),
            self.config.target_bins,
            self.config.uncertainty_mode,
        )?;
        let rates = blocked_beam_rates(self.store, catalogue, id)?;

        let measured = self.measured_mask(&grid, id);
        let obstructions = MaskSet::combine_all([&shadow_mask(&grid), &beamstop_mask(&grid)])?;
        let sectors = self
            .config
            .sectors
            .iter()
            .map(|kind| Sector::new(*kind, self.config.sector_half_width))
            .collect::<vsans_mask::Result<Vec<_>>>()?;

        let layers = |kind: MaskKind| -> Result<MaskLayers> {
            let base = match self.masks.get(id, kind) {
                Some(external) => {
                    external.check_conformal(&grid)?;
                    measured.combine(external)?
                }
                None => {
                    debug!("{id}: no {kind} mask, every pixel kept");
                    measured.clone()
                }
            };

            let sectors = sectors
                .iter()
                .map(|sector| {
                    let reference = base.combine(&sector.mask(&grid))?;
                    let selection = reference.combine(&obstructions)?;
                    Ok(SectorMasks {
                        sector: sector.kind(),
                        selection,
                        reference,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(MaskLayers {
                general: base.combine(&obstructions)?,
                sectors,
            })
        };

        let standard = layers(MaskKind::Standard)?;
        let solenoid = layers(MaskKind::WithSolenoid)?;

        info!(
            "{id}: {} Q bins from {:.5} to {:.5} 1/A",
            settings.bins(),
            settings.q_min(),
            settings.q_max()
        );

        Ok(ConfigSetup {
            id: id.to_string(),
            grid,
            settings,
            rates,
            standard,
            solenoid,
        })
    }

    /// Threshold mask from a calibration exposure of this configuration
    fn measured_mask(&self, grid: &QGrid, id: &str) -> MaskSet {
        if self.config.thresholds.is_empty() {
            return MaskSet::all_selected(grid);
        }

        let frame = self
            .config
            .measured_mask_files
            .iter()
            .filter_map(|file| self.store.get(*file).ok())
            .find(|frame| frame.config_id() == id);

        match frame {
            Some(frame) => {
                debug!("{id}: measured mask from frame {}", frame.file_number);
                let thresholded = threshold_mask(&frame.counts, &self.config.thresholds);
                MaskSet::from_fn(grid, |panel, (i, j)| thresholded.is_selected(panel, i, j))
            }
            None => MaskSet::all_selected(grid),
        }
    }
}

/// Units to reduce for a sample
fn unit_kinds(group: &SampleGroup) -> Vec<UnitKind> {
    let mut kinds = [
        (Channel::Unpolarized, UnitKind::Unpolarized),
        (Channel::HalfUp, UnitKind::HalfUp),
        (Channel::HalfDown, UnitKind::HalfDown),
    ]
    .into_iter()
    .filter(|(channel, _)| !group.exposures(*channel).is_empty())
    .map(|(_, kind)| kind)
    .collect_vec();

    if group.has_any_cross_section() {
        kinds.push(UnitKind::FullPolarization);
    }
    kinds
}

/// Runs single units against a configuration
#[derive(Debug, Clone, Copy)]
struct UnitReducer<'a> {
    config: &'a ReductionConfig,
    store: &'a FrameStore,
    setup: &'a ConfigSetup,
    transmissions: &'a Transmissions<'a>,
    cells: &'a CellLibrary,
    polarizer: &'a PolarizerEfficiency,
    flat: &'a FlatField,
}

impl UnitReducer<'_> {
    fn reduce(&self, group: &SampleGroup, kind: UnitKind) -> UnitOutput {
        let mut report = UnitReport::new(&group.name, &group.config, kind);

        let result = match kind {
            UnitKind::Unpolarized => self.single(&mut report, group, Channel::Unpolarized),
            UnitKind::HalfUp => self.single(&mut report, group, Channel::HalfUp),
            UnitKind::HalfDown => self.single(&mut report, group, Channel::HalfDown),
            UnitKind::FullPolarization => self.full(&mut report, group),
        };

        match result {
            Ok(channels) => UnitOutput { report, channels },
            Err(e) => {
                report.fail(&e);
                UnitOutput {
                    report,
                    channels: Vec::new(),
                }
            }
        }
    }

    fn scaler(&self) -> AbsoluteScaler<'_> {
        AbsoluteScaler::new(&self.setup.grid, self.flat, &self.setup.rates)
    }

    /// Unpolarized or half polarized scattering, never corrected
    fn single(
        &self,
        report: &mut UnitReport,
        group: &SampleGroup,
        channel: Channel,
    ) -> Result<Vec<ChannelData>> {
        let abs_scale = self.transmissions.abs_scale(group, channel);
        let data = self
            .scaler()
            .scale(self.store, group.exposures(channel), abs_scale)?;
        report.advance(UnitState::AbsScaled);
        report.advance(UnitState::Passthrough);

        let offset = match channel {
            Channel::Unpolarized => self.config.low_q_offsets.unpolarized,
            _ => 0.0,
        };
        let profiles = self.bin(&data, report.kind, offset)?;
        report.advance(UnitState::MaskedAndBinned);

        Ok(vec![ChannelData {
            channel,
            data,
            profiles,
        }])
    }

    /// All four cross-sections, separated whenever cells are available
    fn full(&self, report: &mut UnitReport, group: &SampleGroup) -> Result<Vec<ChannelData>> {
        let mut scaled = Vec::with_capacity(4);
        for cross_section in CrossSection::ALL {
            let channel = Channel::Full(cross_section);
            let exposures = group.exposures(channel);
            if exposures.is_empty() {
                return Err(Error::EmptyChannel(cross_section.to_string()));
            }
            let abs_scale = self.transmissions.abs_scale(group, channel);
            scaled.push(self.scaler().scale(self.store, exposures, abs_scale)?);
        }
        report.advance(UnitState::AbsScaled);

        // a disabled correction still removes the cell, with an ideal polarizer
        let data = if !self.cells.is_empty() {
            let matrix = EfficiencyMatrix::build(
                &group.exposure_times(),
                self.cells,
                self.polarizer,
                self.config.analyzer_efficiency,
            )?;
            let corrected = correct(&matrix, &scaled)?;
            report.advance(UnitState::PolCorrected);
            corrected
        } else {
            info!("{report}: no analyzer cells, cross-sections passed through");
            report.advance(UnitState::Passthrough);
            scaled
        };

        let offsets = &self.config.low_q_offsets;
        let channels = CrossSection::ALL
            .into_iter()
            .zip(data)
            .map(|(cross_section, data)| {
                let offset = match cross_section.is_spin_flip() {
                    true => offsets.spin_flip,
                    false => offsets.non_spin_flip,
                };
                let profiles = self.bin(&data, report.kind, offset)?;
                Ok(ChannelData {
                    channel: Channel::Full(cross_section),
                    data,
                    profiles,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        report.advance(UnitState::MaskedAndBinned);

        Ok(channels)
    }

    /// Profiles for every configured sector
    fn bin(&self, data: &IntensityMap, kind: UnitKind, offset: f64) -> Result<Vec<SectorProfile>> {
        self.setup
            .layers(kind)
            .sectors
            .iter()
            .map(|masks| {
                let mut profile = Binner::new(self.setup.settings, &self.setup.grid, &masks.selection)
                    .with_shadow_reference(&masks.reference)
                    .bin(data)?;
                profile.subtract_middle_offset(offset);
                Ok(SectorProfile {
                    sector: masks.sector,
                    profile,
                })
            })
            .collect()
    }
}

/// Apply the inverse efficiency matrix pixel by pixel
///
/// Uncertainties are carried over from the uncorrected channels.
fn correct(matrix: &EfficiencyMatrix, scaled: &[IntensityMap]) -> Result<Vec<IntensityMap>> {
    let [uu, du, dd, ud] = scaled else {
        return Err(Error::EmptyChannel("cross-section".into()));
    };

    let mut corrected = vec![IntensityMap::new(); 4];
    for (panel, uu_panel) in uu {
        let stack = [
            uu_panel,
            panel_data(du, *panel)?,
            panel_data(dd, *panel)?,
            panel_data(ud, *panel)?,
        ];
        let (nx, ny) = uu_panel.intensity.shape();

        let values = matrix.correct([
            stack[0].intensity.values(),
            stack[1].intensity.values(),
            stack[2].intensity.values(),
            stack[3].intensity.values(),
        ])?;

        for ((target, source), values) in corrected.iter_mut().zip(stack).zip(values) {
            target.insert(
                *panel,
                PanelIntensity {
                    intensity: PixelGrid::from_vec(nx, ny, values)?,
                    uncertainty: source.uncertainty.clone(),
                },
            );
        }
    }

    Ok(corrected)
}

fn panel_data(map: &IntensityMap, panel: Panel) -> Result<&PanelIntensity> {
    map.get(&panel)
        .ok_or(vsans_binning::Error::MissingIntensity(panel).into())
}
