//! Transmission measurements on the direct beam panel
//!
//! Every transmission is a sum over the transmission panel, restricted to
//! the transmission mask of the configuration when one exists, after
//! subtracting a blocked beam exposure scaled to the same count time.

// crate modules
use crate::error::{Error, Result};
use crate::frame::{DetectorFrame, FrameStore};
use crate::grouping::{Catalogue, Channel, Exposure, He3Pair, QuartetFiles, SampleGroup};

// external crates
use log::{debug, trace, warn};
use vsans_decay::HeCell;
use vsans_efficiency::{CalibrationQuartet, QuartetEntry};
use vsans_geometry::{Panel, PixelGrid};
use vsans_mask::{MaskKind, MaskLibrary};

/// Monitor counts every scaled quantity is normalised to
pub const MONITOR_NORMALISATION: f64 = 1.0e8;

/// Transmission calculations for one experiment
#[derive(Debug, Clone, Copy)]
pub struct Transmissions<'a> {
    store: &'a FrameStore,
    catalogue: &'a Catalogue,
    masks: &'a MaskLibrary,
    panel: Panel,
}

impl<'a> Transmissions<'a> {
    /// Transmissions measured on `panel`
    pub fn new(
        store: &'a FrameStore,
        catalogue: &'a Catalogue,
        masks: &'a MaskLibrary,
        panel: Panel,
    ) -> Self {
        Self {
            store,
            catalogue,
            masks,
            panel,
        }
    }

    /// Blocked beam exposure used for transmissions in a configuration
    fn blocked_beam(&self, config: &str) -> Result<Option<&'a DetectorFrame>> {
        self.catalogue
            .blocked_beam(config)
            .and_then(|files| files.for_transmission())
            .map(|file| self.store.get(file))
            .transpose()
    }

    /// Transmission mask of the panel, if one was supplied
    fn mask(&self, config: &str) -> Option<&'a PixelGrid<bool>> {
        self.masks
            .get(config, MaskKind::Transmission)
            .and_then(|mask| mask.panel(self.panel))
    }

    /// Blocked beam subtracted counts summed over the masked panel
    pub fn corrected_counts(&self, frame: &DetectorFrame, config: &str) -> Result<f64> {
        let counts = frame.panel_counts(self.panel)?;

        let counts = match self.blocked_beam(config)? {
            Some(bb) => {
                let scale = frame.count_time / bb.checked_count_time()?;
                trace!(
                    "{} less blocked beam {} x {scale:.4}",
                    frame.file_number,
                    bb.file_number
                );
                counts.zip_map(bb.panel_counts(self.panel)?, |c, b| c - b * scale)?
            }
            None => counts.clone(),
        };

        let total = match self.mask(config) {
            Some(mask) => {
                if !mask.same_shape(&counts) {
                    return Err(vsans_mask::Error::ShapeMismatch {
                        panel: self.panel,
                        expected: counts.shape(),
                        found: mask.shape(),
                    }
                    .into());
                }
                counts
                    .values()
                    .iter()
                    .zip(mask.values())
                    .filter(|(_, keep)| **keep)
                    .map(|(c, _)| c)
                    .sum()
            }
            None => counts.sum(),
        };

        Ok(total)
    }

    /// Analyzer transmission from a HeOUT/HeIN pair
    ///
    /// `(IN - BB)/(OUT - BB) * (MON_OUT/MON_IN)`
    pub fn he3_transmission(&self, pair: &He3Pair) -> Result<f64> {
        let cell_out = self.store.get(pair.out_file)?;
        let cell_in = self.store.get(pair.in_file)?;

        let out_counts = self.corrected_counts(cell_out, &pair.config)?;
        if out_counts == 0.0 {
            return Err(Error::ZeroTransmission(pair.out_file));
        }
        let in_counts = self.corrected_counts(cell_in, &pair.config)?;

        Ok(in_counts / out_counts * cell_out.checked_monitor()? / cell_in.checked_monitor()?)
    }

    /// Analyzer cells with every usable transmission recorded
    ///
    /// Pairs with a transmission outside the physical range of the cell are
    /// dropped, and cells left without any observation are skipped.
    pub fn cells(&self) -> Vec<HeCell> {
        let mut cells = Vec::new();

        for record in self.catalogue.cells() {
            let mut cell = match HeCell::new(&record.name, record.insert_time, record.mu, record.te)
            {
                Ok(cell) => cell,
                Err(e) => {
                    warn!("Cell {} skipped: {e}", record.name);
                    continue;
                }
            };

            for pair in &record.pairs {
                let transmission = self
                    .he3_transmission(pair)
                    .and_then(|t| cell.linearise(t).map(|_| t).map_err(Error::from));

                match transmission {
                    Ok(t) => {
                        debug!(
                            "{}: T = {t:.5} at {:.3} h ({} -> {})",
                            record.name, pair.elapsed, pair.out_file, pair.in_file
                        );
                        cell.add_observation(pair.elapsed, t);
                    }
                    Err(e) => warn!(
                        "{}: pair {} -> {} dropped: {e}",
                        record.name, pair.out_file, pair.in_file
                    ),
                }
            }

            if cell.observations().is_empty() {
                warn!("Cell {} has no usable transmissions, skipped", record.name);
                continue;
            }
            cells.push(cell);
        }

        cells
    }

    /// Calibration quartets normalised to their supermirror transmission
    pub fn quartets(&self) -> Vec<CalibrationQuartet> {
        self.catalogue
            .quartets()
            .iter()
            .filter_map(|files| match self.quartet(files) {
                Ok(quartet) => Some(quartet),
                Err(e) => {
                    warn!(
                        "Quartet starting at {} dropped: {e}",
                        files.exposures[0].file
                    );
                    None
                }
            })
            .collect()
    }

    /// `(X - BB)/(SM - BB) * (MON_SM/MON_X)` for every cross-section
    fn quartet(&self, files: &QuartetFiles) -> Result<CalibrationQuartet> {
        let supermirror = self.store.get(files.supermirror)?;
        let sm_counts = self.corrected_counts(supermirror, &files.config)?;
        if sm_counts == 0.0 {
            return Err(Error::ZeroTransmission(files.supermirror));
        }
        let sm_monitor = supermirror.checked_monitor()?;

        let entry = |exposure: &Exposure| -> Result<QuartetEntry> {
            let frame = self.store.get(exposure.file)?;
            let counts = self.corrected_counts(frame, &files.config)?;
            Ok(QuartetEntry {
                transmission: counts / sm_counts * sm_monitor / frame.checked_monitor()?,
                time: exposure.time,
            })
        };

        let [uu, du, dd, ud] = &files.exposures;
        Ok(CalibrationQuartet {
            uu: entry(uu)?,
            du: entry(du)?,
            dd: entry(dd)?,
            ud: entry(ud)?,
        })
    }

    /// Monitor normalised transmission counts of a sample channel
    pub fn sample_counts(&self, group: &SampleGroup, channel: Channel) -> Result<Vec<f64>> {
        let Some(files) = group.transmission.get(&channel) else {
            return Ok(Vec::new());
        };

        files
            .iter()
            .map(|file| {
                let frame = self.store.get(*file)?;
                let counts = self.corrected_counts(frame, &group.config)?;
                Ok(counts * MONITOR_NORMALISATION / frame.checked_monitor()?)
            })
            .collect()
    }

    /// Absolute scale factor of a sample channel
    ///
    /// Polarized channels prefer the half polarized transmission and
    /// unpolarized scattering prefers the unpolarized one, each falling back
    /// to the other. Without any usable transmission the factor is 1.
    pub fn abs_scale(&self, group: &SampleGroup, channel: Channel) -> f64 {
        let preference = match channel {
            Channel::Unpolarized => [Channel::Unpolarized, Channel::HalfUp],
            _ => [Channel::HalfUp, Channel::Unpolarized],
        };

        for candidate in preference {
            match self.sample_counts(group, candidate) {
                Ok(counts) if !counts.is_empty() => {
                    let scale = counts.iter().sum::<f64>() / counts.len() as f64;
                    if scale > 0.0 && scale.is_finite() {
                        debug!("{} {channel}: ABS = {scale:.5e} from {candidate}", group.name);
                        return scale;
                    }
                    warn!(
                        "{} {candidate} transmission is not positive ({scale}), ignored",
                        group.name
                    );
                }
                Ok(_) => trace!("{} has no {candidate} transmission", group.name),
                Err(e) => warn!("{} {candidate} transmission unusable: {e}", group.name),
            }
        }

        warn!(
            "No transmission for {} in {}, absolute scale set to 1",
            group.name, group.config
        );
        1.0
    }
}
