//! Text tables of reduced data

// standard library
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

// crate modules
use crate::error::Result;
use crate::reduce::{ChannelData, ConfigSetup, ReductionOutput, UnitOutput};
use crate::unit::{UnitKind, UnitState};

// external crates
use itertools::Itertools;
use log::{debug, info, warn};
use vsans_binning::{IntensityMap, Profile, ProfilePoint};
use vsans_decay::write_summary;
use vsans_efficiency::CrossSection;
use vsans_geometry::{Panel, QGrid};
use vsans_mask::{MaskSet, SectorKind};
use vsans_utils::ValueExt;

/// Name of the analyzer cell summary
pub const DECAY_SUMMARY: &str = "He3_decay_summary.txt";

fn sci(value: f64) -> String {
    value.sci(4, 2)
}

fn write_row<W: Write>(writer: &mut W, values: &[f64]) -> Result<()> {
    writeln!(writer, "{}", values.iter().map(|v| sci(*v)).join(" "))?;
    Ok(())
}

/// Write 2-D intensity pixel by pixel
///
/// Columns are `Qx Qy I DI Qz SigmaQParl SigmaQPerp Mask`, where the last
/// column is 1 for pixels kept by `flags` and 0 otherwise. Only `panels`
/// are written, in panel order.
pub fn write_two_dimensional<W: Write>(
    writer: &mut W,
    grid: &QGrid,
    data: &IntensityMap,
    flags: &MaskSet,
    panels: &[Panel],
) -> Result<()> {
    writeln!(writer, "Qx Qy I DI Qz SigmaQParl SigmaQPerp Mask")?;

    for panel in panels {
        let (Ok(q), Some(intensity)) = (grid.panel(*panel), data.get(panel)) else {
            debug!("no 2-D data for {panel}");
            continue;
        };
        if q.shape() != intensity.intensity.shape() {
            return Err(vsans_binning::Error::ShapeMismatch {
                panel: *panel,
                expected: q.shape(),
                found: intensity.intensity.shape(),
            }
            .into());
        }

        for ((i, j), value) in intensity.intensity.indexed_iter() {
            let pixel = q.pixel(i, j);
            let flag = match flags.is_selected(*panel, i, j) {
                true => 1.0,
                false => 0.0,
            };
            write_row(
                writer,
                &[
                    pixel.qx,
                    pixel.qy,
                    *value,
                    intensity.uncertainty[(i, j)],
                    pixel.qz,
                    pixel.sigma_parl,
                    pixel.sigma_perp,
                    flag,
                ],
            )?;
        }
    }

    Ok(())
}

/// Write a 1-D profile
///
/// ```rust
/// # use vsans_binning::{Profile, ProfilePoint};
/// # use vsans_geometry::Carriage;
/// # use vsans_pipeline::write_profile;
/// let profile = Profile::new(vec![ProfilePoint {
///     carriage: Carriage::Middle,
///     bin: 0,
///     q: 0.01,
///     intensity: 12.5,
///     uncertainty: 0.5,
///     q_resolution: 0.001,
///     mean_q: 0.0102,
///     pixels: 40,
///     shadow: 1.0,
/// }]);
///
/// let mut buffer = Vec::new();
/// write_profile(&mut buffer, &profile).unwrap();
///
/// let text = String::from_utf8(buffer).unwrap();
/// assert_eq!(
///     text.lines().nth(1),
///     Some("1.0000e-02 1.2500e+01 5.0000e-01 1.0000e-03 1.0200e-02 1.0000e+00")
/// );
/// ```
pub fn write_profile<W: Write>(writer: &mut W, profile: &Profile) -> Result<()> {
    writeln!(writer, "Q, I, DI, DQ, MeanQ, Shadow")?;
    for point in profile.points() {
        write_row(
            writer,
            &[
                point.q,
                point.intensity,
                point.uncertainty,
                point.q_resolution,
                point.mean_q,
                point.shadow,
            ],
        )?;
    }
    Ok(())
}

/// Write the four cross-sections side by side, in UU, DU, DD, UD order
///
/// Only bins present in all four profiles are written.
pub fn write_full_polarization<W: Write>(writer: &mut W, profiles: [&Profile; 4]) -> Result<()> {
    writeln!(
        writer,
        "Q, UU, DelUU, DU, DelDU, DD, DelDD, UD, DelUD, Q_mean, Q_Unc, Shadow"
    )?;

    for points in Profile::align(&profiles) {
        let first = points[0];
        let mut row = vec![first.q];
        row.extend(points.iter().flat_map(|p| [p.intensity, p.uncertainty]));
        row.extend([first.mean_q, first.q_resolution, first.shadow]);
        write_row(writer, &row)?;
    }
    Ok(())
}

/// Write spin-flip and non spin-flip combinations
///
/// `SF = UD + DU`, `NSF = UU + DD` and `NSFDiff = DD - UU`.
pub fn write_combined<W: Write>(writer: &mut W, profiles: [&Profile; 4]) -> Result<()> {
    let [uu, du, dd, ud] = profiles;
    let sf = Profile::spin_flip(ud, du);
    let nsf = Profile::non_spin_flip(uu, dd);
    let diff = Profile::nsf_difference(dd, uu);

    writeln!(
        writer,
        "Q, SF, DelSF, NSF, DelNSF, NSFDiff, DelNSFDiff, DelQ, MeanQ, Shadow"
    )?;

    for points in Profile::align(&[&sf, &nsf, &diff]) {
        let first: &ProfilePoint = points[0];
        let mut row = vec![first.q];
        row.extend(points.iter().flat_map(|p| [p.intensity, p.uncertainty]));
        row.extend([first.q_resolution, first.mean_q, first.shadow]);
        write_row(writer, &row)?;
    }
    Ok(())
}

/// Write every finished unit and the decay summary into `dir`
///
/// Units that were written are moved to `Emitted`. A unit that can not be
/// written is marked failed and the others carry on.
pub fn write_outputs<P: AsRef<Path>>(
    output: &mut ReductionOutput,
    dir: P,
    per_panel: bool,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut written = Vec::new();

    if !output.cells.is_empty() {
        let path = dir.join(DECAY_SUMMARY);
        write_summary(&output.cells, &path)?;
        written.push(path);
    }

    for unit in output.units.iter_mut() {
        if unit.report.state() != &UnitState::MaskedAndBinned {
            continue;
        }

        let Some(setup) = output.configurations.get(&unit.report.config) else {
            warn!("{}: configuration was not set up, not written", unit.report);
            continue;
        };

        match write_unit(unit, setup, dir, per_panel) {
            Ok(paths) => {
                unit.report.advance(UnitState::Emitted);
                written.extend(paths);
            }
            Err(e) => unit.report.fail(&e),
        }
    }

    info!("{} files written to {}", written.len(), dir.display());
    Ok(written)
}

/// Stem shared by every file of a unit
fn stem(unit: &UnitOutput, label: &str) -> String {
    format!("{}_{}_{label}", unit.report.sample, unit.report.config)
}

fn write_unit(
    unit: &UnitOutput,
    setup: &ConfigSetup,
    dir: &Path,
    per_panel: bool,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    let flags = &setup.layers(unit.report.kind).general;

    for channel in &unit.channels {
        let label = channel.channel.label();
        let path = dir.join(format!("{}_2D.txt", stem(unit, label)));
        write_to(&path, |w| {
            write_two_dimensional(w, &setup.grid, &channel.data, flags, &Panel::ALL)
        })?;
        written.push(path);

        if per_panel {
            for panel in Panel::ALL {
                let path = dir.join(format!("{}_2D_{panel}.txt", stem(unit, label)));
                write_to(&path, |w| {
                    write_two_dimensional(w, &setup.grid, &channel.data, flags, &[panel])
                })?;
                written.push(path);
            }
        }

        if unit.report.kind != UnitKind::FullPolarization {
            for sector in &channel.profiles {
                let path = dir.join(format!("{}_{}.txt", stem(unit, label), sector.sector));
                write_to(&path, |w| write_profile(w, &sector.profile))?;
                written.push(path);
            }
        }
    }

    if unit.report.kind == UnitKind::FullPolarization {
        let label = match unit.is_polarization_corrected() {
            true => "FullPol",
            false => "NotPolCorr",
        };
        for sector in sectors(&unit.channels) {
            let Some(profiles) = cross_sections(&unit.channels, sector) else {
                continue;
            };

            let path = dir.join(format!("{}_{sector}.txt", stem(unit, label)));
            write_to(&path, |w| write_full_polarization(w, profiles))?;
            written.push(path);

            let path = dir.join(format!("{}_SF_NSF_{sector}.txt", stem(unit, label)));
            write_to(&path, |w| write_combined(w, profiles))?;
            written.push(path);
        }
    }

    debug!("{}: {} files", unit.report, written.len());
    Ok(written)
}

/// Sectors binned for a unit
fn sectors(channels: &[ChannelData]) -> Vec<SectorKind> {
    channels
        .first()
        .map(|c| c.profiles.iter().map(|p| p.sector).collect())
        .unwrap_or_default()
}

/// Profiles of the four cross-sections in UU, DU, DD, UD order
fn cross_sections(channels: &[ChannelData], sector: SectorKind) -> Option<[&Profile; 4]> {
    let profile = |cs: CrossSection| {
        channels
            .iter()
            .find(|c| c.channel == crate::Channel::Full(cs))
            .and_then(|c| c.profile(sector))
    };
    let [uu, du, dd, ud] = CrossSection::ALL;
    Some([profile(uu)?, profile(du)?, profile(dd)?, profile(ud)?])
}

fn write_to(path: &Path, f: impl FnOnce(&mut BufWriter<File>) -> Result<()>) -> Result<()> {
    let mut writer = init_writer(path)?;
    f(&mut writer)?;
    writer.flush()?;
    Ok(())
}

fn init_writer<P: AsRef<Path>>(path: P) -> Result<BufWriter<File>> {
    let file = File::create(path)?;
    Ok(BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsans_geometry::Carriage;

    fn profile(intensity: f64) -> Profile {
        Profile::new(
            (0..3)
                .map(|bin| ProfilePoint {
                    carriage: Carriage::Front,
                    bin,
                    q: 0.02 * (bin + 1) as f64,
                    intensity,
                    uncertainty: 1.0,
                    q_resolution: 0.002,
                    mean_q: 0.02 * (bin + 1) as f64,
                    pixels: 10,
                    shadow: 1.0,
                })
                .collect(),
        )
    }

    #[test]
    fn full_polarization_columns() {
        let (uu, du, dd, ud) = (profile(1.0), profile(2.0), profile(3.0), profile(4.0));
        let mut buffer = Vec::new();
        write_full_polarization(&mut buffer, [&uu, &du, &dd, &ud]).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 4);

        let columns = lines[1].split(' ').collect::<Vec<_>>();
        assert_eq!(columns.len(), 12);
        assert_eq!(columns[5], "3.0000e+00");
        assert_eq!(columns[7], "4.0000e+00");
    }

    #[test]
    fn combined_sums_and_differences() {
        let (uu, du, dd, ud) = (profile(1.0), profile(2.0), profile(3.0), profile(4.0));
        let mut buffer = Vec::new();
        write_combined(&mut buffer, [&uu, &du, &dd, &ud]).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let columns = text.lines().nth(1).unwrap().split(' ').collect::<Vec<_>>();

        // SF, NSF, NSFDiff
        assert_eq!(columns[1], "6.0000e+00");
        assert_eq!(columns[3], "4.0000e+00");
        assert_eq!(columns[5], "2.0000e+00");
        assert_eq!(columns[2], 2.0_f64.sqrt().sci(4, 2));
    }
}
