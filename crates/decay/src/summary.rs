//! Human readable decay fit summary

// standard library
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

// crate modules
use crate::error::Result;
use crate::CellLibrary;

// external crates
use vsans_utils::ValueExt;

/// Write a table of decay parameters for every cell in the library
///
/// One row per cell with the insertion time, cell constants, the initial
/// neutron polarization `tanh(Mu P0)`, fitted parameters, the number of
/// observations, and whether the fit fell back to the no-decay placeholder.
///
/// ```rust, no_run
/// # use vsans_decay::{write_summary, CellLibrary};
/// let library = CellLibrary::default();
/// write_summary(&library, "./He3_decay_summary.txt").unwrap();
/// ```
pub fn write_summary<P: AsRef<Path>>(library: &CellLibrary, path: P) -> Result<()> {
    let mut writer = init_writer(path)?;
    write_table(library, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write the summary table to any writer
pub fn write_table<W: Write>(library: &CellLibrary, writer: &mut W) -> Result<()> {
    writeln!(
        writer,
        "{:<16} {:>11} {:>11} {:>11} {:>11} {:>11} {:>11} {:>4} {}",
        "Cell", "Insert(h)", "Mu", "Te", "PCell0", "P0", "Gamma(h)", "N", "Confidence"
    )?;

    for curve in library.iter() {
        writeln!(
            writer,
            "{:<16} {:>11} {:>11} {:>11} {:>11} {:>11} {:>11} {:>4} {}",
            curve.name(),
            curve.insert_time().sci(4, 2),
            curve.mu().sci(4, 2),
            curve.te().sci(4, 2),
            curve.initial_cell_polarization().sci(4, 2),
            curve.p0().sci(4, 2),
            curve.gamma().sci(4, 2),
            curve.observations().len(),
            if curve.is_low_confidence() {
                "low"
            } else {
                "fitted"
            }
        )?;
    }

    Ok(())
}

fn init_writer<P: AsRef<Path>>(path: P) -> Result<BufWriter<File>> {
    let file = File::create(path)?;
    Ok(BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeCell;

    #[test]
    fn one_row_per_cell() {
        let mut a = HeCell::new("A", 0.0, 3.0, 0.88).unwrap();
        a.add_observation(0.0, 0.12);
        let library = CellLibrary::from_cells(&[a]).unwrap();

        let mut buffer = Vec::new();
        write_table(&library, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let lines = text.lines().collect::<Vec<&str>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("A "));
        assert!(lines[1].ends_with("low"));
    }
}
