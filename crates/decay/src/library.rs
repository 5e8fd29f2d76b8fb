// crate modules
use crate::error::{Error, Result};
use crate::{DecayCurve, HeCell, PolarizationState};

// external crates
use log::{debug, info};

/// Every fitted cell of an experiment, ordered by insertion time
///
/// Answers polarization queries by picking the most recently inserted cell
/// at the query time. Queries before the first insertion use the first cell.
///
/// ```rust
/// # use vsans_decay::{CellLibrary, HeCell};
/// let mut early = HeCell::new("early", 0.0, 3.0, 0.88).unwrap();
/// early.add_observation(1.0, 0.12);
///
/// let mut late = HeCell::new("late", 50.0, 3.0, 0.88).unwrap();
/// late.add_observation(1.0, 0.15);
///
/// let library = CellLibrary::from_cells(&[late, early]).unwrap();
/// assert_eq!(library.curve_at(-5.0).unwrap().name(), "early");
/// assert_eq!(library.curve_at(49.9).unwrap().name(), "early");
/// assert_eq!(library.curve_at(50.0).unwrap().name(), "late");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellLibrary {
    curves: Vec<DecayCurve>,
}

impl CellLibrary {
    /// Collect already fitted curves
    pub fn new(mut curves: Vec<DecayCurve>) -> Self {
        curves.sort_by(|a, b| a.insert_time().total_cmp(&b.insert_time()));
        Self { curves }
    }

    /// Fit every cell and collect the curves
    pub fn from_cells(cells: &[HeCell]) -> Result<Self> {
        let curves = cells
            .iter()
            .map(|cell| {
                let curve = cell.fit()?;
                info!("{curve}");
                Ok(curve)
            })
            .collect::<Result<Vec<DecayCurve>>>()?;
        Ok(Self::new(curves))
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    /// True if no cells were fitted
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Curves in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &DecayCurve> {
        self.curves.iter()
    }

    /// Cell in the beam at an absolute time (hours)
    pub fn curve_at(&self, time: f64) -> Result<&DecayCurve> {
        let first = self.curves.first().ok_or(Error::NoCells)?;
        let n = self.curves.partition_point(|c| c.insert_time() <= time);

        if n == 0 {
            debug!(
                "query at {time:.3} h precedes every cell insertion, using {}",
                first.name()
            );
            return Ok(first);
        }

        Ok(&self.curves[n - 1])
    }

    /// Polarization state at an absolute time (hours)
    pub fn query(&self, time: f64) -> Result<PolarizationState> {
        Ok(self.curve_at(time)?.state_at(time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_library_cannot_answer() {
        let library = CellLibrary::default();
        assert!(matches!(library.query(1.0), Err(Error::NoCells)));
    }

    #[test]
    fn query_uses_time_since_insertion() {
        let mut cell = HeCell::new("A", 10.0, 3.0, 0.88).unwrap();
        cell.add_observation(0.0, 0.12);
        cell.add_observation(20.0, 0.10);
        let library = CellLibrary::from_cells(&[cell]).unwrap();

        let curve = library.curve_at(30.0).unwrap();
        assert_eq!(library.query(30.0).unwrap(), curve.state_after(20.0));
    }
}
