// standard library
use std::collections::BTreeMap;
use std::ops::{Index, IndexMut};

// crate modules
use crate::error::{Error, Result};
use crate::Panel;

// external crates
use serde::{Deserialize, Serialize};

/// Anything held once per detector panel, in file order
pub type PanelMap<T> = BTreeMap<Panel, T>;

/// Rectangular grid of per-pixel values for one panel
///
/// Pixels are addressed as `(i, j)` where `i` runs along the panel x axis
/// (`nx` pixels) and `j` along the y axis (`ny` pixels). Values are stored
/// with `j` varying fastest, matching the layout of the raw detector arrays.
///
/// ```rust
/// # use vsans_geometry::PixelGrid;
/// let grid = PixelGrid::from_fn(3, 2, |i, j| (10 * i + j) as f64);
/// assert_eq!(grid.shape(), (3, 2));
/// assert_eq!(grid[(2, 1)], 21.0);
/// assert_eq!(grid.values(), &[0.0, 1.0, 10.0, 11.0, 20.0, 21.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "RawGrid<T>",
    bound(deserialize = "T: Deserialize<'de>")
)]
pub struct PixelGrid<T> {
    nx: usize,
    ny: usize,
    values: Vec<T>,
}

/// Unchecked form used to validate deserialised grids
#[derive(Deserialize)]
struct RawGrid<T> {
    nx: usize,
    ny: usize,
    values: Vec<T>,
}

impl<T> TryFrom<RawGrid<T>> for PixelGrid<T> {
    type Error = Error;

    fn try_from(raw: RawGrid<T>) -> Result<Self> {
        PixelGrid::from_vec(raw.nx, raw.ny, raw.values)
    }
}

impl<T> PixelGrid<T> {
    /// Wrap existing values, checking the length matches the shape
    ///
    /// ```rust
    /// # use vsans_geometry::PixelGrid;
    /// assert!(PixelGrid::from_vec(2, 2, vec![1.0; 4]).is_ok());
    /// assert!(PixelGrid::from_vec(2, 2, vec![1.0; 3]).is_err());
    /// ```
    pub fn from_vec(nx: usize, ny: usize, values: Vec<T>) -> Result<Self> {
        if values.len() != nx * ny {
            return Err(Error::GridShapeMismatch {
                expected: nx * ny,
                found: values.len(),
            });
        }
        Ok(Self { nx, ny, values })
    }

    /// Build a grid by evaluating `f(i, j)` for every pixel
    pub fn from_fn(nx: usize, ny: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut values = Vec::with_capacity(nx * ny);
        for i in 0..nx {
            for j in 0..ny {
                values.push(f(i, j));
            }
        }
        Self { nx, ny, values }
    }

    /// Number of pixels along x
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Number of pixels along y
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Shape as `(nx, ny)`
    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    /// Total number of pixels
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for a grid with no pixels
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Flat view of the values, `j` varying fastest
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Mutable flat view of the values
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Consume the grid and return the flat values
    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    /// Value at pixel `(i, j)`, if inside the grid
    pub fn get(&self, i: usize, j: usize) -> Option<&T> {
        if i < self.nx && j < self.ny {
            self.values.get(i * self.ny + j)
        } else {
            None
        }
    }

    /// Iterate over `((i, j), value)` for every pixel
    pub fn indexed_iter(&self) -> impl Iterator<Item = ((usize, usize), &T)> {
        let ny = self.ny.max(1);
        self.values
            .iter()
            .enumerate()
            .map(move |(n, v)| ((n / ny, n % ny), v))
    }

    /// True if both grids have the same `(nx, ny)`
    pub fn same_shape<U>(&self, other: &PixelGrid<U>) -> bool {
        self.shape() == other.shape()
    }

    /// New grid of the same shape with `f` applied to every value
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> PixelGrid<U> {
        PixelGrid {
            nx: self.nx,
            ny: self.ny,
            values: self.values.iter().map(f).collect(),
        }
    }

    /// Combine two grids of the same shape value by value
    ///
    /// ```rust
    /// # use vsans_geometry::PixelGrid;
    /// let a = PixelGrid::filled(2, 1, 3.0);
    /// let b = PixelGrid::filled(2, 1, 4.0);
    /// let c = a.zip_map(&b, |x, y| x * y).unwrap();
    /// assert_eq!(c.values(), &[12.0, 12.0]);
    ///
    /// let d = PixelGrid::filled(1, 2, 4.0);
    /// assert!(a.zip_map(&d, |x, y| x * y).is_err());
    /// ```
    pub fn zip_map<U, V>(
        &self,
        other: &PixelGrid<U>,
        mut f: impl FnMut(&T, &U) -> V,
    ) -> Result<PixelGrid<V>> {
        if !self.same_shape(other) {
            return Err(Error::GridShapeMismatch {
                expected: self.len(),
                found: other.len(),
            });
        }
        Ok(PixelGrid {
            nx: self.nx,
            ny: self.ny,
            values: self
                .values
                .iter()
                .zip(other.values.iter())
                .map(|(a, b)| f(a, b))
                .collect(),
        })
    }
}

impl<T: Clone> PixelGrid<T> {
    /// Grid of the given shape with every pixel set to `value`
    pub fn filled(nx: usize, ny: usize, value: T) -> Self {
        Self {
            nx,
            ny,
            values: vec![value; nx * ny],
        }
    }
}

impl PixelGrid<f64> {
    /// Sum of every pixel value
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }
}

impl<T> Index<(usize, usize)> for PixelGrid<T> {
    type Output = T;

    fn index(&self, (i, j): (usize, usize)) -> &T {
        assert!(i < self.nx && j < self.ny, "pixel ({i}, {j}) outside grid");
        &self.values[i * self.ny + j]
    }
}

impl<T> IndexMut<(usize, usize)> for PixelGrid<T> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        assert!(i < self.nx && j < self.ny, "pixel ({i}, {j}) outside grid");
        &mut self.values[i * self.ny + j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_iteration_matches_layout() {
        let grid = PixelGrid::from_fn(2, 3, |i, j| (i, j));
        for ((i, j), v) in grid.indexed_iter() {
            assert_eq!((i, j), *v);
        }
    }

    #[test]
    fn get_outside_is_none() {
        let grid = PixelGrid::filled(2, 2, 0u8);
        assert!(grid.get(2, 0).is_none());
        assert!(grid.get(1, 1).is_some());
    }

    #[test]
    fn deserialise_checks_shape() {
        let ok: std::result::Result<PixelGrid<f64>, _> =
            serde_json::from_str(r#"{"nx": 1, "ny": 2, "values": [1.0, 2.0]}"#);
        assert!(ok.is_ok());

        let bad: std::result::Result<PixelGrid<f64>, _> =
            serde_json::from_str(r#"{"nx": 2, "ny": 2, "values": [1.0, 2.0]}"#);
        assert!(bad.is_err());
    }
}
