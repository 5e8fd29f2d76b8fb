use crate::error::{Error, Result};

/// Extends functionality for slices of float arrays
pub trait SliceExt<T> {
    /// Find the minimum value in float arrays
    ///
    /// Only provides the minimum value from a collection of valid numbers. Any
    /// NAN values, infinite values, or empty slices will return an error.
    ///
    /// ```rust
    /// # use vsans_utils::SliceExt;
    /// # use vsans_utils::Error;
    /// // Successful cases
    /// assert_eq!([0.011, 0.005, 0.2].try_min(), Ok(0.005));
    ///
    /// // Error cases
    /// assert_eq!([1.1, f64::NAN, 2.2].try_min(), Err(Error::NonFiniteValues));
    /// assert_eq!(Vec::<f64>::new().try_min(), Err(Error::EmptySlice));
    /// ```
    ///
    /// The float primitives do not implement `Ord` due to `NaN` being
    /// incomparable, so this uses `total_cmp` after rejecting non-finite
    /// values.
    fn try_min(&self) -> Result<T>;

    /// Find the maximum value in float arrays
    ///
    /// Only provides the maximum value from a collection of valid numbers. Any
    /// NAN values, infinite values, or empty slices will return an error.
    ///
    /// ```rust
    /// # use vsans_utils::SliceExt;
    /// # use vsans_utils::Error;
    /// // Successful cases
    /// assert_eq!([0.011, 0.005, 0.2].try_max(), Ok(0.2));
    ///
    /// // Error cases
    /// assert_eq!([1.1, f64::INFINITY].try_max(), Err(Error::NonFiniteValues));
    /// assert_eq!(Vec::<f64>::new().try_max(), Err(Error::EmptySlice));
    /// ```
    fn try_max(&self) -> Result<T>;

    /// Arithmetic mean of a non-empty slice
    ///
    /// ```rust
    /// # use vsans_utils::SliceExt;
    /// # use vsans_utils::Error;
    /// assert_eq!([2.0, 4.0].try_mean(), Ok(3.0));
    /// assert_eq!(Vec::<f64>::new().try_mean(), Err(Error::EmptySlice));
    /// ```
    fn try_mean(&self) -> Result<T>;

    /// Find index bin containing 'value', where bins are low <= value < high
    ///
    /// A value on a bin edge returns the bin above. Values equal to the highest
    /// bound are considered part of the last bin, so a Q value sitting exactly
    /// on the upper limit of a binning range is still counted.
    ///
    /// ```text
    ///     edges : 0.005 0.010 0.015
    ///     0.005 <= bin 0 < 0.010
    ///     0.010 <= bin 1 <= 0.015
    /// ```
    ///
    /// ```rust
    /// # use vsans_utils::SliceExt;
    /// let edges = vec![0.0, 0.1, 1.0, 20.0];
    ///
    /// // Find values in the array
    /// assert_eq!(edges.find_bin_exclusive(0.0 ), Ok(0));
    /// assert_eq!(edges.find_bin_exclusive(0.5 ), Ok(1));
    /// assert_eq!(edges.find_bin_exclusive(1.0 ), Ok(2));
    /// assert_eq!(edges.find_bin_exclusive(20.0), Ok(2));
    ///
    /// // Values outside the bin bounds are an error case
    /// assert!(edges.find_bin_exclusive(-1.0).is_err());
    /// assert!(edges.find_bin_exclusive(21.0).is_err());
    /// ```
    fn find_bin_exclusive(&self, value: T) -> Result<usize>;
}

impl SliceExt<f64> for [f64] {
    fn try_min(&self) -> Result<f64> {
        if self.iter().any(|v| !v.is_finite()) {
            return Err(Error::NonFiniteValues);
        };

        self.iter()
            .min_by(|a, b| a.total_cmp(b))
            .copied()
            .ok_or(Error::EmptySlice)
    }

    fn try_max(&self) -> Result<f64> {
        if self.iter().any(|v| !v.is_finite()) {
            return Err(Error::NonFiniteValues);
        };

        self.iter()
            .max_by(|a, b| a.total_cmp(b))
            .copied()
            .ok_or(Error::EmptySlice)
    }

    fn try_mean(&self) -> Result<f64> {
        if self.is_empty() {
            return Err(Error::EmptySlice);
        }
        Ok(self.iter().sum::<f64>() / self.len() as f64)
    }

    fn find_bin_exclusive(&self, value: f64) -> Result<usize> {
        // make sure there are bin edges to check against
        let n = self.len();
        if n < 2 {
            return Err(Error::TooFewEdges {
                found: n,
                required: 2,
            });
        }

        let lower = self[0];
        let upper = self[n - 1];

        // NaN fails both comparisons so check explicitly
        if value.is_nan() || value < lower || value > upper {
            return Err(Error::OutOfBounds {
                value,
                lower,
                upper,
            });
        }

        // the upper edge closes the last bin
        if value == upper {
            return Ok(n - 2);
        }

        // edges are sorted, so the bin is one before the first edge above value
        // at least the first edge is <= value here
        Ok(self.partition_point(|edge| *edge <= value) - 1)
    }
}

/// Evenly spaced values over a closed interval
///
/// Both end points are included, so `n` values produce `n - 1` intervals of
/// width `(stop - start) / (n - 1)`.
///
/// ```rust
/// # use vsans_utils::linspace;
/// assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
/// assert_eq!(linspace(2.0, 3.0, 1), vec![2.0]);
/// assert!(linspace(2.0, 3.0, 0).is_empty());
/// ```
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            // pin the final value to avoid accumulated rounding on the last edge
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + i as f64 * step })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_search_on_interior_edges() {
        let edges = linspace(0.0, 1.0, 11);
        assert_eq!(edges.find_bin_exclusive(0.1), Ok(1));
        assert_eq!(edges.find_bin_exclusive(0.15), Ok(1));
        assert_eq!(edges.find_bin_exclusive(1.0), Ok(9));
    }

    #[test]
    fn bin_search_rejects_nan() {
        let edges = [0.0, 1.0];
        assert!(edges.find_bin_exclusive(f64::NAN).is_err());
    }

    #[test]
    fn bin_search_needs_two_edges() {
        assert_eq!(
            [1.0].find_bin_exclusive(1.0),
            Err(Error::TooFewEdges {
                found: 1,
                required: 2
            })
        );
    }
}
