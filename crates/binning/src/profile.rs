// standard library
use std::collections::BTreeMap;

// external crates
use log::trace;
use serde::{Deserialize, Serialize};
use vsans_geometry::Carriage;

/// One non-empty Q bin of a profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfilePoint {
    /// Carriage the pixels came from
    pub carriage: Carriage,
    /// Bin index within the settings
    pub bin: usize,
    /// Bin centre (1/A)
    pub q: f64,
    /// Mean intensity
    pub intensity: f64,
    /// Intensity uncertainty
    pub uncertainty: f64,
    /// Mean combined Q resolution of the pixels (1/A)
    pub q_resolution: f64,
    /// Mean |Q| of the pixels (1/A)
    pub mean_q: f64,
    /// Number of contributing pixels
    pub pixels: usize,
    /// Fraction of the bin not lost to shadowing
    pub shadow: f64,
}

impl ProfilePoint {
    fn key(&self) -> (Carriage, usize) {
        (self.carriage, self.bin)
    }
}

/// Binned intensity against Q, middle carriage first
///
/// Empty bins are never present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    points: Vec<ProfilePoint>,
}

impl Profile {
    /// Wrap points, ordering them middle first then by bin
    pub fn new(mut points: Vec<ProfilePoint>) -> Self {
        points.sort_by_key(|p| p.key());
        Self { points }
    }

    /// All points
    pub fn points(&self) -> &[ProfilePoint] {
        &self.points
    }

    /// Points from one carriage
    pub fn carriage(&self, carriage: Carriage) -> impl Iterator<Item = &ProfilePoint> {
        self.points.iter().filter(move |p| p.carriage == carriage)
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True for a profile without any points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total pixels across every point
    pub fn total_pixels(&self) -> usize {
        self.points.iter().map(|p| p.pixels).sum()
    }

    /// Subtract a constant from every middle carriage intensity
    ///
    /// ```rust
    /// # use vsans_binning::{Profile, ProfilePoint};
    /// # use vsans_geometry::Carriage;
    /// let point = |carriage| ProfilePoint {
    ///     carriage,
    ///     bin: 0,
    ///     q: 0.01,
    ///     intensity: 10.0,
    ///     uncertainty: 1.0,
    ///     q_resolution: 0.001,
    ///     mean_q: 0.01,
    ///     pixels: 4,
    ///     shadow: 1.0,
    /// };
    ///
    /// let mut profile = Profile::new(vec![point(Carriage::Front), point(Carriage::Middle)]);
    /// profile.subtract_middle_offset(0.5);
    ///
    /// assert_eq!(profile.points()[0].carriage, Carriage::Middle);
    /// assert_eq!(profile.points()[0].intensity, 9.5);
    /// assert_eq!(profile.points()[1].intensity, 10.0);
    /// ```
    pub fn subtract_middle_offset(&mut self, offset: f64) {
        if offset == 0.0 {
            return;
        }
        trace!("subtracting {offset} from middle carriage intensities");
        for point in self
            .points
            .iter_mut()
            .filter(|p| p.carriage == Carriage::Middle)
        {
            point.intensity -= offset;
        }
    }

    /// Sum of spin-flip channels, `UD + DU`
    pub fn spin_flip(ud: &Profile, du: &Profile) -> Profile {
        Self::combine(ud, du, 1.0)
    }

    /// Sum of non spin-flip channels, `UU + DD`
    pub fn non_spin_flip(uu: &Profile, dd: &Profile) -> Profile {
        Self::combine(uu, dd, 1.0)
    }

    /// Difference of non spin-flip channels, `DD - UU`
    pub fn nsf_difference(dd: &Profile, uu: &Profile) -> Profile {
        Self::combine(dd, uu, -1.0)
    }

    /// `a + sign * b` over the points present in both profiles
    ///
    /// Uncertainties combine in quadrature. Resolution, mean Q, pixel count
    /// and shadow factor are taken from `a`.
    fn combine(a: &Profile, b: &Profile, sign: f64) -> Profile {
        let lookup = b
            .points
            .iter()
            .map(|p| (p.key(), p))
            .collect::<BTreeMap<_, _>>();

        let points = a
            .points
            .iter()
            .filter_map(|pa| {
                let pb = lookup.get(&pa.key())?;
                Some(ProfilePoint {
                    intensity: pa.intensity + sign * pb.intensity,
                    uncertainty: pa.uncertainty.hypot(pb.uncertainty),
                    ..*pa
                })
            })
            .collect();

        Profile { points }
    }

    /// Align any number of profiles on their shared points
    ///
    /// Returns, for every point present in all profiles, the matching point
    /// of each profile in the order given.
    pub fn align<'a>(profiles: &[&'a Profile]) -> Vec<Vec<&'a ProfilePoint>> {
        let Some(first) = profiles.first() else {
            return Vec::new();
        };

        let lookups = profiles
            .iter()
            .map(|p| {
                p.points
                    .iter()
                    .map(|point| (point.key(), point))
                    .collect::<BTreeMap<_, _>>()
            })
            .collect::<Vec<_>>();

        first
            .points
            .iter()
            .filter_map(|point| {
                lookups
                    .iter()
                    .map(|l| l.get(&point.key()).copied())
                    .collect::<Option<Vec<_>>>()
            })
            .collect()
    }
}
