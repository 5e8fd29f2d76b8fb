// standard library
use std::collections::BTreeMap;
use std::fmt::Display;

// crate modules
use crate::MaskSet;

// external crates
use log::debug;
use serde::{Deserialize, Serialize};

/// Purpose of an externally supplied mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MaskKind {
    /// Around the direct beam on the transmission panel
    Transmission,
    /// Standard scattering mask
    Standard,
    /// Scattering mask with the solenoid field perturbing the beam
    WithSolenoid,
}

impl Display for MaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Self::Transmission => "Trans",
            Self::Standard => "Standard",
            Self::WithSolenoid => "WithSolenoid",
        };
        write!(f, "{name}")
    }
}

/// External masks keyed by configuration and kind
///
/// ```rust
/// # use vsans_mask::{MaskKind, MaskLibrary, MaskSet};
/// let mut library = MaskLibrary::default();
/// library.insert("CvB400cmF1900cmM6.0000Ang", MaskKind::Standard, MaskSet::default());
///
/// // the solenoid mask falls back to the standard one
/// assert!(library.get("CvB400cmF1900cmM6.0000Ang", MaskKind::WithSolenoid).is_some());
/// assert!(library.get("CvB400cmF1900cmM6.0000Ang", MaskKind::Transmission).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MaskLibrary {
    masks: BTreeMap<(String, MaskKind), MaskSet>,
}

impl MaskLibrary {
    /// Store a mask, replacing any previous one for the same key
    pub fn insert(&mut self, config: impl Into<String>, kind: MaskKind, mask: MaskSet) {
        let config = config.into();
        debug!("{kind} mask registered for {config}");
        self.masks.insert((config, kind), mask);
    }

    /// Mask for a configuration, falling back from solenoid to standard
    pub fn get(&self, config: &str, kind: MaskKind) -> Option<&MaskSet> {
        let lookup = |kind| self.masks.get(&(config.to_string(), kind));
        match kind {
            MaskKind::WithSolenoid => lookup(kind).or_else(|| lookup(MaskKind::Standard)),
            _ => lookup(kind),
        }
    }

    /// Number of stored masks
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    /// True if no masks are stored
    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }
}
