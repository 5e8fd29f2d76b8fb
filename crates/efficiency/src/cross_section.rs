// standard library
use std::fmt::Display;

// external crates
use serde::{Deserialize, Serialize};

/// State of a polarizing element for one exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpinState {
    /// Spin up
    Up,
    /// Spin down
    Down,
    /// Element out of the beam, or not polarizing
    #[serde(alias = "UNPOLARIZED", alias = "Unpol")]
    Unpolarized,
}

/// One of the four polarized scattering cross-sections
///
/// The first letter is the front polarizer state, the second the back
/// analyzer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CrossSection {
    /// Up, up (non spin-flip)
    UU,
    /// Down, up (spin-flip)
    DU,
    /// Down, down (non spin-flip)
    DD,
    /// Up, down (spin-flip)
    UD,
}

impl CrossSection {
    /// Every cross-section in matrix order
    pub const ALL: [CrossSection; 4] = [
        CrossSection::UU,
        CrossSection::DU,
        CrossSection::DD,
        CrossSection::UD,
    ];

    /// Row and column of the cross-section in the efficiency matrix
    pub fn index(&self) -> usize {
        match self {
            Self::UU => 0,
            Self::DU => 1,
            Self::DD => 2,
            Self::UD => 3,
        }
    }

    /// Cross-section measured with the given front and back states
    ///
    /// ```rust
    /// # use vsans_efficiency::{CrossSection, SpinState};
    /// assert_eq!(
    ///     CrossSection::from_spins(SpinState::Down, SpinState::Up),
    ///     Some(CrossSection::DU)
    /// );
    /// assert_eq!(
    ///     CrossSection::from_spins(SpinState::Up, SpinState::Unpolarized),
    ///     None
    /// );
    /// ```
    pub fn from_spins(front: SpinState, back: SpinState) -> Option<Self> {
        match (front, back) {
            (SpinState::Up, SpinState::Up) => Some(Self::UU),
            (SpinState::Down, SpinState::Up) => Some(Self::DU),
            (SpinState::Down, SpinState::Down) => Some(Self::DD),
            (SpinState::Up, SpinState::Down) => Some(Self::UD),
            _ => None,
        }
    }

    /// True for DU and UD
    pub fn is_spin_flip(&self) -> bool {
        matches!(self, Self::DU | Self::UD)
    }

    /// Cross-section with both spins reversed, i.e. UU for DD
    pub fn reversed(&self) -> Self {
        match self {
            Self::UU => Self::DD,
            Self::DD => Self::UU,
            Self::DU => Self::UD,
            Self::UD => Self::DU,
        }
    }

    /// Two letter name
    pub fn name(&self) -> &'static str {
        match self {
            Self::UU => "UU",
            Self::DU => "DU",
            Self::DD => "DD",
            Self::UD => "UD",
        }
    }
}

impl Display for CrossSection {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_matrix_order() {
        for (i, cs) in CrossSection::ALL.iter().enumerate() {
            assert_eq!(cs.index(), i);
        }
    }

    #[test]
    fn reversal_keeps_flip_kind() {
        for cs in CrossSection::ALL {
            assert_eq!(cs.reversed().is_spin_flip(), cs.is_spin_flip());
            assert_eq!(cs.reversed().reversed(), cs);
        }
    }
}
