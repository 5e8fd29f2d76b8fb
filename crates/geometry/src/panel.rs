// standard library
use std::fmt::Display;
use std::str::FromStr;

// crate modules
use crate::error::Error;

// external crates
use serde::{Deserialize, Serialize};

/// Detector carriage
///
/// The front carriage sits closer to the sample and covers the higher Q
/// range, the middle carriage sits further back and covers low Q.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Carriage {
    /// Middle carriage (low Q)
    Middle,
    /// Front carriage (high Q)
    Front,
}

impl Carriage {
    /// Full name, i.e. 'Middle'
    pub fn long_name(&self) -> &'static str {
        match self {
            Self::Middle => "Middle",
            Self::Front => "Front",
        }
    }
}

/// Position of a panel around the beam
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    /// Above the beam, offset vertically
    Top,
    /// Below the beam, offset vertically
    Bottom,
    /// Beam right, offset laterally
    Right,
    /// Beam left, offset laterally
    Left,
}

impl Position {
    /// Top and bottom panels are set back and offset vertically
    pub fn is_horizontal_pair(&self) -> bool {
        matches!(self, Self::Top | Self::Bottom)
    }
}

/// One of the eight VSANS detector panels
///
/// The ordering follows the raw file layout, middle carriage first, which is
/// also the order panels are concatenated in 2-D output tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Panel {
    /// Middle carriage, top
    MT,
    /// Middle carriage, bottom
    MB,
    /// Middle carriage, right
    MR,
    /// Middle carriage, left
    ML,
    /// Front carriage, top
    FT,
    /// Front carriage, bottom
    FB,
    /// Front carriage, right
    FR,
    /// Front carriage, left
    FL,
}

impl Panel {
    /// Every panel in file order
    pub const ALL: [Panel; 8] = [
        Panel::MT,
        Panel::MB,
        Panel::MR,
        Panel::ML,
        Panel::FT,
        Panel::FB,
        Panel::FR,
        Panel::FL,
    ];

    /// Carriage the panel is mounted on
    ///
    /// ```rust
    /// # use vsans_geometry::{Carriage, Panel};
    /// assert_eq!(Panel::FL.carriage(), Carriage::Front);
    /// assert_eq!(Panel::MB.carriage(), Carriage::Middle);
    /// ```
    pub fn carriage(&self) -> Carriage {
        match self {
            Self::MT | Self::MB | Self::MR | Self::ML => Carriage::Middle,
            Self::FT | Self::FB | Self::FR | Self::FL => Carriage::Front,
        }
    }

    /// Position of the panel around the beam
    pub fn position(&self) -> Position {
        match self {
            Self::MT | Self::FT => Position::Top,
            Self::MB | Self::FB => Position::Bottom,
            Self::MR | Self::FR => Position::Right,
            Self::ML | Self::FL => Position::Left,
        }
    }

    /// Two letter name, i.e. 'MT'
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::MT => "MT",
            Self::MB => "MB",
            Self::MR => "MR",
            Self::ML => "ML",
            Self::FT => "FT",
            Self::FB => "FB",
            Self::FR => "FR",
            Self::FL => "FL",
        }
    }

    /// Full name, i.e. 'Middle Top'
    pub fn long_name(&self) -> String {
        let position = match self.position() {
            Position::Top => "Top",
            Position::Bottom => "Bottom",
            Position::Right => "Right",
            Position::Left => "Left",
        };
        format!("{} {}", self.carriage().long_name(), position)
    }

    /// Panels of a single carriage, in file order
    pub fn on_carriage(carriage: Carriage) -> impl Iterator<Item = Panel> {
        Self::ALL.into_iter().filter(move |p| p.carriage() == carriage)
    }
}

impl Display for Panel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

impl FromStr for Panel {
    type Err = Error;

    /// Parse the two letter panel name, ignoring case
    ///
    /// ```rust
    /// # use vsans_geometry::Panel;
    /// assert_eq!("mr".parse::<Panel>().unwrap(), Panel::MR);
    /// assert!("XX".parse::<Panel>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Panel::ALL
            .into_iter()
            .find(|p| p.short_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownPanel(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carriage_split() {
        assert_eq!(Panel::on_carriage(Carriage::Middle).count(), 4);
        assert!(Panel::on_carriage(Carriage::Front).all(|p| p.short_name().starts_with('F')));
    }

    #[test]
    fn names() {
        assert_eq!(Panel::ML.long_name(), "Middle Left");
        assert_eq!(Panel::FT.to_string(), "FT");
        assert!(Panel::FB.position().is_horizontal_pair());
        assert!(!Panel::FR.position().is_horizontal_pair());
    }
}
