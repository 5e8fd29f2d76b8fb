//! Progress of a single reduction unit

// standard library
use std::fmt::Display;

// crate modules
use crate::error::Error;

// external crates
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// What a unit reduces
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Unpolarized scattering
    Unpolarized,
    /// Front polarizer up only
    HalfUp,
    /// Front polarizer down only
    HalfDown,
    /// All four cross-sections together
    FullPolarization,
}

impl Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Self::Unpolarized => "Unpol",
            Self::HalfUp => "U",
            Self::HalfDown => "D",
            Self::FullPolarization => "FullPol",
        };
        write!(f, "{name}")
    }
}

/// Stage reached by a unit
///
/// ```text
/// Grouped -> AbsScaled -> PolCorrected | Passthrough -> MaskedAndBinned -> Emitted
/// ```
///
/// Any stage may end in `Failed`, which is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitState {
    /// Exposures collected
    Grouped,
    /// Counts converted to absolute intensity
    AbsScaled,
    /// Cross-sections separated by the efficiency matrix
    PolCorrected,
    /// No polarization correction applied
    Passthrough,
    /// Sector profiles produced
    MaskedAndBinned,
    /// Written out
    Emitted,
    /// Abandoned with a reason
    Failed(String),
}

impl UnitState {
    /// True if `next` may follow this state
    ///
    /// ```rust
    /// # use vsans_pipeline::UnitState;
    /// assert!(UnitState::AbsScaled.allows(&UnitState::Passthrough));
    /// assert!(UnitState::Grouped.allows(&UnitState::Failed("no frame".into())));
    /// assert!(!UnitState::Grouped.allows(&UnitState::Emitted));
    /// ```
    pub fn allows(&self, next: &UnitState) -> bool {
        use UnitState::*;
        match (self, next) {
            (Failed(_), _) | (Emitted, _) => false,
            (_, Failed(_)) => true,
            (Grouped, AbsScaled) => true,
            (AbsScaled, PolCorrected | Passthrough) => true,
            (PolCorrected | Passthrough, MaskedAndBinned) => true,
            (MaskedAndBinned, Emitted) => true,
            _ => false,
        }
    }

    /// True for `Failed` and `Emitted`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Emitted)
    }
}

impl Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "Failed ({reason})"),
            state => write!(f, "{state:?}"),
        }
    }
}

/// History of one sample x configuration x kind unit
#[derive(Debug, Clone, PartialEq)]
pub struct UnitReport {
    /// Sample name
    pub sample: String,
    /// Configuration identifier
    pub config: String,
    /// What is being reduced
    pub kind: UnitKind,
    history: Vec<UnitState>,
}

impl UnitReport {
    /// New unit in the `Grouped` state
    pub fn new(sample: impl Into<String>, config: impl Into<String>, kind: UnitKind) -> Self {
        Self {
            sample: sample.into(),
            config: config.into(),
            kind,
            history: vec![UnitState::Grouped],
        }
    }

    /// Current state
    pub fn state(&self) -> &UnitState {
        // history is never empty
        &self.history[self.history.len() - 1]
    }

    /// Every state reached, oldest first
    pub fn history(&self) -> &[UnitState] {
        &self.history
    }

    /// Move to the next state
    ///
    /// A transition the state machine does not allow marks the unit failed.
    pub fn advance(&mut self, next: UnitState) {
        if self.state().allows(&next) {
            debug!("{self}: -> {next}");
            self.history.push(next);
        } else {
            let reason = format!("invalid transition from {} to {next}", self.state());
            warn!("{self}: {reason}");
            if !self.state().is_terminal() {
                self.history.push(UnitState::Failed(reason));
            }
        }
    }

    /// Abandon the unit
    pub fn fail(&mut self, error: &Error) {
        warn!("{self} failed: {error}");
        if !self.state().is_terminal() {
            self.history.push(UnitState::Failed(error.to_string()));
        }
    }

    /// True if the unit was abandoned
    pub fn is_failed(&self) -> bool {
        matches!(self.state(), UnitState::Failed(_))
    }

    /// True if the unit was written out
    pub fn is_emitted(&self) -> bool {
        self.state() == &UnitState::Emitted
    }
}

impl Display for UnitReport {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} {} {}", self.sample, self.config, self.kind)
    }
}
