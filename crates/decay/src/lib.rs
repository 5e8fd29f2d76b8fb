//! Polarization decay of He3 analyzer cells
//!
//! A polarized He3 cell placed after the sample transmits one neutron spin
//! state preferentially. The atomic polarization of the gas relaxes over the
//! hours the cell spends on the instrument, so the analyzing power has to be
//! known at the time of every exposure.
//!
//! ## Fitting
//!
//! A [HeCell] collects `(elapsed, transmission)` pairs from HeIN/HeOUT
//! measurements. Each transmission is linearised into an atomic
//! polarization and a single exponential `P(t) = P0 exp(-t/gamma)` is fitted
//! by damped least squares. The fitted cell becomes a read-only
//! [DecayCurve].
//!
//! ```rust
//! # use vsans_decay::HeCell;
//! let mut cell = HeCell::new("Burgundy", 0.0, 3.105, 0.86).unwrap();
//! cell.add_observation(0.0, 0.9);
//! cell.add_observation(10.0, 0.7);
//!
//! let curve = cell.fit().unwrap();
//! let state = curve.state_after(10.0);
//! assert!((state.unpolarized_transmission - 0.7).abs() < 0.007);
//! ```
//!
//! ## Queries
//!
//! A [CellLibrary] orders curves by insertion time and answers "what is the
//! neutron polarization at time T" with a [PolarizationState].

mod cell;
mod curve;
mod error;
mod fit;
mod library;
mod summary;

#[doc(inline)]
pub use cell::{CellObservation, HeCell};

#[doc(inline)]
pub use curve::{DecayCurve, PolarizationState};

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use library::CellLibrary;

#[doc(inline)]
pub use summary::{write_summary, write_table};
