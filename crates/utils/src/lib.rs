//! Common utility for extended `std` types
//!
//! These are left public for convenience.
//!
//! For example, searching sorted bin edges for a momentum transfer value or
//! writing intensities in consistent scientific notation is useful in every
//! stage of a reduction.

// Modules
mod error;
mod slice_ext;
mod value_ext;

// Flatten
pub use error::{Error, Result};
pub use slice_ext::{linspace, SliceExt};
pub use value_ext::ValueExt;
