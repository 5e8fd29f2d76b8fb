//! `vsans` is a semi-modular toolkit for reducing polarized very small angle
//! neutron scattering data
//!
#![doc = include_str!("../readme.md")]
#![deny(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

// Re-exports of toolkit crates.
#[doc(inline)]
pub use vsans_utils as utils;

#[doc(inline)]
pub use vsans_geometry as geometry;

#[cfg(feature = "decay")]
#[cfg_attr(docsrs, doc(cfg(feature = "decay")))]
#[doc(inline)]
pub use vsans_decay as decay;

#[cfg(feature = "efficiency")]
#[cfg_attr(docsrs, doc(cfg(feature = "efficiency")))]
#[doc(inline)]
pub use vsans_efficiency as efficiency;

#[cfg(feature = "mask")]
#[cfg_attr(docsrs, doc(cfg(feature = "mask")))]
#[doc(inline)]
pub use vsans_mask as mask;

#[cfg(feature = "binning")]
#[cfg_attr(docsrs, doc(cfg(feature = "binning")))]
#[doc(inline)]
pub use vsans_binning as binning;

#[cfg(feature = "pipeline")]
#[cfg_attr(docsrs, doc(cfg(feature = "pipeline")))]
#[doc(inline)]
pub use vsans_pipeline as pipeline;
