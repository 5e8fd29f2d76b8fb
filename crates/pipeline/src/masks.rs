//! Reading externally supplied masks

// standard library
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

// crate modules
use crate::error::{Error, Result};
use crate::frame::{DetectorFrame, FrameStore, Purpose};

// external crates
use log::{info, trace, warn};
use serde::{Deserialize, Serialize};
use vsans_geometry::{PanelMap, PixelGrid};
use vsans_mask::{external_mask, MaskKind, MaskLibrary};

/// Mask drawn on one exposure
///
/// The configuration and kind are taken from the referenced frame, and
/// zero-valued pixels are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskFile {
    /// Exposure the mask was drawn on
    pub file_number: u32,
    /// Raw mask values per panel
    pub panels: PanelMap<PixelGrid<f64>>,
}

/// Kind of mask implied by the exposure it was drawn on
///
/// Transmission exposures give transmission masks, scattering with the
/// analyzer in place gives a solenoid mask, and anything else a standard
/// scattering mask.
pub fn mask_kind(frame: &DetectorFrame) -> MaskKind {
    match frame.purpose {
        Purpose::Trans => MaskKind::Transmission,
        Purpose::Scatt if frame.has_back_polarization() => MaskKind::WithSolenoid,
        _ => MaskKind::Standard,
    }
}

/// Register a mask file against its configuration
///
/// Masks referring to frames that are not in the store are skipped.
pub fn register_mask(library: &mut MaskLibrary, store: &FrameStore, mask: &MaskFile) {
    let Ok(frame) = store.get(mask.file_number) else {
        warn!(
            "Mask drawn on frame {} ignored, the frame is not in the store",
            mask.file_number
        );
        return;
    };
    library.insert(frame.config_id(), mask_kind(frame), external_mask(&mask.panels));
}

/// Read every `*.json` mask in a directory
pub fn read_masks<P: AsRef<Path>>(dir: P, store: &FrameStore) -> Result<MaskLibrary> {
    let mut paths = fs::read_dir(dir.as_ref())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect::<Vec<_>>();
    paths.sort();

    let mut library = MaskLibrary::default();
    for path in &paths {
        trace!("reading mask {}", path.display());
        let reader = BufReader::new(File::open(path)?);
        let mask: MaskFile = serde_json::from_reader(reader).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        register_mask(&mut library, store, &mask);
    }

    info!(
        "{} masks registered from {}",
        library.len(),
        dir.as_ref().display()
    );
    Ok(library)
}
