use crate::config::DicingPrefs;
use crate::error::{DicingError, Result};
use crate::loader::{self, ModuleLoader};
use crate::marshal::MarshalledRequest;
use crate::model::{Artifacts, SourceSprite};
use crate::unmarshal;
use tracing::{debug, instrument};

/// Whether the process-wide module is loaded. Never triggers loading.
pub fn is_available() -> bool {
    loader::shared().is_available()
}

/// Dices `sources` through the process-wide module.
///
/// See [`dice_with`] for the call sequence and failure modes.
pub fn dice(sources: &[SourceSprite], prefs: &DicingPrefs) -> Result<Artifacts> {
    dice_with(loader::shared(), sources, prefs)
}

/// Dices `sources` through the module held by `loader`, loading it first if needed.
///
/// Notes:
/// - Blocks the calling thread for the whole native call; there is no timeout or cancellation.
/// - Returns `Unavailable` without calling any native code when the module can't be loaded
///   or its entry point can't be resolved.
/// - A non-empty error text from the module is returned verbatim as `Native`.
/// - A crash inside the module is not contained.
#[instrument(skip_all, fields(sources = sources.len()))]
pub fn dice_with(
    loader: &ModuleLoader,
    sources: &[SourceSprite],
    prefs: &DicingPrefs,
) -> Result<Artifacts> {
    if !loader.ensure_loaded() {
        let reason = loader
            .last_error()
            .unwrap_or_else(|| format!("failed to load {}", loader.describe()));
        return Err(DicingError::unavailable(reason));
    }
    let module = loader
        .module()
        .ok_or_else(|| DicingError::unavailable("native module handle missing"))?;
    let entry = module
        .entry()
        .map_err(|e| DicingError::unavailable(format!("Failed to get dice function: {e}")))?;

    let request = MarshalledRequest::build(sources, prefs);
    debug!(pixel_bytes = request.pixel_bytes(), "invoking native dice");
    // The request owns every buffer the module reads; it outlives both the call and the copy.
    let raw = unsafe { entry(request.sprites(), request.prefs()) };
    let artifacts = unsafe { unmarshal::read_result(&raw) };
    drop(request);
    artifacts
}
