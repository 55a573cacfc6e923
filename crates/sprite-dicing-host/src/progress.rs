//! Progress callback marshaling.

use crate::abi::{ProgressFn, RawProgress, read_text};
use crate::config::ProgressReporting;

/// `(has_progress_callback, progress_callback)` pair for the given reporting mode.
pub(crate) fn callback_for(mode: ProgressReporting) -> (bool, Option<ProgressFn>) {
    match mode {
        ProgressReporting::Silent => (false, None),
        ProgressReporting::Trace => (true, Some(trace_progress)),
    }
}

/// Forwards a progress notification from the module to `tracing`.
///
/// # Safety
///
/// `progress.activity` is null or a null-terminated string valid for this call.
unsafe extern "C" fn trace_progress(progress: RawProgress) {
    let activity = unsafe { read_text(progress.activity) }.unwrap_or_default();
    tracing::debug!(ratio = progress.ratio, %activity, "dicing progress");
}
