//! Host sprites and prefs to ABI structs.

use crate::abi::{BufferView, RawPivot, RawPixel, RawPrefs, RawSourceSprite, RawTexture};
use crate::config::DicingPrefs;
use crate::model::{Pivot, SourceSprite};
use crate::narrow;
use crate::progress;
use std::ffi::CString;
use tracing::debug;

/// ABI request plus every buffer it points into.
///
/// The raw sprites reference heap storage owned by `ids` and `pixels`; moving the request
/// doesn't move that storage, but dropping it invalidates every view handed out.
pub struct MarshalledRequest {
    ids: Vec<CString>,
    pixels: Vec<Vec<u8>>,
    sprites: Vec<RawSourceSprite>,
    prefs: RawPrefs,
}

impl MarshalledRequest {
    /// Copies ids and pixel bytes into owned buffers and builds the raw sprite array.
    pub fn build(sources: &[SourceSprite], prefs: &DicingPrefs) -> Self {
        let mut ids = Vec::with_capacity(sources.len());
        let mut pixels = Vec::with_capacity(sources.len());
        let mut sprites = Vec::with_capacity(sources.len());

        for src in sources {
            let id = id_buffer(&src.id);
            let buf = src.pixels.clone();
            let texture = RawTexture {
                width: src.width,
                height: src.height,
                pixels: BufferView {
                    ptr: buf.as_ptr().cast::<RawPixel>(),
                    len: narrow::texel_count(buf.len()),
                },
            };
            sprites.push(RawSourceSprite {
                id: id.as_ptr(),
                texture,
                has_pivot: src.pivot.is_some(),
                pivot: raw_pivot(src.pivot.unwrap_or_default()),
            });
            ids.push(id);
            pixels.push(buf);
        }

        debug!(sprites = sprites.len(), "marshalled dicing request");
        Self {
            ids,
            pixels,
            sprites,
            prefs: raw_prefs(prefs),
        }
    }

    /// View over the raw sprites; valid while `self` is alive.
    pub fn sprites(&self) -> BufferView<RawSourceSprite> {
        BufferView::from_slice(&self.sprites)
    }

    pub fn prefs(&self) -> RawPrefs {
        self.prefs
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    /// Total bytes copied for pixel storage.
    pub fn pixel_bytes(&self) -> usize {
        self.pixels.iter().map(Vec::len).sum()
    }

    /// Owned identifier buffers, in source order.
    pub fn ids(&self) -> &[CString] {
        &self.ids
    }
}

/// Field-by-field copy; floats pass through, flags and counts keep their fixed widths.
pub fn raw_prefs(prefs: &DicingPrefs) -> RawPrefs {
    let (has_progress_callback, progress_callback) = progress::callback_for(prefs.progress);
    RawPrefs {
        unit_size: prefs.unit_size,
        padding: prefs.padding,
        uv_inset: prefs.uv_inset,
        trim_transparent: prefs.trim_transparent,
        atlas_size_limit: prefs.atlas_size_limit,
        atlas_square: prefs.atlas_square,
        atlas_pot: prefs.atlas_pot,
        ppu: prefs.pixels_per_unit,
        pivot: raw_pivot(prefs.default_pivot),
        has_progress_callback,
        progress_callback,
    }
}

fn raw_pivot(pivot: Pivot) -> RawPivot {
    RawPivot {
        x: pivot.x,
        y: pivot.y,
    }
}

// Text after an interior NUL is unreachable through a C string, so it is cut here.
fn id_buffer(id: &str) -> CString {
    let bytes = id.as_bytes();
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    CString::new(&bytes[..end]).unwrap_or_default()
}
