//! ABI result to host values. Everything is deep-copied; nothing returned here points into
//! module-owned memory.

use crate::abi::{RawDicedSprite, RawPivot, RawRect, RawResult, RawTexture, read_text};
use crate::error::{DicingError, Result};
use crate::model::{Artifacts, AtlasTexture, DicedSprite, Pivot, Rect, Uv, Vertex};
use crate::narrow;
use tracing::debug;

/// Converts a raw outcome into host artifacts or the module's error text.
///
/// # Safety
///
/// Every pointer reachable from `raw` must be valid for reads for the duration of this call,
/// as guaranteed by a module honoring the ABI until control returns to the caller.
pub unsafe fn read_result(raw: &RawResult) -> Result<Artifacts> {
    if let Some(error) = unsafe { read_text(raw.error) } {
        if !error.is_empty() {
            debug!(%error, "native module reported failure");
            return Err(DicingError::Native(error));
        }
    }

    let raw_atlases = unsafe { raw.ok.atlases.as_slice() };
    let raw_sprites = unsafe { raw.ok.sprites.as_slice() };
    let atlases = raw_atlases
        .iter()
        .map(|t| unsafe { read_texture(t) })
        .collect::<Vec<_>>();
    let sprites = raw_sprites
        .iter()
        .map(|s| unsafe { read_sprite(s) })
        .collect::<Vec<_>>();
    debug!(
        atlases = atlases.len(),
        sprites = sprites.len(),
        "copied dicing artifacts"
    );
    Ok(Artifacts { atlases, sprites })
}

/// Copies `pixels.len * 4` bytes; width and height are taken as reported.
///
/// # Safety
///
/// `raw.pixels` must satisfy the contract of [`crate::abi::BufferView::as_slice`].
pub unsafe fn read_texture(raw: &RawTexture) -> AtlasTexture {
    let texels = unsafe { raw.pixels.as_slice() };
    let mut pixels = Vec::with_capacity(narrow::texel_bytes(raw.pixels.len()));
    for px in texels {
        pixels.extend_from_slice(&[px.r, px.g, px.b, px.a]);
    }
    AtlasTexture {
        width: raw.width,
        height: raw.height,
        pixels,
    }
}

/// # Safety
///
/// `raw.id` and the vertex, uv and index views must be valid for reads during this call.
pub unsafe fn read_sprite(raw: &RawDicedSprite) -> DicedSprite {
    let id = unsafe { read_text(raw.id) }.unwrap_or_default();
    let vertices = unsafe { raw.vertices.as_slice() }
        .iter()
        .map(|v| Vertex::new(v.x, v.y))
        .collect();
    let uvs = unsafe { raw.uvs.as_slice() }
        .iter()
        .map(|uv| Uv::new(uv.u, uv.v))
        .collect();
    let indices = unsafe { raw.indices.as_slice() }
        .iter()
        .map(|&i| narrow::mesh_index(i))
        .collect();
    DicedSprite {
        id,
        atlas_index: narrow::atlas_index(raw.atlas_index),
        vertices,
        uvs,
        indices,
        rect: rect(raw.rect),
        pivot: pivot(raw.pivot),
    }
}

fn rect(raw: RawRect) -> Rect {
    Rect::new(raw.x, raw.y, raw.width, raw.height)
}

fn pivot(raw: RawPivot) -> Pivot {
    Pivot::new(raw.x, raw.y)
}
