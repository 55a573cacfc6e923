//! Stub dicing module: exports `dice` with the real ABI but, instead of dicing, echoes every
//! source texture back as its own atlas and emits one quad mesh per source.
//!
//! Result buffers live in thread-local storage and stay valid until the next call on the
//! same thread. Atlas pixel views point straight at the caller's input buffers, which the
//! caller keeps alive until it has copied the result.

use sprite_dicing_host::abi::{
    BufferView, RawArtifacts, RawDicedSprite, RawPivot, RawPrefs, RawProgress, RawRect,
    RawResult, RawSourceSprite, RawTexture, RawUv, RawVertex,
};
use std::cell::RefCell;

const QUAD_INDICES: [u64; 6] = [0, 1, 2, 2, 3, 0];

#[derive(Default)]
struct Output {
    atlases: Vec<RawTexture>,
    sprites: Vec<RawDicedSprite>,
    meshes: Vec<Mesh>,
}

struct Mesh {
    vertices: [RawVertex; 4],
    uvs: [RawUv; 4],
    indices: [u64; 6],
    pivot: RawPivot,
}

thread_local! {
    static OUTPUT: RefCell<Output> = RefCell::new(Output::default());
}

/// # Safety
///
/// `sprites` must describe `len` valid source sprites whose ids and pixel views stay valid
/// until the caller has finished reading the returned result.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dice(sprites: BufferView<RawSourceSprite>, prefs: RawPrefs) -> RawResult {
    if prefs.unit_size == 0 {
        return RawResult::failure(c"Unit size can't be zero.");
    }
    let sources = unsafe { sprites.as_slice() };
    report(&prefs, 0.0);

    let kept: Vec<&RawSourceSprite> = sources
        .iter()
        .filter(|s| !(prefs.trim_transparent && unsafe { fully_transparent(&s.texture) }))
        .collect();

    OUTPUT.with(|cell| {
        let mut out = cell.borrow_mut();
        let out = &mut *out;
        out.atlases.clear();
        out.sprites.clear();
        out.meshes.clear();

        for src in &kept {
            let pivot = if src.has_pivot {
                src.pivot
            } else {
                prefs.pivot
            };
            out.meshes.push(quad(&src.texture, pivot, prefs.ppu));
            out.atlases.push(src.texture);
        }
        // Views into `meshes` are taken only after it stops growing.
        for (index, (src, mesh)) in kept.iter().zip(&out.meshes).enumerate() {
            let width = src.texture.width as f32;
            let height = src.texture.height as f32;
            out.sprites.push(RawDicedSprite {
                id: src.id,
                atlas_index: index as u64,
                vertices: BufferView::from_slice(&mesh.vertices),
                uvs: BufferView::from_slice(&mesh.uvs),
                indices: BufferView::from_slice(&mesh.indices),
                rect: RawRect {
                    x: 0.0,
                    y: 0.0,
                    width,
                    height,
                },
                pivot: mesh.pivot,
            });
        }

        report(&prefs, 1.0);
        RawResult::success(RawArtifacts {
            atlases: BufferView::from_slice(&out.atlases),
            sprites: BufferView::from_slice(&out.sprites),
        })
    })
}

fn quad(texture: &RawTexture, pivot: RawPivot, ppu: f32) -> Mesh {
    let w = texture.width as f32 / ppu;
    let h = texture.height as f32 / ppu;
    let ox = -pivot.x * w;
    let oy = -pivot.y * h;
    Mesh {
        vertices: [
            RawVertex { x: ox, y: oy },
            RawVertex { x: ox + w, y: oy },
            RawVertex {
                x: ox + w,
                y: oy + h,
            },
            RawVertex { x: ox, y: oy + h },
        ],
        uvs: [
            RawUv { u: 0.0, v: 0.0 },
            RawUv { u: 1.0, v: 0.0 },
            RawUv { u: 1.0, v: 1.0 },
            RawUv { u: 0.0, v: 1.0 },
        ],
        indices: QUAD_INDICES,
        pivot,
    }
}

unsafe fn fully_transparent(texture: &RawTexture) -> bool {
    unsafe { texture.pixels.as_slice() }.iter().all(|p| p.a == 0)
}

fn report(prefs: &RawPrefs, ratio: f32) {
    if !prefs.has_progress_callback {
        return;
    }
    if let Some(callback) = prefs.progress_callback {
        unsafe {
            callback(RawProgress {
                ratio,
                activity: c"Echoing source textures".as_ptr(),
            })
        };
    }
}
