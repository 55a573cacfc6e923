//! Fixed-layout structs shared with the native dicing module.
//!
//! Every type here is plain data with `#[repr(C)]` layout and no ownership logic. Who owns the
//! memory behind a [`BufferView`] or a text handle is decided by the calling convention:
//! - input views point at buffers owned by the host for the duration of a single `dice` call;
//! - output views point at buffers owned by the module and must be copied before the call frame
//!   that received them returns.
//!
//! The layout is versionless. A module built against different definitions is undefined
//! behavior, not a negotiated capability.

use std::ffi::{CStr, c_char};
use std::ptr;

/// Name of the single symbol the module must export.
pub const DICE_SYMBOL: &str = "dice";

/// Signature of the exported `dice` entry point.
pub type DiceFn = unsafe extern "C" fn(BufferView<RawSourceSprite>, RawPrefs) -> RawResult;

/// Signature of the optional progress callback carried in [`RawPrefs`].
pub type ProgressFn = unsafe extern "C" fn(RawProgress);

/// Non-owning `(pointer, element count)` view over a contiguous run of `T`.
///
/// Valid only for the duration of the call that produced it; never store one past that call.
#[repr(C)]
#[derive(Debug)]
pub struct BufferView<T> {
    pub ptr: *const T,
    pub len: u64,
}

impl<T> Clone for BufferView<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for BufferView<T> {}

impl<T> BufferView<T> {
    /// Null, zero-length view.
    pub const fn empty() -> Self {
        Self {
            ptr: ptr::null(),
            len: 0,
        }
    }

    /// View over `slice`; the caller keeps `slice` alive for as long as the view is in use.
    pub fn from_slice(slice: &[T]) -> Self {
        Self {
            ptr: slice.as_ptr(),
            len: slice.len() as u64,
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0 || self.ptr.is_null()
    }

    /// Reinterprets the view as a slice. A null or zero-length view yields an empty slice.
    ///
    /// # Safety
    ///
    /// `ptr` must point at `len` initialized, properly aligned `T` values that stay valid and
    /// unmodified for `'a`. The returned slice must not outlive the call that exposed the view.
    pub unsafe fn as_slice<'a>(&self) -> &'a [T] {
        if self.is_empty() {
            return &[];
        }
        let len = crate::narrow::view_len(self.len);
        unsafe { std::slice::from_raw_parts(self.ptr, len) }
    }
}

/// Reads a null-terminated text handle into an owned string, decoding lossily as UTF-8.
/// Returns `None` for a null handle.
///
/// # Safety
///
/// A non-null `ptr` must point at a null-terminated buffer valid for the duration of this call.
pub unsafe fn read_text(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let text = unsafe { CStr::from_ptr(ptr) };
    Some(text.to_string_lossy().into_owned())
}

/// One 4-byte RGBA texel.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawPixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawPivot {
    pub x: f32,
    pub y: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawVertex {
    pub x: f32,
    pub y: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawUv {
    pub u: f32,
    pub v: f32,
}

/// `pixels.len` is expected to equal `width * height`; the byte length is `pixels.len * 4`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawTexture {
    pub width: u32,
    pub height: u32,
    pub pixels: BufferView<RawPixel>,
}

/// `pivot` is meaningful only when `has_pivot` is set.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawSourceSprite {
    pub id: *const c_char,
    pub texture: RawTexture,
    pub has_pivot: bool,
    pub pivot: RawPivot,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawPrefs {
    pub unit_size: u32,
    pub padding: u32,
    pub uv_inset: f32,
    pub trim_transparent: bool,
    pub atlas_size_limit: u32,
    pub atlas_square: bool,
    pub atlas_pot: bool,
    pub ppu: f32,
    pub pivot: RawPivot,
    pub has_progress_callback: bool,
    pub progress_callback: Option<ProgressFn>,
}

/// Progress notification the module may emit through [`RawPrefs::progress_callback`].
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawProgress {
    pub ratio: f32,
    pub activity: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawDicedSprite {
    pub id: *const c_char,
    pub atlas_index: u64,
    pub vertices: BufferView<RawVertex>,
    pub uvs: BufferView<RawUv>,
    pub indices: BufferView<u64>,
    pub rect: RawRect,
    pub pivot: RawPivot,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawArtifacts {
    pub atlases: BufferView<RawTexture>,
    pub sprites: BufferView<RawDicedSprite>,
}

/// Success-xor-error outcome. A non-null, non-empty `error` means `ok` must not be read.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawResult {
    pub error: *const c_char,
    pub ok: RawArtifacts,
}

impl RawResult {
    /// Successful outcome carrying `ok`.
    pub fn success(ok: RawArtifacts) -> Self {
        Self {
            error: ptr::null(),
            ok,
        }
    }

    /// Failed outcome; `error` must outlive the call that returns this value.
    pub fn failure(error: &'static CStr) -> Self {
        Self {
            error: error.as_ptr(),
            ok: RawArtifacts {
                atlases: BufferView::empty(),
                sprites: BufferView::empty(),
            },
        }
    }
}
