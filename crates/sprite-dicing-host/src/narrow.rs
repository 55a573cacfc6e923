//! Width-changing conversions between ABI and host integer types.
//!
//! Each conversion is a plain truncating cast with a documented range precondition; none of
//! them are range checked. Keeping them named lets tests pin the boundary values.

/// Bytes per RGBA texel.
pub const TEXEL_BYTES: usize = 4;

/// Texel count for a pixel byte buffer; a trailing partial texel is dropped.
pub fn texel_count(byte_len: usize) -> u64 {
    (byte_len / TEXEL_BYTES) as u64
}

/// Byte length of `count` texels.
///
/// Precondition: `count * 4` fits in `usize`.
pub fn texel_bytes(count: u64) -> usize {
    view_len(count).wrapping_mul(TEXEL_BYTES)
}

/// Element count of a buffer view as a host length.
///
/// Precondition: `len <= usize::MAX`; only a concern on 32-bit hosts.
pub fn view_len(len: u64) -> usize {
    len as usize
}

/// Atlas index as reported by the module.
///
/// Precondition: `index <= usize::MAX`.
pub fn atlas_index(index: u64) -> usize {
    index as usize
}

/// Mesh index narrowed to the host index width (`u32`).
///
/// Precondition: `index <= u32::MAX`. Larger values wrap; realistic meshes are far below
/// the limit but nothing here enforces it.
pub fn mesh_index(index: u64) -> u32 {
    index as u32
}
