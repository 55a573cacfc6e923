use crate::error::{DicingError, Result};
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};

/// Relative (0.0-1.0) anchor of a sprite, counted from the top-left corner of its mesh rect.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Pivot {
    pub x: f32,
    pub y: f32,
}

impl Pivot {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
    pub fn center() -> Self {
        Self { x: 0.5, y: 0.5 }
    }
}

/// Axis-aligned bounds. `x,y` is the origin; `width,height` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Mesh vertex position in local space units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
}

impl Vertex {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Texture coordinate relative to the atlas dimensions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Uv {
    pub u: f32,
    pub v: f32,
}

impl Uv {
    pub fn new(u: f32, v: f32) -> Self {
        Self { u, v }
    }
}

/// Input image handed to the module (id + RGBA8 pixels + optional custom pivot).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceSprite {
    /// Unique identifier of the sprite among others in a dicing call.
    pub id: String,
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8 bytes; `width * height * 4` long for a well-formed sprite.
    pub pixels: Vec<u8>,
    /// Custom anchor; the module falls back to the default pivot from prefs when absent.
    pub pivot: Option<Pivot>,
}

impl SourceSprite {
    pub fn new(id: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            pixels,
            pivot: None,
        }
    }

    /// Converts any decoded image to RGBA8.
    pub fn from_image(id: impl Into<String>, image: &DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::new(id, width, height, rgba.into_raw())
    }

    pub fn with_pivot(mut self, pivot: Pivot) -> Self {
        self.pivot = Some(pivot);
        self
    }
}

/// Atlas texture produced by the module, copied into host memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AtlasTexture {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8 bytes.
    pub pixels: Vec<u8>,
}

impl AtlasTexture {
    /// Wraps the pixels in an `RgbaImage`; fails when the byte length doesn't match the size.
    pub fn to_image(&self) -> Result<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone()).ok_or(
            DicingError::InvalidTexture {
                width: self.width,
                height: self.height,
                len: self.pixels.len(),
            },
        )
    }
}

/// Diced mesh of a source sprite, referencing one of the produced atlases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DicedSprite {
    /// Id of the source sprite this mesh was generated from.
    pub id: String,
    /// Index into [`Artifacts::atlases`].
    pub atlas_index: usize,
    pub vertices: Vec<Vertex>,
    /// Atlas texture coordinates, parallel to `vertices`.
    pub uvs: Vec<Uv>,
    /// Triangle list indexing `vertices`/`uvs`.
    pub indices: Vec<u32>,
    /// Mesh bounds.
    pub rect: Rect,
    pub pivot: Pivot,
}

/// Success payload of a dicing call. Shares no memory with the module.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Artifacts {
    pub atlases: Vec<AtlasTexture>,
    pub sprites: Vec<DicedSprite>,
}

/// Summary counts over a dicing result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DiceStats {
    pub num_atlases: usize,
    pub num_sprites: usize,
    /// Sum of width * height over all atlases.
    pub total_atlas_area: u64,
    pub max_atlas_width: u32,
    pub max_atlas_height: u32,
    pub num_vertices: usize,
    /// Index count / 3.
    pub num_triangles: usize,
}

impl Artifacts {
    pub fn is_empty(&self) -> bool {
        self.atlases.is_empty() && self.sprites.is_empty()
    }

    /// Computes summary counts for this result.
    pub fn stats(&self) -> DiceStats {
        let mut total_atlas_area = 0u64;
        let mut max_atlas_width = 0u32;
        let mut max_atlas_height = 0u32;
        for atlas in &self.atlases {
            total_atlas_area += (atlas.width as u64) * (atlas.height as u64);
            max_atlas_width = max_atlas_width.max(atlas.width);
            max_atlas_height = max_atlas_height.max(atlas.height);
        }
        let num_vertices = self.sprites.iter().map(|s| s.vertices.len()).sum();
        let num_indices: usize = self.sprites.iter().map(|s| s.indices.len()).sum();
        DiceStats {
            num_atlases: self.atlases.len(),
            num_sprites: self.sprites.len(),
            total_atlas_area,
            max_atlas_width,
            max_atlas_height,
            num_vertices,
            num_triangles: num_indices / 3,
        }
    }
}

impl DiceStats {
    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Atlases: {}, Sprites: {}, Atlas Area: {} px², Largest Atlas: {}x{}, Vertices: {}, Triangles: {}",
            self.num_atlases,
            self.num_sprites,
            self.total_atlas_area,
            self.max_atlas_width,
            self.max_atlas_height,
            self.num_vertices,
            self.num_triangles,
        )
    }
}
