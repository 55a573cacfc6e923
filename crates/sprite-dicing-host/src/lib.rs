//! Host-side boundary for the native sprite dicing module.
//!
//! - Loader: opens the shared library once per process and resolves its `dice` entry point
//! - Marshaller: copies host sprites and prefs into the fixed-layout ABI structs
//! - Unmarshaller: deep-copies atlases and diced meshes out of module-owned memory
//! - Façade: `dice` sequences the above and reports `Unavailable` / `Native` failures
//!
//! The dicing algorithm itself lives in the module and is opaque here.
//!
//! Quick example:
//! ```ignore
//! use sprite_dicing_host::{DicingPrefs, SourceSprite, dice};
//! # fn main() -> anyhow::Result<()> {
//! let img = image::ImageReader::open("hero.png")?.decode()?;
//! let sources = vec![SourceSprite::from_image("hero", &img)];
//! let prefs = DicingPrefs::builder().unit_size(32).build();
//! let out = dice(&sources, &prefs)?;
//! println!("{}", out.stats().summary());
//! # Ok(()) }
//! ```

pub mod abi;
pub mod config;
pub mod dicer;
pub mod error;
pub mod export;
pub mod loader;
pub mod marshal;
pub mod model;
pub mod narrow;
mod progress;
pub mod unmarshal;

pub use config::*;
pub use dicer::*;
pub use error::*;
pub use export::*;
pub use loader::{
    LibrarySource, ModuleLoader, ModuleSource, NativeModule, configure_shared, shared,
};
pub use model::*;

/// Convenience prelude for common types and functions.
/// Importing `sprite_dicing_host::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{
        DicingPrefs, DicingPrefsBuilder, LoaderConfig, ModuleLocation, ProgressReporting,
    };
    pub use crate::error::{DicingError, LoadError};
    pub use crate::loader::{LibrarySource, ModuleLoader, ModuleSource, NativeModule};
    pub use crate::model::{
        Artifacts, AtlasTexture, DiceStats, DicedSprite, Pivot, Rect, SourceSprite, Uv, Vertex,
    };
    pub use crate::{dice, dice_with, is_available};
}
