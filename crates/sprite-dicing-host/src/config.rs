use crate::model::Pivot;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable overriding the logical module path (no extension).
pub const MODULE_ENV: &str = "SPRITE_DICING_MODULE";

/// Default logical module path, relative to the directory of the running executable.
pub const DEFAULT_MODULE: &str = "native/sprite_dicing";

/// What the layer does with progress notifications from the module.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProgressReporting {
    /// No callback is marshaled; the module sees the callback as absent.
    #[default]
    Silent,
    /// A static callback forwards each notification to `tracing` at debug level.
    Trace,
}

impl FromStr for ProgressReporting {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silent" | "none" | "off" => Ok(Self::Silent),
            "trace" | "log" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

/// Dicing preferences forwarded field-by-field to the module.
///
/// Nothing here is validated or clamped; the module alone decides what is out of range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DicingPrefs {
    /// Size of a diced unit (grid cell), in pixels.
    #[serde(default = "default_unit_size")]
    pub unit_size: u32,
    /// Pixels between adjacent units inside atlases.
    #[serde(default = "default_padding")]
    pub padding: u32,
    /// Relative inset (0.0-1.0) of unit UV rects, against texture bleeding.
    #[serde(default)]
    pub uv_inset: f32,
    /// Drop fully-transparent units.
    #[serde(default = "default_trim_transparent")]
    pub trim_transparent: bool,
    /// Max width or height of a single atlas.
    #[serde(default = "default_atlas_size_limit")]
    pub atlas_size_limit: u32,
    /// Force square atlases.
    #[serde(default)]
    pub atlas_square: bool,
    /// Force power-of-two atlas dimensions.
    #[serde(default)]
    pub atlas_pot: bool,
    /// Pixels per world unit used to scale mesh vertices.
    #[serde(default = "default_pixels_per_unit")]
    pub pixels_per_unit: f32,
    /// Anchor used for sources without a custom pivot.
    #[serde(default = "Pivot::center")]
    pub default_pivot: Pivot,
    #[serde(default)]
    pub progress: ProgressReporting,
}

impl Default for DicingPrefs {
    fn default() -> Self {
        Self {
            unit_size: default_unit_size(),
            padding: default_padding(),
            uv_inset: 0.0,
            trim_transparent: default_trim_transparent(),
            atlas_size_limit: default_atlas_size_limit(),
            atlas_square: false,
            atlas_pot: false,
            pixels_per_unit: default_pixels_per_unit(),
            default_pivot: Pivot::center(),
            progress: ProgressReporting::Silent,
        }
    }
}

fn default_unit_size() -> u32 {
    64
}
fn default_padding() -> u32 {
    2
}
fn default_trim_transparent() -> bool {
    true
}
fn default_atlas_size_limit() -> u32 {
    2048
}
fn default_pixels_per_unit() -> f32 {
    100.0
}

/// Builder for `DicingPrefs` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct DicingPrefsBuilder {
    prefs: DicingPrefs,
}

impl DicingPrefsBuilder {
    pub fn new() -> Self {
        Self {
            prefs: DicingPrefs::default(),
        }
    }
    pub fn unit_size(mut self, v: u32) -> Self {
        self.prefs.unit_size = v;
        self
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.prefs.padding = v;
        self
    }
    pub fn uv_inset(mut self, v: f32) -> Self {
        self.prefs.uv_inset = v;
        self
    }
    pub fn trim_transparent(mut self, v: bool) -> Self {
        self.prefs.trim_transparent = v;
        self
    }
    pub fn atlas_size_limit(mut self, v: u32) -> Self {
        self.prefs.atlas_size_limit = v;
        self
    }
    pub fn atlas_square(mut self, v: bool) -> Self {
        self.prefs.atlas_square = v;
        self
    }
    pub fn atlas_pot(mut self, v: bool) -> Self {
        self.prefs.atlas_pot = v;
        self
    }
    pub fn pixels_per_unit(mut self, v: f32) -> Self {
        self.prefs.pixels_per_unit = v;
        self
    }
    pub fn default_pivot(mut self, v: Pivot) -> Self {
        self.prefs.default_pivot = v;
        self
    }
    pub fn progress(mut self, v: ProgressReporting) -> Self {
        self.prefs.progress = v;
        self
    }
    pub fn build(self) -> DicingPrefs {
        self.prefs
    }
}

impl DicingPrefs {
    /// Create a fluent builder for `DicingPrefs`.
    pub fn builder() -> DicingPrefsBuilder {
        DicingPrefsBuilder::new()
    }
}

/// Logical location of the native module: a path without the platform extension,
/// optionally anchored at a root directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleLocation {
    /// Directory relative paths are resolved against; the working directory when unset.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Module path without extension, e.g. `native/sprite_dicing`.
    pub logical: PathBuf,
}

impl ModuleLocation {
    pub fn new(logical: impl Into<PathBuf>) -> Self {
        Self {
            root: None,
            logical: logical.into(),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Absolute path of the platform-specific library file.
    pub fn library_path(&self) -> std::io::Result<PathBuf> {
        let mut file = OsString::from(self.logical.as_os_str());
        file.push(".");
        file.push(library_extension());
        let file = PathBuf::from(file);
        let joined = match &self.root {
            Some(root) => root.join(file),
            None => file,
        };
        std::path::absolute(joined)
    }
}

/// Native shared-library extension of the target platform.
pub fn library_extension() -> &'static str {
    if cfg!(target_os = "windows") {
        "dll"
    } else if cfg!(target_os = "macos") {
        "dylib"
    } else {
        "so"
    }
}

/// Loader configuration: where the native module lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoaderConfig {
    pub module: ModuleLocation,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        let mut module = ModuleLocation::new(DEFAULT_MODULE);
        if let Some(dir) = exe_dir() {
            module = module.with_root(dir);
        }
        Self { module }
    }
}

impl LoaderConfig {
    pub fn new(module: ModuleLocation) -> Self {
        Self { module }
    }

    /// Default config, with the logical module path taken from `SPRITE_DICING_MODULE` when set.
    pub fn from_env() -> Self {
        match std::env::var_os(MODULE_ENV) {
            Some(v) if !v.is_empty() => Self::new(ModuleLocation::new(v)),
            _ => Self::default(),
        }
    }
}

fn exe_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    exe.parent().map(Path::to_path_buf)
}
