//! Native module lifecycle: open, resolve `dice`, cache for the life of the process.
//!
//! Loading a shared library runs its initialization code inside this process. The module is
//! trusted to honor the ABI in [`crate::abi`]; a crash inside it is not contained.

use crate::abi::{DICE_SYMBOL, DiceFn};
use crate::config::{LoaderConfig, ModuleLocation};
use crate::error::LoadError;
use libloading::Library;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, warn};

/// Capability object over a loaded module, exposing its single `dice` entry point.
pub struct NativeModule {
    // Keeps the symbol below mapped; `None` for in-process entry points.
    library: Option<Library>,
    path: Option<PathBuf>,
    entry: DiceFn,
}

impl NativeModule {
    /// Wraps an entry point that lives in this process (statically linked module, test stub).
    ///
    /// # Safety
    ///
    /// `entry` must honor the `dice` contract: read only the views it is given, during the call,
    /// and return views that stay valid until control returns to the caller.
    pub unsafe fn from_entry(entry: DiceFn) -> Self {
        Self {
            library: None,
            path: None,
            entry,
        }
    }

    /// Opens the shared library at `path` and resolves `dice`. On a missing symbol the
    /// library is closed again before returning.
    pub fn open(path: PathBuf) -> Result<Self, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound { path });
        }
        let library = unsafe { Library::new(&path) }.map_err(|e| LoadError::Open {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let resolved = unsafe { library.get::<DiceFn>(DICE_SYMBOL.as_bytes()) }.map(|s| *s);
        let entry = match resolved {
            Ok(entry) => entry,
            Err(_) => {
                drop(library);
                return Err(LoadError::MissingSymbol {
                    path,
                    symbol: DICE_SYMBOL.to_string(),
                });
            }
        };
        Ok(Self {
            library: Some(library),
            path: Some(path),
            entry,
        })
    }

    /// Re-resolves the entry point from the held library; in-process modules return theirs.
    pub fn entry(&self) -> Result<DiceFn, LoadError> {
        let Some(library) = &self.library else {
            return Ok(self.entry);
        };
        match unsafe { library.get::<DiceFn>(DICE_SYMBOL.as_bytes()) } {
            Ok(symbol) => Ok(*symbol),
            Err(_) => Err(LoadError::MissingSymbol {
                path: self.path.clone().unwrap_or_default(),
                symbol: DICE_SYMBOL.to_string(),
            }),
        }
    }

    /// Path of the backing library, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        self.path.as_deref()
    }
}

impl std::fmt::Debug for NativeModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeModule")
            .field("path", &self.path)
            .field("in_process", &self.library.is_none())
            .finish()
    }
}

/// How the loader obtains a module.
pub trait ModuleSource: Send + Sync {
    fn open(&self) -> Result<NativeModule, LoadError>;
    /// Human-readable origin for logs and error texts.
    fn describe(&self) -> String;
}

/// Opens a shared library from a [`ModuleLocation`].
#[derive(Debug, Clone)]
pub struct LibrarySource {
    location: ModuleLocation,
}

impl LibrarySource {
    pub fn new(location: ModuleLocation) -> Self {
        Self { location }
    }

    pub fn location(&self) -> &ModuleLocation {
        &self.location
    }
}

impl ModuleSource for LibrarySource {
    fn open(&self) -> Result<NativeModule, LoadError> {
        let path = self.location.library_path()?;
        debug!(path = %path.display(), "opening native module");
        NativeModule::open(path)
    }

    fn describe(&self) -> String {
        match self.location.library_path() {
            Ok(path) => path.display().to_string(),
            Err(_) => self.location.logical.display().to_string(),
        }
    }
}

/// Process-scoped loader state: the cached module and its loaded flag.
///
/// `ensure_loaded` is serialized by an internal lock, so concurrent callers never double-load;
/// only success is memoized and failures are never retried automatically.
pub struct ModuleLoader {
    source: Box<dyn ModuleSource>,
    module: Mutex<Option<Arc<NativeModule>>>,
    loaded: AtomicBool,
    attempts: AtomicUsize,
    last_error: Mutex<Option<String>>,
}

impl ModuleLoader {
    pub fn new(source: impl ModuleSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            module: Mutex::new(None),
            loaded: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
            last_error: Mutex::new(None),
        }
    }

    pub fn from_config(config: &LoaderConfig) -> Self {
        Self::new(LibrarySource::new(config.module.clone()))
    }

    /// Loads the module unless already loaded. Returns whether it is available afterwards.
    pub fn ensure_loaded(&self) -> bool {
        if self.is_available() {
            return true;
        }
        let mut slot = self.module.lock().unwrap_or_else(|e| e.into_inner());
        // Another caller may have finished loading while we waited for the lock.
        if slot.is_some() {
            return true;
        }
        self.attempts.fetch_add(1, Ordering::Relaxed);
        match self.source.open() {
            Ok(module) => {
                debug!(source = %self.source.describe(), "native module loaded");
                *slot = Some(Arc::new(module));
                self.loaded.store(true, Ordering::Release);
                self.set_last_error(None);
                true
            }
            Err(e) => {
                warn!(source = %self.source.describe(), error = %e, "native module unavailable");
                self.set_last_error(Some(e.to_string()));
                false
            }
        }
    }

    /// Reads the loaded flag. Never loads and never touches the file system.
    pub fn is_available(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// The cached module, if loaded.
    pub fn module(&self) -> Option<Arc<NativeModule>> {
        if !self.is_available() {
            return None;
        }
        self.module
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of times the source was asked to open the module.
    pub fn load_attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Reason the most recent load attempt failed, cleared by a successful load.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn describe(&self) -> String {
        self.source.describe()
    }

    fn set_last_error(&self, error: Option<String>) {
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = error;
    }
}

impl std::fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("source", &self.source.describe())
            .field("loaded", &self.is_available())
            .field("attempts", &self.load_attempts())
            .finish()
    }
}

static SHARED: OnceLock<ModuleLoader> = OnceLock::new();

/// The process-wide loader, configured from `SPRITE_DICING_MODULE` or the default location
/// unless [`configure_shared`] ran first.
pub fn shared() -> &'static ModuleLoader {
    SHARED.get_or_init(|| ModuleLoader::from_config(&LoaderConfig::from_env()))
}

/// Installs the configuration of the process-wide loader. Returns false when the loader was
/// already created, in which case `config` is ignored.
pub fn configure_shared(config: LoaderConfig) -> bool {
    SHARED.set(ModuleLoader::from_config(&config)).is_ok()
}
