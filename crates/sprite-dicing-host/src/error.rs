use thiserror::Error;

/// Failures the loader can detect while acquiring the native module.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("native module not found at {}", .path.display())]
    NotFound { path: std::path::PathBuf },
    #[error("failed to open native module {}: {reason}", .path.display())]
    Open {
        path: std::path::PathBuf,
        reason: String,
    },
    #[error("symbol '{symbol}' not found in {}", .path.display())]
    MissingSymbol {
        path: std::path::PathBuf,
        symbol: String,
    },
    #[error("failed to resolve module path: {0}")]
    Resolve(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum DicingError {
    /// The module could not be loaded or its entry point could not be resolved.
    #[error("Native library not available: {reason}")]
    Unavailable { reason: String },
    /// The module returned a non-empty error text; carried verbatim.
    #[error("{0}")]
    Native(String),
    #[error("Invalid texture: {width}x{height} does not match {len} pixel bytes")]
    InvalidTexture { width: u32, height: u32, len: usize },
}

impl DicingError {
    pub(crate) fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// True when the failure means the feature is unavailable rather than that the call failed.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, DicingError>;
