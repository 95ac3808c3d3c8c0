use std::path::PathBuf;
use thiserror::Error;

/// Failures of the extended-attribute layer.
///
/// Neither variant is fatal: callers degrade the metadata feature for the
/// affected path and keep going.
#[derive(Error, Debug)]
pub enum AttributeStoreError {
    #[error("extended attributes are not supported for {}", .path.display())]
    Unsupported { path: PathBuf },

    #[error("attribute I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("attribute data on {} is corrupt: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
}

impl AttributeStoreError {
    pub fn path(&self) -> &PathBuf {
        match self {
            AttributeStoreError::Unsupported { path }
            | AttributeStoreError::Io { path, .. }
            | AttributeStoreError::Corrupt { path, .. } => path,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, AttributeStoreError::Unsupported { .. })
    }
}

#[derive(Error, Debug)]
pub enum SnapverError {
    #[error("Scan error in {}: {message}", .directory.display())]
    Scan { directory: PathBuf, message: String },

    #[error(transparent)]
    AttributeStore(#[from] AttributeStoreError),

    #[error("Merge write failed for {}: {reason}", .path.display())]
    MergeWrite { path: PathBuf, reason: String },

    #[error("Version not found: {0}")]
    VersionNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Api Error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, SnapverError>;
