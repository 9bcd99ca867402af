//! Error taxonomy for a generation run.
//!
//! Every variant is fatal: the run aborts on the first error and no partial
//! output is considered valid.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BindgenError>;

#[derive(Debug, Error)]
pub enum BindgenError {
    /// An expected header, asset, archive entry or binary is missing.
    #[error("source unavailable: {path}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: Option<io::Error>,
    },

    /// A fixup or emission step expected a declaration the parsed tree lacks.
    #[error("declaration shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The destination is held by another writer. A lock left behind by a
    /// killed run has to be removed by hand.
    #[error("destination is locked by another writer: {path} (lock file {lock})")]
    WriteConflict { path: PathBuf, lock: PathBuf },

    #[error("failed to fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("malformed release descriptor from {url}")]
    ReleaseDescriptor {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to extract {path}: {message}")]
    Archive { path: PathBuf, message: String },

    #[error("header parsing failed: {0}")]
    HeaderParse(String),

    #[error("binding generation failed: {0}")]
    Emit(String),

    #[error("release tag `{0}` does not carry a numeric build")]
    InvalidReleaseTag(String),

    #[error("invalid version manifest: {0}")]
    InvalidManifest(String),

    #[error("invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("i/o error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BindgenError {
    /// A missing file, keeping the underlying I/O error when there is one.
    pub fn unavailable(path: impl Into<PathBuf>, source: Option<io::Error>) -> Self {
        BindgenError::SourceUnavailable {
            path: path.into(),
            source,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BindgenError::Io {
            path: path.into(),
            source,
        }
    }
}
