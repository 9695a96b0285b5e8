//! Error types for the [`import`](super) module.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An import error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for import operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of an import failure.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The file could not be read from disk.
    #[display("could not read {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
    /// Paths are stored as text, so they have to be valid UTF-8.
    #[display("path is not valid UTF-8: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Package metadata could not be extracted. Never fatal on its own.
    Extract,
    /// A lookup or update via the [cache repository](nous_cache::Repository)
    /// failed.
    Cache,
    /// Writing the cover file failed.
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Read(_) | Self::Storage)
    }
}
