//! Extraction Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Only structural problems with the archive are errors. Anything missing
//! *inside* the package document (title, author, cover...) degrades to a
//! default instead, so that a scrappy EPUB can still be imported.

use derive_more::{Display, Error};

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// In every case the caller is expected to fall back to a filename-only import.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The archive's central directory (or an entry's data) could not be read.
    #[display("corrupt or unreadable archive")]
    ArchiveCorrupt,
    /// `META-INF/container.xml` is absent, or is a directory.
    #[display("invalid EPUB: missing META-INF/container.xml")]
    MissingContainer,
    /// The rootfile named by the container does not exist in the archive.
    #[display("invalid EPUB: missing package document at {_0}")]
    MissingPackageDocument(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The bytes are either a readable EPUB or they're not.
        false
    }
}
