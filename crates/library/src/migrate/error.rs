//! Error types for the [`migrate`](super) module.

use derive_more::{Display, Error};

/// A migration error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a migration failure.
///
/// Only a [`Cache`](Self::Cache) failure while discovering pending records
/// ends a migration; everything else skips the record at hand.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A lookup or update via [`nous_cache::Repository`] failed.
    Cache,
    /// The stored cover couldn't be turned back into bytes.
    #[display("cover of book {_0} could not be decoded")]
    BlobDecodeFailure(#[error(not(source))] String),
    /// The cover file couldn't be written; the record stays pending.
    #[display("cover of book {_0} could not be written")]
    FileWriteFailure(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Cache | Self::FileWriteFailure(_))
    }
}
