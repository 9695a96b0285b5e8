//! Library Error Types
//!
//! Each public operation raises its own kind over the error tree built by
//! the operation's module ([`import::error`](crate::import::error),
//! [`migrate::error`](crate::migrate::error)).

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("could not import book")]
    Import,
    #[display("cover migration failed")]
    Migration,
    #[display("could not remove book")]
    Remove,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            // Pending covers are rediscovered by the next scan.
            Self::Migration => true,
            Self::Import | Self::Remove => false,
        }
    }
}
