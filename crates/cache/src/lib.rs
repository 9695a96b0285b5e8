//! SQLite persistence for the library.
//!
//! Stores books (with their legacy inline cover blobs and current cover file
//! paths), highlight annotations, and the reply threads hanging off them. The
//! schema is versioned with embedded migrations that run on connect.
//!
//! Legacy cover blobs come back in whatever shape they were written; see
//! [`blob`] for recovering the actual image bytes.

pub mod blob;
mod db;
pub mod error;
mod models;
mod repo;
mod shared;

pub use crate::blob::PersistedValue;
pub use crate::db::Database;
pub use crate::models::{
    Annotation, Book, BookMetadata, CoverStorage, NewAnnotation, NewBook, NewReply, Reply, Role,
};
pub use crate::repo::Repository;
pub use crate::shared::shared;
