//! Shelving books: importing EPUBs into the library, writing their covers
//! to disk, and moving covers stored inline by older releases out into
//! files.

mod covers;
pub mod error;
pub mod import;
pub mod migrate;
mod remove;

pub use crate::covers::{CoverFiles, CoverWriter, DEFAULT_COVERS_DIR};
pub use crate::import::{Import, import_book};
pub use crate::migrate::{MigrationEvent, MigrationReport, migrate, migrate_covers};
pub use crate::remove::remove_book;
