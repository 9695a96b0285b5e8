//! Moving covers out of the database.
//!
//! Older releases stored covers inline in the books table, in whatever form
//! the storage layer of the day produced. Migration decodes each one with the
//! [blob normalizer](nous_cache::blob), writes it out through a
//! [`CoverWriter`](crate::CoverWriter) and records the resulting path. The
//! inline value is kept.
//!
//! Records are processed one at a time, each independently of the others: a
//! cover that can't be decoded or written is skipped and stays pending, so
//! the next run picks it up again. Once every cover has moved a run finds
//! nothing to do, which makes it safe to run on every start-up.

pub mod error;
mod record;
mod stream;

pub use self::stream::{MigrationEvent, MigrationReport, migrate, migrate_covers};
