use crate::blob::PersistedValue;
use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use time::UtcDateTime;

/// Where a book's cover lives.
///
/// Covers used to be stored inline as a blob; they're now written to disk and
/// only the path is stored. A migrated record keeps its blob alongside the
/// new path: migration only ever adds a path, it never removes a blob.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CoverStorage {
    #[default]
    None,
    /// Legacy inline storage, not yet migrated.
    Blob(PersistedValue),
    FilePath(String),
    /// Migrated: the file is authoritative, the blob is retained.
    Migrated { blob: PersistedValue, path: String },
}

impl CoverStorage {
    fn from_columns(blob: Option<PersistedValue>, path: Option<String>) -> Self {
        match (blob, path) {
            (None, None) => Self::None,
            (Some(blob), None) => Self::Blob(blob),
            (None, Some(path)) => Self::FilePath(path),
            (Some(blob), Some(path)) => Self::Migrated { blob, path },
        }
    }

    /// The cover file, if the book has one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::FilePath(path) | Self::Migrated { path, .. } => Some(path),
            _ => None,
        }
    }

    /// The legacy inline value, if one was ever stored.
    pub fn blob(&self) -> Option<&PersistedValue> {
        match self {
            Self::Blob(blob) | Self::Migrated { blob, .. } => Some(blob),
            _ => None,
        }
    }

    /// Inline storage with no file yet.
    pub fn is_pending_migration(&self) -> bool {
        matches!(self, Self::Blob(_))
    }
}

/// Free-form metadata persisted as JSON alongside the book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    /// Where the EPUB was imported from; unique across the library.
    pub local_path: String,
    pub cover: CoverStorage,
    pub metadata: BookMetadata,
    pub created_at: UtcDateTime,
}

/// A book about to be inserted. The id and creation time are assigned by the
/// repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: Option<String>,
    pub local_path: String,
    pub cover_path: Option<String>,
    pub metadata: BookMetadata,
}

/// Reads `cover_blob` according to the storage class SQLite reports for it,
/// since older releases didn't always write real blobs.
fn persisted_value(row: &SqliteRow) -> sqlx::Result<Option<PersistedValue>> {
    let kind: Option<String> = row.try_get("cover_blob_type")?;
    Ok(match kind.as_deref() {
        Some("blob") => Some(PersistedValue::Bytes(row.try_get("cover_blob")?)),
        Some("text") => Some(PersistedValue::from_stored_text(row.try_get("cover_blob")?)),
        Some("integer") => Some(PersistedValue::Json(row.try_get::<i64, _>("cover_blob")?.into())),
        Some("real") => Some(PersistedValue::Json(row.try_get::<f64, _>("cover_blob")?.into())),
        _ => None,
    })
}

pub(crate) struct BookRow {
    id: String,
    title: String,
    author: Option<String>,
    local_path: String,
    cover_blob: Option<PersistedValue>,
    cover_path: Option<String>,
    metadata: Option<String>,
    created_at: i64,
}
impl<'r> FromRow<'r, SqliteRow> for BookRow {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            local_path: row.try_get("local_path")?,
            cover_blob: persisted_value(row)?,
            cover_path: row.try_get("cover_path")?,
            metadata: row.try_get("metadata")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
impl TryFrom<BookRow> for Book {
    type Error = Error;
    fn try_from(row: BookRow) -> Result<Self> {
        let metadata = match row.metadata.as_deref().map(str::trim) {
            None | Some("") => BookMetadata::default(),
            Some(json) => serde_json::from_str(json).or_raise(|| ErrorKind::InvalidData("metadata"))?,
        };
        Ok(Self {
            id: row.id,
            title: row.title,
            author: row.author,
            local_path: row.local_path,
            cover: CoverStorage::from_columns(row.cover_blob, row.cover_path),
            metadata,
            created_at: super::timestamp(row.created_at, "created at")?,
        })
    }
}

/// Just the legacy cover column of a single book.
pub(crate) struct CoverBlobRow(pub(crate) Option<PersistedValue>);
impl<'r> FromRow<'r, SqliteRow> for CoverBlobRow {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        Ok(Self(persisted_value(row)?))
    }
}
