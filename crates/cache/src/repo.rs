//! Repository for books and everything hanging off them.
//!
//! Books own their annotations, annotations own their reply threads; deleting
//! a book cascades all the way down at the storage layer.

use crate::Database;
use crate::blob::PersistedValue;
use crate::error::{ErrorKind, Result};
use crate::models::{
    self, Annotation, AnnotationRow, Book, BookRow, CoverBlobRow, NewAnnotation, NewBook, NewReply, Reply, ReplyRow,
};
use exn::{OptionExt, ResultExt};
use sqlx::SqlitePool;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    // =========================================================================
    // Books
    // =========================================================================

    /// Insert a new book, assigning it an id and creation time.
    ///
    /// Title and author are trimmed; a blank author is stored as `NULL`.
    /// Fails with [`ErrorKind::Database`] if a book with the same
    /// `local_path` already exists.
    #[instrument(skip(self, book), fields(local_path = %book.local_path))]
    pub async fn insert_book(&self, book: &NewBook) -> Result<Book> {
        let title = book.title.trim();
        if title.is_empty() {
            exn::bail!(ErrorKind::InvalidData("title"));
        }
        let inserted = Book {
            id: models::new_id(),
            title: title.to_string(),
            author: models::trimmed(book.author.as_deref()),
            local_path: book.local_path.clone(),
            cover: match &book.cover_path {
                Some(path) => models::CoverStorage::FilePath(path.clone()),
                None => models::CoverStorage::None,
            },
            metadata: book.metadata.clone(),
            created_at: models::now(),
        };
        let metadata = serde_json::to_string(&inserted.metadata).or_raise(|| ErrorKind::InvalidData("metadata"))?;
        sqlx::query(include_str!("../queries/insert_book.sql"))
            .bind(&inserted.id)
            .bind(&inserted.title)
            .bind(&inserted.author)
            .bind(&inserted.local_path)
            .bind(&book.cover_path)
            .bind(metadata)
            .bind(inserted.created_at.unix_timestamp())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tracing::debug!(id = %inserted.id, "inserted book");
        Ok(inserted)
    }

    pub async fn get_book(&self, id: impl AsRef<str>) -> Result<Option<Book>> {
        let row: Option<BookRow> = sqlx::query_as(include_str!("../queries/get_book.sql"))
            .bind(id.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Book::try_from).transpose()
    }

    /// Look a book up by the path it was imported from.
    pub async fn get_book_by_path(&self, local_path: impl AsRef<str>) -> Result<Option<Book>> {
        let row: Option<BookRow> = sqlx::query_as(include_str!("../queries/get_book_by_path.sql"))
            .bind(local_path.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Book::try_from).transpose()
    }

    /// All books, most recently added first.
    pub async fn list_books(&self) -> Result<Vec<Book>> {
        let rows: Vec<BookRow> = sqlx::query_as(include_str!("../queries/list_books.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Book::try_from).collect()
    }

    /// Delete a book along with its annotations and their replies.
    ///
    /// Returns `false` if there was no such book.
    #[instrument(skip(self))]
    pub async fn delete_book(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_book.sql"))
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every book (and, by cascade, everything else). Returns the
    /// number of books removed.
    #[instrument(skip(self))]
    pub async fn clear_library(&self) -> Result<u64> {
        let result = sqlx::query(include_str!("../queries/clear_library.sql"))
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tracing::info!(removed = result.rows_affected(), "cleared library");
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Covers
    // =========================================================================

    /// Ids of books holding an inline cover blob but no cover file yet,
    /// oldest first.
    ///
    /// Only ids are returned so that blobs can be loaded one at a time with
    /// [`get_cover_blob`](Self::get_cover_blob).
    pub async fn list_pending_cover_migrations(&self) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(include_str!("../queries/list_pending_cover_migrations.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(ids)
    }

    /// The legacy inline cover of a book, exactly as persisted.
    ///
    /// Returns [`ErrorKind::NotFound`] if there's no such book.
    pub async fn get_cover_blob(&self, id: &str) -> Result<Option<PersistedValue>> {
        let row: Option<CoverBlobRow> = sqlx::query_as(include_str!("../queries/get_cover_blob.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(row.ok_or_raise(|| ErrorKind::NotFound(id.to_string()))?.0)
    }

    /// Record the cover file of a book.
    ///
    /// Only fills in a missing path: an existing path is never overwritten and
    /// the inline blob is never touched. Returns whether the record changed.
    #[instrument(skip(self))]
    pub async fn set_cover_path(&self, id: &str, path: &str) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/set_cover_path.sql"))
            .bind(path)
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Annotations
    // =========================================================================

    #[instrument(skip(self, annotation), fields(book_id = %annotation.book_id))]
    pub async fn insert_annotation(&self, annotation: &NewAnnotation) -> Result<Annotation> {
        let inserted = Annotation {
            id: models::new_id(),
            book_id: annotation.book_id.clone(),
            cfi_range: annotation.cfi_range.clone(),
            highlighted_text: annotation.highlighted_text.clone(),
            color: annotation.color.clone(),
        };
        sqlx::query(include_str!("../queries/insert_annotation.sql"))
            .bind(&inserted.id)
            .bind(&inserted.book_id)
            .bind(&inserted.cfi_range)
            .bind(&inserted.highlighted_text)
            .bind(&inserted.color)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(inserted)
    }

    /// Annotations of a book, in the order they were made.
    pub async fn list_annotations_for_book(&self, book_id: &str) -> Result<Vec<Annotation>> {
        let rows: Vec<AnnotationRow> = sqlx::query_as(include_str!("../queries/list_annotations_for_book.sql"))
            .bind(book_id)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().map(Annotation::from).collect())
    }

    // =========================================================================
    // Replies
    // =========================================================================

    /// Add a reply to an annotation's thread.
    ///
    /// A parent, when given, must be a reply on the same annotation
    /// ([`ErrorKind::InvalidData`] otherwise).
    #[instrument(skip(self, reply), fields(annotation_id = %reply.annotation_id))]
    pub async fn insert_reply(&self, reply: &NewReply) -> Result<Reply> {
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        if let Some(parent_id) = &reply.parent_id {
            let parent_annotation: Option<String> =
                sqlx::query_scalar(include_str!("../queries/get_reply_annotation.sql"))
                    .bind(parent_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .or_raise(|| ErrorKind::Database)?;
            if parent_annotation.as_deref() != Some(reply.annotation_id.as_str()) {
                exn::bail!(ErrorKind::InvalidData("parent reply"));
            }
        }
        let inserted = Reply {
            id: models::new_id(),
            annotation_id: reply.annotation_id.clone(),
            parent_id: reply.parent_id.clone(),
            content: reply.content.clone(),
            role: reply.role,
            is_synthesis: reply.is_synthesis,
            created_at: models::now(),
        };
        sqlx::query(include_str!("../queries/insert_reply.sql"))
            .bind(&inserted.id)
            .bind(&inserted.parent_id)
            .bind(&inserted.annotation_id)
            .bind(&inserted.content)
            .bind(inserted.role.to_string())
            .bind(inserted.is_synthesis)
            .bind(inserted.created_at.unix_timestamp())
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(inserted)
    }

    /// The full thread of an annotation, oldest first. Callers rebuild the
    /// tree from `parent_id`.
    pub async fn list_replies_for_annotation(&self, annotation_id: &str) -> Result<Vec<Reply>> {
        let rows: Vec<ReplyRow> = sqlx::query_as(include_str!("../queries/list_replies_for_annotation.sql"))
            .bind(annotation_id)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Reply::try_from).collect()
    }
}
