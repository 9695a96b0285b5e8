use crate::covers::CoverWriter;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::migrate::error::{Error as MigrateError, ErrorKind as MigrateErrorKind, Result as MigrateResult};
use crate::migrate::record::migrate_record;
use async_stream::stream;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use nous_cache::Repository;
use std::pin::pin;
use tracing::instrument;

/// Progress events emitted by [`migrate`] as it works through the books
/// still holding an inline cover.
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started), exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete), exactly once, with the
///    number of pending books.
/// 3. [`Migrated`](Self::Migrated) or [`Skipped`](Self::Skipped), once per
///    pending book, oldest book first.
/// 4. [`Complete`](Self::Complete), exactly once.
///
/// Only a failure to discover pending books ends the stream early, in which
/// case the error is the last item and [`Complete`](Self::Complete) is never
/// emitted.
#[derive(Debug)]
pub enum MigrationEvent {
    Started,
    DiscoveryComplete(u64),
    /// The cover was written out and its path recorded.
    Migrated { id: String, path: String },
    /// The book keeps its inline cover and will be retried next time.
    Skipped { id: String, reason: MigrateError },
    Complete,
}

/// Totals of a finished migration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub discovered: u64,
    pub migrated: u64,
    pub skipped: u64,
}

/// Streams [`MigrationEvent`]s while moving every pending inline cover out
/// through `covers`.
///
/// Pending books are listed up front; their covers are then loaded, decoded
/// and written strictly one after another so that only one cover is held in
/// memory at a time.
pub fn migrate<'a>(
    repo: &'a Repository,
    covers: &'a dyn CoverWriter,
) -> impl Stream<Item = LibraryResult<MigrationEvent>> + 'a {
    stream! {
        for await event in migrate_inner(repo, covers) {
            yield event.or_raise(|| LibraryErrorKind::Migration);
        }
    }
}

fn migrate_inner<'a>(
    repo: &'a Repository,
    covers: &'a dyn CoverWriter,
) -> impl Stream<Item = MigrateResult<MigrationEvent>> + 'a {
    stream!({
        yield Ok(MigrationEvent::Started);

        let ids = match repo.list_pending_cover_migrations().await.or_raise(|| MigrateErrorKind::Cache) {
            Ok(ids) => ids,
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
        yield Ok(MigrationEvent::DiscoveryComplete(u64::try_from(ids.len()).unwrap_or(0)));

        for id in ids {
            match migrate_record(repo, covers, &id).await {
                Ok(path) => {
                    yield Ok(MigrationEvent::Migrated { id, path });
                },
                Err(reason) => {
                    tracing::warn!(%id, error = ?reason, "skipping cover migration");
                    yield Ok(MigrationEvent::Skipped { id, reason });
                },
            }
        }

        yield Ok(MigrationEvent::Complete);
    })
}

/// Run [`migrate`] to completion.
#[instrument(skip_all)]
pub async fn migrate_covers(repo: &Repository, covers: &dyn CoverWriter) -> LibraryResult<MigrationReport> {
    let mut report = MigrationReport::default();
    let mut events = pin!(migrate(repo, covers));
    while let Some(event) = events.next().await {
        match event? {
            MigrationEvent::DiscoveryComplete(discovered) => report.discovered = discovered,
            MigrationEvent::Migrated { .. } => report.migrated += 1,
            MigrationEvent::Skipped { .. } => report.skipped += 1,
            MigrationEvent::Started | MigrationEvent::Complete => {},
        }
    }
    if report.discovered > 0 {
        tracing::info!(
            discovered = report.discovered,
            migrated = report.migrated,
            skipped = report.skipped,
            "migrated covers"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::covers::{CoverFiles, DEFAULT_COVERS_DIR};
    use crate::testing::{JPEG, PNG, book, legacy_bytes, legacy_text, repo};
    use futures::TryStreamExt;
    use nous_cache::CoverStorage;
    use nous_cache::PersistedValue;
    use nous_storage::backend::{MockBackend, StorageBackend};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_nothing_to_migrate() {
        let (_db, repo) = repo().await;
        book(&repo, "/books/a.epub").await;
        let covers = CoverFiles::new(Arc::new(MockBackend::default()), DEFAULT_COVERS_DIR);

        let events: Vec<_> = migrate(&repo, &covers).try_collect().await.unwrap();
        assert!(matches!(
            events.as_slice(),
            [MigrationEvent::Started, MigrationEvent::DiscoveryComplete(0), MigrationEvent::Complete]
        ));
    }

    #[tokio::test]
    async fn test_migrates_every_stored_form() {
        let (db, repo) = repo().await;
        let bytes = book(&repo, "/books/a.epub").await;
        let array = book(&repo, "/books/b.epub").await;
        let base64 = book(&repo, "/books/c.epub").await;
        legacy_bytes(&db, &bytes.id, JPEG).await;
        legacy_text(&db, &array.id, "[137,80,78,71,13,10,26,10]").await;
        legacy_text(&db, &base64.id, "/9j/4AAQ").await;
        // Objects can only have been stored as their JSON text.
        let indexed = book(&repo, "/books/d.epub").await;
        let buffer = book(&repo, "/books/e.epub").await;
        legacy_text(&db, &indexed.id, r#"{"0":255,"1":216,"2":255,"3":224,"4":0,"5":16}"#).await;
        legacy_text(&db, &buffer.id, r#"{"type":"Buffer","data":[137,80,78,71,13,10,26,10]}"#).await;

        let backend = Arc::new(MockBackend::default());
        let covers = CoverFiles::new(backend.clone(), DEFAULT_COVERS_DIR);
        let report = migrate_covers(&repo, &covers).await.unwrap();
        assert_eq!(report, MigrationReport { discovered: 5, migrated: 5, skipped: 0 });

        let expected = [
            (&bytes.id, "jpg", JPEG),
            (&array.id, "png", PNG),
            (&base64.id, "jpg", JPEG),
            (&indexed.id, "jpg", JPEG),
            (&buffer.id, "png", PNG),
        ];
        for (id, extension, data) in expected {
            let path = format!("covers/{id}.{extension}");
            assert_eq!(backend.read(Path::new(&path)).await.unwrap(), data);
            let book = repo.get_book(id).await.unwrap().unwrap();
            assert_eq!(book.cover.path(), Some(path.as_str()));
        }
    }

    #[tokio::test]
    async fn test_inline_cover_is_retained() {
        let (db, repo) = repo().await;
        let book = book(&repo, "/books/a.epub").await;
        legacy_bytes(&db, &book.id, JPEG).await;
        let covers = CoverFiles::new(Arc::new(MockBackend::default()), DEFAULT_COVERS_DIR);

        migrate_covers(&repo, &covers).await.unwrap();

        let migrated = repo.get_book(&book.id).await.unwrap().unwrap();
        assert_eq!(
            migrated.cover,
            CoverStorage::Migrated {
                blob: PersistedValue::Bytes(JPEG.to_vec()),
                path: format!("covers/{}.jpg", book.id),
            }
        );
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let (db, repo) = repo().await;
        let book = book(&repo, "/books/a.epub").await;
        legacy_bytes(&db, &book.id, JPEG).await;
        let backend = Arc::new(MockBackend::default());
        let covers = CoverFiles::new(backend.clone(), DEFAULT_COVERS_DIR);

        let first = migrate_covers(&repo, &covers).await.unwrap();
        let second = migrate_covers(&repo, &covers).await.unwrap();
        assert_eq!(first.migrated, 1);
        assert_eq!(second, MigrationReport::default());
        assert_eq!(backend.paths().await.len(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_cover_is_skipped() {
        let (db, repo) = repo().await;
        let broken = book(&repo, "/books/a.epub").await;
        let fine = book(&repo, "/books/b.epub").await;
        legacy_text(&db, &broken.id, "not a cover, just some words").await;
        legacy_bytes(&db, &fine.id, PNG).await;
        let covers = CoverFiles::new(Arc::new(MockBackend::default()), DEFAULT_COVERS_DIR);

        let events: Vec<_> = migrate(&repo, &covers).try_collect().await.unwrap();
        assert_eq!(events.len(), 5);
        let MigrationEvent::Skipped { id, reason } = &events[2] else {
            panic!("expected the undecodable cover to be skipped, got {:?}", events[2]);
        };
        assert_eq!(id, &broken.id);
        assert_eq!(**reason, MigrateErrorKind::BlobDecodeFailure(broken.id.clone()));
        assert!(matches!(&events[3], MigrationEvent::Migrated { id, .. } if id == &fine.id));
        assert!(matches!(events[4], MigrationEvent::Complete));

        let broken = repo.get_book(&broken.id).await.unwrap().unwrap();
        assert!(broken.cover.is_pending_migration());
    }

    #[tokio::test]
    async fn test_write_failure_leaves_record_pending() {
        let (db, repo) = repo().await;
        let unlucky = book(&repo, "/books/a.epub").await;
        let lucky = book(&repo, "/books/b.epub").await;
        legacy_bytes(&db, &unlucky.id, JPEG).await;
        legacy_bytes(&db, &lucky.id, JPEG).await;

        let backend = Arc::new(MockBackend::default().fail_writes_to(format!("covers/{}.jpg", unlucky.id)));
        let covers = CoverFiles::new(backend.clone(), DEFAULT_COVERS_DIR);
        let report = migrate_covers(&repo, &covers).await.unwrap();
        assert_eq!(report, MigrationReport { discovered: 2, migrated: 1, skipped: 1 });
        assert_eq!(backend.paths().await, vec![PathBuf::from(format!("covers/{}.jpg", lucky.id))]);
        assert_eq!(repo.list_pending_cover_migrations().await.unwrap(), vec![unlucky.id.clone()]);

        // Once storage recovers, the next run picks the record up again.
        let covers = CoverFiles::new(Arc::new(MockBackend::default()), DEFAULT_COVERS_DIR);
        let report = migrate_covers(&repo, &covers).await.unwrap();
        assert_eq!(report, MigrationReport { discovered: 1, migrated: 1, skipped: 0 });
    }

    #[tokio::test]
    async fn test_discovery_failure_ends_the_stream() {
        let (db, repo) = repo().await;
        let covers = CoverFiles::new(Arc::new(MockBackend::default()), DEFAULT_COVERS_DIR);
        db.close().await;

        let events: Vec<_> = migrate(&repo, &covers).collect().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Ok(MigrationEvent::Started)));
        let Err(err) = &events[1] else {
            panic!("expected discovery to fail");
        };
        assert_eq!(**err, LibraryErrorKind::Migration);
        assert!(migrate_covers(&repo, &covers).await.is_err());
    }
}
