//! Adding EPUBs to the library.
//!
//! Import never refuses a readable file: when its package metadata can't be
//! extracted the book is shelved under its file name, without a cover.

pub mod error;

use crate::covers::CoverWriter;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::import::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use nous_cache::{Book, BookMetadata, CoverStorage, NewBook, Repository};
use nous_extract::{NormalizedBytes, PackageMetadata, UNKNOWN_TITLE};
use std::path::Path;
use tracing::instrument;

/// The outcome of [`import_book`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Import {
    Imported(Book),
    /// The path was already in the library; nothing was read or written.
    AlreadyExists(Book),
}

impl Import {
    pub fn book(&self) -> &Book {
        match self {
            Self::Imported(book) | Self::AlreadyExists(book) => book,
        }
    }

    pub fn into_book(self) -> Book {
        match self {
            Self::Imported(book) | Self::AlreadyExists(book) => book,
        }
    }
}

/// Import the EPUB at `path`, writing its cover through `covers`.
pub async fn import_book(repo: &Repository, covers: &dyn CoverWriter, path: impl AsRef<Path>) -> LibraryResult<Import> {
    import_book_inner(repo, covers, path.as_ref()).await.or_raise(|| LibraryErrorKind::Import)
}

#[instrument(skip(repo, covers))]
async fn import_book_inner(repo: &Repository, covers: &dyn CoverWriter, path: &Path) -> Result<Import> {
    let local_path = path.to_str().ok_or_raise(|| ErrorKind::InvalidPath(path.to_path_buf()))?;
    if let Some(existing) = repo.get_book_by_path(local_path).await.or_raise(|| ErrorKind::Cache)? {
        tracing::debug!(id = %existing.id, "already in the library");
        return Ok(Import::AlreadyExists(existing));
    }

    let bytes = tokio::fs::read(path).await.or_raise(|| ErrorKind::Read(path.to_path_buf()))?;
    let metadata = match nous_extract::extract(&bytes).or_raise(|| ErrorKind::Extract) {
        Ok(metadata) => metadata,
        Err(err) => {
            tracing::warn!(error = ?err, "could not read package metadata, shelving under the file name");
            from_file_name(path)
        },
    };
    drop(bytes);

    let new = NewBook {
        title: metadata.title,
        author: metadata.author,
        local_path: local_path.to_string(),
        cover_path: None,
        metadata: BookMetadata { description: metadata.description },
    };
    let mut book = repo.insert_book(&new).await.or_raise(|| ErrorKind::Cache)?;

    if let Some(cover) = metadata.cover {
        let cover = NormalizedBytes::from(cover);
        match covers.write_cover(&book.id, &cover).await.or_raise(|| ErrorKind::Storage) {
            Ok(cover_path) => {
                repo.set_cover_path(&book.id, &cover_path).await.or_raise(|| ErrorKind::Cache)?;
                book.cover = CoverStorage::FilePath(cover_path);
            },
            Err(err) => tracing::warn!(id = %book.id, error = ?err, "could not write cover, importing without one"),
        }
    }

    tracing::info!(id = %book.id, title = %book.title, "imported book");
    Ok(Import::Imported(book))
}

fn from_file_name(path: &Path) -> PackageMetadata {
    let title = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::trim)
        .filter(|stem| !stem.is_empty())
        .unwrap_or(UNKNOWN_TITLE);
    PackageMetadata {
        title: title.to_string(),
        author: None,
        description: None,
        cover: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::covers::{CoverFiles, DEFAULT_COVERS_DIR};
    use crate::testing::{JPEG, repo};
    use nous_storage::backend::{MockBackend, StorageBackend};
    use rstest::rstest;
    use std::io::{Cursor, Write};
    use std::path::PathBuf;
    use std::sync::Arc;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

    const PACKAGE: &str = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Meditations</dc:title>
    <dc:creator>Marcus Aurelius</dc:creator>
    <dc:description>Notes to himself.</dc:description>
  </metadata>
  <manifest>
    <item id="cover-image" properties="cover-image" href="images/cover.jpg" media-type="image/jpeg"/>
  </manifest>
</package>"#;

    fn epub() -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in [
            ("META-INF/container.xml", CONTAINER.as_bytes()),
            ("OEBPS/content.opf", PACKAGE.as_bytes()),
            ("OEBPS/images/cover.jpg", JPEG),
        ] {
            zip.start_file(name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[tokio::test]
    async fn test_import_book() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "meditations.epub", &epub());
        let (_db, repo) = repo().await;
        let backend = Arc::new(MockBackend::default());
        let covers = CoverFiles::new(backend.clone(), DEFAULT_COVERS_DIR);

        let Import::Imported(book) = import_book(&repo, &covers, &path).await.unwrap() else {
            panic!("expected a fresh import");
        };
        assert_eq!(book.title, "Meditations");
        assert_eq!(book.author.as_deref(), Some("Marcus Aurelius"));
        assert_eq!(book.metadata.description.as_deref(), Some("Notes to himself."));

        let cover_path = format!("covers/{}.jpg", book.id);
        assert_eq!(book.cover, CoverStorage::FilePath(cover_path.clone()));
        assert_eq!(backend.read(Path::new(&cover_path)).await.unwrap(), JPEG);
        assert_eq!(repo.get_book(&book.id).await.unwrap(), Some(book));
    }

    #[tokio::test]
    async fn test_import_is_keyed_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "meditations.epub", &epub());
        let (_db, repo) = repo().await;
        let covers = CoverFiles::new(Arc::new(MockBackend::default()), DEFAULT_COVERS_DIR);

        let first = import_book(&repo, &covers, &path).await.unwrap();
        let second = import_book(&repo, &covers, &path).await.unwrap();
        assert!(matches!(first, Import::Imported(_)));
        assert_eq!(second, Import::AlreadyExists(first.into_book()));
        assert_eq!(repo.list_books().await.unwrap().len(), 1);
    }

    #[rstest]
    #[case::not_a_zip("Letters from a Stoic.epub", b"definitely not a zip".to_vec(), "Letters from a Stoic")]
    #[case::blank_stem("   .epub", b"".to_vec(), UNKNOWN_TITLE)]
    #[tokio::test]
    async fn test_unreadable_package_falls_back_to_file_name(
        #[case] name: &str,
        #[case] data: Vec<u8>,
        #[case] expected: &str,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), name, &data);
        let (_db, repo) = repo().await;
        let backend = Arc::new(MockBackend::default());
        let covers = CoverFiles::new(backend.clone(), DEFAULT_COVERS_DIR);

        let book = import_book(&repo, &covers, &path).await.unwrap().into_book();
        assert_eq!(book.title, expected);
        assert_eq!(book.author, None);
        assert_eq!(book.cover, CoverStorage::None);
        assert!(backend.paths().await.is_empty());
    }

    struct Offline;

    #[async_trait::async_trait]
    impl CoverWriter for Offline {
        async fn write_cover(&self, _id: &str, _cover: &NormalizedBytes) -> nous_storage::error::Result<String> {
            exn::bail!(nous_storage::error::ErrorKind::BackendError("offline".to_string()));
        }

        async fn remove_cover(&self, _id: &str, _recorded: &str) -> nous_storage::error::Result<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_cover_write_failure_does_not_block_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "meditations.epub", &epub());
        let (_db, repo) = repo().await;

        let book = import_book(&repo, &Offline, &path).await.unwrap().into_book();
        assert_eq!(book.title, "Meditations");
        assert_eq!(book.cover, CoverStorage::None);
        assert_eq!(repo.get_book(&book.id).await.unwrap().unwrap().cover, CoverStorage::None);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (_db, repo) = repo().await;
        let covers = CoverFiles::new(Arc::new(MockBackend::default()), DEFAULT_COVERS_DIR);

        let err = import_book(&repo, &covers, dir.path().join("missing.epub")).await.unwrap_err();
        assert_eq!(*err, LibraryErrorKind::Import);
        assert!(repo.list_books().await.unwrap().is_empty());
    }
}
