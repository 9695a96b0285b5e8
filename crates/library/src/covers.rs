use async_trait::async_trait;
use exn::OptionExt;
use nous_extract::NormalizedBytes;
use nous_storage::BackendHandle;
use nous_storage::error::{ErrorKind, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Directory, relative to the storage root, that cover files are written to.
pub const DEFAULT_COVERS_DIR: &str = "covers";

/// Somewhere to keep cover images.
#[async_trait]
pub trait CoverWriter: Send + Sync {
    /// Store the cover of book `id`, returning the path to record against the
    /// book.
    async fn write_cover(&self, id: &str, cover: &NormalizedBytes) -> Result<String>;

    /// Remove the cover of book `id` previously stored at `recorded`.
    ///
    /// Returns `false` when there was nothing of ours to remove.
    async fn remove_cover(&self, id: &str, recorded: &str) -> Result<bool>;
}

/// Cover files named `<id>.<ext>` in a directory of a storage backend, the
/// extension following the sniffed image type.
#[derive(Clone)]
pub struct CoverFiles {
    backend: BackendHandle,
    dir: PathBuf,
}

impl CoverFiles {
    pub fn new(backend: BackendHandle, dir: impl Into<PathBuf>) -> Self {
        Self { backend, dir: dir.into() }
    }

    /// Where the cover of book `id` is written, relative to the storage root.
    pub fn relative_path(&self, id: &str, cover: &NormalizedBytes) -> PathBuf {
        self.dir.join(format!("{id}.{}", cover.mime.extension()))
    }
}

#[async_trait]
impl CoverWriter for CoverFiles {
    #[instrument(skip(self, cover), fields(backend = self.backend.name(), size = cover.bytes.len(), mime = %cover.mime))]
    async fn write_cover(&self, id: &str, cover: &NormalizedBytes) -> Result<String> {
        let path = self.relative_path(id, cover);
        self.backend.write(&path, &cover.bytes).await?;
        let located = self.backend.locate(&path)?;
        let recorded = located.to_str().map(str::to_string).ok_or_raise(|| ErrorKind::InvalidPath(located.clone()))?;
        tracing::debug!(path = %recorded, "wrote cover");
        Ok(recorded)
    }

    #[instrument(skip(self), fields(backend = self.backend.name()))]
    async fn remove_cover(&self, id: &str, recorded: &str) -> Result<bool> {
        // Only files we named ourselves; anything else isn't ours to delete.
        let Some(name) = Path::new(recorded).file_name() else {
            return Ok(false);
        };
        if Path::new(name).file_stem() != Some(OsStr::new(id)) {
            tracing::debug!("cover file was not written by this library, leaving it");
            return Ok(false);
        }
        match self.backend.delete(&self.dir.join(name)).await {
            Ok(()) => Ok(true),
            Err(err) if matches!(&*err, ErrorKind::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{JPEG, PNG};
    use nous_storage::backend::{LocalBackend, MockBackend, StorageBackend};
    use rstest::rstest;
    use std::sync::Arc;

    #[rstest]
    #[case::jpeg(JPEG, "covers/book-1.jpg")]
    #[case::png(PNG, "covers/book-1.png")]
    #[case::unrecognised(&[0x00, 0x01], "covers/book-1.jpg")]
    #[tokio::test]
    async fn test_write_cover_names_file_by_id_and_type(#[case] bytes: &[u8], #[case] expected: &str) {
        let backend = Arc::new(MockBackend::default());
        let covers = CoverFiles::new(backend.clone(), DEFAULT_COVERS_DIR);
        let path = covers.write_cover("book-1", &NormalizedBytes::from(bytes.to_vec())).await.unwrap();
        assert_eq!(path, expected);
        assert_eq!(backend.read(Path::new(expected)).await.unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_write_cover_records_absolute_path_for_local_storage() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(LocalBackend::new("local", dir.path()).unwrap());
        let covers = CoverFiles::new(backend, DEFAULT_COVERS_DIR);
        let path = covers.write_cover("book-1", &NormalizedBytes::from(PNG.to_vec())).await.unwrap();
        let expected = dir.path().join("covers").join("book-1.png");
        assert_eq!(Path::new(&path), expected);
        assert_eq!(std::fs::read(expected).unwrap(), PNG);
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let backend = Arc::new(MockBackend::default().fail_writes_to("covers/book-1.jpg"));
        let covers = CoverFiles::new(backend, DEFAULT_COVERS_DIR);
        let err = covers.write_cover("book-1", &NormalizedBytes::from(JPEG.to_vec())).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Io(_)));
    }

    #[tokio::test]
    async fn test_remove_cover() {
        let backend = Arc::new(MockBackend::with_files([("covers/book-1.jpg", JPEG), ("covers/other.jpg", JPEG)]));
        let covers = CoverFiles::new(backend.clone(), DEFAULT_COVERS_DIR);

        assert!(covers.remove_cover("book-1", "covers/book-1.jpg").await.unwrap());
        // Already gone.
        assert!(!covers.remove_cover("book-1", "covers/book-1.jpg").await.unwrap());
        // Named after a different book.
        assert!(!covers.remove_cover("book-1", "covers/other.jpg").await.unwrap());

        assert_eq!(backend.paths().await, vec![PathBuf::from("covers/other.jpg")]);
    }
}
