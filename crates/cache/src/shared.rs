//! The process-wide database handle.

use crate::Database;
use crate::error::Result;
use std::path::Path;
use tokio::sync::OnceCell;

static SHARED: OnceCell<Database> = OnceCell::const_new();

/// The process-wide [`Database`], connecting on first use.
///
/// Concurrent first calls wait on a single connection attempt rather than
/// racing to open their own. If that attempt fails nothing is cached and the
/// next call tries again. Once connected, `path` is ignored by later calls.
pub async fn shared(path: impl AsRef<Path>) -> Result<&'static Database> {
    let path = path.as_ref();
    SHARED
        .get_or_try_init(|| async {
            tracing::debug!(path = %path.display(), "opening shared database");
            Database::connect(path).await
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test: the cell is shared by the whole test binary.
    #[tokio::test]
    async fn test_shared_retries_then_caches() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does/not/exist/nous.db");
        assert!(shared(&missing).await.is_err());

        let path = dir.path().join("nous.db");
        let first = shared(&path).await.unwrap();
        let second = shared(dir.path().join("other.db")).await.unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(!dir.path().join("other.db").exists());
    }
}
