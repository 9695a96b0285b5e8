use crate::covers::CoverWriter;
use crate::migrate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use nous_cache::Repository;
use nous_extract::NormalizedBytes;
use tracing::instrument;

/// Migrate the cover of a single book, returning the recorded path.
#[instrument(skip(repo, covers))]
pub(super) async fn migrate_record(repo: &Repository, covers: &dyn CoverWriter, id: &str) -> Result<String> {
    let decode_failure = || ErrorKind::BlobDecodeFailure(id.to_string());

    let value = repo.get_cover_blob(id).await.or_raise(|| ErrorKind::Cache)?;
    let value = value.ok_or_raise(decode_failure)?;
    let bytes = nous_cache::blob::to_bytes(&value).or_raise(decode_failure)?;
    if bytes.is_empty() {
        exn::bail!(decode_failure());
    }
    let cover = NormalizedBytes::from(bytes);
    tracing::debug!(size = cover.bytes.len(), mime = %cover.mime, "decoded inline cover");

    let path = covers.write_cover(id, &cover).await.or_raise(|| ErrorKind::FileWriteFailure(id.to_string()))?;
    if !repo.set_cover_path(id, &path).await.or_raise(|| ErrorKind::Cache)? {
        tracing::debug!("cover path was recorded elsewhere in the meantime");
    }
    Ok(path)
}
