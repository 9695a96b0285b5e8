use crate::covers::CoverWriter;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use nous_cache::Repository;
use tracing::instrument;

/// Remove a book from the library, along with its annotations, their
/// replies, and its cover file.
///
/// The EPUB itself is left alone. Returns `false` if there was no such book.
#[instrument(skip(repo, covers))]
pub async fn remove_book(repo: &Repository, covers: &dyn CoverWriter, id: &str) -> Result<bool> {
    let Some(book) = repo.get_book(id).await.or_raise(|| ErrorKind::Remove)? else {
        return Ok(false);
    };
    let removed = repo.delete_book(&book.id).await.or_raise(|| ErrorKind::Remove)?;
    if let Some(path) = book.cover.path()
        && let Err(err) = covers.remove_cover(&book.id, path).await
    {
        // The record is gone either way; a stray file is harmless.
        tracing::warn!(error = ?err, path, "could not remove cover file");
    }
    Ok(removed)
}
