//! Cover image discovery.
//!
//! There's no single way EPUBs declare their cover, so three strategies are
//! tried in order of how explicit they are:
//!
//! 1. [`MetaPointer`](CoverStrategy::MetaPointer): EPUB 2's
//!    `<meta name="cover" content="{id}">`, pointing at a manifest item.
//! 2. [`PropertyFlag`](CoverStrategy::PropertyFlag): EPUB 3's
//!    `properties="cover-image"` on a manifest item.
//! 3. [`IdHeuristic`](CoverStrategy::IdHeuristic): a manifest item that is
//!    simply *called* `cover` (or failing that, `cover-image`).

use crate::archive::ArchiveSession;
use crate::package::{ManifestItem, PackageDocument};
use derive_more::Display;
use tracing::instrument;

/// How a cover reference was found.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum CoverStrategy {
    #[display("meta-pointer")]
    MetaPointer,
    #[display("property-flag")]
    PropertyFlag,
    #[display("id-heuristic")]
    IdHeuristic,
}

/// The manifest href chosen as the cover, still relative to the package
/// document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverReference {
    pub href: String,
    pub strategy: CoverStrategy,
}

/// Pick the cover image from a package document, if it declares one.
///
/// The first strategy that finds a candidate decides: a meta pointer naming a
/// missing item, or a flagged item with an empty href, means no cover rather
/// than a fallback to the weaker strategies.
pub fn locate(package: &PackageDocument) -> Option<CoverReference> {
    let (item, strategy) = match candidate(package) {
        Some((Some(item), strategy)) if !item.href.is_empty() => (item, strategy),
        Some((_, strategy)) => {
            tracing::debug!(%strategy, "declared cover does not resolve to an href");
            return None;
        },
        None => {
            tracing::debug!("package declares no cover");
            return None;
        },
    };
    tracing::debug!(id = %item.id, href = %item.href, %strategy, "located cover");
    Some(CoverReference { href: item.href.clone(), strategy })
}

/// The item the first applicable strategy settles on, `None` inside when the
/// strategy applies but names nothing.
fn candidate(package: &PackageDocument) -> Option<(Option<&ManifestItem>, CoverStrategy)> {
    if let Some(id) = package.cover_meta.as_deref() {
        return Some((package.item(id), CoverStrategy::MetaPointer));
    }
    if let Some(item) = package.manifest.iter().find(|item| item.properties.contains("cover-image")) {
        return Some((Some(item), CoverStrategy::PropertyFlag));
    }
    package
        .item("cover")
        .or_else(|| package.item("cover-image"))
        .map(|item| (Some(item), CoverStrategy::IdHeuristic))
}

/// Read the bytes of a resolved cover entry.
///
/// Returns `None` if the entry doesn't exist, is a directory, or can't be
/// read: a broken cover is not worth failing the import over.
#[instrument(level = "debug", skip(session))]
pub fn read(session: &ArchiveSession<'_>, path: &str) -> Option<Vec<u8>> {
    let Some(entry) = session.find(path).filter(|entry| !entry.is_directory) else {
        tracing::debug!("cover entry not present in archive");
        return None;
    };
    match session.read_bytes(entry) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!(error = %e, "unable to read cover entry");
            None
        },
    }
}
