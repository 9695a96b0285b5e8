//! EPUB metadata and cover extraction.
//!
//! The pipeline is entirely synchronous: callers read the archive into
//! memory first and hand over the bytes.
//!
//! ```text
//! bytes → archive → container → package → cover → path → cover bytes
//! ```

pub mod archive;
pub mod container;
pub mod cover;
pub mod error;
pub mod mime;
pub mod package;
pub mod path;
mod xml;

use tracing::instrument;

use crate::archive::ArchiveSession;
use crate::error::Result;
pub use crate::mime::{ImageMime, NormalizedBytes, sniff};
pub use crate::package::UNKNOWN_TITLE;

/// Everything the library needs from an EPUB to shelve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    /// Raw cover image bytes, unvalidated.
    pub cover: Option<Vec<u8>>,
}

/// Easy, top-level entrypoint for extracting [`PackageMetadata`] from the
/// raw bytes of an EPUB.
///
/// Only structural problems (unreadable archive, missing container, missing
/// package document) are errors; missing metadata fields and covers are
/// defaulted. The archive session is released on every return path.
#[instrument(skip(bytes), fields(archive_size = bytes.as_ref().len()))]
pub fn extract(bytes: impl AsRef<[u8]>) -> Result<PackageMetadata> {
    let session = ArchiveSession::open(bytes.as_ref())?;
    let container = container::resolve(&session)?;
    let package = package::read(&session, &container)?;
    let cover = cover::locate(&package)
        .map(|reference| path::resolve(&package.path, &reference.href))
        .and_then(|path| cover::read(&session, &path));
    Ok(PackageMetadata {
        title: package.title,
        author: package.author,
        description: package.description,
        cover,
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    /// Build an in-memory ZIP. Names ending in `/` become directories.
    pub fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    /// Wrap metadata and manifest children in a minimal OPF package.
    pub fn package_document(metadata: &str, manifest: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <package xmlns="http://www.idpf.org/2007/opf" version="3.0">
                <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
                    {metadata}
                </metadata>
                <manifest>{manifest}</manifest>
            </package>"#
        )
    }
}
