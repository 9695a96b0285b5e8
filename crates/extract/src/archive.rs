//! Random-access view over the ZIP container of an EPUB.
//!
//! An [`ArchiveSession`] borrows the raw archive bytes for its whole lifetime
//! and owns the listing of its entries. Entries are handed out by reference,
//! so the borrow checker guarantees none of them outlive the session they
//! were listed from; dropping the session is the only release required,
//! whichever way the caller exits.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// A single file (or directory) inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Full archive path, always `/`-separated (e.g. `OEBPS/content.opf`).
    pub name: String,
    pub is_directory: bool,
    index: usize,
}

/// An open archive.
pub struct ArchiveSession<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    entries: Vec<ArchiveEntry>,
}

impl<'a> ArchiveSession<'a> {
    /// Open a byte buffer as a ZIP archive and list its entries.
    ///
    /// # Errors
    /// [`ArchiveCorrupt`](ErrorKind::ArchiveCorrupt) when the central
    /// directory cannot be read.
    pub fn open(bytes: &'a [u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).or_raise(|| ErrorKind::ArchiveCorrupt)?;
        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            // Raw access only reads the local header; nothing is inflated
            // until somebody actually asks for the entry's contents.
            let file = archive.by_index_raw(index).or_raise(|| ErrorKind::ArchiveCorrupt)?;
            entries.push(ArchiveEntry {
                name: file.name().to_string(),
                is_directory: file.is_dir(),
                index,
            });
        }
        tracing::trace!(entries = entries.len(), "opened archive session");
        Ok(Self { archive, entries })
    }

    /// All entries, in central directory order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Find the first entry whose name matches exactly.
    pub fn find(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Read (and inflate) the raw contents of an entry.
    pub fn read_bytes(&self, entry: &ArchiveEntry) -> Result<Vec<u8>> {
        // Cloning shares the parsed central directory and only copies the
        // cursor, which lets reads happen through a shared reference.
        let mut archive = self.archive.clone();
        let mut file = archive.by_index(entry.index).or_raise(|| ErrorKind::ArchiveCorrupt)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer).or_raise(|| ErrorKind::ArchiveCorrupt)?;
        Ok(buffer)
    }

    /// Read an entry as UTF-8 text, replacing invalid sequences and stripping
    /// a leading byte order mark.
    pub fn read_text(&self, entry: &ArchiveEntry) -> Result<String> {
        let bytes = self.read_bytes(entry)?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(text.strip_prefix('\u{feff}').unwrap_or(&text).to_string())
    }
}

impl Drop for ArchiveSession<'_> {
    fn drop(&mut self) {
        tracing::trace!(entries = self.entries.len(), "closed archive session");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::build_archive;

    #[test]
    fn test_lists_entries_in_order() {
        let bytes = build_archive(&[("mimetype", b"application/epub+zip"), ("META-INF/", b""), ("a/b.txt", b"b")]);
        let session = ArchiveSession::open(&bytes).unwrap();
        let names: Vec<_> = session.entries().iter().map(|e| (e.name.as_str(), e.is_directory)).collect();
        assert_eq!(names, vec![("mimetype", false), ("META-INF/", true), ("a/b.txt", false)]);
    }

    #[test]
    fn test_read_bytes_and_text() {
        let bytes = build_archive(&[("one.bin", &[0xFF, 0x00, 0x10]), ("two.txt", "\u{feff}héllo".as_bytes())]);
        let session = ArchiveSession::open(&bytes).unwrap();
        let one = session.find("one.bin").unwrap();
        assert_eq!(session.read_bytes(one).unwrap(), vec![0xFF, 0x00, 0x10]);
        let two = session.find("two.txt").unwrap();
        assert_eq!(session.read_text(two).unwrap(), "héllo");
    }

    #[test]
    fn test_find_is_exact() {
        let bytes = build_archive(&[("OEBPS/Cover.jpg", b"x")]);
        let session = ArchiveSession::open(&bytes).unwrap();
        assert!(session.find("OEBPS/Cover.jpg").is_some());
        assert!(session.find("oebps/cover.jpg").is_none());
        assert!(session.find("Cover.jpg").is_none());
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let result = ArchiveSession::open(b"definitely not a zip file");
        let err = result.err().unwrap();
        assert_eq!(*err, ErrorKind::ArchiveCorrupt);
        assert!(ArchiveSession::open(&[]).is_err());
    }
}
