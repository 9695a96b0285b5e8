//! Container descriptor (`META-INF/container.xml`) resolution.

use crate::archive::ArchiveSession;
use crate::error::{ErrorKind, Result};
use crate::xml;
use exn::OptionExt;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::instrument;

/// The one entry every EPUB must have at a fixed location.
pub const CONTAINER_PATH: &str = "META-INF/container.xml";
/// Where the package document lives when the container doesn't say.
pub const DEFAULT_ROOTFILE: &str = "OEBPS/content.opf";

/// The resolved container descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDescriptor {
    /// Archive path of the package document.
    pub rootfile_path: String,
}

/// Locate and parse the container descriptor.
///
/// Missing or empty `full-path` attributes (and container files too broken to
/// parse) fall back to [`DEFAULT_ROOTFILE`] instead of failing: plenty of
/// real-world EPUBs get this wrong and still have a perfectly good package
/// document at the conventional location.
///
/// # Errors
/// [`MissingContainer`](ErrorKind::MissingContainer) if the entry is absent
/// or is a directory.
#[instrument(level = "debug", skip(session))]
pub fn resolve(session: &ArchiveSession<'_>) -> Result<ContainerDescriptor> {
    let entry = session
        .find(CONTAINER_PATH)
        .filter(|entry| !entry.is_directory)
        .ok_or_raise(|| ErrorKind::MissingContainer)?;
    let xml = session.read_text(entry)?;
    let rootfile_path = match first_rootfile(&xml) {
        Some(path) => path,
        None => {
            tracing::debug!(fallback = DEFAULT_ROOTFILE, "container has no usable rootfile");
            DEFAULT_ROOTFILE.to_string()
        },
    };
    Ok(ContainerDescriptor { rootfile_path })
}

/// `full-path` of the first `rootfile` element, if it has a non-empty one.
fn first_rootfile(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) if e.local_name().as_ref() == b"rootfile" => {
                return xml::attribute(e, b"full-path").filter(|path| !path.is_empty());
            },
            Ok(Event::Eof) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "malformed container descriptor");
                return None;
            },
            _ => {},
        }
        buf.clear();
    }
}
