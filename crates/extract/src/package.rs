//! Package document (OPF) parsing.
//!
//! Only the handful of fields needed to put a book on the shelf are
//! extracted: the first title, creator and description, the manifest, and
//! the legacy `<meta name="cover">` pointer. Anything absent or unparseable
//! degrades to a default rather than an error.

use crate::archive::ArchiveSession;
use crate::container::ContainerDescriptor;
use crate::error::{ErrorKind, Result};
use crate::xml;
use exn::OptionExt;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::BTreeSet;
use tracing::instrument;

/// Title used when the package document doesn't declare one.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// One resource declared in the package manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    /// Percent-encoded, relative to the package document's directory.
    pub href: String,
    /// Space-separated `properties` flags (e.g. `cover-image`, `nav`).
    pub properties: BTreeSet<String>,
}

/// The parsed package document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDocument {
    /// Archive path the document was read from.
    pub path: String,
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    /// Manifest items, in document order.
    pub manifest: Vec<ManifestItem>,
    /// `content` of the first `<meta name="cover">`, if it had one.
    pub cover_meta: Option<String>,
}

impl PackageDocument {
    /// First manifest item with exactly this id.
    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }
}

/// Read and parse the package document named by the container.
///
/// # Errors
/// [`MissingPackageDocument`](ErrorKind::MissingPackageDocument) if no such
/// entry exists (or it's a directory).
#[instrument(level = "debug", skip(session))]
pub fn read(session: &ArchiveSession<'_>, container: &ContainerDescriptor) -> Result<PackageDocument> {
    let path = &container.rootfile_path;
    let entry = session
        .find(path)
        .filter(|entry| !entry.is_directory)
        .ok_or_raise(|| ErrorKind::MissingPackageDocument(path.clone()))?;
    let xml = session.read_text(entry)?;
    Ok(parse(path, &xml))
}

#[derive(Clone, Copy)]
enum Field {
    Title,
    Author,
    Description,
}
impl Field {
    fn from_tag(name: &[u8]) -> Option<Self> {
        match name {
            b"dc:title" => Some(Self::Title),
            b"dc:creator" => Some(Self::Author),
            b"dc:description" => Some(Self::Description),
            _ => None,
        }
    }
}

/// Text content of the element currently being captured.
struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

/// Only the *first* element of each kind counts, even if its text turns out
/// to be empty; `Some(None)` records "seen, but blank".
#[derive(Default)]
struct Fields {
    title: Option<Option<String>>,
    author: Option<Option<String>>,
    description: Option<Option<String>>,
}
impl Fields {
    fn slot(&mut self, field: Field) -> &mut Option<Option<String>> {
        match field {
            Field::Title => &mut self.title,
            Field::Author => &mut self.author,
            Field::Description => &mut self.description,
        }
    }
}

/// Parse package document XML. Never fails: a malformed document yields
/// whatever was read before the parser gave up.
pub fn parse(path: &str, xml: &str) -> PackageDocument {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut fields = Fields::default();
    let mut capture: Option<Capture> = None;
    let mut manifest = Vec::new();
    let mut cover_meta: Option<Option<String>> = None;

    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(path, error = %e, "malformed package document; using what was parsed so far");
                break;
            },
        };
        match event {
            Event::Start(ref e) => {
                if let Some(capture) = capture.as_mut() {
                    capture.depth += 1;
                } else if let Some(field) = Field::from_tag(e.name().as_ref())
                    && fields.slot(field).is_none()
                {
                    capture = Some(Capture { field, depth: 0, text: String::new() });
                }
                visit(e, &mut manifest, &mut cover_meta);
            },
            Event::Empty(ref e) => {
                if capture.is_none()
                    && let Some(field) = Field::from_tag(e.name().as_ref())
                    && fields.slot(field).is_none()
                {
                    *fields.slot(field) = Some(None);
                }
                visit(e, &mut manifest, &mut cover_meta);
            },
            Event::End(_) => {
                if let Some(current) = capture.as_mut() {
                    match current.depth {
                        0 => {
                            if let Some(done) = capture.take() {
                                let text = done.text.trim();
                                *fields.slot(done.field) = Some((!text.is_empty()).then(|| text.to_string()));
                            }
                        },
                        _ => current.depth -= 1,
                    }
                }
            },
            Event::Text(ref t) => {
                if let Some(capture) = capture.as_mut() {
                    capture.text.push_str(&xml::decode(t.as_ref()));
                }
            },
            Event::CData(ref t) => {
                if let Some(capture) = capture.as_mut() {
                    capture.text.push_str(&String::from_utf8_lossy(t.as_ref()));
                }
            },
            Event::GeneralRef(ref r) => {
                if let Some(capture) = capture.as_mut() {
                    capture.text.push_str(&xml::entity(r.as_ref()));
                }
            },
            Event::Eof => break,
            _ => {},
        }
        buf.clear();
    }

    PackageDocument {
        path: path.to_string(),
        title: fields.title.flatten().unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        author: fields.author.flatten(),
        description: fields.description.flatten(),
        manifest,
        cover_meta: cover_meta.flatten(),
    }
}

/// Collect manifest items and the first cover `meta` from any element.
fn visit(element: &BytesStart<'_>, manifest: &mut Vec<ManifestItem>, cover_meta: &mut Option<Option<String>>) {
    match element.local_name().as_ref() {
        b"item" => manifest.push(ManifestItem {
            id: xml::attribute(element, b"id").unwrap_or_default(),
            href: xml::attribute(element, b"href").unwrap_or_default(),
            properties: xml::attribute(element, b"properties")
                .map(|p| p.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        }),
        b"meta" if cover_meta.is_none() && xml::attribute(element, b"name").as_deref() == Some("cover") => {
            *cover_meta = Some(xml::attribute(element, b"content").filter(|id| !id.is_empty()));
        },
        _ => {},
    }
}
