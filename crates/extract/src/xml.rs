//! Small helpers over `quick-xml` shared by the container and package
//! document parsers.

use quick_xml::escape::unescape;
use quick_xml::events::BytesStart;

/// Returns the (unescaped) value of the first attribute with the given key.
///
/// Attributes that fail to parse are skipped rather than failing the whole
/// element; a broken attribute somewhere else shouldn't hide the one we want.
pub(crate) fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| decode(&attr.value))
}

/// Decode raw bytes into text, resolving any predefined entities or
/// character references. Unknown entities are kept verbatim.
pub(crate) fn decode(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    match unescape(&text) {
        Ok(unescaped) => unescaped.into_owned(),
        Err(_) => text.into_owned(),
    }
}

/// Resolve the name of a general entity reference (`amp`, `#233`, `#x2014`).
pub(crate) fn entity(name: &[u8]) -> String {
    decode(format!("&{};", String::from_utf8_lossy(name)).as_bytes())
}
