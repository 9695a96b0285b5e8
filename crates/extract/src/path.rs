//! Resolution of manifest hrefs against the package document's location.

/// Resolve a (percent-encoded, relative) manifest `href` into an archive
/// entry name.
///
/// The href is joined onto the package document's directory, then `.`
/// segments are dropped and `..` segments pop their parent. A `..` at the
/// archive root is simply ignored, so the result can never escape the
/// archive. Empty segments (from doubled slashes) are kept as-is.
pub fn resolve(package_path: &str, href: &str) -> String {
    let decoded = match urlencoding::decode(href) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => href.to_string(),
    };
    let directory = match package_path.rfind('/') {
        Some(index) => &package_path[..=index],
        None => "",
    };
    let joined = format!("{directory}{decoded}");
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "." => {},
            ".." => {
                segments.pop();
            },
            other => segments.push(other),
        }
    }
    segments.join("/")
}
