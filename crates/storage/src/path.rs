//! Storage path validation.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validate and normalise a path relative to a storage root.
///
/// `.` components, repeated separators and trailing slashes are dropped, and
/// `..` is resolved as long as it never climbs above the root. Absolute paths
/// are treated as relative to the root. Null bytes, Windows path prefixes and
/// paths that normalise to nothing are rejected.
///
/// # Errors
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath) for anything that
/// can't be safely joined onto a storage root.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use nous_storage::validate_path;
/// assert!(validate_path("covers/3f2a.jpg").is_ok());
/// assert!(validate_path("covers/../3f2a.jpg").is_ok());
/// assert!(validate_path("../3f2a.jpg").is_err());
/// assert!(validate_path("covers/\0.jpg").is_err());
/// assert_eq!(validate_path("covers//./3f2a.jpg").unwrap(), Path::new("covers/3f2a.jpg"));
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(path.to_path_buf());
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => {
                // Null bytes survive `Path::components()` on Unix but truncate
                // paths in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(invalid());
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(invalid()),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(invalid()),
        false => Ok(components.into_iter().collect()),
    }
}
