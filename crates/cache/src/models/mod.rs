mod annotation;
mod book;
mod reply;

pub use self::annotation::{Annotation, NewAnnotation};
pub(crate) use self::annotation::AnnotationRow;
pub use self::book::{Book, BookMetadata, CoverStorage, NewBook};
pub(crate) use self::book::{BookRow, CoverBlobRow};
pub use self::reply::{NewReply, Reply, Role};
pub(crate) use self::reply::ReplyRow;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use time::UtcDateTime;

/// Timestamps are stored as whole seconds since the Unix epoch.
pub(crate) fn now() -> UtcDateTime {
    let now = UtcDateTime::now();
    now.replace_nanosecond(0).unwrap_or(now)
}

pub(crate) fn timestamp(seconds: i64, field: &'static str) -> Result<UtcDateTime> {
    UtcDateTime::from_unix_timestamp(seconds).or_raise(|| ErrorKind::InvalidData(field))
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Trim, treating whitespace-only text as absent.
pub(crate) fn trimmed(text: Option<&str>) -> Option<String> {
    text.map(str::trim).filter(|text| !text.is_empty()).map(str::to_string)
}
