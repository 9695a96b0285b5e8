//! Image type detection from leading magic bytes.

use derive_more::Display;

/// Image formats recognised by [`sniff`].
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageMime {
    #[display("image/jpeg")]
    Jpeg,
    #[display("image/png")]
    Png,
    #[display("image/gif")]
    Gif,
    #[display("image/bmp")]
    Bmp,
    #[display("image/webp")]
    Webp,
}

impl ImageMime {
    /// Conventional file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Webp => "webp",
        }
    }
}

/// Identify an image from its signature, or `None` when nothing matches
/// (including inputs shorter than four bytes).
pub fn sniff_strict(bytes: &[u8]) -> Option<ImageMime> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some(ImageMime::Jpeg),
        [0x89, b'P', b'N', b'G', ..] => Some(ImageMime::Png),
        [b'G', b'I', b'F', b'8', ..] => Some(ImageMime::Gif),
        [b'B', b'M', ..] => Some(ImageMime::Bmp),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(ImageMime::Webp),
        _ => None,
    }
}

/// Identify an image from its signature, assuming JPEG when unsure.
pub fn sniff(bytes: &[u8]) -> ImageMime {
    sniff_strict(bytes).unwrap_or(ImageMime::Jpeg)
}

/// Canonical image bytes along with their detected type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedBytes {
    pub bytes: Vec<u8>,
    pub mime: ImageMime,
}

impl From<Vec<u8>> for NormalizedBytes {
    fn from(bytes: Vec<u8>) -> Self {
        let mime = sniff(&bytes);
        Self { bytes, mime }
    }
}
