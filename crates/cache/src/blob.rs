//! Recovery of canonical bytes from legacy cover values.
//!
//! Before covers were written to disk they were stored inline, and depending
//! on which release (and which SQLite binding) wrote them, the "bytes" may
//! have come back as a real blob, a JSON-ish structure, or one of several
//! text encodings. [`normalize`] tries a fixed list of strategies and returns
//! the first that succeeds.
//!
//! The order matters: a string like `deadbeef` is both valid base64 and valid
//! hex, and is decoded as base64 because that strategy comes first.

use crate::error::{ErrorKind, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use derive_more::Display;
use exn::OptionExt;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static HEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]+$").unwrap());

/// Largest buffer an index-keyed object may expand to (64 MiB).
pub const MAX_INDEXED_LEN: usize = 64 * 1024 * 1024;

/// A cover value exactly as it was persisted, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistedValue {
    Bytes(Vec<u8>),
    Text(String),
    /// Structured values: arrays, objects, numbers.
    Json(Value),
}

impl PersistedValue {
    /// Interpret a text column. SQLite has no structured type, so objects
    /// (`{"0": 255, ...}` or `{"type": "Buffer", "data": [...]}`) were stored
    /// as their JSON text; those are lifted back into [`Json`](Self::Json).
    /// Arrays stay text and go through the JSON array text strategy.
    pub fn from_stored_text(text: String) -> Self {
        if text.trim_start().starts_with('{')
            && let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text)
        {
            return Self::Json(Value::Object(map));
        }
        Self::Text(text)
    }
}

impl From<Vec<u8>> for PersistedValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}
impl From<String> for PersistedValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}
impl From<&str> for PersistedValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}
impl From<Value> for PersistedValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            other => Self::Json(other),
        }
    }
}

/// Which strategy recovered the bytes.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    #[display("native bytes")]
    NativeBytes,
    /// `{"type": "Buffer", "data": [...]}`
    #[display("buffer object")]
    BufferObject,
    #[display("integer array")]
    IntegerArray,
    #[display("JSON array text")]
    JsonArrayText,
    #[display("base64 text")]
    Base64Text,
    #[display("hex text")]
    HexText,
    /// `{"0": 137, "1": 80, ...}`
    #[display("indexed object")]
    IndexedObject,
}

struct Strategy {
    encoding: Encoding,
    accepts: fn(&PersistedValue) -> bool,
    decode: fn(&PersistedValue) -> Option<Vec<u8>>,
}

const STRATEGIES: [Strategy; 7] = [
    Strategy {
        encoding: Encoding::NativeBytes,
        accepts: |value| matches!(value, PersistedValue::Bytes(_)),
        decode: native_bytes,
    },
    Strategy {
        encoding: Encoding::BufferObject,
        accepts: |value| matches!(value, PersistedValue::Json(Value::Object(map)) if is_buffer(map)),
        decode: buffer_object,
    },
    Strategy {
        encoding: Encoding::IntegerArray,
        accepts: |value| matches!(value, PersistedValue::Json(Value::Array(_))),
        decode: integer_array,
    },
    Strategy {
        encoding: Encoding::JsonArrayText,
        accepts: |value| {
            matches!(value, PersistedValue::Text(text) if text.trim_start().starts_with('[') && text.trim_end().ends_with(']'))
        },
        decode: json_array_text,
    },
    Strategy {
        encoding: Encoding::Base64Text,
        accepts: |value| matches!(value, PersistedValue::Text(text) if !text.is_empty()),
        decode: base64_text,
    },
    Strategy {
        encoding: Encoding::HexText,
        accepts: |value| matches!(value, PersistedValue::Text(text) if text.len() % 2 == 0 && HEX.is_match(text)),
        decode: hex_text,
    },
    Strategy {
        encoding: Encoding::IndexedObject,
        accepts: |value| {
            matches!(value, PersistedValue::Json(Value::Object(map))
                if !map.is_empty() && map.keys().all(|key| !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())))
        },
        decode: indexed_object,
    },
];

fn is_buffer(map: &Map<String, Value>) -> bool {
    map.get("type").and_then(Value::as_str) == Some("Buffer") && map.get("data").is_some_and(Value::is_array)
}

/// Every element must be an integer in `0..=255`.
fn integer_bytes(items: &[Value]) -> Option<Vec<u8>> {
    items.iter().map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok())).collect()
}

fn native_bytes(value: &PersistedValue) -> Option<Vec<u8>> {
    match value {
        PersistedValue::Bytes(bytes) => Some(bytes.clone()),
        _ => None,
    }
}

fn buffer_object(value: &PersistedValue) -> Option<Vec<u8>> {
    match value {
        PersistedValue::Json(Value::Object(map)) => map.get("data").and_then(Value::as_array).and_then(|data| integer_bytes(data)),
        _ => None,
    }
}

fn integer_array(value: &PersistedValue) -> Option<Vec<u8>> {
    match value {
        PersistedValue::Json(Value::Array(items)) => integer_bytes(items),
        _ => None,
    }
}

fn json_array_text(value: &PersistedValue) -> Option<Vec<u8>> {
    match value {
        PersistedValue::Text(text) => serde_json::from_str::<Vec<Value>>(text).ok().and_then(|items| integer_bytes(&items)),
        _ => None,
    }
}

fn base64_text(value: &PersistedValue) -> Option<Vec<u8>> {
    match value {
        PersistedValue::Text(text) => STANDARD.decode(text).ok(),
        _ => None,
    }
}

fn hex_text(value: &PersistedValue) -> Option<Vec<u8>> {
    match value {
        PersistedValue::Text(text) => (0..text.len())
            .step_by(2)
            .map(|i| text.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
            .collect(),
        _ => None,
    }
}

fn indexed_object(value: &PersistedValue) -> Option<Vec<u8>> {
    let PersistedValue::Json(Value::Object(map)) = value else {
        return None;
    };
    let mut entries = Vec::with_capacity(map.len());
    for (key, value) in map {
        let index: usize = key.parse().ok()?;
        let byte = value.as_u64().and_then(|n| u8::try_from(n).ok())?;
        entries.push((index, byte));
    }
    let len = entries.iter().map(|(index, _)| *index).max()?.checked_add(1)?;
    if len > MAX_INDEXED_LEN {
        return None;
    }
    let mut bytes = vec![0; len];
    for (index, byte) in entries {
        bytes[index] = byte;
    }
    Some(bytes)
}

/// Recover bytes from a persisted value, along with the strategy that worked.
pub fn decode(value: &PersistedValue) -> Option<(Encoding, Vec<u8>)> {
    let decoded = STRATEGIES
        .iter()
        .filter(|strategy| (strategy.accepts)(value))
        .find_map(|strategy| (strategy.decode)(value).map(|bytes| (strategy.encoding, bytes)));
    if let Some((encoding, bytes)) = &decoded {
        tracing::trace!(%encoding, size = bytes.len(), "decoded persisted value");
    }
    decoded
}

/// Which strategy would recover bytes from this value, if any.
pub fn detect(value: &PersistedValue) -> Option<Encoding> {
    decode(value).map(|(encoding, _)| encoding)
}

/// Recover the canonical bytes of a persisted value, if any strategy can.
pub fn normalize(value: &PersistedValue) -> Option<Vec<u8>> {
    decode(value).map(|(_, bytes)| bytes)
}

/// Like [`normalize`], but failure is an error.
///
/// # Errors
/// [`BlobDecodeFailure`](ErrorKind::BlobDecodeFailure) when no strategy
/// applies.
pub fn to_bytes(value: &PersistedValue) -> Result<Vec<u8>> {
    normalize(value).ok_or_raise(|| ErrorKind::BlobDecodeFailure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    const SAMPLE: &[u8] = &[0, 1, 2, 253, 254, 255];

    #[rstest]
    #[case::native(PersistedValue::Bytes(SAMPLE.to_vec()), Encoding::NativeBytes)]
    #[case::buffer(json!({"type": "Buffer", "data": [0, 1, 2, 253, 254, 255]}).into(), Encoding::BufferObject)]
    #[case::integer_array(json!([0, 1, 2, 253, 254, 255]).into(), Encoding::IntegerArray)]
    #[case::json_array_text("[0, 1, 2, 253, 254, 255]".into(), Encoding::JsonArrayText)]
    #[case::base64("AAEC/f7/".into(), Encoding::Base64Text)]
    #[case::hex("000102fdfeff".into(), Encoding::HexText)]
    #[case::indexed(json!({"0": 0, "1": 1, "2": 2, "3": 253, "4": 254, "5": 255}).into(), Encoding::IndexedObject)]
    fn test_each_strategy(#[case] value: PersistedValue, #[case] expected: Encoding) {
        let (encoding, bytes) = decode(&value).unwrap();
        assert_eq!(encoding, expected);
        assert_eq!(bytes, SAMPLE);
    }

    #[test]
    fn test_base64_takes_precedence_over_hex() {
        // Valid in both alphabets: base64 is tried first.
        let value = PersistedValue::from("deadbeef");
        assert_eq!(detect(&value), Some(Encoding::Base64Text));
        assert_eq!(normalize(&value).unwrap(), vec![117, 230, 157, 109, 231, 159]);
        // Not a multiple of four, so only hex can make sense of it.
        let value = PersistedValue::from("abc123");
        assert_eq!(detect(&value), Some(Encoding::HexText));
        assert_eq!(normalize(&value).unwrap(), vec![0xAB, 0xC1, 0x23]);
    }

    #[rstest]
    #[case::single_byte(vec![0xFF])]
    #[case::two_bytes(vec![0x00, 0xFF])]
    #[case::odd_length(vec![1, 2, 3])]
    #[case::jpeg_magic(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00])]
    #[case::all_values((0..=255).collect())]
    #[case::all_values_reversed((0..=255).rev().collect())]
    fn test_text_round_trips(#[case] bytes: Vec<u8>) {
        let array = serde_json::to_string(&bytes).unwrap();
        assert_eq!(decode(&PersistedValue::Text(array)), Some((Encoding::JsonArrayText, bytes.clone())));
        let base64 = STANDARD.encode(&bytes);
        assert_eq!(decode(&PersistedValue::Text(base64)), Some((Encoding::Base64Text, bytes)));
    }

    #[test]
    fn test_empty_sequence() {
        // `[]` is a perfectly good (empty) array, but empty text is not base64.
        assert_eq!(decode(&PersistedValue::from("[]")), Some((Encoding::JsonArrayText, Vec::new())));
        assert_eq!(STANDARD.encode(b""), "");
        assert_eq!(normalize(&PersistedValue::from("")), None);
    }

    #[rstest]
    #[case::indexed(r#"{"0":255,"1":216,"2":255,"3":224}"#, Encoding::IndexedObject)]
    #[case::buffer(r#"{"type":"Buffer","data":[255,216,255,224]}"#, Encoding::BufferObject)]
    #[case::padded(r#"  {"1":216,"0":255,"3":224,"2":255}"#, Encoding::IndexedObject)]
    fn test_stored_object_text(#[case] text: &str, #[case] expected: Encoding) {
        let value = PersistedValue::from_stored_text(text.to_string());
        assert!(matches!(value, PersistedValue::Json(Value::Object(_))));
        assert_eq!(decode(&value), Some((expected, vec![0xFF, 0xD8, 0xFF, 0xE0])));
    }

    #[rstest]
    #[case::array("[255,216]")]
    #[case::base64("/9j/4A==")]
    #[case::broken_object("{\"0\": 1")]
    fn test_other_stored_text_stays_text(#[case] text: &str) {
        assert_eq!(PersistedValue::from_stored_text(text.to_string()), PersistedValue::Text(text.to_string()));
    }

    #[test]
    fn test_sparse_indexed_object_zero_fills() {
        let value = PersistedValue::from(json!({"4": 9, "0": 1, "2": 3}));
        assert_eq!(normalize(&value).unwrap(), vec![1, 0, 3, 0, 9]);
    }

    #[rstest]
    #[case::empty_text("".into())]
    #[case::odd_hex("abc".into())]
    #[case::not_an_encoding("definitely not bytes!".into())]
    #[case::whitespace_in_base64("aGVs bG8=".into())]
    // Stricter than a typed-array conversion, which would wrap these modulo
    // 256 (or truncate the fraction) and silently produce a different image.
    #[case::out_of_range(json!([1, 256]).into())]
    #[case::negative(json!([-1]).into())]
    #[case::float(json!([1.5]).into())]
    #[case::array_text_out_of_range("[1, 999]".into())]
    #[case::array_text_broken("[1, 2".into())]
    #[case::number(json!(42).into())]
    #[case::non_digit_key(json!({"0": 1, "x": 2}).into())]
    #[case::empty_object(json!({}).into())]
    #[case::too_sparse(json!({"999999999": 1}).into())]
    #[case::null(json!(null).into())]
    fn test_undecodable(#[case] value: PersistedValue) {
        assert_eq!(normalize(&value), None);
        assert_eq!(*to_bytes(&value).unwrap_err(), ErrorKind::BlobDecodeFailure);
    }

    #[test]
    fn test_json_string_becomes_text() {
        assert_eq!(PersistedValue::from(json!("aGVsbG8=")), PersistedValue::Text("aGVsbG8=".to_string()));
        assert_eq!(to_bytes(&json!("aGVsbG8=").into()).unwrap(), b"hello");
    }

    #[test]
    fn test_empty_native_bytes_pass_through() {
        assert_eq!(normalize(&PersistedValue::Bytes(Vec::new())), Some(Vec::new()));
    }
}
