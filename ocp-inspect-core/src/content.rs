//! Decoding of MachineConfig file payloads.
//!
//! Ignition file sources are RFC 2397 data URLs. MachineConfigs rendered by
//! the cluster use the plain form `data:,<percent-encoded text>`. Anything
//! else (`data:;base64,...`, gzip) passes through untouched.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

pub const DATA_PREFIX: &str = "data:,";

/// Bytes left unescaped by [`encode_content`]: RFC 3986 unreserved plus `/`.
const PAYLOAD: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Decodes a file source for display.
///
/// Strips a leading `data:,`, percent-decodes `%XX` escapes, and pretty-prints
/// the result when it is JSON (4-space indent, keys sorted). `+` is kept as is.
/// Never fails: malformed escapes and invalid UTF-8 degrade to literal text.
pub fn decode_content(raw: &str) -> String {
    let payload = raw.strip_prefix(DATA_PREFIX).unwrap_or(raw);
    let decoded = percent_decode_str(payload).decode_utf8_lossy();
    if decoded.is_empty() {
        return String::new();
    }

    match serde_json::from_str::<Value>(&decoded) {
        Ok(json) => pretty_json(json).unwrap_or_else(|| decoded.into_owned()),
        Err(_) => decoded.into_owned(),
    }
}

/// Inverse of [`decode_content`] for non-JSON text.
pub fn encode_content(text: &str) -> String {
    format!("{DATA_PREFIX}{}", utf8_percent_encode(text, PAYLOAD))
}

fn pretty_json(json: Value) -> Option<String> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    sort_keys(json).serialize(&mut serializer).ok()?;
    String::from_utf8(out).ok()
}

// serde_json's map only sorts when `preserve_order` is off; sort explicitly.
fn sort_keys(json: Value) -> Value {
    match json {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
