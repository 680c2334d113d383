//! Submission Normalizer
//!
//! The front end ships source as `btoa(encodeURIComponent(source))` so that
//! non-ASCII code survives the trip. Decoding inverts that exactly:
//! base64 → percent-decode → UTF-8.

use crate::error::DecodeError;
use base64::{engine::general_purpose, Engine as _};
use percent_encoding::{percent_decode, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Bytes `encodeURIComponent` leaves unescaped
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Decode a submitted code payload into raw source text
pub fn decode(code: &str) -> Result<String, DecodeError> {
    // Tolerate line-wrapped base64
    let compact: String = code.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let escaped = general_purpose::STANDARD.decode(compact.as_bytes())?;
    let source = percent_decode(&escaped).decode_utf8()?;
    Ok(source.into_owned())
}

/// Encode source the way the front end does
pub fn encode(source: &str) -> String {
    let escaped = utf8_percent_encode(source, URI_COMPONENT).to_string();
    general_purpose::STANDARD.encode(escaped)
}

/// Decode only when the caller says the payload is encoded
pub fn normalize(code: &str, base64_encoded: bool) -> Result<String, DecodeError> {
    if base64_encoded {
        decode(code)
    } else {
        Ok(code.to_string())
    }
}
