//! Big5 <-> UTF-8 conversion
//!
//! The remote side of a traditional-Chinese MUD speaks Big5; everything
//! inside this program is UTF-8. Conversion is best-effort: a failed
//! conversion falls back to passing the input through rather than killing
//! the session, and the result is tagged so callers can tell the two
//! apart.

use encoding_rs::BIG5;

/// Result of decoding inbound bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Bytes converted cleanly from Big5.
    Clean(String),
    /// Conversion failed; bytes reinterpreted as single-byte (Latin-1) text.
    Raw(String),
}

impl Decoded {
    /// The decoded text, regardless of how it was obtained.
    pub fn text(&self) -> &str {
        match self {
            Decoded::Clean(s) | Decoded::Raw(s) => s,
        }
    }

}

/// Result of encoding an outbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoded {
    /// Text converted cleanly to Big5.
    Clean(Vec<u8>),
    /// Text contained characters outside Big5; UTF-8 bytes passed through.
    Raw(Vec<u8>),
}

impl Encoded {
    #[allow(dead_code)]
    pub fn bytes(&self) -> &[u8] {
        match self {
            Encoded::Clean(b) | Encoded::Raw(b) => b,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Encoded::Clean(b) | Encoded::Raw(b) => b,
        }
    }
}

/// Decode Big5 bytes into UTF-8 text.
///
/// Invalid byte sequences do not fail the caller: the original bytes are
/// reinterpreted one byte per character so the session keeps running on
/// garbled input.
pub fn decode(bytes: &[u8]) -> Decoded {
    if bytes.is_empty() {
        return Decoded::Clean(String::new());
    }

    match BIG5.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => Decoded::Clean(text.into_owned()),
        None => Decoded::Raw(bytes.iter().map(|&b| b as char).collect()),
    }
}

/// Encode UTF-8 text into Big5 bytes.
///
/// Characters with no Big5 mapping fall back to sending the UTF-8 bytes
/// unmodified, so a send is never silently dropped.
pub fn encode(text: &str) -> Encoded {
    if text.is_empty() {
        return Encoded::Clean(Vec::new());
    }

    let (bytes, _, had_unmappable) = BIG5.encode(text);
    if had_unmappable {
        Encoded::Raw(text.as_bytes().to_vec())
    } else {
        Encoded::Clean(bytes.into_owned())
    }
}
