//! `application/x-www-form-urlencoded` encoding.
//!
//! The processor is strict about key casing (`CUST_NBR`, not `cust_nbr`) and
//! tolerant about value escaping, so the builder preserves insertion order
//! and escapes conservatively: unreserved characters pass through, space
//! becomes `+`, everything else is percent-encoded.

use crate::WireError;
use zeroize::Zeroize;

/// Percent-encode one value for a form body.
pub fn form_urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => {
                out.push('%');
                out.push(hex_digit(byte >> 4));
                out.push(hex_digit(byte & 0x0f));
            }
        }
    }
    out
}

/// Decode one percent-encoded form value.
pub fn form_urldecode(value: &str) -> Result<String, WireError> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                let hi = from_hex_digit(bytes.get(i + 1).copied());
                let lo = from_hex_digit(bytes.get(i + 2).copied());
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi << 4) | lo);
                        i += 3;
                    }
                    _ => return Err(WireError::BadEscape { position: i }),
                }
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|e| WireError::Unparseable {
        reason: format!("form value is not UTF-8 after decoding: {e}"),
    })
}

fn hex_digit(nibble: u8) -> char {
    char::from_digit(nibble as u32, 16)
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('0')
}

fn from_hex_digit(byte: Option<u8>) -> Option<u8> {
    (byte? as char).to_digit(16).map(|d| d as u8)
}

/// Order-preserving form body builder.
///
/// Reused across requests by the gateway's buffer pool; `clear` empties both
/// the pair list and the scratch body without releasing capacity. `Debug`
/// reports only the pair count; staged values can include PANs.
#[derive(Default)]
pub struct FormBuilder {
    pairs: Vec<(String, String)>,
    body: String,
}

impl std::fmt::Debug for FormBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormBuilder")
            .field("pairs", &self.pairs.len())
            .finish_non_exhaustive()
    }
}

impl FormBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a key/value pair. Keys are written exactly as given.
    pub fn field(&mut self, key: &str, value: &str) -> &mut Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    /// Append a pair only when the optional value is present and non-empty.
    pub fn optional_field(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            if !v.is_empty() {
                self.field(key, v);
            }
        }
        self
    }

    /// Number of pairs currently staged.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when no pairs are staged.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Look up the first staged value for a key. Test and audit hook.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Encode the staged pairs into a form body, reusing the internal buffer.
    pub fn encode(&mut self) -> &str {
        self.body.clear();
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                self.body.push('&');
            }
            self.body.push_str(&form_urlencode(key));
            self.body.push('=');
            self.body.push_str(&form_urlencode(value));
        }
        &self.body
    }

    /// Iterate staged pairs in insertion order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Drop all staged pairs and the encoded body, keeping list capacity.
    ///
    /// Staged values may include PANs and CVVs, so both backing stores are
    /// zeroized rather than merely truncated.
    pub fn clear(&mut self) {
        for (key, value) in self.pairs.iter_mut() {
            key.zeroize();
            value.zeroize();
        }
        self.pairs.clear();
        self.body.zeroize();
    }
}

/// Parse a form-encoded body into pairs.
///
/// Fails on bodies that are clearly not key/value data (no `=` anywhere),
/// which is what lets the response sniffer fall back to XML.
pub fn parse_pairs(body: &str) -> Result<Vec<(String, String)>, WireError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(WireError::Unparseable {
            reason: "empty body".to_string(),
        });
    }
    if !trimmed.contains('=') {
        return Err(WireError::Unparseable {
            reason: "no key/value separator in body".to_string(),
        });
    }
    let mut pairs = Vec::new();
    for piece in trimmed.split('&') {
        if piece.is_empty() {
            continue;
        }
        let (key, value) = match piece.split_once('=') {
            Some(kv) => kv,
            None => (piece, ""),
        };
        pairs.push((form_urldecode(key)?, form_urldecode(value)?));
    }
    Ok(pairs)
}
