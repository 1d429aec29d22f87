//! HMAC request signing and response verification.
//!
//! Signed HTTP calls carry two headers: `EPI-Id` (the four-part key) and
//! `EPI-Signature`, the lowercase-hex HMAC-SHA256 of the endpoint path
//! concatenated with the payload bytes. Browser Post responses are verified
//! by recomputing the HMAC over the response fields in a fixed order. All
//! comparisons are constant-time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the merchant's four-part key.
pub const EPI_ID_HEADER: &str = "EPI-Id";
/// Header carrying the request signature.
pub const EPI_SIGNATURE_HEADER: &str = "EPI-Signature";

/// Request signer bound to one merchant MAC key.
#[derive(Clone)]
pub struct Signer {
    key: Vec<u8>,
}

impl Signer {
    /// Create a signer from the merchant MAC key.
    pub fn new(mac_key: &str) -> Self {
        Self {
            key: mac_key.as_bytes().to_vec(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length; this cannot fail.
        HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length")
    }

    /// Sign `endpoint ∥ payload`, returning lowercase hex.
    pub fn sign(&self, endpoint: &str, payload: &[u8]) -> String {
        let mut mac = self.mac();
        mac.update(endpoint.as_bytes());
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Sign the concatenation of `values` in the given order, returning
    /// lowercase hex. Used for Browser Post response verification.
    pub fn sign_concat<'a>(&self, values: impl IntoIterator<Item = &'a str>) -> String {
        let mut mac = self.mac();
        for value in values {
            mac.update(value.as_bytes());
        }
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time comparison of an expected hex digest against the
    /// signature of `endpoint ∥ payload`.
    pub fn verify(&self, endpoint: &str, payload: &[u8], expected_hex: &str) -> bool {
        constant_time_hex_eq(&self.sign(endpoint, payload), expected_hex)
    }

    /// Constant-time comparison of an expected hex digest against the
    /// signature of the concatenated `values`.
    pub fn verify_concat<'a>(
        &self,
        values: impl IntoIterator<Item = &'a str>,
        expected_hex: &str,
    ) -> bool {
        constant_time_hex_eq(&self.sign_concat(values), expected_hex)
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").field("key", &"<redacted>").finish()
    }
}

fn constant_time_hex_eq(computed: &str, expected: &str) -> bool {
    let expected = expected.to_ascii_lowercase();
    if computed.len() != expected.len() {
        return false;
    }
    computed.as_bytes().ct_eq(expected.as_bytes()).into()
}
