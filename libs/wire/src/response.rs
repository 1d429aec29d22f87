//! Processor reply decoding.
//!
//! Server Post replies arrive either URL-encoded or as response XML,
//! depending on processor configuration. The sniffer keys on the first
//! non-whitespace byte: `<` selects the XML reader, anything else tries the
//! key/value reader and falls back to XML when that fails. Both shapes
//! normalize to the same field map, so downstream code never knows which
//! encoding came over the wire.

use crate::form;
use crate::xml;
use crate::WireError;
use std::collections::HashMap;

/// Which decoder produced a [`RawResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// URL-encoded key/value body.
    KeyValue,
    /// `<RESPONSE><FIELDS>` XML body.
    Xml,
}

/// A decoded processor reply: uppercase-keyed fields plus the raw body.
#[derive(Debug, Clone)]
pub struct RawResponse {
    fields: HashMap<String, String>,
    format: ResponseFormat,
    raw: String,
}

impl RawResponse {
    /// Decoder that produced this response.
    pub fn format(&self) -> ResponseFormat {
        self.format
    }

    /// The body exactly as received, for audit trails.
    pub fn raw_body(&self) -> &str {
        &self.raw
    }

    /// Fetch a field by its wire name. Lookup is case-insensitive because
    /// some processor paths downcase keys in the XML shape.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(&key.to_ascii_uppercase()).map(String::as_str)
    }

    /// Fetch a field, treating absent and empty identically.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Fetch a field the contract requires to be present and non-empty.
    pub fn require(&self, key: &str) -> Result<&str, WireError> {
        self.get_non_empty(key).ok_or_else(|| WireError::MissingField {
            field: key.to_string(),
        })
    }

    /// Number of decoded fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no fields decoded (never the case for a parsed response).
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Assemble a response from already-decoded pairs. Used by the Browser
    /// Post adapter, whose fields arrive as redirect query parameters
    /// rather than a reply body.
    pub fn from_pairs(pairs: Vec<(String, String)>, format: ResponseFormat, raw: &str) -> Self {
        let mut fields = HashMap::with_capacity(pairs.len());
        for (key, value) in pairs {
            // First occurrence wins; the processor never legitimately
            // repeats a key.
            fields.entry(key.to_ascii_uppercase()).or_insert(value);
        }
        Self {
            fields,
            format,
            raw: raw.to_string(),
        }
    }
}

/// Decode a reply body, sniffing the encoding.
pub fn sniff_and_parse(body: &str) -> Result<RawResponse, WireError> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('<') {
        let pairs = xml::parse_response_fields(body)?;
        return Ok(RawResponse::from_pairs(pairs, ResponseFormat::Xml, body));
    }
    match form::parse_pairs(body) {
        Ok(pairs) => Ok(RawResponse::from_pairs(pairs, ResponseFormat::KeyValue, body)),
        Err(kv_err) => {
            // Some processor paths return XML with a leading BOM or junk;
            // try the XML reader before giving up.
            tracing::debug!(error = %kv_err, "key/value decode failed, trying XML");
            let pairs = xml::parse_response_fields(trimmed).map_err(|_| kv_err)?;
            Ok(RawResponse::from_pairs(pairs, ResponseFormat::Xml, body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML_BODY: &str = r#"<RESPONSE><FIELDS>
        <FIELD KEY="AUTH_GUID">09LMQ886L2K2W11MPX1</FIELD>
        <FIELD KEY="AUTH_RESP">00</FIELD>
        <FIELD KEY="AUTH_CODE">057579</FIELD>
        <FIELD KEY="AUTH_RESP_TEXT">ZIP MATCH</FIELD>
        <FIELD KEY="AUTH_AVS">Z</FIELD>
        <FIELD KEY="AUTH_CVV2">M</FIELD>
        <FIELD KEY="TRAN_NBR">12345</FIELD>
        <FIELD KEY="AMOUNT">10.00</FIELD>
    </FIELDS></RESPONSE>"#;

    const KV_BODY: &str = "AUTH_GUID=09LMQ886L2K2W11MPX1&AUTH_RESP=00&AUTH_CODE=057579\
        &AUTH_RESP_TEXT=ZIP+MATCH&AUTH_AVS=Z&AUTH_CVV2=M&TRAN_NBR=12345&AMOUNT=10.00";

    #[test]
    fn sniffs_xml() {
        let resp = sniff_and_parse(XML_BODY).unwrap();
        assert_eq!(resp.format(), ResponseFormat::Xml);
        assert_eq!(resp.get("AUTH_GUID"), Some("09LMQ886L2K2W11MPX1"));
        assert_eq!(resp.get("AUTH_RESP_TEXT"), Some("ZIP MATCH"));
    }

    #[test]
    fn sniffs_key_value() {
        let resp = sniff_and_parse(KV_BODY).unwrap();
        assert_eq!(resp.format(), ResponseFormat::KeyValue);
        assert_eq!(resp.get("AUTH_RESP_TEXT"), Some("ZIP MATCH"));
    }

    #[test]
    fn both_shapes_normalize_identically() {
        let from_xml = sniff_and_parse(XML_BODY).unwrap();
        let from_kv = sniff_and_parse(KV_BODY).unwrap();
        for key in [
            "AUTH_GUID", "AUTH_RESP", "AUTH_CODE", "AUTH_RESP_TEXT", "AUTH_AVS",
            "AUTH_CVV2", "TRAN_NBR", "AMOUNT",
        ] {
            assert_eq!(from_xml.get(key), from_kv.get(key), "field {key}");
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let resp = sniff_and_parse(KV_BODY).unwrap();
        assert_eq!(resp.get("auth_guid"), Some("09LMQ886L2K2W11MPX1"));
    }

    #[test]
    fn require_rejects_empty_fields() {
        let resp = sniff_and_parse("AUTH_GUID=&AUTH_RESP=00").unwrap();
        assert!(resp.require("AUTH_GUID").is_err());
        assert_eq!(resp.require("AUTH_RESP").unwrap(), "00");
    }

    #[test]
    fn garbage_body_is_unparseable() {
        assert!(sniff_and_parse("complete nonsense").is_err());
        assert!(sniff_and_parse("").is_err());
    }

    #[test]
    fn raw_body_is_preserved_verbatim() {
        let resp = sniff_and_parse(XML_BODY).unwrap();
        assert_eq!(resp.raw_body(), XML_BODY);
    }
}
