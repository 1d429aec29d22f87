//! The EPX XML dialect.
//!
//! Requests are a single root element whose attributes carry the merchant
//! identity and whose children carry one field each. The socket channel
//! names the root after the transaction's wire code (`<CCE1 …>`); the BRIC
//! storage body uses the fixed `<DETAIL …>` root. Replies are
//! `<RESPONSE><FIELDS><FIELD KEY="NAME">value</FIELD>…</FIELDS></RESPONSE>`.
//! Character data is escaped for `& < > " '` in both directions; the reader
//! is forgiving about whitespace, attribute quoting, and self-closed fields
//! because processor configurations differ in how they pretty-print.

use crate::WireError;
use zeroize::Zeroize;

/// Escape character data for element content or attribute values.
pub fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// Reverse [`xml_escape`]. Unknown entities pass through verbatim.
pub fn xml_unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let entity_end = tail.find(';').map(|i| i + 1);
        let replaced = entity_end.and_then(|end| match &tail[..end] {
            "&amp;" => Some(('&', end)),
            "&lt;" => Some(('<', end)),
            "&gt;" => Some(('>', end)),
            "&quot;" => Some(('"', end)),
            "&apos;" => Some(('\'', end)),
            _ => None,
        });
        match replaced {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Root element name of the BRIC storage request body.
pub const DETAIL_ROOT: &str = "DETAIL";

/// Writer for the XML request documents.
///
/// Reused across requests by the gateway's buffer pool; [`RequestWriter::clear`]
/// zeroizes the buffer because it can hold raw account numbers. `Debug`
/// reports only the buffered length for the same reason.
#[derive(Default)]
pub struct RequestWriter {
    buf: String,
    root: String,
    open: bool,
}

impl std::fmt::Debug for RequestWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestWriter")
            .field("len", &self.buf.len())
            .field("open", &self.open)
            .finish()
    }
}

impl RequestWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a root element with the merchant identity attributes.
    ///
    /// Socket requests name the root after the transaction's wire code;
    /// [`RequestWriter::open_detail`] covers the BRIC storage shape.
    pub fn open_root(
        &mut self,
        root: &str,
        cust_nbr: &str,
        merch_nbr: &str,
        dba_nbr: &str,
        terminal_nbr: &str,
    ) {
        self.buf.clear();
        self.root.clear();
        self.root.push_str(root);
        self.buf.push('<');
        self.buf.push_str(root);
        self.buf.push_str(" cust_nbr=\"");
        self.buf.push_str(&xml_escape(cust_nbr));
        self.buf.push_str("\" merch_nbr=\"");
        self.buf.push_str(&xml_escape(merch_nbr));
        self.buf.push_str("\" dba_nbr=\"");
        self.buf.push_str(&xml_escape(dba_nbr));
        self.buf.push_str("\" terminal_nbr=\"");
        self.buf.push_str(&xml_escape(terminal_nbr));
        self.buf.push_str("\">");
        self.open = true;
    }

    /// Open the fixed `<DETAIL>` root used by the BRIC storage body.
    pub fn open_detail(&mut self, cust_nbr: &str, merch_nbr: &str, dba_nbr: &str, terminal_nbr: &str) {
        self.open_root(DETAIL_ROOT, cust_nbr, merch_nbr, dba_nbr, terminal_nbr);
    }

    /// Append one `<NAME>value</NAME>` child.
    pub fn element(&mut self, name: &str, value: &str) -> &mut Self {
        debug_assert!(self.open, "element written before the root was opened");
        self.buf.push('<');
        self.buf.push_str(name);
        self.buf.push('>');
        self.buf.push_str(&xml_escape(value));
        self.buf.push_str("</");
        self.buf.push_str(name);
        self.buf.push('>');
        self
    }

    /// Append a child only when the optional value is present and non-empty.
    pub fn optional_element(&mut self, name: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            if !v.is_empty() {
                self.element(name, v);
            }
        }
        self
    }

    /// Close the root element and expose the document.
    pub fn finish(&mut self) -> &str {
        if self.open {
            self.buf.push_str("</");
            self.buf.push_str(&self.root);
            self.buf.push('>');
            self.open = false;
        }
        &self.buf
    }

    /// Zeroize and reset the buffer for reuse.
    pub fn clear(&mut self) {
        self.buf.zeroize();
        self.root.clear();
        self.open = false;
    }
}

/// Parse a `<RESPONSE><FIELDS><FIELD KEY="…">` reply into key/value pairs.
///
/// Accepts single- or double-quoted `KEY` attributes and self-closed empty
/// fields. Anything outside `<FIELD>` elements is ignored.
pub fn parse_response_fields(body: &str) -> Result<Vec<(String, String)>, WireError> {
    let trimmed = body.trim();
    if !trimmed.starts_with('<') {
        return Err(WireError::Unparseable {
            reason: "body does not start with an XML tag".to_string(),
        });
    }
    if !trimmed.contains("<RESPONSE") && !trimmed.contains("<FIELDS") {
        return Err(WireError::Unparseable {
            reason: "missing RESPONSE/FIELDS envelope".to_string(),
        });
    }

    let mut fields = Vec::new();
    let mut rest = trimmed;
    while let Some(start) = rest.find("<FIELD") {
        // `<FIELDS>` shares the prefix; skip anything where the tag name
        // continues past FIELD.
        if matches!(
            rest.as_bytes().get(start + "<FIELD".len()),
            Some(b) if b.is_ascii_alphanumeric() || *b == b'_'
        ) {
            rest = &rest[start + "<FIELD".len()..];
            continue;
        }
        let tag = &rest[start..];
        let tag_end = tag.find('>').ok_or_else(|| WireError::Unparseable {
            reason: "unterminated FIELD tag".to_string(),
        })?;
        let head = &tag[..tag_end];
        let key = attribute_value(head, "KEY").ok_or_else(|| WireError::Unparseable {
            reason: "FIELD without KEY attribute".to_string(),
        })?;

        if head.ends_with('/') {
            // Self-closed empty field.
            fields.push((key, String::new()));
            rest = &tag[tag_end + 1..];
            continue;
        }

        let content = &tag[tag_end + 1..];
        let close = content.find("</FIELD").ok_or_else(|| WireError::Unparseable {
            reason: format!("unterminated FIELD element for key {key}"),
        })?;
        fields.push((key, xml_unescape(content[..close].trim())));
        let after_close = content[close..].find('>').map(|i| close + i + 1).unwrap_or(content.len());
        rest = &content[after_close..];
    }

    if fields.is_empty() {
        return Err(WireError::Unparseable {
            reason: "no FIELD elements in response".to_string(),
        });
    }
    Ok(fields)
}

fn attribute_value(tag: &str, name: &str) -> Option<String> {
    let at = tag.find(name)?;
    let after = tag[at + name.len()..].trim_start();
    let after = after.strip_prefix('=')?.trim_start();
    let quote = after.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let inner = &after[1..];
    let end = inner.find(quote)?;
    Some(xml_unescape(&inner[..end]))
}
