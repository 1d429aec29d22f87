//! Wire codec for the EPX gateway.
//!
//! The processor speaks two encodings on its synchronous surfaces:
//! `application/x-www-form-urlencoded` key/value bodies, and a small fixed
//! XML dialect (transaction-rooted socket requests, the `<DETAIL>` storage
//! body, and `<RESPONSE><FIELDS><FIELD KEY="…">` replies). Both are
//! hand-rolled here; the shapes are closed and tiny, and a general-purpose
//! XML stack would be the wrong tool for a payload this constrained.
//!
//! Nothing in this crate performs I/O. Encoders produce `String` bodies,
//! decoders consume `&str` bodies, and the channel adapters own the sockets.

pub mod form;
pub mod response;
pub mod xml;

pub use form::{form_urldecode, form_urlencode, FormBuilder};
pub use response::{sniff_and_parse, RawResponse, ResponseFormat};
pub use xml::{xml_escape, xml_unescape, RequestWriter, DETAIL_ROOT};

use thiserror::Error;

/// Decode failures for processor reply bodies.
#[derive(Debug, Error)]
pub enum WireError {
    /// Body could not be decoded as key/value pairs or as response XML.
    #[error("Unparseable response body: {reason}")]
    Unparseable {
        /// What the decoder tripped on.
        reason: String,
    },

    /// Body decoded but a field the contract requires is missing or empty.
    #[error("Missing required response field: {field}")]
    MissingField {
        /// The absent field name.
        field: String,
    },

    /// Malformed percent-escape in a form-encoded value.
    #[error("Invalid percent-escape in form data at byte {position}")]
    BadEscape {
        /// Byte offset of the broken escape.
        position: usize,
    },
}
