//! Normalized transaction response model.

use chrono::{DateTime, Utc};
use epx_codes::{classify, Classification, Network};
use epx_wire::RawResponse;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Storage approvals also accept `85` (account verified).
pub const STORAGE_APPROVAL_CODES: [&str; 2] = ["00", "85"];

/// The single response model every channel normalizes into.
///
/// Declines are represented here too: `is_approved == false` with the
/// processor's code and text intact, so callers can persist the audit trail
/// and show the classified user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    /// Processor GUID for this transaction; usable as a BRIC in follow-ups.
    pub auth_guid: String,
    /// Raw auth response code, e.g. `"00"`.
    pub auth_resp: String,
    /// Human-readable approval number, when the issuer returned one.
    pub auth_code: Option<String>,
    /// Raw response text from the processor.
    pub auth_resp_text: Option<String>,
    /// Whether the processor approved the request.
    pub is_approved: bool,
    /// One-character AVS result.
    pub avs_result: Option<String>,
    /// One-character CVV2 result.
    pub cvv2_result: Option<String>,
    /// Processor card-brand code.
    pub card_type: Option<String>,
    /// Echoed transaction number.
    pub tran_nbr: Option<String>,
    /// Echoed transaction group.
    pub tran_group: Option<String>,
    /// Echoed amount.
    pub amount: Option<String>,
    /// GUID the processor echoed when it differs from the canonical token.
    /// Set only by BRIC update, where the original token stays canonical.
    pub new_auth_guid: Option<String>,
    /// When the gateway finished processing this response.
    pub processed_at: DateTime<Utc>,
    /// The reply body exactly as received, for audit.
    pub raw_body: String,
    /// Which code table classifies `auth_resp`.
    pub network: Network,
}

impl TransactionResponse {
    /// Build a normalized response from a decoded reply.
    ///
    /// Fails only when the contract-required `AUTH_GUID`/`AUTH_RESP` fields
    /// are missing or empty; every other field is optional.
    pub fn from_raw(raw: &RawResponse, network: Network, storage: bool) -> Result<Self> {
        let auth_guid = raw.require("AUTH_GUID")?.to_string();
        let auth_resp = raw.require("AUTH_RESP")?.to_string();
        let is_approved = if storage {
            STORAGE_APPROVAL_CODES.contains(&auth_resp.as_str())
        } else {
            auth_resp == "00"
        };
        Ok(Self {
            auth_guid,
            is_approved,
            auth_code: raw.get_non_empty("AUTH_CODE").map(String::from),
            auth_resp_text: raw.get_non_empty("AUTH_RESP_TEXT").map(String::from),
            avs_result: raw.get_non_empty("AUTH_AVS").map(String::from),
            cvv2_result: raw.get_non_empty("AUTH_CVV2").map(String::from),
            card_type: raw.get_non_empty("AUTH_CARD_TYPE").map(String::from),
            tran_nbr: raw.get_non_empty("TRAN_NBR").map(String::from),
            tran_group: raw.get_non_empty("TRAN_GROUP").map(String::from),
            amount: raw.get_non_empty("AMOUNT").map(String::from),
            new_auth_guid: None,
            processed_at: Utc::now(),
            raw_body: raw.raw_body().to_string(),
            auth_resp,
            network,
        })
    }

    /// Classify the response code against the static tables.
    pub fn classification(&self) -> Classification {
        classify(&self.auth_resp, self.network)
    }

    /// Decode the AVS result into a human-readable description.
    pub fn avs_description(&self) -> Option<&'static str> {
        self.avs_result.as_deref().map(epx_codes::avs_description)
    }

    /// Decode the CVV2 result into a human-readable description.
    pub fn cvv2_description(&self) -> Option<&'static str> {
        self.cvv2_result.as_deref().map(epx_codes::cvv_description)
    }

    /// Decode the card-brand code into a brand name.
    pub fn card_brand(&self) -> Option<&'static str> {
        self.card_type.as_deref().map(epx_codes::card_brand)
    }
}
