//! Processor response-code taxonomy for the EPX gateway.
//!
//! Maps the raw `AUTH_RESP` codes returned by the processor onto a portable
//! model: approval/decline flags, retryability, a coarse category, and a
//! message safe to show an end user. Credit-card codes and ACH codes live in
//! distinct tables because the same numeric string can mean different things
//! on each rail (`14` is an invalid card number on the credit side but an
//! invalid account number on the ACH side).
//!
//! Lookups never fail: an unrecognized code resolves to a generic decline
//! that is not retryable, so new processor codes degrade safely.

pub mod ach;
pub mod credit;
mod error;

pub use error::PaymentError;

use serde::{Deserialize, Serialize};

/// Coarse outcome category attached to every classified response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseCategory {
    /// Transaction approved by the issuer.
    Approved,
    /// Generic decline with no more specific bucket.
    Declined,
    /// Account lacks funds; retry later may succeed.
    InsufficientFunds,
    /// Card past its expiration date.
    ExpiredCard,
    /// Card or account number failed validation at the issuer.
    InvalidCard,
    /// Issuer flagged the attempt as suspected fraud or a pickup.
    Fraud,
    /// Processor or issuer internal failure.
    SystemError,
    /// Transport-level failure before a processor verdict.
    NetworkError,
    /// Request malformed or not permitted for this merchant.
    InvalidRequest,
}

impl ResponseCategory {
    /// Stable kebab-case name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseCategory::Approved => "approved",
            ResponseCategory::Declined => "declined",
            ResponseCategory::InsufficientFunds => "insufficient-funds",
            ResponseCategory::ExpiredCard => "expired-card",
            ResponseCategory::InvalidCard => "invalid-card",
            ResponseCategory::Fraud => "fraud",
            ResponseCategory::SystemError => "system-error",
            ResponseCategory::NetworkError => "network-error",
            ResponseCategory::InvalidRequest => "invalid-request",
        }
    }
}

/// Static attributes of one processor response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseCodeInfo {
    /// The processor code, e.g. `"00"`.
    pub code: &'static str,
    /// Short display label for dashboards and logs.
    pub display: &'static str,
    /// Longer operator-facing description.
    pub description: &'static str,
    /// Issuer approved the transaction.
    pub is_approved: bool,
    /// Issuer or processor declined the transaction.
    pub is_declined: bool,
    /// A later retry of the same request could plausibly succeed.
    pub is_retryable: bool,
    /// The cardholder has to act (new card, different funding, call issuer).
    pub requires_user_action: bool,
    /// Coarse outcome bucket.
    pub category: ResponseCategory,
    /// Message safe to surface to the paying customer.
    pub user_message: &'static str,
}

/// Which rail a response code came back on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Card-present / card-not-present credit and debit card rails.
    Credit,
    /// ACH checking and savings rails.
    Ach,
}

/// A response code resolved against the static tables.
///
/// Owns the raw code string so unknown codes survive classification intact.
#[derive(Debug, Clone)]
pub struct Classification {
    /// Raw code as received from the processor.
    pub code: String,
    /// Rail the code was classified against.
    pub network: Network,
    /// Static attributes; the fallback entry when the code is unknown.
    pub info: &'static ResponseCodeInfo,
}

impl Classification {
    /// True when the static table did not recognize the code.
    pub fn is_unknown(&self) -> bool {
        self.info.code == UNKNOWN_CODE.code
    }

    /// Build the structured error bundle for callers that treat a decline
    /// as a failure, attaching the raw gateway message when one is known.
    pub fn to_payment_error(&self, gateway_message: Option<String>) -> PaymentError {
        PaymentError {
            code: self.code.clone(),
            user_message: self.info.user_message.to_string(),
            gateway_message,
            retryable: self.info.is_retryable,
            category: self.info.category,
            display: self.info.display,
            description: self.info.description,
        }
    }
}

/// Fallback entry for codes absent from both tables.
pub static UNKNOWN_CODE: ResponseCodeInfo = ResponseCodeInfo {
    code: "??",
    display: "Unknown Response",
    description: "Processor returned a response code not present in the code tables",
    is_approved: false,
    is_declined: true,
    is_retryable: false,
    requires_user_action: false,
    category: ResponseCategory::Declined,
    user_message: "The payment could not be completed. Please try a different payment method.",
};

/// Classify a processor code against the table for the given rail.
pub fn classify(code: &str, network: Network) -> Classification {
    let info = match network {
        Network::Credit => credit::lookup(code),
        Network::Ach => ach::lookup(code),
    };
    Classification {
        code: code.to_string(),
        network,
        info: info.unwrap_or(&UNKNOWN_CODE),
    }
}

/// Decode a one-character AVS result into a human-readable description.
pub fn avs_description(result: &str) -> &'static str {
    match result {
        "A" => "Address matches, ZIP does not",
        "E" => "AVS error or not allowed for this card type",
        "G" => "Non-US issuer, AVS not performed",
        "N" => "Neither address nor ZIP matches",
        "R" => "Issuer system unavailable, retry",
        "S" => "AVS not supported by issuer",
        "U" => "Address information unavailable",
        "W" => "Nine-digit ZIP matches, address does not",
        "X" => "Address and nine-digit ZIP match",
        "Y" => "Address and five-digit ZIP match",
        "Z" => "Five-digit ZIP matches, address does not",
        _ => "Unrecognized AVS result",
    }
}

/// Decode a one-character CVV2 result into a human-readable description.
pub fn cvv_description(result: &str) -> &'static str {
    match result {
        "M" => "CVV2 match",
        "N" => "CVV2 does not match",
        "P" => "CVV2 not processed",
        "S" => "CVV2 expected but not provided",
        "U" => "Issuer does not support CVV2",
        "X" => "No CVV2 data available",
        _ => "Unrecognized CVV2 result",
    }
}

/// Decode the processor's card-brand code (`AUTH_CARD_TYPE`).
pub fn card_brand(code: &str) -> &'static str {
    match code {
        "V" => "Visa",
        "M" => "Mastercard",
        "A" => "American Express",
        "D" => "Discover",
        "J" => "JCB",
        "P" => "PIN Debit",
        _ => "Unknown",
    }
}
