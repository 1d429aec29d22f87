//! ACH response codes.
//!
//! A subset of NACHA return semantics as surfaced synchronously by the
//! processor. ACH acceptance (`00`) only means the entry was accepted for
//! origination; a return can still arrive days later through the dispute
//! channel, which is outside this crate.

use crate::credit::code;
use crate::{ResponseCategory, ResponseCodeInfo};

static ACCEPTED: ResponseCodeInfo = code!("00", "Accepted", "Entry accepted for origination",
    approved: true, declined: false, retryable: false, user_action: false,
    Approved, "Your payment was accepted.");

static INVALID_MERCHANT: ResponseCodeInfo = code!("03", "Invalid Merchant",
    "Merchant is not configured for ACH origination",
    approved: false, declined: true, retryable: false, user_action: false,
    InvalidRequest, "This payment could not be processed.");

static INVALID_ACCOUNT: ResponseCodeInfo = code!("14", "Invalid Account Number",
    "Account number failed structural validation",
    approved: false, declined: true, retryable: false, user_action: true,
    InvalidCard, "The account number is invalid. Please check it and try again.");

static NO_CHECKING_ACCOUNT: ResponseCodeInfo = code!("52", "No Checking Account",
    "No checking account exists for the account number",
    approved: false, declined: true, retryable: false, user_action: true,
    InvalidCard, "No checking account was found for this account number.");

static NO_SAVINGS_ACCOUNT: ResponseCodeInfo = code!("53", "No Savings Account",
    "No savings account exists for the account number",
    approved: false, declined: true, retryable: false, user_action: true,
    InvalidCard, "No savings account was found for this account number.");

static INVALID_ROUTING: ResponseCodeInfo = code!("78", "Invalid Routing Number",
    "Routing number failed checksum or is not a participating institution",
    approved: false, declined: true, retryable: false, user_action: true,
    InvalidCard, "The routing number is invalid. Please check it and try again.");

static VERIFIED: ResponseCodeInfo = code!("85", "Account Verified",
    "Account verification succeeded; issued for pre-notes and token storage",
    approved: true, declined: false, retryable: false, user_action: false,
    Approved, "Your bank account was verified.");

static SYSTEM_ERROR: ResponseCodeInfo = code!("96", "System Error",
    "Processor internal malfunction",
    approved: false, declined: true, retryable: true, user_action: false,
    SystemError, "The payment system is temporarily unavailable. Please try again.");

/// Look up an ACH response code. Returns `None` for unknown codes.
pub fn lookup(code: &str) -> Option<&'static ResponseCodeInfo> {
    match code {
        "00" => Some(&ACCEPTED),
        "03" => Some(&INVALID_MERCHANT),
        "14" => Some(&INVALID_ACCOUNT),
        "52" => Some(&NO_CHECKING_ACCOUNT),
        "53" => Some(&NO_SAVINGS_ACCOUNT),
        "78" => Some(&INVALID_ROUTING),
        "85" => Some(&VERIFIED),
        "96" => Some(&SYSTEM_ERROR),
        _ => None,
    }
}
