//! Credit and debit card response codes.
//!
//! The entries follow ISO 8583 action-code conventions as surfaced by the
//! processor. `91` and `96` are the two codes where an automatic retry is
//! worthwhile without cardholder involvement; soft declines like `51` and
//! `61` may clear on retry but need the cardholder to fix funding first.

use crate::{ResponseCategory, ResponseCodeInfo};

macro_rules! code {
    ($code:literal, $display:literal, $desc:literal,
     approved: $ap:literal, declined: $de:literal, retryable: $re:literal,
     user_action: $ua:literal, $cat:ident, $msg:literal) => {
        ResponseCodeInfo {
            code: $code,
            display: $display,
            description: $desc,
            is_approved: $ap,
            is_declined: $de,
            is_retryable: $re,
            requires_user_action: $ua,
            category: ResponseCategory::$cat,
            user_message: $msg,
        }
    };
}

pub(crate) use code;

static APPROVED: ResponseCodeInfo = code!("00", "Approved", "Transaction approved",
    approved: true, declined: false, retryable: false, user_action: false,
    Approved, "Your payment was approved.");

static REFER_TO_ISSUER: ResponseCodeInfo = code!("01", "Refer To Issuer",
    "Issuer requests voice authorization before approving",
    approved: false, declined: true, retryable: false, user_action: true,
    Declined, "Your card issuer needs additional verification. Please contact your bank.");

static PICKUP_CARD: ResponseCodeInfo = code!("04", "Pickup Card",
    "Issuer requests the card be retained",
    approved: false, declined: true, retryable: false, user_action: true,
    Fraud, "This card cannot be used. Please contact your bank.");

static DO_NOT_HONOR: ResponseCodeInfo = code!("05", "Do Not Honor",
    "Issuer declined without a specific reason",
    approved: false, declined: true, retryable: false, user_action: true,
    Declined, "Your card was declined. Please try a different payment method.");

static INVALID_TRANSACTION: ResponseCodeInfo = code!("12", "Invalid Transaction",
    "Transaction type not permitted for this card",
    approved: false, declined: true, retryable: false, user_action: false,
    InvalidRequest, "This transaction could not be processed.");

static INVALID_AMOUNT: ResponseCodeInfo = code!("13", "Invalid Amount",
    "Amount field failed issuer validation",
    approved: false, declined: true, retryable: false, user_action: false,
    InvalidRequest, "The payment amount is invalid.");

static INVALID_CARD: ResponseCodeInfo = code!("14", "Invalid Card Number",
    "Account number failed validation at the issuer",
    approved: false, declined: true, retryable: false, user_action: true,
    InvalidCard, "The card number is invalid. Please check it and try again.");

static NO_SUCH_ISSUER: ResponseCodeInfo = code!("15", "No Such Issuer",
    "No issuer exists for this account range",
    approved: false, declined: true, retryable: false, user_action: true,
    InvalidCard, "The card number is invalid. Please check it and try again.");

static REENTER: ResponseCodeInfo = code!("19", "Re-enter Transaction",
    "Issuer asks for the transaction to be re-entered",
    approved: false, declined: true, retryable: true, user_action: false,
    SystemError, "A temporary error occurred. Please try again.");

static FORMAT_ERROR: ResponseCodeInfo = code!("30", "Format Error",
    "Message failed format validation at the issuer",
    approved: false, declined: true, retryable: false, user_action: false,
    InvalidRequest, "This transaction could not be processed.");

static LOST_CARD: ResponseCodeInfo = code!("41", "Lost Card",
    "Card reported lost by the cardholder",
    approved: false, declined: true, retryable: false, user_action: true,
    Fraud, "This card cannot be used. Please contact your bank.");

static STOLEN_CARD: ResponseCodeInfo = code!("43", "Stolen Card",
    "Card reported stolen by the cardholder",
    approved: false, declined: true, retryable: false, user_action: true,
    Fraud, "This card cannot be used. Please contact your bank.");

static INSUFFICIENT_FUNDS: ResponseCodeInfo = code!("51", "Insufficient Funds",
    "Account lacks funds for the requested amount",
    approved: false, declined: true, retryable: true, user_action: true,
    InsufficientFunds, "Your card has insufficient funds. Please use a different payment method.");

static EXPIRED_CARD: ResponseCodeInfo = code!("54", "Expired Card",
    "Card is past its expiration date",
    approved: false, declined: true, retryable: false, user_action: true,
    ExpiredCard, "Your card has expired. Please use a different card.");

static NOT_PERMITTED: ResponseCodeInfo = code!("57", "Transaction Not Permitted",
    "Issuer does not allow this transaction type for the cardholder",
    approved: false, declined: true, retryable: false, user_action: true,
    Declined, "Your card does not support this type of purchase.");

static SUSPECTED_FRAUD: ResponseCodeInfo = code!("59", "Suspected Fraud",
    "Issuer flagged the attempt as suspected fraud",
    approved: false, declined: true, retryable: false, user_action: true,
    Fraud, "Your card was declined. Please contact your bank.");

static EXCEEDS_LIMIT: ResponseCodeInfo = code!("61", "Exceeds Withdrawal Limit",
    "Amount exceeds the card's withdrawal limit",
    approved: false, declined: true, retryable: true, user_action: true,
    InsufficientFunds, "This payment exceeds your card's limit. Please use a different payment method.");

static RESTRICTED_CARD: ResponseCodeInfo = code!("62", "Restricted Card",
    "Card restricted from use with this merchant or region",
    approved: false, declined: true, retryable: false, user_action: true,
    Declined, "Your card was declined. Please try a different payment method.");

static SECURITY_VIOLATION: ResponseCodeInfo = code!("63", "Security Violation",
    "Security check failed at the issuer",
    approved: false, declined: true, retryable: false, user_action: true,
    Fraud, "Your card was declined. Please contact your bank.");

static ACTIVITY_LIMIT: ResponseCodeInfo = code!("65", "Activity Limit Exceeded",
    "Card exceeded its allowed number of transactions",
    approved: false, declined: true, retryable: true, user_action: true,
    InsufficientFunds, "Your card has reached its transaction limit. Please try again later.");

static PIN_TRIES_EXCEEDED: ResponseCodeInfo = code!("75", "PIN Tries Exceeded",
    "Allowable number of PIN entry attempts exceeded",
    approved: false, declined: true, retryable: false, user_action: true,
    Declined, "Too many incorrect PIN attempts. Please contact your bank.");

static CVV_ERROR: ResponseCodeInfo = code!("82", "CVV Error",
    "Card verification value failed validation",
    approved: false, declined: true, retryable: false, user_action: true,
    InvalidCard, "The card security code is incorrect. Please check it and try again.");

static NO_REASON_TO_DECLINE: ResponseCodeInfo = code!("85", "No Reason To Decline",
    "Account verification succeeded; issued for zero-dollar verifications and token storage",
    approved: true, declined: false, retryable: false, user_action: false,
    Approved, "Your payment method was verified.");

static ISSUER_TIMEOUT: ResponseCodeInfo = code!("91", "Issuer Unavailable",
    "Issuer or switch inoperative; the authorization never reached the issuer",
    approved: false, declined: true, retryable: true, user_action: false,
    SystemError, "The payment system is temporarily unavailable. Please try again.");

static SYSTEM_ERROR: ResponseCodeInfo = code!("96", "System Error",
    "Processor internal malfunction",
    approved: false, declined: true, retryable: true, user_action: false,
    SystemError, "The payment system is temporarily unavailable. Please try again.");

/// Look up a credit-card response code. Returns `None` for unknown codes.
pub fn lookup(code: &str) -> Option<&'static ResponseCodeInfo> {
    match code {
        "00" => Some(&APPROVED),
        "01" => Some(&REFER_TO_ISSUER),
        "04" => Some(&PICKUP_CARD),
        "05" => Some(&DO_NOT_HONOR),
        "12" => Some(&INVALID_TRANSACTION),
        "13" => Some(&INVALID_AMOUNT),
        "14" => Some(&INVALID_CARD),
        "15" => Some(&NO_SUCH_ISSUER),
        "19" => Some(&REENTER),
        "30" => Some(&FORMAT_ERROR),
        "41" => Some(&LOST_CARD),
        "43" => Some(&STOLEN_CARD),
        "51" => Some(&INSUFFICIENT_FUNDS),
        "54" => Some(&EXPIRED_CARD),
        "57" => Some(&NOT_PERMITTED),
        "59" => Some(&SUSPECTED_FRAUD),
        "61" => Some(&EXCEEDS_LIMIT),
        "62" => Some(&RESTRICTED_CARD),
        "63" => Some(&SECURITY_VIOLATION),
        "65" => Some(&ACTIVITY_LIMIT),
        "75" => Some(&PIN_TRIES_EXCEEDED),
        "82" => Some(&CVV_ERROR),
        "85" => Some(&NO_REASON_TO_DECLINE),
        "91" => Some(&ISSUER_TIMEOUT),
        "96" => Some(&SYSTEM_ERROR),
        _ => None,
    }
}
