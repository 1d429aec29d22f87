//! Structured payment error bundle.

use crate::ResponseCategory;
use serde::Serialize;
use thiserror::Error;

/// Everything a caller needs to persist, display, and decide on a failed or
/// declined payment: the stable processor code, a user-safe message, the raw
/// gateway message when one was returned, a retryability flag, the coarse
/// category, and the display/description detail pair from the code tables.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{display} ({code}): {user_message}")]
pub struct PaymentError {
    /// Stable short code, e.g. `"05"`.
    pub code: String,
    /// Message safe to show the paying customer.
    pub user_message: String,
    /// Raw message from the gateway, when known. Operator-facing only.
    pub gateway_message: Option<String>,
    /// A retry of the same request could plausibly succeed.
    pub retryable: bool,
    /// Coarse outcome bucket.
    pub category: ResponseCategory,
    /// Short display label from the code table.
    pub display: &'static str,
    /// Operator-facing description from the code table.
    pub description: &'static str,
}
