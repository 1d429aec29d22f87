//! Error types for the gateway adapter.

use epx_wire::WireError;
use thiserror::Error;

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Main error type for gateway operations.
///
/// Declines are NOT errors: a parsed response with `AUTH_RESP != "00"` comes
/// back as a normal [`crate::response::TransactionResponse`] so callers can
/// persist audit trails. Everything here is a failure to obtain a verdict.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Request failed local validation; no network I/O was performed.
    #[error("Validation failed: {reason}")]
    Validation {
        /// Which rule failed.
        reason: String,
    },

    /// Merchant identity or adapter configuration is unusable.
    #[error("Configuration error: {reason}")]
    Configuration {
        /// What is malformed or missing.
        reason: String,
    },

    /// Transport-level failure before a processor verdict.
    #[error("Network error: {message}")]
    Network {
        /// Description of the failure.
        message: String,
        /// Underlying error, when one exists.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An I/O or HTTP deadline elapsed.
    #[error("Timeout: {operation} exceeded {timeout_ms}ms")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The deadline that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// Processor answered with HTTP 5xx.
    #[error("Gateway unavailable: HTTP {status}")]
    GatewayStatus {
        /// The HTTP status code.
        status: u16,
    },

    /// Processor rejected the request with HTTP 4xx.
    #[error("Request rejected: HTTP {status}")]
    RequestRejected {
        /// The HTTP status code.
        status: u16,
    },

    /// Reply body could not be decoded, or required fields were absent.
    #[error("Parse error: {0}")]
    Parse(#[from] WireError),

    /// Browser Post response MAC did not verify.
    #[error("Response signature mismatch")]
    SignatureMismatch,

    /// Circuit breaker is open; the channel call was not attempted.
    #[error("Circuit breaker open")]
    CircuitOpen,

    /// Half-open probe slots are exhausted; the call was not attempted.
    #[error("Too many requests while probing recovery")]
    TooManyRequests,

    /// The caller's cancellation context fired.
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GatewayError {
    /// Whether a retry of the same request could plausibly succeed.
    ///
    /// Only transport-layer failures qualify. Validation, configuration,
    /// parse, and signature failures are deterministic; breaker rejections
    /// and cancellations must surface immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::Network { .. }
                | GatewayError::Timeout { .. }
                | GatewayError::GatewayStatus { .. }
        )
    }

    /// Whether this error came from the caller's cancellation context.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, GatewayError::Cancelled)
    }

    /// Whether the circuit breaker should count this as a failure.
    ///
    /// Breaker counting tracks channel health, so local rejections
    /// (validation, cancellation, breaker verdicts themselves) stay out.
    pub fn counts_against_breaker(&self) -> bool {
        matches!(
            self,
            GatewayError::Network { .. }
                | GatewayError::Timeout { .. }
                | GatewayError::GatewayStatus { .. }
                | GatewayError::RequestRejected { .. }
                | GatewayError::Parse(_)
        )
    }

    /// Create a network error with no underlying source.
    pub fn network(message: impl Into<String>) -> Self {
        GatewayError::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error wrapping an underlying cause.
    pub fn network_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        GatewayError::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a validation error.
    pub fn validation(reason: impl Into<String>) -> Self {
        GatewayError::Validation {
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        GatewayError::Configuration {
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return GatewayError::Timeout {
                operation: "http request".to_string(),
                timeout_ms: 0,
            };
        }
        if err.is_connect() {
            return GatewayError::network_with_source("connection failed", err);
        }
        GatewayError::network_with_source("http transport failure", err)
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => GatewayError::Timeout {
                operation: "socket i/o".to_string(),
                timeout_ms: 0,
            },
            ErrorKind::ConnectionRefused => {
                GatewayError::network_with_source("connection refused", err)
            }
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe => {
                GatewayError::network_with_source("connection reset", err)
            }
            _ => GatewayError::network_with_source("socket failure", err),
        }
    }
}
