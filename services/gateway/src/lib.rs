//! # EPX Gateway - Payment Processor Adapter Core
//!
//! ## Purpose
//!
//! Carries structured financial requests (authorize, capture, sale, void,
//! refund, pre-note, BRIC storage, token validation) to the EPX processor
//! over whichever channel the processor prescribes, normalizes the
//! heterogeneous replies into one response model, and enforces the safety
//! properties around tokenization, retry, and failure isolation.
//!
//! ## Architecture Role
//!
//! The gateway sits between the merchant-facing service layer and the
//! processor's four transport surfaces:
//!
//! - **Server Post (HTTPS)** — primary synchronous channel for financial
//!   transactions and BRIC storage.
//! - **Server Post (XML socket)** — alternate TCP framing, same contract.
//! - **Key Exchange** — issues the short-lived TAC for Browser Post.
//! - **Browser Post** — merchant-hosted redirect form plus MAC-verified
//!   callback parsing; card data never touches the merchant backend.
//!
//! Every call runs the same pipeline: validate, stage into a pooled
//! envelope, build and sign the payload, offer to the circuit breaker, run
//! the retry loop, parse and classify, scrub. Declines come back as normal
//! responses with `is_approved == false`; errors are reserved for failures
//! to obtain a verdict.
//!
//! ## Safety Properties
//!
//! - No PAN, CVV, or account number survives a pooled envelope release.
//! - Validation failures perform no network I/O.
//! - The circuit breaker isolates a failing processor; declines never trip
//!   it.
//! - Cancellation propagates through every send, read, and backoff sleep.
//! - Browser Post verdicts are authenticated with a constant-time HMAC
//!   comparison before anything trusts them.
//!
//! ## Example
//!
//! ```rust,no_run
//! use epx_gateway::{Environment, Gateway, GatewayConfig, MerchantIdentity, TransactionRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> epx_gateway::Result<()> {
//! let identity = MerchantIdentity {
//!     cust_nbr: "9001".into(),
//!     merch_nbr: "900300".into(),
//!     dba_nbr: "2".into(),
//!     terminal_nbr: "21".into(),
//!     environment: Environment::Test,
//!     epi_id: "9001-900300-2-21".into(),
//!     mac_key: "mac-key".into(),
//! };
//! let gateway = Gateway::new(GatewayConfig::sandbox(), identity)?;
//!
//! let request = TransactionRequest {
//!     amount: "10.00".into(),
//!     tran_nbr: "12345".into(),
//!     account_nbr: Some("4111111111111111".into()),
//!     exp_date: Some("1225".into()),
//!     cvv2: Some("123".into()),
//!     ..Default::default()
//! };
//! let response = gateway.sale(&CancellationToken::new(), request).await?;
//! if response.is_approved {
//!     // response.auth_guid is the BRIC for captures/voids/refunds.
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bric;
pub mod channels;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod payload;
pub mod pool;
pub mod request;
pub mod response;
pub mod retry;
pub mod signing;
pub mod validation;

// Re-export the primary surface.
pub use channels::{
    BrowserPostAdapter, BrowserPostFormData, KeyExchangeChannel, ServerPostChannel, Tac,
    TransactionChannel, XmlSocketChannel,
};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState};
pub use config::{BrowserPostConfig, ChannelKind, GatewayConfig};
pub use error::{GatewayError, Result};
pub use gateway::Gateway;
pub use identity::{Environment, MerchantIdentity};
pub use pool::{Envelope, PoolStats, PooledEnvelope, RequestPool};
pub use request::{mask_account, TranType, TransactionRequest};
pub use response::TransactionResponse;
pub use retry::{retry_with_backoff, RetryPolicy};
pub use signing::{Signer, EPI_ID_HEADER, EPI_SIGNATURE_HEADER};

// Re-export the classification types callers consume alongside responses.
pub use epx_codes::{
    classify, Classification, Network, PaymentError, ResponseCategory, ResponseCodeInfo,
};
