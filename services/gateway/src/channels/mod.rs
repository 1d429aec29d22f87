//! Channel adapters.
//!
//! Each processor surface is its own adapter. The two Server Post encodings
//! share a capability trait so the orchestrator can swap them per
//! configuration; Key Exchange and Browser Post have different shapes (TAC
//! issuance and local form/verify work) and expose their own APIs.
//!
//! Payload building and transmission are split on the trait: the pipeline
//! builds and signs once, and only the transmit step re-runs on retry.

pub mod browser_post;
pub mod key_exchange;
pub mod server_post;
pub mod xml_socket;

pub use browser_post::{BrowserPostAdapter, BrowserPostFormData};
pub use key_exchange::{KeyExchangeChannel, Tac};
pub use server_post::ServerPostChannel;
pub use xml_socket::XmlSocketChannel;

use async_trait::async_trait;
use epx_wire::RawResponse;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::pool::Envelope;

/// A synchronous transaction channel: build one wire payload from a staged
/// envelope, then send it and decode the reply. Implementations must honor
/// the cancellation token at every suspension point.
#[async_trait]
pub trait TransactionChannel: Send + Sync {
    /// Encode the staged request into this channel's wire payload.
    fn build(&self, envelope: &mut Envelope) -> Result<String>;

    /// Send a built payload and decode the reply. Called once per retry
    /// attempt.
    async fn transmit(&self, cancel: &CancellationToken, payload: &str) -> Result<RawResponse>;

    /// Short channel name for logs.
    fn name(&self) -> &'static str;
}
