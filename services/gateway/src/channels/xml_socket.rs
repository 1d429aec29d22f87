//! Server Post over a raw TCP socket.
//!
//! The alternate framing for the same semantic contract: one XML document
//! out, one XML document back, connection closed by the processor. There is
//! no length prefix or document sentinel on the reply; the reader
//! accumulates until the peer closes or the socket deadline elapses and
//! hands whatever arrived to the parser.

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::Local;
use epx_wire::{sniff_and_parse, RawResponse};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::error::{GatewayError, Result};
use crate::identity::MerchantIdentity;
use crate::payload;
use crate::pool::Envelope;

use super::TransactionChannel;

/// Initial reply buffer size; replies of at least 4 KiB must fit without
/// reallocation churn.
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// XML-over-TCP Server Post adapter.
pub struct XmlSocketChannel {
    addr: String,
    timeout: Duration,
    identity: MerchantIdentity,
}

impl XmlSocketChannel {
    /// Create the adapter for a `host:port` endpoint.
    pub fn new(addr: impl Into<String>, timeout: Duration, identity: MerchantIdentity) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            identity,
        }
    }

    /// Endpoint this adapter connects to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send one document and read the reply under a single deadline
    /// covering connect, write, and read.
    pub async fn exchange(&self, cancel: &CancellationToken, document: &str) -> Result<RawResponse> {
        let deadline = Instant::now() + self.timeout;

        let work = self.exchange_inner(document, deadline);
        let text = tokio::select! {
            _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
            result = work => result?,
        };

        let raw = sniff_and_parse(&text)?;
        raw.require("AUTH_GUID")?;
        raw.require("AUTH_RESP")?;
        Ok(raw)
    }

    async fn exchange_inner(&self, document: &str, deadline: Instant) -> Result<String> {
        let mut stream = self
            .deadline_bound(deadline, "connect", TcpStream::connect(&self.addr))
            .await??;

        self.deadline_bound(deadline, "write", stream.write_all(document.as_bytes()))
            .await??;
        self.deadline_bound(deadline, "write", stream.flush()).await??;

        // Read until the processor closes the connection or the deadline
        // elapses. A deadline expiry with data already buffered is not an
        // error; some processor configurations hold the socket open after
        // the reply.
        let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
        loop {
            let remaining = match deadline.checked_duration_since(Instant::now()) {
                Some(remaining) if !remaining.is_zero() => remaining,
                _ => break,
            };
            match tokio::time::timeout(remaining, stream.read_buf(&mut buf)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(_)) => continue,
                Ok(Err(err)) => return Err(err.into()),
                Err(_elapsed) => break,
            }
        }

        if buf.is_empty() {
            return Err(GatewayError::Timeout {
                operation: "socket read".to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            });
        }

        String::from_utf8(buf.to_vec())
            .map_err(|e| GatewayError::network(format!("reply is not UTF-8: {e}")))
    }

    async fn deadline_bound<F, T>(
        &self,
        deadline: Instant,
        operation: &str,
        future: F,
    ) -> Result<std::result::Result<T, std::io::Error>>
    where
        F: std::future::Future<Output = std::result::Result<T, std::io::Error>>,
    {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .unwrap_or(Duration::ZERO);
        tokio::time::timeout(remaining, future)
            .await
            .map_err(|_| GatewayError::Timeout {
                operation: format!("socket {operation}"),
                timeout_ms: self.timeout.as_millis() as u64,
            })
    }
}

#[async_trait]
impl TransactionChannel for XmlSocketChannel {
    fn build(&self, envelope: &mut Envelope) -> Result<String> {
        let kind = envelope
            .request
            .tran_type
            .ok_or_else(|| GatewayError::validation("transaction kind is missing"))?;

        // The request root names the transaction by its wire code; the
        // `<DETAIL>` root is exclusive to the BRIC storage body.
        payload::build_socket_xml(
            &self.identity,
            &envelope.request,
            kind,
            Local::now(),
            &mut envelope.xml,
        );
        Ok(envelope.xml.finish().to_string())
    }

    async fn transmit(&self, cancel: &CancellationToken, payload: &str) -> Result<RawResponse> {
        tracing::debug!(channel = self.name(), addr = %self.addr, "sending xml socket post");
        self.exchange(cancel, payload).await
    }

    fn name(&self) -> &'static str {
        "server-post-xml-socket"
    }
}
