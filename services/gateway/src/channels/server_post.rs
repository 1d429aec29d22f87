//! Server Post over HTTPS.
//!
//! The primary synchronous channel for financial transactions and BRIC
//! storage. One pooled `reqwest` client serves every call through a given
//! gateway; clones of it share the same connection pool, so the Key
//! Exchange adapter reuses it instead of opening its own.

use async_trait::async_trait;
use chrono::Local;
use epx_wire::{sniff_and_parse, RawResponse};
use tokio_util::sync::CancellationToken;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::identity::MerchantIdentity;
use crate::payload;
use crate::pool::Envelope;
use crate::signing::{Signer, EPI_ID_HEADER, EPI_SIGNATURE_HEADER};

use super::TransactionChannel;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const XML_CONTENT_TYPE: &str = "application/xml";

/// HTTPS Server Post adapter.
pub struct ServerPostChannel {
    client: reqwest::Client,
    url: String,
    identity: MerchantIdentity,
    signer: Signer,
}

impl ServerPostChannel {
    /// Build the shared HTTP client per the configuration.
    ///
    /// TLS verification is disabled only when the configuration both runs
    /// in sandbox and asks for it; `GatewayConfig::validate` rejects the
    /// combination elsewhere.
    pub fn build_client(config: &GatewayConfig) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(config.http_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .danger_accept_invalid_certs(
                config.environment.is_sandbox() && config.danger_accept_invalid_certs,
            )
            .build()
            .map_err(|e| GatewayError::configuration(format!("http client: {e}")))
    }

    /// Create the adapter around an existing client.
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        identity: MerchantIdentity,
        signer: Signer,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            identity,
            signer,
        }
    }

    /// Endpoint this adapter posts to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST a pre-encoded body and decode the reply.
    ///
    /// The reply is accepted only when both `AUTH_GUID` and `AUTH_RESP`
    /// decoded non-empty; anything else is a parse error, never a decline.
    pub async fn post_body(
        &self,
        cancel: &CancellationToken,
        content_type: &str,
        body: &str,
    ) -> Result<RawResponse> {
        let signature = self.signer.sign(&self.url, body.as_bytes());

        let request = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(EPI_ID_HEADER, &self.identity.epi_id)
            .header(EPI_SIGNATURE_HEADER, signature)
            .body(body.to_string());

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
            result = request.send() => result?,
        };

        let status = response.status();
        if status.is_server_error() {
            return Err(GatewayError::GatewayStatus {
                status: status.as_u16(),
            });
        }
        if status.is_client_error() {
            return Err(GatewayError::RequestRejected {
                status: status.as_u16(),
            });
        }

        let text = tokio::select! {
            _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
            result = response.text() => result?,
        };

        let raw = sniff_and_parse(&text)?;
        raw.require("AUTH_GUID")?;
        raw.require("AUTH_RESP")?;
        Ok(raw)
    }

    /// POST a `<DETAIL>` document. Used by the BRIC storage operations.
    pub async fn post_xml(&self, cancel: &CancellationToken, body: &str) -> Result<RawResponse> {
        self.post_body(cancel, XML_CONTENT_TYPE, body).await
    }
}

#[async_trait]
impl TransactionChannel for ServerPostChannel {
    fn build(&self, envelope: &mut Envelope) -> Result<String> {
        let kind = envelope
            .request
            .tran_type
            .ok_or_else(|| GatewayError::validation("transaction kind is missing"))?;

        payload::build_financial_form(
            &self.identity,
            &envelope.request,
            kind,
            Local::now(),
            &mut envelope.form,
        );
        Ok(envelope.form.encode().to_string())
    }

    async fn transmit(&self, cancel: &CancellationToken, payload: &str) -> Result<RawResponse> {
        tracing::debug!(channel = self.name(), "sending server post");
        self.post_body(cancel, FORM_CONTENT_TYPE, payload).await
    }

    fn name(&self) -> &'static str {
        "server-post-https"
    }
}
