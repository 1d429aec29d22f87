//! The request pipeline orchestrator.
//!
//! One `Gateway` per merchant identity. Every operation funnels through the
//! same path: validate, stage into a pooled envelope, build and sign the
//! wire payload, offer the call to the circuit breaker, run the retry loop,
//! normalize and classify the reply, scrub. The breaker and the envelope
//! pool are the only state shared between calls.

use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use zeroize::Zeroize;

use crate::channels::{
    BrowserPostAdapter, BrowserPostFormData, KeyExchangeChannel, ServerPostChannel, Tac,
    TransactionChannel, XmlSocketChannel,
};
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerMetrics};
use crate::config::{ChannelKind, GatewayConfig};
use crate::error::{GatewayError, Result};
use crate::identity::MerchantIdentity;
use crate::pool::{PoolStats, RequestPool};
use crate::request::{TranType, TransactionRequest};
use crate::response::TransactionResponse;
use crate::retry::retry_with_backoff;
use crate::signing::Signer;
use crate::validation::validate;

/// The payment-gateway adapter.
///
/// Safe for concurrent use from many tasks; each call is independent except
/// for the shared circuit breaker and pools.
pub struct Gateway {
    config: GatewayConfig,
    identity: MerchantIdentity,
    breaker: Arc<CircuitBreaker>,
    pool: Arc<RequestPool>,
    https: ServerPostChannel,
    xml_socket: XmlSocketChannel,
    key_exchange: KeyExchangeChannel,
    browser_post: BrowserPostAdapter,
}

impl Gateway {
    /// Construct a gateway, building the pooled HTTP client from config.
    pub fn new(config: GatewayConfig, identity: MerchantIdentity) -> Result<Self> {
        let client = ServerPostChannel::build_client(&config)?;
        Self::with_client(config, identity, client)
    }

    /// Construct a gateway around an injected HTTP client. Test seam and
    /// dependency-injection constructor.
    pub fn with_client(
        config: GatewayConfig,
        identity: MerchantIdentity,
        client: reqwest::Client,
    ) -> Result<Self> {
        config.validate()?;
        identity.validate().map_err(GatewayError::configuration)?;

        let signer = Signer::new(&identity.mac_key);
        let https = ServerPostChannel::new(
            client.clone(),
            config.server_post_url.clone(),
            identity.clone(),
            signer.clone(),
        );
        let xml_socket = XmlSocketChannel::new(
            config.xml_socket_addr.clone(),
            config.socket_timeout,
            identity.clone(),
        );
        let key_exchange = KeyExchangeChannel::new(
            client,
            config.key_exchange_url.clone(),
            identity.clone(),
            signer.clone(),
            config.tac_duration,
        );
        let browser_post =
            BrowserPostAdapter::new(config.browser_post.clone(), identity.clone(), signer);

        Ok(Self {
            breaker: Arc::new(CircuitBreaker::new(config.breaker.clone())),
            pool: RequestPool::new(config.envelope_pool_size),
            config,
            identity,
            https,
            xml_socket,
            key_exchange,
            browser_post,
        })
    }

    /// The merchant identity this gateway sends as.
    pub fn identity(&self) -> &MerchantIdentity {
        &self.identity
    }

    /// Circuit breaker metrics snapshot.
    pub fn breaker_metrics(&self) -> CircuitBreakerMetrics {
        self.breaker.metrics()
    }

    /// Return the breaker to closed with zeroed counters.
    pub fn reset_breaker(&self) {
        self.breaker.reset();
    }

    /// Envelope pool statistics.
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    // ---- Financial operations -------------------------------------------

    /// Sale: authorize and capture in one step.
    pub async fn sale(
        &self,
        cancel: &CancellationToken,
        request: TransactionRequest,
    ) -> Result<TransactionResponse> {
        self.submit_as(cancel, request, TranType::Sale).await
    }

    /// Authorization only; capture later.
    pub async fn authorize(
        &self,
        cancel: &CancellationToken,
        request: TransactionRequest,
    ) -> Result<TransactionResponse> {
        self.submit_as(cancel, request, TranType::AuthOnly).await
    }

    /// Capture a prior authorization. `original_auth_guid` is required.
    pub async fn capture(
        &self,
        cancel: &CancellationToken,
        request: TransactionRequest,
    ) -> Result<TransactionResponse> {
        self.submit_as(cancel, request, TranType::Capture).await
    }

    /// Refund against a prior sale or capture.
    pub async fn refund(
        &self,
        cancel: &CancellationToken,
        request: TransactionRequest,
    ) -> Result<TransactionResponse> {
        self.submit_as(cancel, request, TranType::Refund).await
    }

    /// Void a prior transaction.
    pub async fn void(
        &self,
        cancel: &CancellationToken,
        request: TransactionRequest,
    ) -> Result<TransactionResponse> {
        self.submit_as(cancel, request, TranType::Void).await
    }

    /// Submit a request whose kind is already set: ACH debits/credits,
    /// pre-notes, PIN-less debit, and anything else without a named wrapper.
    ///
    /// Storage kinds have their own wire shape; use the BRIC operations
    /// (`store_bric_from_transaction`, `store_bric_from_account`,
    /// `update_bric`) instead.
    pub async fn submit(
        &self,
        cancel: &CancellationToken,
        request: TransactionRequest,
    ) -> Result<TransactionResponse> {
        let kind = request
            .tran_type
            .ok_or_else(|| GatewayError::validation("transaction kind is missing"))?;
        if kind.is_storage() {
            return Err(GatewayError::validation(
                "storage kinds go through the BRIC storage operations",
            ));
        }
        self.submit_as(cancel, request, kind).await
    }

    /// Validate a stored token with a zero-dollar authorization over
    /// Server Post HTTPS.
    pub async fn validate_token(
        &self,
        cancel: &CancellationToken,
        token: &str,
        tran_nbr: &str,
    ) -> Result<TransactionResponse> {
        if token.is_empty() {
            return Err(GatewayError::validation("token must not be empty"));
        }
        let request = TransactionRequest {
            tran_type: Some(TranType::AuthOnly),
            amount: "0.00".to_string(),
            tran_nbr: tran_nbr.to_string(),
            original_auth_guid: Some(token.to_string()),
            ..Default::default()
        };
        self.execute(cancel, request, ChannelKind::Https).await
    }

    // ---- Browser Post ---------------------------------------------------

    /// Start a merchant-hosted tokenization or payment: issue a TAC, then
    /// build the form the user agent will POST to the processor.
    pub async fn begin_browser_post(
        &self,
        cancel: &CancellationToken,
        mut request: TransactionRequest,
        merchant_name: Option<&str>,
    ) -> Result<(Tac, BrowserPostFormData)> {
        if request.tran_type.is_none() {
            request.tran_type = Some(TranType::Sale);
        }
        let kind = validate(&self.identity, &self.config, &request)?;
        if request.redirect_url.is_none() {
            return Err(GatewayError::validation(
                "browser post requires a redirect URL",
            ));
        }

        let tac = self
            .breaker
            .call(|| {
                retry_with_backoff(&self.config.retry, cancel, |_attempt| {
                    self.key_exchange.issue_tac(cancel, &request)
                })
            })
            .await?;
        let form = self
            .browser_post
            .build_form(&tac, &request, kind, merchant_name)?;
        Ok((tac, form))
    }

    /// Verify and parse a Browser Post redirect. The strict default path.
    pub fn complete_browser_post(
        &self,
        query: &str,
        storage: bool,
    ) -> Result<TransactionResponse> {
        self.browser_post.parse_and_verify(query, storage)
    }

    /// Parse a redirect without MAC verification. Callers using this path
    /// must treat the transaction as unverified.
    pub fn parse_browser_post_redirect(
        &self,
        query: &str,
        storage: bool,
    ) -> Result<TransactionResponse> {
        self.browser_post.parse_redirect(query, storage)
    }

    /// MAC-verify a redirect without parsing it.
    pub fn verify_browser_post_mac(&self, query: &str) -> Result<()> {
        self.browser_post.verify_response_mac(query)
    }

    // ---- Internals ------------------------------------------------------

    async fn submit_as(
        &self,
        cancel: &CancellationToken,
        mut request: TransactionRequest,
        kind: TranType,
    ) -> Result<TransactionResponse> {
        request.tran_type = Some(kind);
        self.execute(cancel, request, self.config.financial_channel)
            .await
    }

    pub(crate) async fn execute(
        &self,
        cancel: &CancellationToken,
        request: TransactionRequest,
        channel: ChannelKind,
    ) -> Result<TransactionResponse> {
        let started = Instant::now();
        let kind = validate(&self.identity, &self.config, &request)?;
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }

        let mut envelope = self.pool.acquire();
        envelope.request = request;

        let channel: &dyn TransactionChannel = match channel {
            ChannelKind::Https => &self.https,
            ChannelKind::XmlSocket => &self.xml_socket,
        };
        let mut payload = channel.build(&mut envelope)?;

        let result = self
            .breaker
            .call(|| {
                retry_with_backoff(&self.config.retry, cancel, |_attempt| {
                    channel.transmit(cancel, &payload)
                })
            })
            .await;

        // The payload copy can carry a PAN; the envelope guard scrubs the
        // pooled buffers, this scrubs the copy.
        payload.zeroize();
        drop(envelope);

        let raw = result?;
        let response = TransactionResponse::from_raw(&raw, kind.network(), kind.is_storage())?;
        let classification = response.classification();
        tracing::info!(
            channel = channel.name(),
            tran_type = %kind,
            tran_nbr = response.tran_nbr.as_deref().unwrap_or(""),
            auth_resp = %response.auth_resp,
            approved = response.is_approved,
            category = classification.info.category.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "transaction processed"
        );
        Ok(response)
    }

    pub(crate) fn https_channel(&self) -> &ServerPostChannel {
        &self.https
    }

    pub(crate) fn breaker_ref(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub(crate) fn retry_policy(&self) -> &crate::retry::RetryPolicy {
        &self.config.retry
    }

    pub(crate) fn validate_request(&self, request: &TransactionRequest) -> Result<TranType> {
        validate(&self.identity, &self.config, request)
    }

    pub(crate) fn pool_ref(&self) -> &Arc<RequestPool> {
        &self.pool
    }
}
