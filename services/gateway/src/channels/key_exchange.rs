//! Key Exchange: Terminal Authorization Code issuance.
//!
//! A TAC authorizes exactly one Browser Post submission with the enclosed
//! parameters. The adapter is stateless with respect to issued TACs: it
//! stamps the validity window and hands the code to the caller, never
//! storing it.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use epx_wire::FormBuilder;

use crate::error::{GatewayError, Result};
use crate::identity::MerchantIdentity;
use crate::request::TransactionRequest;
use crate::signing::{Signer, EPI_ID_HEADER, EPI_SIGNATURE_HEADER};

/// A Terminal Authorization Code with its validity window.
///
/// Single-use by contract; `expires_at` is stamped by the adapter, not
/// returned by the processor.
#[derive(Debug, Clone)]
pub struct Tac {
    /// The opaque code.
    pub code: String,
    /// When the code stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl Tac {
    /// Whether the code is still inside its validity window.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Key Exchange adapter.
pub struct KeyExchangeChannel {
    client: reqwest::Client,
    url: String,
    identity: MerchantIdentity,
    signer: Signer,
    tac_duration: Duration,
}

impl KeyExchangeChannel {
    /// Create the adapter. The client is a clone of the gateway's pooled
    /// HTTP client.
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        identity: MerchantIdentity,
        signer: Signer,
        tac_duration: Duration,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            identity,
            signer,
            tac_duration,
        }
    }

    /// Request a TAC binding the merchant, transaction number, amount, and
    /// redirect URL. An empty TAC in the reply is a hard error.
    pub async fn issue_tac(
        &self,
        cancel: &CancellationToken,
        request: &TransactionRequest,
    ) -> Result<Tac> {
        let mut form = FormBuilder::new();
        form.field("CUST_NBR", &self.identity.cust_nbr)
            .field("MERCH_NBR", &self.identity.merch_nbr)
            .field("DBA_NBR", &self.identity.dba_nbr)
            .field("TERMINAL_NBR", &self.identity.terminal_nbr)
            .field("AMOUNT", &request.amount)
            .field("TRAN_NBR", &request.tran_nbr);
        form.optional_field("TRAN_GROUP", request.tran_group.as_deref())
            .optional_field("REDIRECT_URL", request.redirect_url.as_deref())
            .optional_field("CUST_ID", request.customer_id.as_deref());
        for (key, value) in &request.metadata {
            form.field(key, value);
        }
        let body = form.encode().to_string();
        form.clear();

        let signature = self.signer.sign(&self.url, body.as_bytes());
        let http_request = self
            .client
            .post(&self.url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .header(EPI_ID_HEADER, &self.identity.epi_id)
            .header(EPI_SIGNATURE_HEADER, signature)
            .body(body);

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
            result = http_request.send() => result?,
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

        let code = parse_tac_body(&text)?;
        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.tac_duration)
                .map_err(|e| GatewayError::configuration(format!("tac_duration: {e}")))?;

        tracing::debug!(tran_nbr = %request.tran_nbr, %expires_at, "issued TAC");
        Ok(Tac { code, expires_at })
    }
}

/// Extract the TAC from a reply body: either `TAC=…` (possibly among other
/// pairs) or the bare code on its own.
fn parse_tac_body(body: &str) -> Result<String> {
    let trimmed = body.trim();
    let code = if trimmed.contains('=') {
        epx_wire::form::parse_pairs(trimmed)?
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("TAC"))
            .map(|(_, value)| value)
            .unwrap_or_default()
    } else {
        trimmed.to_string()
    };

    if code.is_empty() {
        return Err(GatewayError::Parse(epx_wire::WireError::MissingField {
            field: "TAC".to_string(),
        }));
    }
    Ok(code)
}
