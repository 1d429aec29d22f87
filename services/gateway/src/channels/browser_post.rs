//! Browser Post: merchant-hosted redirect flow.
//!
//! The merchant backend never touches card data on this channel. It builds
//! a form the user agent posts straight to the processor, bound to a TAC
//! from Key Exchange, and later receives the processor's verdict as
//! redirect query parameters. The redirect is authenticated by recomputing
//! an HMAC over a fixed ordering of the response fields.

use epx_wire::{RawResponse, ResponseFormat};

use crate::config::BrowserPostConfig;
use crate::error::{GatewayError, Result};
use crate::identity::MerchantIdentity;
use crate::request::{TranType, TransactionRequest};
use crate::response::TransactionResponse;
use crate::signing::Signer;

use super::key_exchange::Tac;

/// The hidden-field set a user agent will POST to the processor.
///
/// Derived per request; never persisted. `REDIRECT_URL` is intentionally
/// absent: it is bound inside the TAC and the processor rejects attempts to
/// override it in the form.
#[derive(Debug, Clone)]
pub struct BrowserPostFormData {
    /// Processor endpoint to POST to.
    pub post_url: String,
    /// Hidden fields in render order.
    pub fields: Vec<(String, String)>,
    /// Where the processor sends the user agent on approval.
    pub success_url: String,
    /// Where the processor sends the user agent on decline, when distinct.
    pub decline_url: Option<String>,
    /// Where the processor sends the user agent on error, when distinct.
    pub error_url: Option<String>,
}

/// Browser Post adapter: form construction and redirect verification.
pub struct BrowserPostAdapter {
    config: BrowserPostConfig,
    identity: MerchantIdentity,
    signer: Signer,
}

impl BrowserPostAdapter {
    /// Create the adapter.
    pub fn new(config: BrowserPostConfig, identity: MerchantIdentity, signer: Signer) -> Self {
        Self {
            config,
            identity,
            signer,
        }
    }

    /// Build the redirect form for a transaction bound to `tac`.
    ///
    /// Storage flows reference a prior BRIC through `original_auth_guid`;
    /// card flows may stage account fields for processor-side entry.
    pub fn build_form(
        &self,
        tac: &Tac,
        request: &TransactionRequest,
        kind: TranType,
        merchant_name: Option<&str>,
    ) -> Result<BrowserPostFormData> {
        if tac.code.is_empty() {
            return Err(GatewayError::validation("TAC is empty"));
        }
        if tac.is_expired() {
            return Err(GatewayError::validation("TAC has expired"));
        }
        let success_url = request
            .redirect_url
            .clone()
            .ok_or_else(|| GatewayError::validation("browser post requires a redirect URL"))?;

        let mut fields: Vec<(String, String)> = vec![
            ("TAC".to_string(), tac.code.clone()),
            ("CUST_NBR".to_string(), self.identity.cust_nbr.clone()),
            ("MERCH_NBR".to_string(), self.identity.merch_nbr.clone()),
            ("DBA_NBR".to_string(), self.identity.dba_nbr.clone()),
            ("TERMINAL_NBR".to_string(), self.identity.terminal_nbr.clone()),
            ("TRAN_TYPE".to_string(), kind.wire_code().to_string()),
            ("AMOUNT".to_string(), request.amount.clone()),
            ("TRAN_NBR".to_string(), request.tran_nbr.clone()),
        ];
        push_optional(&mut fields, "TRAN_GROUP", request.tran_group.as_deref());
        push_optional(&mut fields, "INDUSTRY_TYPE", request.industry_type.as_deref());
        push_optional(&mut fields, "CARD_ENT_METH", request.card_ent_meth.as_deref());
        push_optional(&mut fields, "ORIG_AUTH_GUID", request.original_auth_guid.as_deref());
        push_optional(&mut fields, "ACCOUNT_NBR", request.account_nbr.as_deref());
        push_optional(&mut fields, "EXP_DATE", request.exp_date.as_deref());
        push_optional(&mut fields, "MERCH_NAME", merchant_name);

        Ok(BrowserPostFormData {
            post_url: self.config.post_url.clone(),
            fields,
            success_url,
            decline_url: request.decline_redirect_url.clone(),
            error_url: request.error_redirect_url.clone(),
        })
    }

    /// Parse the processor's redirect query into a normalized response.
    ///
    /// `AUTH_GUID` and `AUTH_RESP` are required; every other parameter is
    /// carried through when present. Parsing performs no MAC check — call
    /// [`BrowserPostAdapter::verify_response_mac`] (or use
    /// [`BrowserPostAdapter::parse_and_verify`]) before trusting the verdict.
    pub fn parse_redirect(&self, query: &str, storage: bool) -> Result<TransactionResponse> {
        let raw = redirect_params(query)?;
        TransactionResponse::from_raw(&raw, TranType::Sale.network(), storage)
    }

    /// Recompute the response MAC over the configured field order and
    /// compare constant-time against the `MAC` parameter.
    ///
    /// Fails on a missing `MAC`, a mismatch, or any tampered signed field
    /// (a tampered field changes the recomputed digest). A disabled
    /// verification flag short-circuits to success; configuration
    /// validation restricts that to the sandbox.
    pub fn verify_response_mac(&self, query: &str) -> Result<()> {
        if !self.config.verify_response_mac {
            tracing::warn!("browser post MAC verification is disabled (sandbox)");
            return Ok(());
        }

        let raw = redirect_params(query)?;
        let presented = raw
            .get_non_empty("MAC")
            .ok_or(GatewayError::SignatureMismatch)?;

        let values: Vec<&str> = self
            .config
            .mac_fields
            .iter()
            .map(|field| raw.get(field).unwrap_or(""))
            .collect();

        if self.signer.verify_concat(values, presented) {
            Ok(())
        } else {
            Err(GatewayError::SignatureMismatch)
        }
    }

    /// Verify then parse: the strict path callers should default to.
    pub fn parse_and_verify(&self, query: &str, storage: bool) -> Result<TransactionResponse> {
        self.verify_response_mac(query)?;
        self.parse_redirect(query, storage)
    }
}

fn push_optional(fields: &mut Vec<(String, String)>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        if !value.is_empty() {
            fields.push((key.to_string(), value.to_string()));
        }
    }
}

/// Decode redirect query parameters, tolerating a leading `?`.
fn redirect_params(query: &str) -> Result<RawResponse> {
    let query = query.trim_start_matches('?');
    let pairs = epx_wire::form::parse_pairs(query)?;
    Ok(RawResponse::from_pairs(
        pairs,
        ResponseFormat::KeyValue,
        query,
    ))
}
