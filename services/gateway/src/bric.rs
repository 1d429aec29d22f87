//! BRIC storage sub-protocol.
//!
//! Three operations, all carried over Server Post HTTPS with a `<DETAIL>`
//! XML body: convert a prior approved transaction into a long-lived storage
//! token, create a token directly from a raw account, and update the
//! reference data bound to an existing token. Storage replies treat both
//! `00` and `85` as approved.

use chrono::Local;
use tokio_util::sync::CancellationToken;
use zeroize::Zeroize;

use crate::error::{GatewayError, Result};
use crate::gateway::Gateway;
use crate::payload;
use crate::request::{TranType, TransactionRequest};
use crate::response::TransactionResponse;
use crate::retry::retry_with_backoff;

/// Entry method for tokens minted from a prior transaction GUID.
const ENTRY_FROM_GUID: &str = "Z";
/// Entry method for credit tokens minted from a raw card number.
const ENTRY_FROM_CARD: &str = "E";
/// Entry method for ACH tokens minted from a raw bank account.
const ENTRY_FROM_BANK: &str = "X";

impl Gateway {
    /// Convert a prior approved transaction's GUID into a storage BRIC.
    ///
    /// The credit variant carries billing fields for account verification;
    /// the ACH variant carries account and routing data. Pick the variant
    /// with `request.tran_type` (`CreditBricStorage` when unset).
    pub async fn store_bric_from_transaction(
        &self,
        cancel: &CancellationToken,
        mut request: TransactionRequest,
    ) -> Result<TransactionResponse> {
        if request
            .original_auth_guid
            .as_deref()
            .map_or(true, str::is_empty)
        {
            return Err(GatewayError::validation(
                "BRIC storage from a prior transaction requires original_auth_guid",
            ));
        }
        let kind = storage_kind(&request)?;
        request.tran_type = Some(kind);
        request.card_ent_meth = Some(ENTRY_FROM_GUID.to_string());
        self.storage_call(cancel, request, kind, None).await
    }

    /// Mint a storage BRIC directly from a raw card or bank account.
    pub async fn store_bric_from_account(
        &self,
        cancel: &CancellationToken,
        mut request: TransactionRequest,
    ) -> Result<TransactionResponse> {
        if request.account_nbr.as_deref().map_or(true, str::is_empty) {
            return Err(GatewayError::validation(
                "BRIC storage from an account requires account_nbr",
            ));
        }
        let kind = storage_kind(&request)?;
        request.tran_type = Some(kind);
        request.card_ent_meth = Some(
            if kind == TranType::AchBricStorage {
                ENTRY_FROM_BANK
            } else {
                ENTRY_FROM_CARD
            }
            .to_string(),
        );
        self.storage_call(cancel, request, kind, None).await
    }

    /// Update reference data (names, address, ZIP, expiration) bound to an
    /// existing storage token.
    ///
    /// The processor may echo a new GUID; the ORIGINAL token stays the
    /// canonical one. Both are logged, the echoed GUID is surfaced as
    /// `new_auth_guid`, and `auth_guid` on the returned response is always
    /// the original.
    pub async fn update_bric(
        &self,
        cancel: &CancellationToken,
        mut request: TransactionRequest,
    ) -> Result<TransactionResponse> {
        let original = request
            .original_auth_guid
            .clone()
            .filter(|guid| !guid.is_empty())
            .ok_or_else(|| {
                GatewayError::validation("BRIC update requires original_auth_guid")
            })?;
        let kind = storage_kind(&request)?;
        request.tran_type = Some(kind);
        request.card_ent_meth = Some(ENTRY_FROM_GUID.to_string());
        self.storage_call(cancel, request, kind, Some(original)).await
    }

    /// Shared storage-call path: build the `<DETAIL>` document, run it
    /// through the breaker and retry loop over HTTPS, normalize with the
    /// storage approval set.
    async fn storage_call(
        &self,
        cancel: &CancellationToken,
        request: TransactionRequest,
        kind: TranType,
        canonical_guid: Option<String>,
    ) -> Result<TransactionResponse> {
        self.validate_request(&request)?;
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }

        let mut envelope = self.pool_ref().acquire();
        envelope.request = request;

        let staged = &mut *envelope;
        payload::build_detail_xml(
            self.identity(),
            &staged.request,
            kind,
            Local::now(),
            &mut staged.xml,
        );
        let mut document = staged.xml.finish().to_string();

        let https = self.https_channel();
        let result = self
            .breaker_ref()
            .call(|| {
                retry_with_backoff(self.retry_policy(), cancel, |_attempt| {
                    https.post_xml(cancel, &document)
                })
            })
            .await;

        document.zeroize();
        drop(envelope);

        let raw = result?;
        let mut response = TransactionResponse::from_raw(&raw, kind.network(), true)?;

        if let Some(original) = canonical_guid {
            if response.auth_guid != original {
                tracing::info!(
                    original_guid = %original,
                    echoed_guid = %response.auth_guid,
                    "BRIC update echoed a new GUID; keeping the original as canonical"
                );
                response.new_auth_guid = Some(std::mem::replace(
                    &mut response.auth_guid,
                    original,
                ));
            }
        }

        tracing::info!(
            tran_type = %kind,
            approved = response.is_approved,
            auth_resp = %response.auth_resp,
            "storage operation processed"
        );
        Ok(response)
    }
}

fn storage_kind(request: &TransactionRequest) -> Result<TranType> {
    match request.tran_type {
        None => Ok(TranType::CreditBricStorage),
        Some(kind) if kind.is_storage() => Ok(kind),
        Some(other) => Err(GatewayError::validation(format!(
            "{} is not a storage kind",
            other.wire_code()
        ))),
    }
}
