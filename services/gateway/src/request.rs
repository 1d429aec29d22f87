//! Transaction request model and the transaction-kind table.

use epx_codes::Network;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use zeroize::Zeroize;

/// Every transaction kind the processor recognizes, with its wire code.
///
/// The wire codes are part of the external contract and must be sent
/// bit-exact; see [`TranType::wire_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranType {
    /// Credit sale: authorize and capture in one step.
    Sale,
    /// Credit authorization only; funds held, not captured.
    AuthOnly,
    /// Capture of a prior authorization.
    Capture,
    /// Refund against a prior sale or capture.
    Refund,
    /// Void of a prior sale, capture, or authorization.
    Void,
    /// Convert a credit card or prior credit transaction into a storage BRIC.
    CreditBricStorage,
    /// ACH debit from a checking account.
    AchCheckingDebit,
    /// ACH credit to a checking account, referencing a prior debit.
    AchCheckingCredit,
    /// Zero-dollar ACH pre-note against a checking account.
    AchCheckingPrenote,
    /// Void of a prior ACH checking entry.
    AchCheckingVoid,
    /// ACH debit from a savings account.
    AchSavingsDebit,
    /// ACH credit to a savings account, referencing a prior debit.
    AchSavingsCredit,
    /// Zero-dollar ACH pre-note against a savings account.
    AchSavingsPrenote,
    /// Void of a prior ACH savings entry.
    AchSavingsVoid,
    /// Convert a bank account or prior ACH entry into a storage BRIC.
    AchBricStorage,
    /// PIN-less debit purchase.
    PinlessDebitPurchase,
    /// PIN-less debit return, referencing a prior purchase.
    PinlessDebitReturn,
    /// Void of a prior PIN-less debit entry.
    PinlessDebitVoid,
}

impl TranType {
    /// The bit-exact `TRAN_TYPE` wire code.
    pub fn wire_code(&self) -> &'static str {
        match self {
            TranType::Sale => "CCE1",
            TranType::AuthOnly => "CCE2",
            TranType::Capture => "CCE4",
            TranType::Refund => "CCE9",
            TranType::Void => "CCEX",
            TranType::CreditBricStorage => "CCE8",
            TranType::AchCheckingDebit => "CKC1",
            TranType::AchCheckingCredit => "CKC2",
            TranType::AchCheckingPrenote => "CKC0",
            TranType::AchCheckingVoid => "CKCX",
            TranType::AchSavingsDebit => "CKS1",
            TranType::AchSavingsCredit => "CKS2",
            TranType::AchSavingsPrenote => "CKS0",
            TranType::AchSavingsVoid => "CKSX",
            TranType::AchBricStorage => "CKC8",
            TranType::PinlessDebitPurchase => "DB0P",
            TranType::PinlessDebitReturn => "DB0R",
            TranType::PinlessDebitVoid => "DB0X",
        }
    }

    /// Reverse of [`TranType::wire_code`].
    pub fn from_wire_code(code: &str) -> Option<Self> {
        Some(match code {
            "CCE1" => TranType::Sale,
            "CCE2" => TranType::AuthOnly,
            "CCE4" => TranType::Capture,
            "CCE9" => TranType::Refund,
            "CCEX" => TranType::Void,
            "CCE8" => TranType::CreditBricStorage,
            "CKC1" => TranType::AchCheckingDebit,
            "CKC2" => TranType::AchCheckingCredit,
            "CKC0" => TranType::AchCheckingPrenote,
            "CKCX" => TranType::AchCheckingVoid,
            "CKS1" => TranType::AchSavingsDebit,
            "CKS2" => TranType::AchSavingsCredit,
            "CKS0" => TranType::AchSavingsPrenote,
            "CKSX" => TranType::AchSavingsVoid,
            "CKC8" => TranType::AchBricStorage,
            "DB0P" => TranType::PinlessDebitPurchase,
            "DB0R" => TranType::PinlessDebitReturn,
            "DB0X" => TranType::PinlessDebitVoid,
            _ => return None,
        })
    }

    /// True for ACH checking and savings kinds.
    pub fn is_ach(&self) -> bool {
        matches!(
            self,
            TranType::AchCheckingDebit
                | TranType::AchCheckingCredit
                | TranType::AchCheckingPrenote
                | TranType::AchCheckingVoid
                | TranType::AchSavingsDebit
                | TranType::AchSavingsCredit
                | TranType::AchSavingsPrenote
                | TranType::AchSavingsVoid
                | TranType::AchBricStorage
        )
    }

    /// True for the savings-account ACH kinds.
    pub fn is_savings(&self) -> bool {
        matches!(
            self,
            TranType::AchSavingsDebit
                | TranType::AchSavingsCredit
                | TranType::AchSavingsPrenote
                | TranType::AchSavingsVoid
        )
    }

    /// True for PIN-less debit kinds.
    pub fn is_pinless_debit(&self) -> bool {
        matches!(
            self,
            TranType::PinlessDebitPurchase
                | TranType::PinlessDebitReturn
                | TranType::PinlessDebitVoid
        )
    }

    /// True for the BRIC storage kinds.
    pub fn is_storage(&self) -> bool {
        matches!(self, TranType::CreditBricStorage | TranType::AchBricStorage)
    }

    /// True for zero-dollar pre-note kinds.
    pub fn is_prenote(&self) -> bool {
        matches!(
            self,
            TranType::AchCheckingPrenote | TranType::AchSavingsPrenote
        )
    }

    /// Kinds that must reference a prior transaction before the wire send.
    ///
    /// PIN-less debit returns and voids are deliberately absent: the
    /// processor resolves their predecessors itself, so a missing reference
    /// there surfaces as a decline, not a local rejection.
    pub fn requires_original_guid(&self) -> bool {
        matches!(
            self,
            TranType::Capture
                | TranType::Void
                | TranType::Refund
                | TranType::AchCheckingVoid
                | TranType::AchSavingsVoid
                | TranType::AchCheckingCredit
                | TranType::AchSavingsCredit
        )
    }

    /// Kinds where a zero amount is legitimate: verifications, pre-notes,
    /// and BRIC storage.
    pub fn allows_zero_amount(&self) -> bool {
        matches!(self, TranType::AuthOnly) || self.is_prenote() || self.is_storage()
    }

    /// Which response-code table classifies replies for this kind.
    pub fn network(&self) -> Network {
        if self.is_ach() {
            Network::Ach
        } else {
            Network::Credit
        }
    }
}

impl fmt::Display for TranType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_code())
    }
}

/// A structured financial request, transport-agnostic.
///
/// Sensitive fields are optional so the same struct covers card, ACH, and
/// tokenized flows; the gateway's pool zeroizes every one of them on
/// release. `Debug` masks the account number and hides the CVV entirely.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Transaction kind.
    pub tran_type: Option<TranType>,
    /// Fixed-point decimal amount string, e.g. `"10.00"`.
    pub amount: String,
    /// Locally unique transaction number.
    pub tran_nbr: String,
    /// Optional group identifier echoed by the processor.
    pub tran_group: Option<String>,
    /// Prior transaction GUID or storage BRIC this request follows up on.
    pub original_auth_guid: Option<String>,
    /// Card primary account number or bank account number.
    pub account_nbr: Option<String>,
    /// Card expiration, `MMYY`.
    pub exp_date: Option<String>,
    /// Card verification value.
    pub cvv2: Option<String>,
    /// Card entry method code.
    pub card_ent_meth: Option<String>,
    /// Industry type code.
    pub industry_type: Option<String>,
    /// ACH routing number.
    pub routing_nbr: Option<String>,
    /// ACH standard entry class, e.g. `WEB`.
    pub std_entry_class: Option<String>,
    /// ACH receiver name.
    pub recv_name: Option<String>,
    /// Billing first name.
    pub first_name: Option<String>,
    /// Billing last name.
    pub last_name: Option<String>,
    /// Billing street address.
    pub address: Option<String>,
    /// Billing city.
    pub city: Option<String>,
    /// Billing state.
    pub state: Option<String>,
    /// Billing ZIP code.
    pub zip_code: Option<String>,
    /// Authorization characteristics extension, e.g. `RB` for recurring.
    pub aci_ext: Option<String>,
    /// Browser Post success redirect URL; bound into the TAC, never resent.
    pub redirect_url: Option<String>,
    /// Browser Post decline redirect URL, when distinct from success.
    pub decline_redirect_url: Option<String>,
    /// Browser Post error redirect URL, when distinct from success.
    pub error_redirect_url: Option<String>,
    /// Merchant-side customer identifier for Key Exchange metadata.
    pub customer_id: Option<String>,
    /// Free-form pass-through metadata.
    pub metadata: HashMap<String, String>,
}

impl TransactionRequest {
    /// The transaction kind, or the reason it is missing.
    pub fn kind(&self) -> Option<TranType> {
        self.tran_type
    }

    /// True when the request carries neither a prior GUID nor a raw account.
    pub fn has_no_instrument(&self) -> bool {
        self.original_auth_guid.as_deref().map_or(true, str::is_empty)
            && self.account_nbr.as_deref().map_or(true, str::is_empty)
    }

    /// Zeroize every sensitive field and empty (without reallocating) the
    /// metadata map. Called by the pool on release; also safe to call
    /// directly on stack-owned requests.
    pub fn scrub(&mut self) {
        self.tran_type = None;
        self.amount.zeroize();
        self.tran_nbr.zeroize();
        scrub_opt(&mut self.tran_group);
        scrub_opt(&mut self.original_auth_guid);
        scrub_opt(&mut self.account_nbr);
        scrub_opt(&mut self.exp_date);
        scrub_opt(&mut self.cvv2);
        scrub_opt(&mut self.card_ent_meth);
        scrub_opt(&mut self.industry_type);
        scrub_opt(&mut self.routing_nbr);
        scrub_opt(&mut self.std_entry_class);
        scrub_opt(&mut self.recv_name);
        scrub_opt(&mut self.first_name);
        scrub_opt(&mut self.last_name);
        scrub_opt(&mut self.address);
        scrub_opt(&mut self.city);
        scrub_opt(&mut self.state);
        scrub_opt(&mut self.zip_code);
        scrub_opt(&mut self.aci_ext);
        scrub_opt(&mut self.redirect_url);
        scrub_opt(&mut self.decline_redirect_url);
        scrub_opt(&mut self.error_redirect_url);
        scrub_opt(&mut self.customer_id);
        for (_, value) in self.metadata.iter_mut() {
            value.zeroize();
        }
        self.metadata.clear();
    }
}

fn scrub_opt(field: &mut Option<String>) {
    if let Some(value) = field.as_mut() {
        value.zeroize();
    }
    *field = None;
}

/// Mask an account number for logs: last four digits only.
pub fn mask_account(account: &str) -> String {
    if account.len() <= 4 {
        "****".to_string()
    } else {
        format!("****{}", &account[account.len() - 4..])
    }
}

impl fmt::Debug for TransactionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionRequest")
            .field("tran_type", &self.tran_type)
            .field("amount", &self.amount)
            .field("tran_nbr", &self.tran_nbr)
            .field("tran_group", &self.tran_group)
            .field("original_auth_guid", &self.original_auth_guid)
            .field("account_nbr", &self.account_nbr.as_deref().map(mask_account))
            .field("cvv2", &self.cvv2.as_ref().map(|_| "<redacted>"))
            .field("redirect_url", &self.redirect_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_round_trip() {
        for kind in [
            TranType::Sale,
            TranType::AuthOnly,
            TranType::Capture,
            TranType::Refund,
            TranType::Void,
            TranType::CreditBricStorage,
            TranType::AchCheckingDebit,
            TranType::AchCheckingCredit,
            TranType::AchCheckingPrenote,
            TranType::AchCheckingVoid,
            TranType::AchSavingsDebit,
            TranType::AchSavingsCredit,
            TranType::AchSavingsPrenote,
            TranType::AchSavingsVoid,
            TranType::AchBricStorage,
            TranType::PinlessDebitPurchase,
            TranType::PinlessDebitReturn,
            TranType::PinlessDebitVoid,
        ] {
            assert_eq!(TranType::from_wire_code(kind.wire_code()), Some(kind));
        }
    }

    #[test]
    fn contract_wire_codes_are_bit_exact() {
        assert_eq!(TranType::Sale.wire_code(), "CCE1");
        assert_eq!(TranType::AuthOnly.wire_code(), "CCE2");
        assert_eq!(TranType::Capture.wire_code(), "CCE4");
        assert_eq!(TranType::Refund.wire_code(), "CCE9");
        assert_eq!(TranType::Void.wire_code(), "CCEX");
        assert_eq!(TranType::CreditBricStorage.wire_code(), "CCE8");
        assert_eq!(TranType::AchBricStorage.wire_code(), "CKC8");
        assert_eq!(TranType::PinlessDebitPurchase.wire_code(), "DB0P");
    }

    #[test]
    fn follow_ups_require_original_guid() {
        assert!(TranType::Capture.requires_original_guid());
        assert!(TranType::Refund.requires_original_guid());
        assert!(TranType::Void.requires_original_guid());
        assert!(TranType::AchCheckingCredit.requires_original_guid());
        assert!(TranType::AchSavingsCredit.requires_original_guid());
        assert!(TranType::AchCheckingVoid.requires_original_guid());
        assert!(TranType::AchSavingsVoid.requires_original_guid());
        assert!(!TranType::Sale.requires_original_guid());
        assert!(!TranType::AchCheckingDebit.requires_original_guid());
        // PIN-less debit follow-ups are validated by the processor, not
        // locally.
        assert!(!TranType::PinlessDebitReturn.requires_original_guid());
        assert!(!TranType::PinlessDebitVoid.requires_original_guid());
    }

    #[test]
    fn zero_amount_kinds() {
        assert!(TranType::AuthOnly.allows_zero_amount());
        assert!(TranType::AchCheckingPrenote.allows_zero_amount());
        assert!(TranType::CreditBricStorage.allows_zero_amount());
        assert!(!TranType::Sale.allows_zero_amount());
        assert!(!TranType::Refund.allows_zero_amount());
    }

    #[test]
    fn ach_kinds_classify_on_the_ach_table() {
        assert_eq!(TranType::AchCheckingDebit.network(), Network::Ach);
        assert_eq!(TranType::AchBricStorage.network(), Network::Ach);
        assert_eq!(TranType::Sale.network(), Network::Credit);
        assert_eq!(TranType::PinlessDebitPurchase.network(), Network::Credit);
    }

    #[test]
    fn scrub_clears_every_sensitive_field() {
        let mut req = TransactionRequest {
            tran_type: Some(TranType::Sale),
            amount: "10.00".into(),
            tran_nbr: "12345".into(),
            account_nbr: Some("4111111111111111".into()),
            cvv2: Some("123".into()),
            exp_date: Some("1225".into()),
            first_name: Some("Jane".into()),
            ..Default::default()
        };
        req.metadata.insert("note".into(), "vip".into());
        req.scrub();
        assert!(req.tran_type.is_none());
        assert!(req.amount.is_empty());
        assert!(req.account_nbr.is_none());
        assert!(req.cvv2.is_none());
        assert!(req.exp_date.is_none());
        assert!(req.first_name.is_none());
        assert!(req.metadata.is_empty());
    }

    #[test]
    fn debug_masks_account_and_cvv() {
        let req = TransactionRequest {
            account_nbr: Some("4111111111111111".into()),
            cvv2: Some("123".into()),
            ..Default::default()
        };
        let rendered = format!("{req:?}");
        assert!(!rendered.contains("4111111111111111"));
        assert!(rendered.contains("****1111"));
        assert!(!rendered.contains("123"));
    }

    #[test]
    fn mask_account_handles_short_values() {
        assert_eq!(mask_account("12"), "****");
        assert_eq!(mask_account("4111111111111111"), "****1111");
    }
}
