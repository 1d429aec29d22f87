//! Request validation.
//!
//! Every rule here runs before any byte reaches the wire; a request that
//! fails validation performs no network I/O. Declines are the processor's
//! job — this layer only rejects requests the processor could never accept
//! or that would violate local safety rules (redirect hygiene, zero
//! amounts on financial kinds).

use rust_decimal::Decimal;
use std::str::FromStr;
use url::Url;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::identity::{Environment, MerchantIdentity};
use crate::request::{TranType, TransactionRequest};

/// Validate a request against the identity and configuration it will be
/// sent with. Returns the resolved transaction kind.
pub fn validate(
    identity: &MerchantIdentity,
    config: &GatewayConfig,
    request: &TransactionRequest,
) -> Result<TranType> {
    identity
        .validate()
        .map_err(GatewayError::configuration)?;

    let kind = request
        .tran_type
        .ok_or_else(|| GatewayError::validation("transaction kind is missing"))?;

    if request.tran_nbr.is_empty() {
        return Err(GatewayError::validation("tran_nbr must not be empty"));
    }

    validate_amount(kind, &request.amount)?;

    if kind.requires_original_guid()
        && request
            .original_auth_guid
            .as_deref()
            .map_or(true, str::is_empty)
    {
        return Err(GatewayError::validation(format!(
            "{} requires original_auth_guid",
            kind.wire_code()
        )));
    }

    if kind.is_ach() && request.has_no_instrument() {
        for (name, value) in [
            ("account_nbr", &request.account_nbr),
            ("routing_nbr", &request.routing_nbr),
            ("first_name", &request.first_name),
            ("last_name", &request.last_name),
        ] {
            if value.as_deref().map_or(true, str::is_empty) {
                return Err(GatewayError::validation(format!(
                    "ACH {} without a prior GUID requires {name}",
                    kind.wire_code()
                )));
            }
        }
    }

    for redirect in [
        request.redirect_url.as_deref(),
        request.decline_redirect_url.as_deref(),
        request.error_redirect_url.as_deref(),
    ]
    .into_iter()
    .flatten()
    {
        validate_redirect_url(redirect, config.environment, &config.redirect_allowed_domains)?;
    }

    Ok(kind)
}

fn validate_amount(kind: TranType, amount: &str) -> Result<()> {
    if amount.is_empty() {
        // Storage kinds tokenize without moving money; the amount is
        // optional there and mandatory everywhere else.
        if kind.is_storage() {
            return Ok(());
        }
        return Err(GatewayError::validation("amount must not be empty"));
    }

    let parsed = Decimal::from_str(amount)
        .map_err(|e| GatewayError::validation(format!("amount {amount:?} is not a decimal: {e}")))?;
    if parsed.is_sign_negative() {
        return Err(GatewayError::validation(format!(
            "amount {amount:?} must not be negative"
        )));
    }
    if parsed.is_zero() && !kind.allows_zero_amount() {
        return Err(GatewayError::validation(format!(
            "zero amount is not permitted for {}",
            kind.wire_code()
        )));
    }
    Ok(())
}

/// Validate a Browser Post redirect URL: absolute, HTTPS outside the
/// sandbox, and inside the configured domain allow-list when one exists.
pub fn validate_redirect_url(
    redirect: &str,
    environment: Environment,
    allowed_domains: &[String],
) -> Result<Url> {
    let url = Url::parse(redirect)
        .map_err(|e| GatewayError::validation(format!("redirect URL is not absolute: {e}")))?;

    if !environment.is_sandbox() && url.scheme() != "https" {
        return Err(GatewayError::validation(
            "redirect URL must be HTTPS outside the sandbox",
        ));
    }

    if !allowed_domains.is_empty() {
        let host = url
            .host_str()
            .ok_or_else(|| GatewayError::validation("redirect URL has no host"))?;
        let permitted = allowed_domains.iter().any(|domain| {
            host.eq_ignore_ascii_case(domain)
                || host
                    .to_ascii_lowercase()
                    .ends_with(&format!(".{}", domain.to_ascii_lowercase()))
        });
        if !permitted {
            return Err(GatewayError::validation(format!(
                "redirect host {host:?} is not in the domain allow-list"
            )));
        }
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::TranType;

    fn identity() -> MerchantIdentity {
        MerchantIdentity {
            cust_nbr: "9001".into(),
            merch_nbr: "900300".into(),
            dba_nbr: "2".into(),
            terminal_nbr: "21".into(),
            environment: Environment::Test,
            epi_id: "9001-900300-2-21".into(),
            mac_key: "key".into(),
        }
    }

    fn config() -> GatewayConfig {
        GatewayConfig::sandbox()
    }

    fn sale() -> TransactionRequest {
        TransactionRequest {
            tran_type: Some(TranType::Sale),
            amount: "10.00".into(),
            tran_nbr: "12345".into(),
            account_nbr: Some("4111111111111111".into()),
            exp_date: Some("1225".into()),
            ..Default::default()
        }
    }

    #[test]
    fn valid_sale_passes() {
        assert_eq!(validate(&identity(), &config(), &sale()).unwrap(), TranType::Sale);
    }

    #[test]
    fn empty_identity_field_is_a_configuration_error() {
        let mut id = identity();
        id.terminal_nbr.clear();
        let err = validate(&id, &config(), &sale()).unwrap_err();
        assert!(matches!(err, GatewayError::Configuration { .. }));
    }

    #[test]
    fn empty_tran_nbr_rejected() {
        let mut req = sale();
        req.tran_nbr.clear();
        assert!(validate(&identity(), &config(), &req).is_err());
    }

    #[test]
    fn amount_must_parse_non_negative() {
        for bad in ["", "abc", "-1.00", "10.0.0"] {
            let mut req = sale();
            req.amount = bad.into();
            assert!(validate(&identity(), &config(), &req).is_err(), "amount {bad:?}");
        }
    }

    #[test]
    fn zero_amount_only_for_verification_kinds() {
        let mut req = sale();
        req.amount = "0.00".into();
        assert!(validate(&identity(), &config(), &req).is_err());

        req.tran_type = Some(TranType::AuthOnly);
        assert!(validate(&identity(), &config(), &req).is_ok());

        req.tran_type = Some(TranType::CreditBricStorage);
        assert!(validate(&identity(), &config(), &req).is_ok());
    }

    #[test]
    fn storage_kinds_may_omit_amount() {
        let mut req = sale();
        req.tran_type = Some(TranType::CreditBricStorage);
        req.amount.clear();
        assert!(validate(&identity(), &config(), &req).is_ok());

        // But a malformed amount still fails even for storage.
        req.amount = "not-a-number".into();
        assert!(validate(&identity(), &config(), &req).is_err());
    }

    #[test]
    fn follow_ups_require_original_guid() {
        for kind in [
            TranType::Capture,
            TranType::Void,
            TranType::Refund,
            TranType::AchCheckingCredit,
            TranType::AchSavingsVoid,
        ] {
            let mut req = sale();
            req.tran_type = Some(kind);
            req.routing_nbr = Some("021000021".into());
            req.first_name = Some("Jane".into());
            req.last_name = Some("Doe".into());
            assert!(validate(&identity(), &config(), &req).is_err(), "{kind}");

            req.original_auth_guid = Some("09LMQ886L2K2W11MPX1".into());
            assert!(validate(&identity(), &config(), &req).is_ok(), "{kind}");
        }
    }

    #[test]
    fn ach_without_guid_requires_bank_fields() {
        let mut req = TransactionRequest {
            tran_type: Some(TranType::AchCheckingDebit),
            amount: "25.00".into(),
            tran_nbr: "7".into(),
            account_nbr: Some("123456789".into()),
            routing_nbr: Some("021000021".into()),
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            ..Default::default()
        };
        assert!(validate(&identity(), &config(), &req).is_ok());

        req.routing_nbr = None;
        assert!(validate(&identity(), &config(), &req).is_err());

        // A prior GUID substitutes for the raw bank fields.
        req.original_auth_guid = Some("BRIC123".into());
        assert!(validate(&identity(), &config(), &req).is_ok());
    }

    #[test]
    fn redirect_url_must_be_absolute() {
        let mut req = sale();
        req.redirect_url = Some("/relative/path".into());
        assert!(validate(&identity(), &config(), &req).is_err());
    }

    #[test]
    fn redirect_url_https_enforced_outside_sandbox() {
        assert!(validate_redirect_url("http://shop.example.com/done", Environment::Test, &[]).is_ok());
        assert!(
            validate_redirect_url("http://shop.example.com/done", Environment::Prod, &[]).is_err()
        );
        assert!(
            validate_redirect_url("https://shop.example.com/done", Environment::Prod, &[]).is_ok()
        );
    }

    #[test]
    fn redirect_allow_list_admits_subdomains() {
        let allowed = vec!["example.com".to_string()];
        assert!(validate_redirect_url("https://example.com/x", Environment::Prod, &allowed).is_ok());
        assert!(
            validate_redirect_url("https://shop.example.com/x", Environment::Prod, &allowed).is_ok()
        );
        assert!(
            validate_redirect_url("https://evilexample.com/x", Environment::Prod, &allowed).is_err()
        );
        assert!(validate_redirect_url("https://other.org/x", Environment::Prod, &allowed).is_err());
    }
}
