//! Merchant identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which processor environment an identity is provisioned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Sandbox endpoints; relaxed TLS and MAC rules are permitted here only.
    Test,
    /// Production endpoints.
    Prod,
}

impl Environment {
    /// True for the sandbox environment.
    pub fn is_sandbox(&self) -> bool {
        matches!(self, Environment::Test)
    }
}

/// The four-part merchant identity plus signing material.
///
/// Loaded once from the credential store when the gateway is constructed and
/// immutable for the gateway's lifetime. The MAC key never appears in Debug
/// output or logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct MerchantIdentity {
    /// Customer number.
    pub cust_nbr: String,
    /// Merchant number.
    pub merch_nbr: String,
    /// DBA number.
    pub dba_nbr: String,
    /// Terminal number.
    pub terminal_nbr: String,
    /// Environment this identity is provisioned for.
    pub environment: Environment,
    /// Four-part key sent as the `EPI-Id` header.
    pub epi_id: String,
    /// HMAC key for `EPI-Signature` and Browser Post response verification.
    pub mac_key: String,
}

impl MerchantIdentity {
    /// Validate that the identity is usable for signing and sending.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("cust_nbr", &self.cust_nbr),
            ("merch_nbr", &self.merch_nbr),
            ("dba_nbr", &self.dba_nbr),
            ("terminal_nbr", &self.terminal_nbr),
        ] {
            if value.is_empty() {
                return Err(format!("merchant identity field {name} is empty"));
            }
        }
        if self.mac_key.is_empty() {
            return Err("merchant MAC key is empty".to_string());
        }
        Ok(())
    }
}

impl fmt::Debug for MerchantIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerchantIdentity")
            .field("cust_nbr", &self.cust_nbr)
            .field("merch_nbr", &self.merch_nbr)
            .field("dba_nbr", &self.dba_nbr)
            .field("terminal_nbr", &self.terminal_nbr)
            .field("environment", &self.environment)
            .field("epi_id", &self.epi_id)
            .field("mac_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> MerchantIdentity {
        MerchantIdentity {
            cust_nbr: "9001".into(),
            merch_nbr: "900300".into(),
            dba_nbr: "2".into(),
            terminal_nbr: "21".into(),
            environment: Environment::Test,
            epi_id: "9001-900300-2-21".into(),
            mac_key: "secret-mac-key".into(),
        }
    }

    #[test]
    fn debug_redacts_mac_key() {
        let rendered = format!("{:?}", identity());
        assert!(!rendered.contains("secret-mac-key"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn validate_rejects_empty_tuple_fields() {
        let mut id = identity();
        id.dba_nbr.clear();
        assert!(id.validate().is_err());
    }

    #[test]
    fn validate_rejects_missing_mac_key() {
        let mut id = identity();
        id.mac_key.clear();
        assert!(id.validate().unwrap_err().contains("MAC key"));
    }
}
