//! Gateway configuration.
//!
//! Endpoint URLs are bit-exact per environment; everything else is a tuning
//! knob with a production-safe default. `from_env` reads `EPX_*` variables
//! so deployments can override without a config file.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::error::{GatewayError, Result};
use crate::identity::Environment;
use crate::retry::RetryPolicy;

/// Which channel carries financial Server Post transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelKind {
    /// HTTPS form post (default).
    Https,
    /// XML document over a raw TCP connection.
    XmlSocket,
}

/// Browser Post response-MAC verification settings.
///
/// The signed field order matches observed processor behavior; it is held
/// here rather than in code so a processor revision is a config change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserPostConfig {
    /// Processor endpoint the user agent posts to.
    pub post_url: String,
    /// Whether to verify the `MAC` parameter on redirects. May be disabled
    /// only in sandbox.
    pub verify_response_mac: bool,
    /// Response fields, in order, whose values are concatenated and signed.
    pub mac_fields: Vec<String>,
}

impl BrowserPostConfig {
    fn for_environment(environment: Environment) -> Self {
        let post_url = match environment {
            Environment::Test => "https://services.epxuap.com/browserpost/",
            Environment::Prod => "https://services.epxnow.com/browserpost/",
        };
        Self {
            post_url: post_url.to_string(),
            verify_response_mac: true,
            mac_fields: default_mac_fields(),
        }
    }
}

/// Default signed-field order for Browser Post response verification.
pub fn default_mac_fields() -> Vec<String> {
    [
        "CUST_NBR",
        "MERCH_NBR",
        "AUTH_GUID",
        "AUTH_RESP",
        "AMOUNT",
        "TRAN_NBR",
        "TRAN_GROUP",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Complete gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Which processor environment this gateway talks to.
    pub environment: Environment,

    /// Server Post HTTPS endpoint.
    pub server_post_url: String,

    /// Key Exchange endpoint.
    pub key_exchange_url: String,

    /// XML socket endpoint, `host:port`.
    pub xml_socket_addr: String,

    /// Browser Post settings.
    pub browser_post: BrowserPostConfig,

    /// Channel used for financial Server Post transactions.
    pub financial_channel: ChannelKind,

    /// Per-request HTTP timeout.
    pub http_timeout: Duration,

    /// Single deadline covering connect, write, and read on the XML socket.
    pub socket_timeout: Duration,

    /// Idle HTTP connections retained per host.
    pub pool_max_idle_per_host: usize,

    /// Idle HTTP connection lifetime.
    pub pool_idle_timeout: Duration,

    /// Idle request envelopes retained by the buffer pool.
    pub envelope_pool_size: usize,

    /// Skip TLS certificate verification. Sandbox only.
    pub danger_accept_invalid_certs: bool,

    /// Hosts allowed as redirect targets; empty means any host passes.
    /// A listed domain admits itself and its subdomains.
    pub redirect_allowed_domains: Vec<String>,

    /// Validity window the adapter stamps on issued TACs.
    pub tac_duration: Duration,

    /// Circuit breaker tuning.
    pub breaker: CircuitBreakerConfig,

    /// Retry/backoff tuning.
    pub retry: RetryPolicy,
}

impl GatewayConfig {
    /// Sandbox defaults.
    pub fn sandbox() -> Self {
        Self {
            environment: Environment::Test,
            server_post_url: "https://secure.epxuap.com".to_string(),
            key_exchange_url: "https://epxnow.com/epx/key_exchange_sandbox".to_string(),
            xml_socket_addr: "secure.epxuap.com:8087".to_string(),
            browser_post: BrowserPostConfig::for_environment(Environment::Test),
            financial_channel: ChannelKind::Https,
            http_timeout: Duration::from_secs(30),
            socket_timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 100,
            pool_idle_timeout: Duration::from_secs(90),
            envelope_pool_size: 64,
            danger_accept_invalid_certs: false,
            redirect_allowed_domains: Vec::new(),
            tac_duration: Duration::from_secs(4 * 60 * 60),
            breaker: CircuitBreakerConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Production defaults.
    pub fn production() -> Self {
        Self {
            environment: Environment::Prod,
            server_post_url: "https://epxnow.com/epx/server_post".to_string(),
            key_exchange_url: "https://epxnow.com/epx/key_exchange".to_string(),
            xml_socket_addr: "epxnow.com:8086".to_string(),
            browser_post: BrowserPostConfig::for_environment(Environment::Prod),
            ..Self::sandbox()
        }
    }

    /// Defaults for an environment.
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Test => Self::sandbox(),
            Environment::Prod => Self::production(),
        }
    }

    /// Load configuration from `EPX_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let environment = match env::var("EPX_ENVIRONMENT").as_deref() {
            Ok("prod") | Ok("production") => Environment::Prod,
            _ => Environment::Test,
        };
        let mut config = Self::for_environment(environment);

        if let Ok(url) = env::var("EPX_SERVER_POST_URL") {
            config.server_post_url = url;
        }
        if let Ok(url) = env::var("EPX_KEY_EXCHANGE_URL") {
            config.key_exchange_url = url;
        }
        if let Ok(url) = env::var("EPX_BROWSER_POST_URL") {
            config.browser_post.post_url = url;
        }
        if let Ok(addr) = env::var("EPX_XML_SOCKET_ADDR") {
            config.xml_socket_addr = addr;
        }
        if let Ok(channel) = env::var("EPX_FINANCIAL_CHANNEL") {
            if channel.eq_ignore_ascii_case("xml-socket") {
                config.financial_channel = ChannelKind::XmlSocket;
            }
        }
        config.http_timeout = env_duration_secs("EPX_HTTP_TIMEOUT_SECS", config.http_timeout);
        config.socket_timeout = env_duration_secs("EPX_SOCKET_TIMEOUT_SECS", config.socket_timeout);
        config.tac_duration = env_duration_secs("EPX_TAC_DURATION_SECS", config.tac_duration);
        if let Some(domains) = env::var("EPX_REDIRECT_ALLOWED_DOMAINS").ok().filter(|s| !s.is_empty()) {
            config.redirect_allowed_domains =
                domains.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(max) = env::var("EPX_BREAKER_MAX_FAILURES") {
            if let Ok(max) = max.parse() {
                config.breaker.max_failures = max;
            }
        }
        if let Ok(retries) = env::var("EPX_MAX_RETRIES") {
            if let Ok(retries) = retries.parse() {
                config.retry.max_retries = retries;
            }
        }

        config
    }

    /// Reject configurations that relax safety outside the sandbox.
    pub fn validate(&self) -> Result<()> {
        if !self.environment.is_sandbox() {
            if self.danger_accept_invalid_certs {
                return Err(GatewayError::configuration(
                    "TLS verification may be disabled only in sandbox",
                ));
            }
            if !self.browser_post.verify_response_mac {
                return Err(GatewayError::configuration(
                    "response MAC verification may be disabled only in sandbox",
                ));
            }
        }
        for (name, url) in [
            ("server_post_url", &self.server_post_url),
            ("key_exchange_url", &self.key_exchange_url),
            ("browser_post.post_url", &self.browser_post.post_url),
        ] {
            url::Url::parse(url)
                .map_err(|e| GatewayError::configuration(format!("{name} is not a URL: {e}")))?;
        }
        if !self.xml_socket_addr.contains(':') {
            return Err(GatewayError::configuration(
                "xml_socket_addr must be host:port",
            ));
        }
        if self.browser_post.mac_fields.is_empty() {
            return Err(GatewayError::configuration(
                "browser_post.mac_fields must not be empty",
            ));
        }
        Ok(())
    }
}

fn env_duration_secs(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
