//! Service configuration with validation.
//!
//! Configuration is constructed once at startup (normally via
//! [`AppConfig::from_env`]) and passed into the orchestrator and gateway
//! constructors. Nothing else in the codebase reads ambient environment
//! state.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

/// Arbitrum Sepolia, the ledger network the reference deployment runs on.
const DEFAULT_CHAIN_ID: u64 = 421_614;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP surface configuration.
    pub http: HttpConfig,
    /// Ledger endpoint and signing configuration.
    pub ledger: LedgerConfig,
    /// External verifier process configuration.
    pub verifier: VerifierConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            ledger: LedgerConfig::default(),
            verifier: VerifierConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build configuration from environment variables.
    ///
    /// Required: `RPC_URL`, `CONTRACT_ADDRESS`, `PRIVATE_KEY`,
    /// `VERIFIER_SCRIPT`. Everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        config.ledger.rpc_url = require_env("RPC_URL")?;
        config.ledger.contract_address = require_env("CONTRACT_ADDRESS")?;
        config.ledger.signer_key = require_env("PRIVATE_KEY")?;
        config.verifier.script = require_env("VERIFIER_SCRIPT")?;

        if let Some(port) = optional_env("PORT") {
            config.http.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT must be a number".into()))?;
        }
        if let Some(chain_id) = optional_env("CHAIN_ID") {
            config.ledger.chain_id = chain_id
                .parse()
                .map_err(|_| ConfigError::Invalid("CHAIN_ID must be a number".into()))?;
        }
        if let Some(interpreter) = optional_env("VERIFIER_INTERPRETER") {
            config.verifier.interpreter = interpreter;
        }
        if let Some(secs) = optional_env("VERIFIER_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| ConfigError::Invalid("VERIFIER_TIMEOUT_SECS must be a number".into()))?;
            config.verifier.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = optional_env("CONFIRMATION_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                ConfigError::Invalid("CONFIRMATION_TIMEOUT_SECS must be a number".into())
            })?;
            config.ledger.confirmation_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.ledger.rpc_url.starts_with("http://") && !self.ledger.rpc_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid(
                "rpc_url must be an http(s) endpoint".into(),
            ));
        }

        let address = self
            .ledger
            .contract_address
            .strip_prefix("0x")
            .unwrap_or(&self.ledger.contract_address);
        if hex::decode(address).map(|b| b.len()) != Ok(20) {
            return Err(ConfigError::Invalid(
                "contract_address must be a 20-byte hex address".into(),
            ));
        }

        let key = self
            .ledger
            .signer_key
            .strip_prefix("0x")
            .unwrap_or(&self.ledger.signer_key);
        if hex::decode(key).map(|b| b.len()) != Ok(32) {
            return Err(ConfigError::Invalid(
                "signer_key must be a 32-byte hex scalar".into(),
            ));
        }

        if self.verifier.script.is_empty() {
            return Err(ConfigError::Invalid("verifier script is not set".into()));
        }
        if self.verifier.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout("verifier timeout cannot be 0".into()));
        }
        if self.ledger.confirmation_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "confirmation timeout cannot be 0".into(),
            ));
        }
        if self.ledger.poll_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout("poll interval cannot be 0".into()));
        }
        if self.ledger.poll_interval > self.ledger.confirmation_timeout {
            return Err(ConfigError::InvalidTimeout(
                "poll interval exceeds confirmation timeout".into(),
            ));
        }

        Ok(())
    }

    /// Get HTTP server bind address.
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address.
    pub host: IpAddr,
    /// Port (default: 3000).
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 3000,
        }
    }
}

/// Ledger endpoint, contract, and write configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,
    /// Vote contract address, 0x-prefixed hex.
    pub contract_address: String,
    /// Signing key for writes, 0x-prefixed hex scalar.
    pub signer_key: String,
    /// Chain id used for replay-protected signing.
    pub chain_id: u64,
    /// Human-readable network name, reported by the info endpoints.
    pub network_name: String,
    /// Per-request timeout for RPC round trips.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    /// Bound on the wait for write confirmation.
    #[serde(with = "duration_secs")]
    pub confirmation_timeout: Duration,
    /// Receipt poll interval while waiting for confirmation.
    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            contract_address: String::new(),
            signer_key: String::new(),
            chain_id: DEFAULT_CHAIN_ID,
            network_name: "arbitrum-sepolia".to_string(),
            request_timeout: Duration::from_secs(10),
            confirmation_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// External verifier process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Interpreter the verifier script runs under.
    pub interpreter: String,
    /// Path to the verifier script. Invoked with the tag id as its only
    /// argument.
    pub script: String,
    /// Bound on one verification attempt. On expiry the child process is
    /// killed and the outcome is "not verified".
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            script: String::new(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A required environment variable is absent.
    #[error("missing environment variable {0}")]
    MissingEnv(String),
    /// Invalid timeout value.
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn require_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnv(name.to_string()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Serde helper: durations as whole seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
