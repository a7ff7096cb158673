//! Service configuration: TOML file or environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{CredentialError, Result};
use crate::ledger::abi;
use crate::ledger::retry::RetryPolicy;

/// Validator account used as the transaction sender when none is configured.
pub const DEFAULT_SENDER: &str = "0x53b8be11aada878bbf830e426d5d3071c34facef";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub wallets: WalletConfig,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LedgerVariant {
    /// Proof-of-authority node, ABI-encoded contract writes.
    Poa,
    /// Any JSON-RPC node; reads are live, writes are simulated.
    Generic,
    /// In-process ledger.
    #[default]
    Mock,
}

impl std::str::FromStr for LedgerVariant {
    type Err = CredentialError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "poa" | "besu" => Ok(LedgerVariant::Poa),
            "generic" | "rpc" => Ok(LedgerVariant::Generic),
            "mock" => Ok(LedgerVariant::Mock),
            other => Err(CredentialError::Config(format!("unknown ledger variant {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    #[serde(default)]
    pub variant: LedgerVariant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(default = "default_sender")]
    pub sender_address: String,
    /// Receipt poll interval; matches the chain's block period.
    #[serde(default = "default_block_period_ms")]
    pub block_period_ms: u64,
    #[serde(default = "default_receipt_attempts")]
    pub receipt_max_attempts: u32,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_sender() -> String {
    DEFAULT_SENDER.to_string()
}

fn default_block_period_ms() -> u64 {
    5_000
}

fn default_receipt_attempts() -> u32 {
    12
}

fn default_gas_limit() -> u64 {
    200_000
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            variant: LedgerVariant::default(),
            rpc_url: None,
            contract_address: None,
            sender_address: default_sender(),
            block_period_ms: default_block_period_ms(),
            receipt_max_attempts: default_receipt_attempts(),
            gas_limit: default_gas_limit(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

impl LedgerConfig {
    pub fn receipt_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.block_period_ms),
            self.receipt_max_attempts,
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ContentConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.pinata.cloud".to_string()
}

fn default_gateway_url() -> String {
    "https://gateway.pinata.cloud/ipfs/".to_string()
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            api_secret: None,
            gateway_url: default_gateway_url(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

impl ContentConfig {
    pub fn has_credentials(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        set(&self.api_key) && set(&self.api_secret)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WalletConfig {
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

fn default_cache_size() -> usize {
    1024
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            cache_size: default_cache_size(),
        }
    }
}

impl Config {
    pub fn parse(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| CredentialError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CredentialError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::parse(&content)
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a key lookup; unset or empty keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(variant) = get("LEDGER_VARIANT") {
            config.ledger.variant = variant.parse()?;
        }
        config.ledger.rpc_url = get("BLOCKCHAIN_RPC_URL");
        config.ledger.contract_address = get("CONTRACT_ADDRESS");
        if let Some(sender) = get("SENDER_ADDRESS") {
            config.ledger.sender_address = sender;
        }
        config.content.api_key = get("PINATA_API_KEY");
        config.content.api_secret = get("PINATA_API_SECRET");
        if let Some(url) = get("PINATA_API_URL") {
            config.content.api_url = url;
        }
        if let Some(url) = get("PINATA_GATEWAY_URL") {
            config.content.gateway_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let ledger = &self.ledger;
        if matches!(ledger.variant, LedgerVariant::Poa | LedgerVariant::Generic)
            && ledger.rpc_url.as_deref().is_none_or(str::is_empty)
        {
            return Err(CredentialError::Config(format!(
                "ledger.rpc_url is required for the {:?} variant",
                ledger.variant
            )));
        }
        if ledger.block_period_ms == 0 || ledger.receipt_max_attempts == 0 {
            return Err(CredentialError::Config(
                "ledger.block_period_ms and ledger.receipt_max_attempts must be positive".into(),
            ));
        }
        abi::parse_address(&ledger.sender_address).map_err(|e| CredentialError::Config(e.to_string()))?;
        if let Some(contract) = &ledger.contract_address {
            abi::parse_address(contract).map_err(|e| CredentialError::Config(e.to_string()))?;
        }
        if self.wallets.cache_size == 0 {
            return Err(CredentialError::Config("wallets.cache_size must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ledger.variant, LedgerVariant::Mock);
        assert_eq!(config.ledger.receipt_policy().budget(), Duration::from_secs(60));
    }

    #[test]
    fn parses_full_toml() {
        let config = Config::parse(
            r#"
            [ledger]
            variant = "poa"
            rpc_url = "http://localhost:8545"
            contract_address = "0x0000000000000000000000000000000000000abc"
            block_period_ms = 1000
            receipt_max_attempts = 3

            [content]
            api_key = "k"
            api_secret = "s"

            [wallets]
            cache_size = 16
            "#,
        )
        .unwrap();
        assert_eq!(config.ledger.variant, LedgerVariant::Poa);
        assert_eq!(config.ledger.sender_address, DEFAULT_SENDER);
        assert_eq!(config.ledger.receipt_policy().max_attempts, 3);
        assert!(config.content.has_credentials());
        assert_eq!(config.wallets.cache_size, 16);
    }

    #[test]
    fn rpc_variant_requires_url() {
        let err = Config::parse("[ledger]\nvariant = \"generic\"\n").unwrap_err();
        assert!(err.to_string().contains("rpc_url"));
    }

    #[test]
    fn rejects_unknown_fields_and_bad_addresses() {
        assert!(Config::parse("[ledger]\nbogus = 1\n").is_err());
        assert!(Config::parse("[ledger]\ncontract_address = \"0x12\"\n").is_err());
    }

    #[test]
    fn env_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("LEDGER_VARIANT", "besu"),
            ("BLOCKCHAIN_RPC_URL", "http://node:8545"),
            ("PINATA_API_KEY", "key"),
            ("PINATA_API_SECRET", ""),
        ]);
        let config = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.ledger.variant, LedgerVariant::Poa);
        assert_eq!(config.ledger.rpc_url.as_deref(), Some("http://node:8545"));
        assert!(!config.content.has_credentials());
        assert_eq!(config.content.gateway_url, "https://gateway.pinata.cloud/ipfs/");
    }

    #[test]
    fn unknown_variant_is_config_error() {
        let err = Config::from_lookup(|k| (k == "LEDGER_VARIANT").then(|| "fabric".to_string()))
            .unwrap_err();
        assert!(matches!(err, CredentialError::Config(_)));
    }
}
