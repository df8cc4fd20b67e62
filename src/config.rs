//! Configuration for the marketplace covenant
//!
//! Provides the deployment parameters of a contract instance (its compiled
//! code part and genesis balance), transaction builder defaults and debug
//! switches. Settings can be loaded from JSON, environment variables, or
//! passed programmatically.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::constants::{SEQUENCE_FINAL, TX_VERSION};
use crate::error::{MarketplaceError, Result};
use crate::types::ByteString;

/// Contract deployment configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Hex of the compiled covenant code that precedes `OP_RETURN` in every
    /// state locking script. Fixed for the lifetime of a deployment.
    #[serde(default)]
    pub code_script_hex: String,

    /// Value locked in the genesis state output (the deploy script uses 1 satoshi)
    #[serde(default = "default_genesis_balance")]
    pub genesis_balance: u64,
}

fn default_genesis_balance() -> u64 {
    1
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            code_script_hex: String::new(),
            genesis_balance: default_genesis_balance(),
        }
    }
}

impl ContractConfig {
    /// Decode the configured code part
    pub fn code_script(&self) -> Result<ByteString> {
        hex::decode(self.code_script_hex.trim()).map_err(|e| {
            MarketplaceError::Config(Cow::Owned(format!("code_script_hex is not valid hex: {e}")))
        })
    }
}

/// Transaction builder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Version field of built transactions
    #[serde(default = "default_tx_version")]
    pub tx_version: i32,

    /// Lock time of built transactions
    /// Default: 0 (final immediately)
    #[serde(default)]
    pub lock_time: u32,

    /// Sequence number of the contract input
    #[serde(default = "default_input_sequence")]
    pub input_sequence: u32,
}

fn default_tx_version() -> i32 {
    TX_VERSION
}

fn default_input_sequence() -> u32 {
    SEQUENCE_FINAL
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            tx_version: TX_VERSION,
            lock_time: 0,
            input_sequence: SEQUENCE_FINAL,
        }
    }
}

/// Debug configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Log rejected transitions at warn level (otherwise debug)
    #[serde(default)]
    pub log_rejections: bool,

    /// Re-check builder output against the validator before returning it
    #[serde(default = "default_true")]
    pub enable_runtime_assertions: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_rejections: false,
            enable_runtime_assertions: true,
        }
    }
}

/// Complete marketplace configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MarketplaceConfig {
    #[serde(default)]
    pub contract: ContractConfig,

    #[serde(default)]
    pub builder: BuilderConfig,

    #[serde(default)]
    pub debug: DebugConfig,
}

impl MarketplaceConfig {
    /// Parse configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| MarketplaceError::Config(Cow::Owned(format!("invalid config JSON: {e}"))))
    }

    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern `MARKETPLACE_<SECTION>_<KEY>`.
    /// Unset or unparseable variables leave the default in place.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("MARKETPLACE_CONTRACT_CODE_SCRIPT_HEX") {
            config.contract.code_script_hex = val;
        }
        if let Ok(val) = std::env::var("MARKETPLACE_CONTRACT_GENESIS_BALANCE") {
            if let Ok(balance) = val.parse::<u64>() {
                config.contract.genesis_balance = balance;
            }
        }

        if let Ok(val) = std::env::var("MARKETPLACE_BUILDER_TX_VERSION") {
            if let Ok(version) = val.parse::<i32>() {
                config.builder.tx_version = version;
            }
        }
        if let Ok(val) = std::env::var("MARKETPLACE_BUILDER_LOCK_TIME") {
            if let Ok(lock_time) = val.parse::<u32>() {
                config.builder.lock_time = lock_time;
            }
        }
        if let Ok(val) = std::env::var("MARKETPLACE_BUILDER_INPUT_SEQUENCE") {
            if let Ok(sequence) = val.parse::<u32>() {
                config.builder.input_sequence = sequence;
            }
        }

        if let Ok(val) = std::env::var("MARKETPLACE_DEBUG_LOG_REJECTIONS") {
            if let Ok(enabled) = val.parse::<bool>() {
                config.debug.log_rejections = enabled;
            }
        }
        if let Ok(val) = std::env::var("MARKETPLACE_DEBUG_ENABLE_RUNTIME_ASSERTIONS") {
            if let Ok(enabled) = val.parse::<bool>() {
                config.debug.enable_runtime_assertions = enabled;
            }
        }

        config
    }

    /// Check values that would otherwise only fail deep inside a build
    pub fn validate(&self) -> Result<()> {
        self.contract.code_script()?;
        if self.contract.genesis_balance == 0 {
            return Err(MarketplaceError::Config(Cow::Borrowed(
                "genesis_balance must be at least one satoshi",
            )));
        }
        Ok(())
    }
}

/// Global marketplace configuration instance
static GLOBAL_MARKETPLACE_CONFIG: std::sync::OnceLock<MarketplaceConfig> =
    std::sync::OnceLock::new();

/// Initialize global marketplace configuration
///
/// Should be called once at startup. Returns the rejected config if one was
/// already installed.
pub fn init_marketplace_config(
    config: MarketplaceConfig,
) -> std::result::Result<(), MarketplaceConfig> {
    GLOBAL_MARKETPLACE_CONFIG.set(config)
}

/// Get global marketplace configuration
///
/// Returns the global config if initialized, otherwise the environment-derived one.
pub fn get_marketplace_config() -> MarketplaceConfig {
    GLOBAL_MARKETPLACE_CONFIG
        .get()
        .cloned()
        .unwrap_or_else(MarketplaceConfig::from_env)
}

/// Rejection-logging switch for the transition validator
///
/// Resolved from [`get_marketplace_config`] on first use and fixed for the
/// rest of the process, so validation never touches the environment.
pub fn log_rejections() -> bool {
    static LOG_REJECTIONS: std::sync::OnceLock<bool> = std::sync::OnceLock::new();
    *LOG_REJECTIONS.get_or_init(|| get_marketplace_config().debug.log_rejections)
}
