//! Node configuration types

use anyhow::Context as _;
use oracle_core::params::Params;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of environment overrides, e.g. `ORACLE__ORACLE__VOTE_PERIOD=5`
pub const ENV_PREFIX: &str = "ORACLE";

/// Complete node configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node identity
    #[serde(default)]
    pub node: NodeSettings,

    /// Oracle module parameters written at genesis
    #[serde(default)]
    pub oracle: Params,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Devnet simulation settings
    #[serde(default)]
    pub devnet: DevnetConfig,
}

impl NodeConfig {
    /// Load from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));

        let config: NodeConfig = builder
            .build()
            .context("failed to read node configuration")?
            .try_deserialize()
            .context("failed to parse node configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.oracle.validate().context("invalid [oracle] section")?;
        anyhow::ensure!(!self.node.chain_id.is_empty(), "chain_id must not be empty");
        anyhow::ensure!(self.devnet.block_time_secs > 0, "devnet block_time_secs must be positive");
        Ok(())
    }

    /// Render as TOML, e.g. to write a starter config file
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Basic node settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeSettings {
    /// Chain identifier
    #[serde(default = "default_chain_id")]
    pub chain_id: String,

    /// Node name
    #[serde(default = "default_node_name")]
    pub name: String,
}

fn default_chain_id() -> String {
    "oracle-devnet-1".to_string()
}

fn default_node_name() -> String {
    "oracle-node".to_string()
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            name: default_node_name(),
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: `text` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Color output
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            color: true,
        }
    }
}

/// Devnet simulation settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DevnetConfig {
    /// Number of simulated validators
    #[serde(default = "default_validators")]
    pub validators: u8,

    /// Consensus power of each validator
    #[serde(default = "default_validator_power")]
    pub validator_power: i64,

    /// Validators (highest indices) that never vote
    #[serde(default)]
    pub absent_validators: u8,

    /// Blocks to run
    #[serde(default = "default_blocks")]
    pub blocks: u64,

    /// Seconds between blocks
    #[serde(default = "default_block_time_secs")]
    pub block_time_secs: i64,

    /// Reference prices the validators report around, `<rate><denom>,...`
    #[serde(default = "default_prices")]
    pub prices: String,

    /// TWAP lookback reported at the end of the run
    #[serde(default = "default_twap_lookback")]
    pub twap_lookback_secs: i64,
}

fn default_validators() -> u8 {
    4
}

fn default_validator_power() -> i64 {
    100
}

fn default_blocks() -> u64 {
    60
}

fn default_block_time_secs() -> i64 {
    5
}

fn default_prices() -> String {
    "12.5uatom,1700ueth".to_string()
}

fn default_twap_lookback() -> i64 {
    120
}

impl Default for DevnetConfig {
    fn default() -> Self {
        Self {
            validators: default_validators(),
            validator_power: default_validator_power(),
            absent_validators: 0,
            blocks: default_blocks(),
            block_time_secs: default_block_time_secs(),
            prices: default_prices(),
            twap_lookback_secs: default_twap_lookback(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.oracle, Params::default());
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[node]
chain_id = "oracle-test-9"

[oracle]
vote_period = 5
slash_window = 50
vote_threshold = "0.667"
whitelist = ["uatom"]

[devnet]
validators = 7
"#
        )
        .unwrap();

        let config = NodeConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.node.chain_id, "oracle-test-9");
        assert_eq!(config.node.name, "oracle-node");
        assert_eq!(config.oracle.vote_period, 5);
        assert_eq!(config.oracle.vote_threshold, "0.667".parse().unwrap());
        assert_eq!(config.oracle.whitelist, vec!["uatom".to_string()]);
        assert_eq!(config.oracle.lookback_duration, Params::default().lookback_duration);
        assert_eq!(config.devnet.validators, 7);
    }

    #[test]
    fn test_load_rejects_invalid_params() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[oracle]\nvote_period = 7\nslash_window = 100").unwrap();

        assert!(NodeConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.node.chain_id, "oracle-devnet-1");
    }

    #[test]
    fn test_toml_round_trip() {
        let config = NodeConfig::default();
        let text = config.to_toml().unwrap();
        let back: NodeConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.oracle, config.oracle);
        assert_eq!(back.devnet.prices, config.devnet.prices);
    }
}
