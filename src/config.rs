//! Node configuration. Mirrors the teacher's `MpoolConfig`/`Libp2pConfig` split: a
//! serde-derived struct with a `Default` impl carrying the production defaults, loadable from
//! TOML, plus a thin `clap` front door for the handful of flags worth overriding at the CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_PEER_SERVER_PORT: u16 = 7774;
const DEFAULT_TESTNET_PEER_SERVER_PORT: u16 = 6874;

/// Configuration available to the core (§6 of the spec). Fields not consumed by the core
/// (HTTP API bind address, database URL, forging keys, …) are deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub my_address: Option<String>,
    pub my_platform: String,
    pub share_my_address: bool,
    pub my_hallmark: Option<String>,

    pub peer_server_port: u16,
    pub max_number_of_connected_public_peers: usize,

    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub blacklisting_period: Duration,

    pub enable_hallmark_protection: bool,
    pub push_threshold: i64,
    pub pull_threshold: i64,
    pub send_to_peers_limit: usize,
    pub broadcast_pool_size: usize,

    pub use_peers_db: bool,
    pub save_peers: bool,

    pub is_testnet: bool,
    /// Bitmask: 1=exceptions, 2=non-200, 4=200 responses.
    pub communication_logging_mask: u8,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            my_address: None,
            my_platform: "nhz-node".to_string(),
            share_my_address: true,
            my_hallmark: None,

            peer_server_port: DEFAULT_PEER_SERVER_PORT,
            max_number_of_connected_public_peers: 20,

            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(20),
            blacklisting_period: Duration::from_secs(600),

            enable_hallmark_protection: true,
            push_threshold: 0,
            pull_threshold: 0,
            send_to_peers_limit: 10,
            broadcast_pool_size: 10,

            use_peers_db: true,
            save_peers: true,

            is_testnet: false,
            communication_logging_mask: 0,
        }
    }
}

impl NodeConfig {
    /// Loads configuration from a TOML file, falling back to defaults for absent keys.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.send_to_peers_limit == 0 {
            return Err(ConfigError::Invalid(
                "send_to_peers_limit must be greater than zero".to_string(),
            ));
        }
        if self.broadcast_pool_size == 0 {
            return Err(ConfigError::Invalid(
                "broadcast_pool_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The inbound TCP port implied by `is_testnet`, unless `peer_server_port` was explicitly
    /// set away from the mainnet default.
    pub fn effective_peer_server_port(&self) -> u16 {
        if self.is_testnet && self.peer_server_port == DEFAULT_PEER_SERVER_PORT {
            DEFAULT_TESTNET_PEER_SERVER_PORT
        } else {
            self.peer_server_port
        }
    }
}

/// Command-line front door. Resolves a [`NodeConfig`] from a config file with a small number of
/// flags layered on top, matching the teacher's `cli`/`cli::config` split.
#[derive(Debug, clap::Parser)]
#[command(name = "nhz-node", about = "Nhz transaction pool and peer overlay node")]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Force testnet mode regardless of the config file.
    #[arg(long)]
    pub testnet: bool,

    /// Override `my_address` from the config file.
    #[arg(long)]
    pub my_address: Option<String>,
}

impl Cli {
    /// Resolves the final [`NodeConfig`], applying CLI overrides on top of the file (or defaults
    /// if the file does not exist).
    pub fn resolve_config(&self) -> Result<NodeConfig, ConfigError> {
        let mut config = if self.config.exists() {
            NodeConfig::load(&self.config)?
        } else {
            NodeConfig::default()
        };
        if self.testnet {
            config.is_testnet = true;
        }
        if let Some(addr) = &self.my_address {
            config.my_address = Some(addr.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        NodeConfig::default().validate().unwrap();
    }

    #[test]
    fn testnet_port_is_used_only_at_the_default() {
        let mut config = NodeConfig::default();
        assert_eq!(config.effective_peer_server_port(), DEFAULT_PEER_SERVER_PORT);
        config.is_testnet = true;
        assert_eq!(config.effective_peer_server_port(), DEFAULT_TESTNET_PEER_SERVER_PORT);
        config.peer_server_port = 9999;
        assert_eq!(config.effective_peer_server_port(), 9999);
    }

    #[test]
    fn zero_send_limit_is_rejected() {
        let mut config = NodeConfig::default();
        config.send_to_peers_limit = 0;
        assert!(config.validate().is_err());
    }
}
