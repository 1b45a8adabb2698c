//! Process configuration from the environment.
//!
//! Subsystem activation is driven by which variables are present: the bridge
//! needs a burn address and a collection file, the worker additionally needs
//! the deployer mnemonic and the contract address.

use std::{env, path::PathBuf, str::FromStr};

use bitcoin::Network;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub rpc_url: String,
    pub rpc_user: Option<String>,
    pub rpc_password: Option<String>,
    pub network: Network,
    pub database_path: PathBuf,
    pub api_port: u16,
    pub start_height: u64,
    pub enable_api: bool,
    pub bridge: Option<BridgeEnv>,
    pub worker: Option<WorkerEnv>,
}

#[derive(Debug, Clone)]
pub(crate) struct BridgeEnv {
    pub burn_address: String,
    pub collection_file: PathBuf,
    pub collection_name: String,
    pub collection_symbol: String,
    pub confirmations: u64,
    pub min_fee_sats: u64,
    pub oracle_fee_address: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct WorkerEnv {
    pub deployer_mnemonic: String,
    pub contract_address: String,
    /// Endpoint of the contract chain's node; defaults to RPC_URL for
    /// single-node deployments.
    pub contract_rpc_url: String,
    pub interval_secs: u64,
}

impl Config {
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        let rpc_url = require("RPC_URL")?;

        let network_raw = require("NETWORK")?;
        let network = match network_raw.as_str() {
            "mainnet" => Network::Bitcoin,
            "testnet" => Network::Testnet,
            "regtest" => Network::Regtest,
            _ => {
                return Err(ConfigError::Invalid {
                    name: "NETWORK",
                    value: network_raw,
                })
            }
        };

        let database_path = database_path(&require("DATABASE_URL")?);

        let bridge = match (optional("BRIDGE_BURN_ADDRESS"), optional("BRIDGE_COLLECTION_FILE")) {
            (Some(burn_address), Some(collection_file)) => Some(BridgeEnv {
                burn_address,
                collection_file: collection_file.into(),
                collection_name: require("BRIDGE_COLLECTION_NAME")?,
                collection_symbol: require("BRIDGE_COLLECTION_SYMBOL")?,
                confirmations: parse_or("BRIDGE_CONFIRMATIONS", 6)?,
                min_fee_sats: parse_or("BRIDGE_MIN_FEE_SATS", 0)?,
                oracle_fee_address: optional("ORACLE_FEE_ADDRESS"),
            }),
            (None, None) => None,
            _ => {
                warn!(
                    "BRIDGE_BURN_ADDRESS and BRIDGE_COLLECTION_FILE must both be set \
                     to enable the bridge; ignoring the partial configuration"
                );
                None
            }
        };

        let worker = match (optional("DEPLOYER_MNEMONIC"), optional("BRIDGE_CONTRACT_ADDRESS")) {
            (Some(deployer_mnemonic), Some(contract_address)) => Some(WorkerEnv {
                deployer_mnemonic,
                contract_address,
                contract_rpc_url: optional("CONTRACT_RPC_URL").unwrap_or_else(|| rpc_url.clone()),
                interval_secs: parse_or("WORKER_INTERVAL_SECS", 30)?,
            }),
            (None, None) => None,
            _ => {
                warn!(
                    "DEPLOYER_MNEMONIC and BRIDGE_CONTRACT_ADDRESS must both be set \
                     to enable the attestation worker; ignoring the partial configuration"
                );
                None
            }
        };

        Ok(Self {
            rpc_url,
            rpc_user: optional("RPC_USER"),
            rpc_password: optional("RPC_PASSWORD"),
            network,
            database_path,
            api_port: parse_or("API_PORT", 3002)?,
            start_height: parse_or("START_HEIGHT", 0)?,
            enable_api: parse_or("ENABLE_API", true)?,
            bridge,
            worker,
        })
    }
}

/// DATABASE_URL accepts a bare path or a `sqlite://` URL.
fn database_path(raw: &str) -> PathBuf {
    raw.strip_prefix("sqlite://")
        .unwrap_or(raw)
        .to_string()
        .into()
}

fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_path_strips_scheme() {
        assert_eq!(
            database_path("sqlite:///var/lib/ordbridge.db"),
            PathBuf::from("/var/lib/ordbridge.db")
        );
        assert_eq!(
            database_path("./ordbridge.db"),
            PathBuf::from("./ordbridge.db")
        );
    }
}
