//! Deployer configuration
//!
//! Defaults, overridden by `DEPLOYER_*` environment variables, overridden in
//! turn by command-line flags in the binary.

use crate::chain::DEFAULT_POLL_INTERVAL;
use crate::contract::DEFAULT_OPTIMIZER_RUNS;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Seconds to wait for a deployment or deploy action to be mined
pub const DEFAULT_TIMEOUT_SECS: u64 = 90;

/// Gas price of creation transactions, in wei (20 gwei)
pub const DEFAULT_GAS_PRICE: u128 = 20_000_000_000;

/// Seconds to wait for the node to answer a single call
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Deployer configuration
#[derive(Debug, Clone)]
pub struct DeployerConfig {
    /// Node IPC socket
    pub ipc_path: PathBuf,
    /// Solidity compiler executable
    pub solc_path: PathBuf,
    pub optimizer_runs: u32,
    /// Directory holding `<name>.sol` / `<name>.json` pairs
    pub challenge_dir: PathBuf,
    /// Sender of creation transactions; the node's coinbase when unset
    pub deploy_from: Option<String>,
    /// Gas price for creation transactions, in wei
    pub deploy_gas_price: u128,
    pub deploy_timeout: Duration,
    pub action_timeout: Duration,
    pub poll_interval: Duration,
    /// Bound on one node call
    pub rpc_timeout: Duration,
}

impl Default for DeployerConfig {
    fn default() -> Self {
        Self {
            ipc_path: PathBuf::from(".ethereum").join("geth.ipc"),
            solc_path: PathBuf::from("solc"),
            optimizer_runs: DEFAULT_OPTIMIZER_RUNS,
            challenge_dir: PathBuf::from("challenges"),
            deploy_from: None,
            deploy_gas_price: DEFAULT_GAS_PRICE,
            deploy_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            action_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll_interval: DEFAULT_POLL_INTERVAL,
            rpc_timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
        }
    }
}

impl DeployerConfig {
    /// Defaults with overrides from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Defaults with overrides from `vars`
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(datadir) = vars.get("DEPLOYER_GETH_DATADIR") {
            config.ipc_path = PathBuf::from(datadir).join("geth.ipc");
        }
        if let Some(path) = vars.get("DEPLOYER_IPC_PATH") {
            config.ipc_path = PathBuf::from(path);
        }
        if let Some(path) = vars.get("DEPLOYER_SOLC_PATH") {
            config.solc_path = PathBuf::from(path);
        }
        if let Some(dir) = vars.get("DEPLOYER_CHALLENGE_DIR") {
            config.challenge_dir = PathBuf::from(dir);
        }
        if let Some(from) = vars.get("DEPLOYER_FROM") {
            config.deploy_from = Some(from.clone());
        }
        if let Some(price) = vars.get("DEPLOYER_GAS_PRICE") {
            config.deploy_gas_price = parse_var("DEPLOYER_GAS_PRICE", price)?;
        }
        if let Some(secs) = vars.get("DEPLOYER_TIMEOUT_SECS") {
            let secs: u64 = parse_var("DEPLOYER_TIMEOUT_SECS", secs)?;
            config.deploy_timeout = Duration::from_secs(secs);
            config.action_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = vars.get("DEPLOYER_RPC_TIMEOUT_SECS") {
            let secs: u64 = parse_var("DEPLOYER_RPC_TIMEOUT_SECS", secs)?;
            config.rpc_timeout = Duration::from_secs(secs);
        }
        if let Some(runs) = vars.get("DEPLOYER_OPTIMIZER_RUNS") {
            config.optimizer_runs = parse_var("DEPLOYER_OPTIMIZER_RUNS", runs)?;
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
