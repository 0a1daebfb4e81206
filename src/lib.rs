//! Chain-Deployer: compile Solidity challenges and deploy them to an Ethereum node
//!
//! This crate provides:
//! - A `solc --standard-json` adapter that yields one contract's bytecode and ABI
//! - A JSON-RPC client for the node's IPC socket
//! - Bounded receipt polling for contract creation and deposits
//! - An asynchronous deployment state machine with a lock-guarded status register
//! - A registry of post-deploy hooks keyed by contract name
//!
//! # Example
//!
//! ```rust,no_run
//! use chain_deployer::{ChainClient, ContractRegistry, Deployer, DeployerConfig, IpcNode};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DeployerConfig::default();
//! let chain = ChainClient::new(Arc::new(IpcNode::new(&config.ipc_path)));
//! let deployer = Deployer::new(config, chain, ContractRegistry::new());
//!
//! // Returns immediately; progress is read from the status register
//! deployer.deploy_contract_async("SimpleStorage", "0xuser", Duration::from_secs(90));
//!
//! let status = deployer.deployment_status();
//! println!("{} {:?}", status.state, status.deployed_address);
//! # Ok(())
//! # }
//! ```

pub mod chain;
#[cfg(unix)]
pub mod cli;
pub mod config;
pub mod contract;
pub mod deploy;

// Re-export commonly used types
#[cfg(unix)]
pub use chain::IpcNode;
pub use chain::{ChainClient, ChainError, NodeRpc, PollSchedule, RpcError};
pub use config::{ConfigError, DeployerConfig};
pub use contract::{
    ChallengeStore, CompiledArtifact, CompilerError, ContractAbi, ContractRegistry, DepositHook,
    LiveContract, PostDeployHook, SolcCompiler,
};
pub use deploy::{
    DeployError, Deployer, DeploymentSnapshot, DeploymentState, FailureKind, FailureReason,
};
