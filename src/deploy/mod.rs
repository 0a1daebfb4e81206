//! Deployment orchestration
//!
//! Provides the asynchronous deployment state machine:
//! - `Deployer` spawning one background task per deployment
//! - `StatusRegister` holding the latest deployment's state and address
//! - The error taxonomy reported through failed states
//!
//! # Example
//!
//! ```rust,no_run
//! use chain_deployer::chain::{ChainClient, IpcNode};
//! use chain_deployer::config::DeployerConfig;
//! use chain_deployer::contract::ContractRegistry;
//! use chain_deployer::deploy::Deployer;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DeployerConfig::from_env()?;
//! let chain = ChainClient::new(Arc::new(IpcNode::new(&config.ipc_path)));
//! let deployer = Deployer::new(config, chain, ContractRegistry::new());
//!
//! deployer.deploy_contract_async("SimpleStorage", "0xuser", Duration::from_secs(90));
//! println!("{}", deployer.deployment_status().state);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod orchestrator;
pub mod status;

pub use error::{DeployError, FailureKind, FailureReason};
pub use orchestrator::{Deployer, DeploymentRequest};
pub use status::{DeploymentSnapshot, DeploymentState, StatusRegister, Transition};
