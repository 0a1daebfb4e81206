//! CLI commands for the deployer
//!
//! Implements all command handlers for the CLI interface.

use crate::chain::{ChainClient, IpcNode};
use crate::config::DeployerConfig;
use crate::contract::{ChallengeStore, ContractRegistry, DepositHook};
use crate::deploy::{Deployer, DeploymentSnapshot};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub deployer: Deployer,
}

impl AppState {
    /// Connect to the node and load the hook registry
    pub fn new(config: DeployerConfig) -> CliResult<Self> {
        let store = ChallengeStore::new(&config.challenge_dir);
        let registry = build_registry(&store)?;
        let node = IpcNode::new(&config.ipc_path).with_request_timeout(config.rpc_timeout);
        let chain = ChainClient::new(Arc::new(node));

        Ok(Self {
            deployer: Deployer::new(config, chain, registry),
        })
    }
}

/// Register the deposit hook for every challenge that has deploy actions
pub fn build_registry(store: &ChallengeStore) -> CliResult<ContractRegistry> {
    let mut registry = ContractRegistry::new();
    if !store.dir().is_dir() {
        log::warn!("Challenge directory {:?} not found", store.dir());
        return Ok(registry);
    }

    for name in store.list()? {
        let challenge = store.load(&name)?;
        if !challenge.config.on_deploy.is_empty() {
            registry.register(&name, DepositHook::factory);
        }
    }
    Ok(registry)
}

/// Poll `deployer` until the deployment ends, calling `on_change` for every
/// new state seen
pub async fn watch_deployment<F>(
    deployer: &Deployer,
    interval: Duration,
    mut on_change: F,
) -> DeploymentSnapshot
where
    F: FnMut(&DeploymentSnapshot),
{
    let mut last = None;
    loop {
        let snapshot = deployer.deployment_status();
        if last.as_ref() != Some(&snapshot.state) {
            on_change(&snapshot);
            last = Some(snapshot.state.clone());
        }
        if snapshot.state.is_terminal() {
            return snapshot;
        }
        tokio::time::sleep(interval).await;
    }
}

/// Compile a source file
pub async fn cmd_compile(state: &AppState, file: &Path, json: bool) -> CliResult<()> {
    let source = std::fs::read_to_string(file)?;
    let artifact = state.deployer.compile(&source).await?;

    if json {
        let out = serde_json::json!({
            "contract": artifact.contract_name,
            "bytecode": artifact.bytecode_hex(),
            "abi": artifact.abi,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("📜 Compiled {}", artifact.contract_name);
    println!("   ├─ Bytecode: {} bytes", artifact.bytecode.len());
    println!("   └─ Functions: {}", artifact.abi.function_names().join(", "));

    Ok(())
}

/// Deploy a challenge and follow its status
pub async fn cmd_deploy(
    state: &AppState,
    name: &str,
    user: &str,
    timeout: Duration,
    json: bool,
) -> CliResult<()> {
    let deployer = &state.deployer;
    println!("🚀 Deploying {} for {}...", name, user);

    let handle = deployer.deploy_contract_async(name, user, timeout);
    let interval = deployer.config().poll_interval;
    let snapshot = watch_deployment(deployer, interval, |s| {
        if !json {
            println!("   ⏳ {}", s.state);
        }
    })
    .await;
    handle.await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    if let Some(reason) = snapshot.state.failure() {
        return Err(format!("deployment failed: {}", reason).into());
    }

    if !json {
        println!("✅ Contract deployed!");
        if let Some(address) = &snapshot.deployed_address {
            println!("   Address: {}", address);
        }
    }

    Ok(())
}

/// Show the balance of an address
pub async fn cmd_balance(state: &AppState, address: &str) -> CliResult<()> {
    let balance = state.deployer.balance_of(address).await?;
    println!("💰 Balance for {}", address);
    println!("   {} wei", balance);
    Ok(())
}

/// Unlock the node's coinbase account
pub async fn cmd_unlock(state: &AppState) -> CliResult<()> {
    if state.deployer.unlock_coinbase().await? {
        println!("🔓 Coinbase unlocked");
    } else {
        println!("❌ Node refused to unlock the coinbase");
    }
    Ok(())
}

/// List challenges and whether they have a post-deploy hook
pub fn cmd_challenges(state: &AppState) -> CliResult<()> {
    let store = state.deployer.challenges();
    let names = store.list()?;

    if names.is_empty() {
        println!("📭 No challenges found in {:?}", store.dir());
        return Ok(());
    }

    println!("📋 Challenges ({}):", names.len());
    for name in &names {
        let hook = if state.deployer.registry().exists(name) {
            "deposit hook"
        } else {
            "-"
        };
        println!("   {} ({})", name, hook);
    }

    Ok(())
}
