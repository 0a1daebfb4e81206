//! Deployment orchestrator
//!
//! Runs compile → submit → wait for receipt → post-deploy hook on a
//! background task and publishes progress through a [`StatusRegister`].

use crate::chain::{ChainClient, ChainError};
use crate::config::DeployerConfig;
use crate::contract::{
    ChallengeStore, CompiledArtifact, CompilerError, ContractRegistry, DeployAction, LiveContract,
    SolcCompiler,
};
use crate::deploy::error::{DeployError, FailureKind, FailureReason};
use crate::deploy::status::{DeploymentSnapshot, StatusRegister, Transition};
use futures::FutureExt;
use log::{error, info};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// One deployment attempt, fixed once the challenge config is read
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentRequest {
    pub contract_name: String,
    pub user_address: String,
    pub deploy_actions: Vec<DeployAction>,
    pub timeout: Duration,
}

struct DeployerInner {
    config: DeployerConfig,
    compiler: SolcCompiler,
    chain: ChainClient,
    challenges: ChallengeStore,
    registry: ContractRegistry,
    status: StatusRegister,
}

/// Deploys challenge contracts and tracks the latest deployment.
///
/// Cloning is cheap; clones share the same status register.
#[derive(Clone)]
pub struct Deployer {
    inner: Arc<DeployerInner>,
}

impl Deployer {
    /// Build a deployer from configuration, a node client and hook registry
    pub fn new(config: DeployerConfig, chain: ChainClient, registry: ContractRegistry) -> Self {
        let compiler =
            SolcCompiler::new(&config.solc_path).with_optimizer_runs(config.optimizer_runs);
        Self::with_compiler(config, compiler, chain, registry)
    }

    /// Same as [`Deployer::new`] with an explicitly configured compiler
    pub fn with_compiler(
        config: DeployerConfig,
        compiler: SolcCompiler,
        chain: ChainClient,
        registry: ContractRegistry,
    ) -> Self {
        let chain = chain.with_poll_interval(config.poll_interval);
        let challenges = ChallengeStore::new(&config.challenge_dir);
        Self {
            inner: Arc::new(DeployerInner {
                config,
                compiler,
                chain,
                challenges,
                registry,
                status: StatusRegister::new(),
            }),
        }
    }

    pub fn config(&self) -> &DeployerConfig {
        &self.inner.config
    }

    pub fn chain(&self) -> &ChainClient {
        &self.inner.chain
    }

    pub fn registry(&self) -> &ContractRegistry {
        &self.inner.registry
    }

    pub fn challenges(&self) -> &ChallengeStore {
        &self.inner.challenges
    }

    /// Current status and deployed address; never blocks on a deployment
    pub fn deployment_status(&self) -> DeploymentSnapshot {
        self.inner.status.snapshot()
    }

    /// Start deploying challenge `name` for `user_address` and return at once.
    ///
    /// Progress and failures are only reported through
    /// [`deployment_status`](Self::deployment_status). The returned handle
    /// may be awaited or dropped. Must be called within a Tokio runtime.
    pub fn deploy_contract_async(
        &self,
        name: &str,
        user_address: &str,
        timeout: Duration,
    ) -> JoinHandle<()> {
        let deployer = self.clone();
        let name = name.to_string();
        let user_address = user_address.to_string();

        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(deployer.run_deployment(&name, &user_address, timeout))
                .catch_unwind()
                .await;

            let reason = match outcome {
                Ok(Ok(address)) => {
                    info!("Deployed {} for {} at {}", name, user_address, address);
                    return;
                }
                Ok(Err(e)) => FailureReason::from(&e),
                Err(panic) => {
                    let detail = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    FailureReason::new(
                        FailureKind::DeploymentFailed,
                        format!("Deployment task panicked: {}", detail),
                    )
                }
            };

            error!("Deployment of {} for {} failed: {}", name, user_address, reason);
            deployer.inner.status.transition(Transition::Failed(reason));
        })
    }

    /// Compile a source unit
    pub async fn compile(&self, source: &str) -> Result<CompiledArtifact, CompilerError> {
        self.inner.compiler.compile(source).await
    }

    /// Balance of `address` in wei
    pub async fn balance_of(&self, address: &str) -> Result<u128, ChainError> {
        self.inner.chain.balance_of(address).await
    }

    pub async fn unlock_coinbase(&self) -> Result<bool, ChainError> {
        self.inner.chain.unlock_coinbase().await
    }

    /// The deployment procedure; returns the contract address
    async fn run_deployment(
        &self,
        name: &str,
        user_address: &str,
        timeout: Duration,
    ) -> Result<String, DeployError> {
        let inner = &self.inner;
        info!("Deploying {} for {}", name, user_address);
        inner.status.transition(Transition::Start);

        let challenge = inner.challenges.load(name)?;
        let request = DeploymentRequest {
            contract_name: challenge.name,
            user_address: user_address.to_string(),
            deploy_actions: challenge.config.on_deploy,
            timeout,
        };

        let artifact = inner.compiler.compile(&challenge.source).await?;
        inner.status.transition(Transition::Compiled);

        let from = match &inner.config.deploy_from {
            Some(from) => from.clone(),
            None => inner.chain.coinbase().await?,
        };
        let tx_hash = inner
            .chain
            .submit_creation(&artifact.bytecode, &from, Some(inner.config.deploy_gas_price))
            .await?;

        let address = inner
            .chain
            .wait_for_contract_address(&tx_hash, request.timeout)
            .await?
            .ok_or_else(|| DeployError::DeploymentTimedOut {
                tx_hash: tx_hash.clone(),
                timeout: request.timeout,
            })?;

        inner.status.transition(Transition::Mined {
            address: address.clone(),
        });
        info!("{} mined at {}", request.contract_name, address);

        if let Some(hook) =
            inner
                .registry
                .get(&request.user_address, &request.contract_name, &address)
        {
            let contract = LiveContract::new(
                &request.contract_name,
                &address,
                artifact.abi,
                request.deploy_actions,
                inner.chain.clone(),
                inner.config.action_timeout,
            );
            hook.setup(&contract).await?;
        }

        inner.status.transition(Transition::Deployed {
            address: address.clone(),
        });
        Ok(address)
    }
}
