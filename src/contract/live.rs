//! Handle to a contract that is on chain

use crate::chain::{ChainClient, ChainError, TransactionReceipt};
use crate::contract::abi::ContractAbi;
use crate::contract::challenge::DeployAction;
use std::time::Duration;

/// A deployed contract, as handed to post-deploy hooks
#[derive(Clone)]
pub struct LiveContract {
    name: String,
    address: String,
    abi: ContractAbi,
    deploy_actions: Vec<DeployAction>,
    chain: ChainClient,
    action_timeout: Duration,
}

impl LiveContract {
    pub fn new(
        name: &str,
        address: &str,
        abi: ContractAbi,
        deploy_actions: Vec<DeployAction>,
        chain: ChainClient,
        action_timeout: Duration,
    ) -> Self {
        Self {
            name: name.to_string(),
            address: address.to_string(),
            abi,
            deploy_actions,
            chain,
            action_timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn abi(&self) -> &ContractAbi {
        &self.abi
    }

    /// Post-deploy instructions from the challenge config, in order
    pub fn deploy_actions(&self) -> &[DeployAction] {
        &self.deploy_actions
    }

    /// Send `amount` wei to the contract's `deposit()` and wait until mined
    pub async fn deposit(&self, amount: u128) -> Result<TransactionReceipt, ChainError> {
        self.chain
            .send_value_to_contract(&self.abi, &self.address, amount, self.action_timeout)
            .await
    }
}
