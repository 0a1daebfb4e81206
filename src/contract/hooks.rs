//! Built-in post-deploy hooks

use crate::chain::ChainClient;
use crate::contract::challenge::ActionKind;
use crate::contract::live::LiveContract;
use crate::contract::registry::{HookContext, HookError, PostDeployHook};
use async_trait::async_trait;
use std::sync::Mutex;

/// Funds a contract through its `deposit()` function and considers it
/// hacked once the balance drops below what was put in.
pub struct DepositHook {
    context: HookContext,
    deposited: Mutex<u128>,
}

impl DepositHook {
    pub fn new(context: HookContext) -> Self {
        Self {
            context,
            deposited: Mutex::new(0),
        }
    }

    /// Factory suitable for [`ContractRegistry::register`](crate::contract::ContractRegistry::register)
    pub fn factory(context: HookContext) -> Box<dyn PostDeployHook> {
        Box::new(Self::new(context))
    }

    /// Total wei deposited by `setup`
    pub fn deposited(&self) -> u128 {
        *self
            .deposited
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl PostDeployHook for DepositHook {
    async fn setup(&self, contract: &LiveContract) -> Result<(), HookError> {
        let mut total: u128 = 0;
        for action in contract.deploy_actions() {
            match action.action {
                ActionKind::Deposit => {
                    contract.deposit(action.amount).await?;
                    total = total.checked_add(action.amount).ok_or_else(|| {
                        HookError::Failed("deposit total overflows".to_string())
                    })?;
                }
            }
        }

        *self
            .deposited
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = total;

        log::info!(
            "Funded {} at {} for {} with {} wei",
            contract.name(),
            contract.address(),
            self.context.user_address,
            total
        );
        Ok(())
    }

    async fn has_been_hacked(&self, chain: &ChainClient) -> Result<bool, HookError> {
        let balance = chain.balance_of(&self.context.contract_address).await?;
        Ok(balance < self.deposited())
    }
}
