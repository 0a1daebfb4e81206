//! Chain client wrapper
//!
//! Thin layer over [`NodeRpc`]: plain passthroughs plus the two waits the
//! deployer needs (contract creation and value transfers), both built on
//! [`poll_until`].

use crate::chain::poll::{poll_until, PollSchedule, DEFAULT_POLL_INTERVAL};
use crate::chain::rpc::{NodeRpc, RpcError, TransactionReceipt, TransactionRequest};
use crate::contract::abi::{ContractAbi, DEPOSIT_SELECTOR};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Chain client errors
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),
    #[error("Deployment actions timed out after {timeout:?} (tx {tx_hash})")]
    ActionTimedOut { tx_hash: String, timeout: Duration },
    #[error("Contract has no {0}() function")]
    MissingFunction(String),
    #[error("Function {0}() does not accept value")]
    NotPayable(String),
}

/// Shareable handle to a node
#[derive(Clone)]
pub struct ChainClient {
    rpc: Arc<dyn NodeRpc>,
    poll_interval: Duration,
}

impl ChainClient {
    pub fn new(rpc: Arc<dyn NodeRpc>) -> Self {
        Self {
            rpc,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the receipt polling interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn schedule(&self, deadline: Duration) -> PollSchedule {
        PollSchedule::new(self.poll_interval, deadline)
    }

    pub async fn coinbase(&self) -> Result<String, ChainError> {
        Ok(self.rpc.coinbase().await?)
    }

    /// Unlock the coinbase account with the empty passphrase
    pub async fn unlock_coinbase(&self) -> Result<bool, ChainError> {
        let coinbase = self.rpc.coinbase().await?;
        let unlocked = self.rpc.unlock_account(&coinbase, "").await?;
        log::info!("Unlock of coinbase {}: {}", coinbase, unlocked);
        Ok(unlocked)
    }

    /// Balance of `address` in wei
    pub async fn balance_of(&self, address: &str) -> Result<u128, ChainError> {
        Ok(self.rpc.balance(address).await?)
    }

    pub async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, ChainError> {
        Ok(self.rpc.transaction_receipt(tx_hash).await?)
    }

    /// Submit a contract-creation transaction and return its hash
    pub async fn submit_creation(
        &self,
        bytecode: &[u8],
        from: &str,
        gas_price: Option<u128>,
    ) -> Result<String, ChainError> {
        let tx = TransactionRequest::creation(from, bytecode, gas_price);
        let tx_hash = self.rpc.send_transaction(&tx).await?;
        log::info!("Submitted contract creation {} from {}", tx_hash, from);
        Ok(tx_hash)
    }

    /// Wait for the created contract's address.
    ///
    /// A receipt without a contract address counts as not mined yet, so
    /// both cases end in `Ok(None)` once `timeout` passes.
    pub async fn wait_for_contract_address(
        &self,
        tx_hash: &str,
        timeout: Duration,
    ) -> Result<Option<String>, ChainError> {
        let rpc = &self.rpc;
        poll_until(self.schedule(timeout), || async move {
            let receipt = rpc.transaction_receipt(tx_hash).await?;
            Ok::<_, ChainError>(receipt.and_then(|r| r.contract_address))
        })
        .await
    }

    /// Call `deposit()` on a contract with `amount` wei from the coinbase
    /// and wait for the transaction to be mined
    pub async fn send_value_to_contract(
        &self,
        abi: &ContractAbi,
        contract_address: &str,
        amount: u128,
        timeout: Duration,
    ) -> Result<TransactionReceipt, ChainError> {
        if !abi.has_function("deposit") {
            return Err(ChainError::MissingFunction("deposit".to_string()));
        }
        if !abi.is_payable("deposit") {
            return Err(ChainError::NotPayable("deposit".to_string()));
        }

        let tx = TransactionRequest {
            from: self.rpc.coinbase().await?,
            to: Some(contract_address.to_string()),
            gas_price: None,
            value: Some(amount),
            data: Some(format!("0x{}", hex::encode(DEPOSIT_SELECTOR))),
        };
        let tx_hash = self.rpc.send_transaction(&tx).await?;
        log::info!(
            "Depositing {} wei into {} (tx {})",
            amount,
            contract_address,
            tx_hash
        );

        let rpc = &self.rpc;
        let pending = tx_hash.as_str();
        let receipt = poll_until(self.schedule(timeout), || async move {
            Ok::<_, ChainError>(rpc.transaction_receipt(pending).await?)
        })
        .await?;

        receipt.ok_or(ChainError::ActionTimedOut { tx_hash, timeout })
    }
}
