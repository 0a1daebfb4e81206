//! In-memory node used by the test suites

use crate::chain::rpc::{NodeRpc, RpcError, TransactionReceipt, TransactionRequest};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct StubState {
    sent: Vec<TransactionRequest>,
    polls: HashMap<String, usize>,
    balances: HashMap<String, u128>,
    unlocked: Vec<String>,
}

/// Node that mines every transaction after a configurable number of
/// receipt lookups, or never
pub(crate) struct StubNode {
    receipt_delay: usize,
    mines: bool,
    contract_address: Option<String>,
    state: Mutex<StubState>,
}

impl StubNode {
    pub const COINBASE: &'static str = "0x00000000000000000000000000000000000000cb";
    pub const CONTRACT_ADDRESS: &'static str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

    pub fn new() -> Self {
        Self {
            receipt_delay: 0,
            mines: true,
            contract_address: Some(Self::CONTRACT_ADDRESS.to_string()),
            state: Mutex::new(StubState::default()),
        }
    }

    /// Return no receipt for the first `polls` lookups of each transaction
    pub fn with_receipt_delay(mut self, polls: usize) -> Self {
        self.receipt_delay = polls;
        self
    }

    /// Creation receipts carry a null contract address
    pub fn without_contract_address(mut self) -> Self {
        self.contract_address = None;
        self
    }

    pub fn never_mine(mut self) -> Self {
        self.mines = false;
        self
    }

    pub fn hash_for(index: usize) -> String {
        format!("0x{:064x}", index + 1)
    }

    pub fn coinbase_address(&self) -> String {
        Self::COINBASE.to_string()
    }

    pub fn set_balance(&self, address: &str, amount: u128) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert(address.to_string(), amount);
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn unlocked(&self) -> Vec<String> {
        self.state.lock().unwrap().unlocked.clone()
    }

    pub fn receipt_polls(&self) -> usize {
        self.state.lock().unwrap().polls.values().sum()
    }
}

#[async_trait]
impl NodeRpc for StubNode {
    async fn coinbase(&self) -> Result<String, RpcError> {
        Ok(self.coinbase_address())
    }

    async fn unlock_account(&self, account: &str, _passphrase: &str) -> Result<bool, RpcError> {
        self.state
            .lock()
            .unwrap()
            .unlocked
            .push(account.to_string());
        Ok(true)
    }

    async fn balance(&self, address: &str) -> Result<u128, RpcError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .balances
            .get(address)
            .copied()
            .unwrap_or(0))
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, RpcError> {
        let mut state = self.state.lock().unwrap();
        let hash = Self::hash_for(state.sent.len());
        if let (Some(to), Some(value)) = (&tx.to, tx.value) {
            *state.balances.entry(to.clone()).or_insert(0) += value;
        }
        state.sent.push(tx.clone());
        Ok(hash)
    }

    async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, RpcError> {
        let mut state = self.state.lock().unwrap();
        let polls = state.polls.entry(tx_hash.to_string()).or_insert(0);
        *polls += 1;
        if !self.mines || *polls <= self.receipt_delay {
            return Ok(None);
        }

        let index = (0..state.sent.len())
            .find(|i| Self::hash_for(*i) == tx_hash)
            .ok_or_else(|| RpcError::InvalidResponse(format!("unknown tx {}", tx_hash)))?;
        let contract_address = if state.sent[index].is_creation() {
            self.contract_address.clone()
        } else {
            None
        };

        Ok(Some(TransactionReceipt {
            transaction_hash: tx_hash.to_string(),
            contract_address,
            block_number: Some("0x1".to_string()),
            status: Some("0x1".to_string()),
        }))
    }
}
