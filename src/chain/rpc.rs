//! Node RPC abstraction
//!
//! The node is a black box reached over JSON-RPC. Everything the deployer
//! needs from it goes through the [`NodeRpc`] trait so the transport can be
//! swapped (IPC socket in production, an in-memory stub in tests).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// RPC errors
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Node error {code}: {message}")]
    Node { code: i64, message: String },
    #[error("Connection closed before a response arrived")]
    Disconnected,
    #[error("No response within {0:?}")]
    TimedOut(Duration),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Transaction submitted through `eth_sendTransaction`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "quantity")]
    pub gas_price: Option<u128>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "quantity")]
    pub value: Option<u128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl TransactionRequest {
    /// Contract creation: no recipient, bytecode as call data
    pub fn creation(from: &str, bytecode: &[u8], gas_price: Option<u128>) -> Self {
        Self {
            from: from.to_string(),
            to: None,
            gas_price,
            value: None,
            data: Some(format!("0x{}", hex::encode(bytecode))),
        }
    }

    /// Whether this transaction creates a contract
    pub fn is_creation(&self) -> bool {
        self.to.is_none()
    }
}

/// Receipt returned by `eth_getTransactionReceipt` once a transaction is mined
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Calls the deployer makes against a node
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// Account the node mines to (`eth_coinbase`)
    async fn coinbase(&self) -> Result<String, RpcError>;

    /// Unlock an account held by the node (`personal_unlockAccount`)
    async fn unlock_account(&self, account: &str, passphrase: &str) -> Result<bool, RpcError>;

    /// Balance in wei at the latest block (`eth_getBalance`)
    async fn balance(&self, address: &str) -> Result<u128, RpcError>;

    /// Submit a transaction for the node to sign and broadcast; returns its hash
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, RpcError>;

    /// Receipt for a transaction, `None` while it is still pending
    async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, RpcError>;
}

/// Encode an integer as a JSON-RPC quantity (`0x`-prefixed, no leading zeros)
pub fn to_quantity(value: u128) -> String {
    format!("0x{:x}", value)
}

/// Parse a JSON-RPC quantity
pub fn parse_quantity(s: &str) -> Result<u128, RpcError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| RpcError::InvalidResponse(format!("quantity without 0x prefix: {}", s)))?;
    if digits.is_empty() {
        return Err(RpcError::InvalidResponse("empty quantity".to_string()));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|_| RpcError::InvalidResponse(format!("invalid quantity: {}", s)))
}

/// Serde adapter for optional hex quantities
pub(crate) mod quantity {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<u128>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_str(&super::to_quantity(*v)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u128>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| super::parse_quantity(&s).map_err(de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_encoding() {
        assert_eq!(to_quantity(0), "0x0");
        assert_eq!(to_quantity(255), "0xff");
        assert_eq!(parse_quantity("0x3b9aca00").unwrap(), 1_000_000_000);
        assert!(parse_quantity("1234").is_err());
        assert!(parse_quantity("0x").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_creation_request_json() {
        let tx = TransactionRequest::creation("0xabc", &[0x60, 0x80], Some(20_000_000_000));
        let json = serde_json::to_value(&tx).unwrap();

        assert_eq!(json["from"], "0xabc");
        assert_eq!(json["gasPrice"], "0x4a817c800");
        assert_eq!(json["data"], "0x6080");
        assert!(json.get("to").is_none());
        assert!(json.get("value").is_none());
        assert!(tx.is_creation());
    }

    #[test]
    fn test_receipt_with_null_contract_address() {
        let receipt: TransactionReceipt = serde_json::from_str(
            r#"{"transactionHash":"0x01","contractAddress":null,"blockNumber":"0x2"}"#,
        )
        .unwrap();

        assert_eq!(receipt.transaction_hash, "0x01");
        assert!(receipt.contract_address.is_none());
        assert_eq!(receipt.block_number.as_deref(), Some("0x2"));
    }
}
