//! Contract interface description
//!
//! Wraps the JSON ABI produced by the compiler. Only function lookup is
//! needed here; argument encoding is left to the node.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Selector of `deposit()`, the first four bytes of its Keccak-256 hash
pub const DEPOSIT_SELECTOR: [u8; 4] = [0xd0, 0xe3, 0x0d, 0xb0];

/// JSON ABI of a compiled contract
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractAbi(Value);

impl ContractAbi {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Names of the declared functions, in ABI order
    pub fn function_names(&self) -> Vec<&str> {
        self.0
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.get("type").and_then(Value::as_str) == Some("function"))
                    .filter_map(|e| e.get("name").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.function_names().contains(&name)
    }

    /// Whether a function of that name accepts value
    pub fn is_payable(&self, name: &str) -> bool {
        self.0
            .as_array()
            .map(|entries| {
                entries.iter().any(|e| {
                    e.get("name").and_then(Value::as_str) == Some(name)
                        && (e.get("stateMutability").and_then(Value::as_str) == Some("payable")
                            || e.get("payable").and_then(Value::as_bool) == Some(true))
                })
            })
            .unwrap_or(false)
    }
}
