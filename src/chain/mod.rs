//! Node access
//!
//! Provides the RPC seam to an Ethereum node and the client used by the
//! deployer:
//! - `NodeRpc` trait with a JSON-RPC over IPC implementation
//! - Bounded polling for receipts
//! - `ChainClient` wrapper (balances, unlock, creation, deposits)

pub mod client;
#[cfg(unix)]
pub mod ipc;
pub mod poll;
pub mod rpc;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ChainClient, ChainError};
#[cfg(unix)]
pub use ipc::{IpcNode, JsonCodec, DEFAULT_REQUEST_TIMEOUT};
pub use poll::{poll_until, PollSchedule, DEFAULT_POLL_INTERVAL};
pub use rpc::{parse_quantity, to_quantity, NodeRpc, RpcError, TransactionReceipt, TransactionRequest};
