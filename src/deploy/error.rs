//! Deployment errors

use crate::chain::{ChainError, RpcError};
use crate::contract::{ChallengeError, CompilerError, HookError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Anything that can end a deployment attempt
#[derive(Error, Debug)]
pub enum DeployError {
    #[error(transparent)]
    Compiler(#[from] CompilerError),
    #[error(transparent)]
    Challenge(#[from] ChallengeError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Hook(#[from] HookError),
    #[error("Deployment timed out after {timeout:?} (tx {tx_hash})")]
    DeploymentTimedOut { tx_hash: String, timeout: Duration },
    #[error("Deployment failed: {0}")]
    DeploymentFailed(String),
}

impl From<RpcError> for DeployError {
    fn from(e: RpcError) -> Self {
        DeployError::Chain(ChainError::Rpc(e))
    }
}

/// Coarse classification of a failure, kept in the status register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    CompilerCrashed,
    CompilationError,
    NoContractProduced,
    AmbiguousContract,
    ContractNotFound,
    DeploymentTimedOut,
    ActionTimedOut,
    DeploymentFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::CompilerCrashed => "CompilerCrashed",
            FailureKind::CompilationError => "CompilationError",
            FailureKind::NoContractProduced => "NoContractProduced",
            FailureKind::AmbiguousContract => "AmbiguousContract",
            FailureKind::ContractNotFound => "ContractNotFound",
            FailureKind::DeploymentTimedOut => "DeploymentTimedOut",
            FailureKind::ActionTimedOut => "ActionTimedOut",
            FailureKind::DeploymentFailed => "DeploymentFailed",
        };
        write!(f, "{}", s)
    }
}

impl DeployError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DeployError::Compiler(CompilerError::CompilerCrashed { .. }) => {
                FailureKind::CompilerCrashed
            }
            DeployError::Compiler(CompilerError::CompilationError { .. }) => {
                FailureKind::CompilationError
            }
            DeployError::Compiler(CompilerError::NoContractProduced) => {
                FailureKind::NoContractProduced
            }
            DeployError::Compiler(CompilerError::AmbiguousContract { .. }) => {
                FailureKind::AmbiguousContract
            }
            DeployError::Challenge(ChallengeError::ContractNotFound(_))
            | DeployError::Challenge(ChallengeError::InvalidName(_)) => {
                FailureKind::ContractNotFound
            }
            DeployError::DeploymentTimedOut { .. } => FailureKind::DeploymentTimedOut,
            DeployError::Chain(ChainError::ActionTimedOut { .. })
            | DeployError::Hook(HookError::Chain(ChainError::ActionTimedOut { .. })) => {
                FailureKind::ActionTimedOut
            }
            _ => FailureKind::DeploymentFailed,
        }
    }
}

/// Why a deployment failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub message: String,
}

impl FailureReason {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&DeployError> for FailureReason {
    fn from(e: &DeployError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
