//! Deployment status register
//!
//! A single slot holding the state of the latest deployment. It only
//! changes through [`Transition`]s, each applied under one lock
//! acquisition, so readers never see a state without its address.

use crate::deploy::error::FailureReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Where a deployment is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum DeploymentState {
    Idle,
    Compiling,
    CompiledAndProcessing,
    MinedPostProcessing,
    Deployed,
    Failed(FailureReason),
}

impl DeploymentState {
    /// Position in the success path; `Failed` sorts last
    pub fn stage(&self) -> u8 {
        match self {
            DeploymentState::Idle => 0,
            DeploymentState::Compiling => 1,
            DeploymentState::CompiledAndProcessing => 2,
            DeploymentState::MinedPostProcessing => 3,
            DeploymentState::Deployed => 4,
            DeploymentState::Failed(_) => 5,
        }
    }

    /// `Deployed` and `Failed` end an attempt
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentState::Deployed | DeploymentState::Failed(_))
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            DeploymentState::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentState::Idle => write!(f, "idle"),
            DeploymentState::Compiling => write!(f, "compiling"),
            DeploymentState::CompiledAndProcessing => write!(f, "compiled and processing"),
            DeploymentState::MinedPostProcessing => write!(f, "mined on-chain, post-processing"),
            DeploymentState::Deployed => write!(f, "deployed"),
            DeploymentState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Step of the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// New attempt; clears the previous address
    Start,
    Compiled,
    /// Receipt seen; state and address change together
    Mined { address: String },
    Deployed { address: String },
    /// Keeps whatever address is in the slot
    Failed(FailureReason),
}

/// Immutable view of the register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSnapshot {
    pub state: DeploymentState,
    pub deployed_address: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl DeploymentSnapshot {
    pub fn idle() -> Self {
        Self {
            state: DeploymentState::Idle,
            deployed_address: None,
            updated_at: Utc::now(),
        }
    }

    /// Snapshot after `transition`.
    ///
    /// Only `Mined` and `Deployed` put an address in the slot, and they
    /// bring their own, so an attempt never shows another attempt's address
    /// next to a pre-mining state.
    pub fn apply(&self, transition: Transition) -> Self {
        let (state, deployed_address) = match transition {
            Transition::Start => (DeploymentState::Compiling, None),
            Transition::Compiled => (DeploymentState::CompiledAndProcessing, None),
            Transition::Mined { address } => (DeploymentState::MinedPostProcessing, Some(address)),
            Transition::Deployed { address } => (DeploymentState::Deployed, Some(address)),
            Transition::Failed(reason) => (
                DeploymentState::Failed(reason),
                self.deployed_address.clone(),
            ),
        };

        if !matches!(state, DeploymentState::Compiling | DeploymentState::Failed(_))
            && state.stage() <= self.state.stage()
        {
            log::warn!(
                "Status moved backwards: {} -> {}",
                self.state,
                state
            );
        }

        Self {
            state,
            deployed_address,
            updated_at: Utc::now(),
        }
    }
}

impl Default for DeploymentSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

/// Lock-guarded status slot
#[derive(Debug, Default)]
pub struct StatusRegister {
    current: Mutex<DeploymentSnapshot>,
}

impl StatusRegister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `transition` and return the new snapshot
    pub fn transition(&self, transition: Transition) -> DeploymentSnapshot {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = current.apply(transition);
        log::debug!("Deployment status: {}", current.state);
        current.clone()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> DeploymentSnapshot {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
