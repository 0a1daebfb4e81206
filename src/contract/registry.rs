//! Post-deploy hook registry
//!
//! Maps a contract name to a factory for its hook. Hooks are built once per
//! deployment (user, contract name and on-chain address) and kept, so the
//! hook that ran `setup` is the one later asked `has_been_hacked`.

use crate::chain::{ChainClient, ChainError};
use crate::contract::live::LiveContract;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Hook errors
#[derive(Error, Debug)]
pub enum HookError {
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),
    #[error("Hook failed: {0}")]
    Failed(String),
}

/// Who and what a hook was built for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HookContext {
    pub user_address: String,
    pub contract_name: String,
    pub contract_address: String,
}

/// Contract-specific behaviour around a deployment
#[async_trait]
pub trait PostDeployHook: Send + Sync {
    /// Run once the contract is mined
    async fn setup(&self, contract: &LiveContract) -> Result<(), HookError>;

    /// Whether the user has broken the contract
    async fn has_been_hacked(&self, chain: &ChainClient) -> Result<bool, HookError>;
}

/// Builds a hook for one deployment
pub type HookFactory = Box<dyn Fn(HookContext) -> Box<dyn PostDeployHook> + Send + Sync>;

/// Name to hook factory lookup
#[derive(Default)]
pub struct ContractRegistry {
    factories: HashMap<String, HookFactory>,
    built: Mutex<HashMap<HookContext, Arc<dyn PostDeployHook>>>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the hook factory for `name`
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(HookContext) -> Box<dyn PostDeployHook> + Send + Sync + 'static,
    {
        self.built
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|context, _| context.contract_name != name);
        if self
            .factories
            .insert(name.to_string(), Box::new(factory))
            .is_some()
        {
            log::warn!("Replaced hook registered for {}", name);
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Hook for a deployment of `name`, built on first request
    pub fn get(
        &self,
        user_address: &str,
        name: &str,
        contract_address: &str,
    ) -> Option<Arc<dyn PostDeployHook>> {
        let factory = self.factories.get(name)?;
        let context = HookContext {
            user_address: user_address.to_string(),
            contract_name: name.to_string(),
            contract_address: contract_address.to_string(),
        };

        let mut built = self.built.lock().unwrap_or_else(PoisonError::into_inner);
        let hook = built
            .entry(context)
            .or_insert_with_key(|context| Arc::from(factory(context.clone())));
        Some(hook.clone())
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
