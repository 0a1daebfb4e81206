//! Smart contract module
//!
//! Everything about a contract before and after it reaches the chain.
//!
//! # Overview
//!
//! This module implements:
//! - A `solc --standard-json` adapter producing bytecode and ABI
//! - Challenge loading (source plus deploy config) from a directory
//! - A registry of post-deploy hooks keyed by contract name
//! - A handle to the live contract passed to those hooks
//!
//! # Example
//!
//! ```rust,no_run
//! use chain_deployer::contract::{ChallengeStore, SolcCompiler};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = ChallengeStore::new("challenges");
//! let challenge = store.load("SimpleStorage")?;
//!
//! let artifact = SolcCompiler::new("solc").compile(&challenge.source).await?;
//! println!("{} bytes, functions {:?}", artifact.bytecode.len(), artifact.abi.function_names());
//! # Ok(())
//! # }
//! ```

pub mod abi;
pub mod challenge;
pub mod compiler;
pub mod hooks;
pub mod live;
pub mod registry;

pub use abi::{ContractAbi, DEPOSIT_SELECTOR};
pub use challenge::{ActionKind, Challenge, ChallengeConfig, ChallengeError, ChallengeStore, DeployAction};
pub use compiler::{
    parse_standard_output, CompiledArtifact, CompilerError, SolcCompiler, DEFAULT_OPTIMIZER_RUNS,
    SOURCE_NAME,
};
pub use hooks::DepositHook;
pub use live::LiveContract;
pub use registry::{ContractRegistry, HookContext, HookError, HookFactory, PostDeployHook};
