//! Challenge storage
//!
//! A challenge is a pair of files in the challenge directory:
//! `<name>.sol` with the contract source and `<name>.json` with its
//! deployment config.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Challenge loading errors
#[derive(Error, Debug)]
pub enum ChallengeError {
    #[error("Contract not found: {0}")]
    ContractNotFound(String),
    #[error("Invalid contract name: {0}")]
    InvalidName(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Invalid challenge config for {name}: {source}")]
    InvalidConfig {
        name: String,
        source: serde_json::Error,
    },
}

/// Kinds of post-deploy instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Send `amount` wei to the contract's `deposit()` function
    Deposit,
}

/// Instruction executed once the contract is on chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployAction {
    pub action: ActionKind,
    #[serde(default)]
    pub amount: u128,
}

impl DeployAction {
    pub fn deposit(amount: u128) -> Self {
        Self {
            action: ActionKind::Deposit,
            amount,
        }
    }
}

/// Contents of `<name>.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChallengeConfig {
    #[serde(default)]
    pub on_deploy: Vec<DeployAction>,
}

/// A loaded challenge
#[derive(Debug, Clone)]
pub struct Challenge {
    pub name: String,
    pub source: String,
    pub config: ChallengeConfig,
}

/// Directory of challenges
#[derive(Debug, Clone)]
pub struct ChallengeStore {
    dir: PathBuf,
}

impl ChallengeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load source and config for `name`
    pub fn load(&self, name: &str) -> Result<Challenge, ChallengeError> {
        validate_name(name)?;

        let config_path = self.dir.join(format!("{}.json", name));
        let source_path = self.dir.join(format!("{}.sol", name));

        let config_raw = read_challenge_file(&config_path, name)?;
        let config: ChallengeConfig =
            serde_json::from_str(&config_raw).map_err(|source| ChallengeError::InvalidConfig {
                name: name.to_string(),
                source,
            })?;
        let source = read_challenge_file(&source_path, name)?;

        log::debug!(
            "Loaded challenge {} ({} deploy action(s))",
            name,
            config.on_deploy.len()
        );

        Ok(Challenge {
            name: name.to_string(),
            source,
            config,
        })
    }

    /// Whether both files exist for `name`
    pub fn exists(&self, name: &str) -> bool {
        validate_name(name).is_ok()
            && self.dir.join(format!("{}.sol", name)).is_file()
            && self.dir.join(format!("{}.json", name)).is_file()
    }

    /// Names of all complete challenges, sorted
    pub fn list(&self) -> Result<Vec<String>, ChallengeError> {
        let mut names: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension()? != "sol" {
                    return None;
                }
                path.file_stem()?.to_str().map(str::to_string)
            })
            .filter(|name| self.exists(name))
            .collect();
        names.sort();
        Ok(names)
    }
}

/// Names are plain file stems; anything that could escape the directory is rejected
fn validate_name(name: &str) -> Result<(), ChallengeError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ChallengeError::InvalidName(name.to_string()))
    }
}

fn read_challenge_file(path: &Path, name: &str) -> Result<String, ChallengeError> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ChallengeError::ContractNotFound(name.to_string()),
        _ => ChallengeError::IoError(e),
    })
}
