//! Chain-Deployer CLI Application
//!
//! A command-line interface for compiling and deploying challenge contracts.

use chain_deployer::cli::{self, AppState};
use chain_deployer::config::DeployerConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "deployer")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Compile and deploy Solidity challenges to an Ethereum node", long_about = None)]
struct Cli {
    /// Node IPC socket (default: $DEPLOYER_IPC_PATH or <geth datadir>/geth.ipc)
    #[arg(long)]
    ipc: Option<PathBuf>,

    /// Solidity compiler executable
    #[arg(long)]
    solc: Option<PathBuf>,

    /// Directory holding <name>.sol and <name>.json challenge files
    #[arg(short, long)]
    challenges: Option<PathBuf>,

    /// Sender of deployment transactions (default: node coinbase)
    #[arg(long)]
    from: Option<String>,

    /// Gas price for deployment transactions, in wei (default: 20 gwei)
    #[arg(long)]
    gas_price: Option<u128>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a Solidity file
    Compile {
        /// Source file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Deploy a challenge and wait for it to finish
    Deploy {
        /// Challenge name
        name: String,

        /// Address of the user the challenge is deployed for
        #[arg(short, long)]
        user: String,

        /// Seconds to wait for the deployment to be mined
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Show the balance of an address
    Balance {
        /// Address to query
        #[arg(short, long)]
        address: String,
    },

    /// Unlock the node's coinbase account
    Unlock,

    /// List available challenges
    Challenges,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();

    let mut config = DeployerConfig::from_env()?;
    if let Some(ipc) = args.ipc {
        config.ipc_path = ipc;
    }
    if let Some(solc) = args.solc {
        config.solc_path = solc;
    }
    if let Some(dir) = args.challenges {
        config.challenge_dir = dir;
    }
    if args.from.is_some() {
        config.deploy_from = args.from;
    }
    if let Some(price) = args.gas_price {
        config.deploy_gas_price = price;
    }

    let default_timeout = config.deploy_timeout;
    let json = args.json;
    let state = AppState::new(config)?;

    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        match args.command {
            Commands::Compile { file } => {
                cli::cmd_compile(&state, &file, json).await?;
            }

            Commands::Deploy {
                name,
                user,
                timeout,
            } => {
                let timeout = timeout.map(Duration::from_secs).unwrap_or(default_timeout);
                cli::cmd_deploy(&state, &name, &user, timeout, json).await?;
            }

            Commands::Balance { address } => {
                cli::cmd_balance(&state, &address).await?;
            }

            Commands::Unlock => {
                cli::cmd_unlock(&state).await?;
            }

            Commands::Challenges => {
                cli::cmd_challenges(&state)?;
            }
        }

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}
