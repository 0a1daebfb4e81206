//! Command-line front end

pub mod commands;

pub use commands::{
    build_registry, cmd_balance, cmd_challenges, cmd_compile, cmd_deploy, cmd_unlock,
    watch_deployment, AppState, CliResult,
};
