// openw-cli/src/commands.rs
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};

use crate::console::Console;
use crate::wallet::session::{Registration, Session};

/// Command-line front-end for the hosted wallet service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Generate a node keychain and register it on the remote server
    NodeRegister,
    /// Show the node keychain
    NodeInfo,
    /// Create a wallet on the remote server
    NewWallet,
    /// List the wallets registered on the remote server
    ListWallet,
    /// Create an account (not available yet)
    NewAccount,
    /// List accounts (not available yet)
    ListAccount,
    /// Create an address (not available yet)
    NewAddress,
    /// Search an address (not available yet)
    SearchAddress,
    /// Send a transfer (not available yet)
    Transfer,
    /// Configure fund summary (not available yet)
    SetSum,
    /// Start fund summary (not available yet)
    StartSum,
}

pub fn run_command(
    session: &mut Session,
    console: &mut dyn Console,
    command: Command,
) -> Result<()> {
    info!("Running command {:?}", command);

    let result = match command {
        Command::NodeRegister => session.register_flow(console).map(|outcome| match outcome {
            Registration::Registered(keychain) => {
                let remote = session
                    .config()
                    .map(|config| config.remote_server.clone())
                    .unwrap_or_default();
                println!("\nNode {} registered on {}.", keychain.node_id(), remote);
            }
            Registration::Declined => println!("\nExisting keychain kept, nothing registered."),
        }),
        Command::NodeInfo => session.show_identity_flow(console).map(|_| ()),
        Command::NewWallet => session.create_wallet_flow(console).map(|_| ()),
        Command::ListWallet => session.list_wallet_flow(console).map(|_| ()),
        Command::NewAccount => session.new_account_flow(),
        Command::ListAccount => session.list_account_flow(),
        Command::NewAddress => session.new_address_flow(),
        Command::SearchAddress => session.search_address_flow(),
        Command::Transfer => session.transfer_flow(),
        Command::SetSum => session.set_sum_flow(),
        Command::StartSum => session.start_sum_flow(),
    };

    if let Err(e) = &result {
        error!("Command {:?} failed: {}", command, e);
    }
    result.with_context(|| format!("Command {:?} failed", command))
}
