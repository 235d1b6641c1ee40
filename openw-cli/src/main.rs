// openw-cli/src/main.rs
mod api;
mod commands;
mod console;
mod logging;
mod wallet;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use crate::{
    api::HttpConnector,
    commands::{run_command, Cli},
    console::TerminalConsole,
    wallet::{config::Config, session::Session},
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;
    let log_file = logging::init(&config.log_dir, &config.log_level)?;

    info!("Starting openwcli, logging to {:?}", log_file);
    if !cli.config.exists() {
        info!("No config file at {:?}, using defaults.", cli.config);
    }

    let mut session = Session::new(Box::new(HttpConnector));
    session
        .initialize(config)
        .context("Failed to initialize session")?;

    let mut console = TerminalConsole;
    run_command(&mut session, &mut console, cli.command)?;

    info!("openwcli exited cleanly.");
    Ok(())
}
