// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mnemo - conversation memory engine.
//!
//! This is the binary entry point: the CLI, the `serve` daemon, and `status`.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod cli;
mod commands;
mod engine;
mod serve;
mod shutdown;
mod status;

use clap::Parser;
use mnemo_config::MnemoConfig;
use mnemo_core::MnemoError;
use mnemo_gateway::protocol::error_message;

use crate::cli::{Cli, Commands};
use crate::engine::Engine;
use crate::serve::Transport;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => mnemo_config::load_and_validate_path(path),
        None => mnemo_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            mnemo_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command, config).await {
        eprintln!("mnemo: {}", error_message(&e));
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: MnemoConfig) -> Result<(), MnemoError> {
    match command {
        Commands::Serve { stdio } => {
            serve::init_tracing(&config.server.log_level);
            let transport = if stdio { Transport::Stdio } else { Transport::Http };
            serve::run_serve(config, transport).await
        }
        Commands::Status { json, plain } => status::run_status(&config, json, plain).await,
        command => {
            // One-shot commands only log warnings unless RUST_LOG says otherwise.
            let level = match command {
                Commands::WatchProject { .. } => config.server.log_level.as_str(),
                _ => "warn",
            };
            serve::init_tracing(level);

            let cancel = shutdown::install_signal_handler();
            let engine = Engine::connect(&config, cancel).await?;
            let output = commands::execute(&engine.ctx, command).await?;
            println!("{output}");
            Ok(())
        }
    }
}
