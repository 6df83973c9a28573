// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! prloom - dispatcher engine control CLI

mod commands;
mod config;
mod error;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "prloom",
    version,
    disable_version_flag = true,
    about = "Control surface for the plan dispatcher engine"
)]
struct Cli {
    /// Repo root to operate on (defaults to the current directory)
    #[arg(short = 'C', long = "directory", global = true, value_name = "DIR")]
    directory: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mark a plan stopped; the dispatcher blocks it on its next tick
    Stop { plan_id: String },
    /// Clear a plan's blocked/paused state
    Unpause { plan_id: String },
    /// Request an immediate feedback poll for a plan
    Poll { plan_id: String },
    /// Launch a poll and resume the worker loop if new feedback lands
    LaunchPoll { plan_id: String },
    /// Request an immediate review-step run for a plan
    Review { plan_id: String },
    /// Activate a draft/queued plan
    Activate { plan_id: String },
    /// Run the dispatcher loop until killed
    Run {
        /// Launch runners under tmux instead of bare subprocesses
        #[arg(long)]
        tmux: bool,
        /// Attach the interactive terminal UI
        #[arg(long = "ui")]
        use_tui: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), error::CliError> {
    let cli = Cli::parse();
    let repo_root = cli
        .directory
        .unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::Stop { plan_id } => commands::stop(&repo_root, &plan_id),
        Commands::Unpause { plan_id } => commands::unpause(&repo_root, &plan_id),
        Commands::Poll { plan_id } => commands::poll(&repo_root, &plan_id),
        Commands::LaunchPoll { plan_id } => commands::launch_poll(&repo_root, &plan_id),
        Commands::Review { plan_id } => commands::review(&repo_root, &plan_id),
        Commands::Activate { plan_id } => commands::activate(&repo_root, &plan_id),
        Commands::Run { tmux, use_tui } => {
            let _guard = logging::init(&repo_root.join(".prloom").join("prloom.log"))?;
            commands::run(&repo_root, tmux, use_tui).await
        }
    }
}
