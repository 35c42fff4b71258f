// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Result;
use clap::Subcommand;
use gs_core::GuestShareConfig;
use gs_logging::CliLoggingArgs;
use std::path::PathBuf;

pub mod check;
pub mod names;
pub mod replay;

pub use clap::Parser;

#[derive(clap::Parser)]
#[command(
    name = "gshare",
    about = "Guest Share CLI",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file (default: $GS_HOME/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub logging: CliLoggingArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decide whether a path may be shared with a guest
    Check(check::CheckArgs),
    /// Apply a JSON event log and print the resulting shared-path table
    Replay(replay::ReplayArgs),
    /// Print a collision-free name for a new entry in a directory
    Dedup(names::DedupArgs),
    /// Resolve a path below a directory to a file or directory entry
    Resolve(names::ResolveArgs),
}

impl Commands {
    pub async fn run(self, config: &GuestShareConfig) -> Result<()> {
        match self {
            Commands::Check(args) => args.run(config).await,
            Commands::Replay(args) => args.run(config).await,
            Commands::Dedup(args) => args.run(config).await,
            Commands::Resolve(args) => args.run().await,
        }
    }
}
