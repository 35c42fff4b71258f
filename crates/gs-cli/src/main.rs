// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Result;
use gs_cli::{Cli, Parser};
use gs_core::GuestShareConfig;
use gs_logging::CliLogLevel;

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        config,
        mut logging,
        command,
    } = Cli::parse();

    let config = GuestShareConfig::load_or_default(config.as_deref())?;

    if logging.log_format.is_none() {
        logging.log_format = config.logging.format;
    }
    let default_level = config.logging.cli_level().unwrap_or(CliLogLevel::Warn);
    // Stdout carries command output, so logs stay on stderr unless redirected
    logging.init_with_default_level("gs-cli", default_level)?;

    command.run(&config).await
}
