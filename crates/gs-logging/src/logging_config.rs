// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Logging configuration types

use crate::{CliLogLevel, LogFormat};
use serde::{Deserialize, Serialize};

/// `[logging]` section of a configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingConfig {
    /// Logging verbosity level
    #[serde(rename = "log-level")]
    pub level: Option<String>,

    /// Output format
    pub format: Option<LogFormat>,
}

impl LoggingConfig {
    /// The configured level, ignoring values that do not parse
    pub fn cli_level(&self) -> Option<CliLogLevel> {
        self.level.as_deref().and_then(|level| level.parse().ok())
    }
}
