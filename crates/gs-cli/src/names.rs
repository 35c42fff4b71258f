// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::{Context, Result};
use clap::Args;
use gs_core::{EntryKind, GuestShareConfig, HostEntryProvider, PathNameResolver};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Serialize)]
struct ResolveJson {
    path: String,
    kind: EntryKind,
    full_path: String,
}

#[derive(Args, Clone)]
pub struct DedupArgs {
    /// Directory the new entry goes into
    #[arg(long, value_name = "DIR")]
    dir: PathBuf,

    /// Desired name
    #[arg(value_name = "NAME")]
    name: String,
}

impl DedupArgs {
    pub async fn run(self, config: &GuestShareConfig) -> Result<()> {
        let dir = absolute(&self.dir)?;
        let provider = Arc::new(HostEntryProvider::new(&dir));
        let resolver =
            PathNameResolver::new(provider.clone()).with_probe_errors(config.probe_errors);
        let name = resolver
            .deduplicate_path(&provider.root_entry(), &self.name)
            .await
            .with_context(|| format!("failed to probe names in {}", dir.display()))?;
        println!("{name}");
        Ok(())
    }
}

#[derive(Args, Clone)]
pub struct ResolveArgs {
    /// Directory acting as the filesystem root
    #[arg(long, value_name = "DIR")]
    root: PathBuf,

    /// Path to resolve; a leading `/` starts at the root
    #[arg(value_name = "PATH")]
    path: String,

    /// Emit machine-readable JSON output
    #[arg(long)]
    json: bool,
}

impl ResolveArgs {
    pub async fn run(self) -> Result<()> {
        let root = absolute(&self.root)?;
        let provider = Arc::new(HostEntryProvider::new(&root));
        let resolver = PathNameResolver::new(provider.clone());
        let entry = resolver
            .resolve_path(&provider.root_entry(), &self.path)
            .await
            .with_context(|| format!("cannot resolve {} under {}", self.path, root.display()))?;

        if self.json {
            let output = ResolveJson {
                path: entry.path.to_string(),
                kind: entry.kind,
                full_path: entry.full_path().to_string(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            let kind = if entry.is_directory() { "directory" } else { "file" };
            println!("{kind} {}", entry.path);
        }
        Ok(())
    }
}

fn absolute(dir: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(dir).with_context(|| format!("cannot access {}", dir.display()))
}
