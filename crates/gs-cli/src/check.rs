// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Result;
use clap::Args;
use gs_core::types::DEFAULT_VM_NAME;
use gs_core::{Entry, GuestShare, GuestShareConfig, SharePath, volume_registry_initializer};
use serde::Serialize;
use std::sync::Arc;

/// JSON output for a sharing decision
#[derive(Serialize)]
struct CheckJson {
    path: String,
    vm_name: String,
    volume_id: Option<String>,
    allowed: bool,
    denial: Option<String>,
    already_shared: bool,
}

#[derive(Args, Clone)]
pub struct CheckArgs {
    /// Absolute path of the entry
    #[arg(value_name = "PATH")]
    path: String,

    /// Guest VM to share with
    #[arg(long, default_value = DEFAULT_VM_NAME)]
    vm: String,

    /// Ask for a persistent share
    #[arg(long)]
    persist: bool,

    /// The entry is a file rather than a directory
    #[arg(long)]
    file: bool,

    /// Treat the VM as enabled even if the configuration does not
    #[arg(long)]
    assume_enabled: bool,

    /// Emit machine-readable JSON output
    #[arg(long)]
    json: bool,
}

impl CheckArgs {
    pub async fn run(self, config: &GuestShareConfig) -> Result<()> {
        let path: SharePath = self.path.parse()?;
        let initializer = volume_registry_initializer(Arc::new(config.volume_source()));
        let volumes = initializer.get_instance().await?;

        let volume = volumes.volume_for(&path);
        let filesystem_root = volume.as_ref().map(|v| v.root.clone()).unwrap_or_default();
        let entry = if self.file {
            Entry::file(path, filesystem_root)
        } else {
            Entry::directory(path, filesystem_root)
        };

        let service = GuestShare::from_config(config, volumes);
        if self.assume_enabled {
            service.set_enabled(&self.vm, "", true);
        }
        let decision = service.check_share(&self.vm, &entry, self.persist);
        let already_shared = service.is_path_shared(&self.vm, &entry);

        if self.json {
            let output = CheckJson {
                path: entry.path.to_string(),
                vm_name: self.vm,
                volume_id: volume.map(|v| v.volume_id),
                allowed: decision.is_ok(),
                denial: decision.err().map(|denial| denial.to_string()),
                already_shared,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            match decision {
                Ok(()) => println!("allowed: {} can be shared with {}", entry.path, self.vm),
                Err(denial) => println!("denied: {} ({})", entry.path, denial),
            }
            if already_shared {
                println!("already shared with {}", self.vm);
            }
        }
        Ok(())
    }
}
