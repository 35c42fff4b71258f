// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::{Context, Result};
use clap::Args;
use gs_core::{
    GuestEvent, GuestShare, GuestShareConfig, event_channel, volume_registry_initializer,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// JSON output for the registry after replay
#[derive(Serialize)]
struct ReplayJson {
    events: usize,
    enabled: Vec<String>,
    shared: BTreeMap<String, Vec<String>>,
}

#[derive(Args, Clone)]
pub struct ReplayArgs {
    /// JSON file holding an array of guest events
    #[arg(value_name = "EVENTS")]
    events: PathBuf,

    /// Start from an empty registry instead of the configured one
    #[arg(long)]
    fresh: bool,
}

impl ReplayArgs {
    pub async fn run(self, config: &GuestShareConfig) -> Result<()> {
        let raw = std::fs::read_to_string(&self.events)
            .with_context(|| format!("failed to read {}", self.events.display()))?;
        let events: Vec<GuestEvent> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid event log {}", self.events.display()))?;

        let initializer = volume_registry_initializer(Arc::new(config.volume_source()));
        let volumes = initializer.get_instance().await?;
        let service = Arc::new(if self.fresh {
            GuestShare::new(config.policy(), volumes)
        } else {
            GuestShare::from_config(config, volumes)
        });

        let (tx, rx) = event_channel(events.len().max(1));
        let consumer = service.clone().listen(rx);
        for event in &events {
            tx.send(event.clone()).await.context("event consumer stopped")?;
        }
        drop(tx);
        consumer.await.context("event consumer panicked")?;

        let output = ReplayJson {
            events: events.len(),
            enabled: service
                .enabled_guests()
                .iter()
                .map(ToString::to_string)
                .collect(),
            shared: service
                .shared_paths()
                .into_iter()
                .map(|(path, vms)| (path.to_string(), vms))
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}
