// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Configuration file for guest sharing

use gs_logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::path::SharePath;
use crate::policy::SharingPolicy;
use crate::registry::SharedPathRegistry;
use crate::resolver::ProbeErrorPolicy;
use crate::types::{
    DEFAULT_CONTAINER_NAME, DEFAULT_VM_NAME, Entry, GuestId, PLUGIN_VM_NAME, RootType,
};
use crate::volumes::{StaticVolumeSource, VolumeInfo};

/// Environment variable that relocates the configuration directory
pub const GS_HOME_ENV: &str = "GS_HOME";

/// Top-level `config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GuestShareConfig {
    pub default_vm: String,
    pub default_container: String,
    pub plugin_vm: String,
    pub sharable_root_types: Vec<RootType>,
    pub probe_errors: ProbeErrorPolicy,
    pub logging: LoggingConfig,
    pub volumes: Vec<VolumeInfo>,
    pub guests: Vec<GuestConfig>,
    pub shared: Vec<SharedPathConfig>,
}

/// `[[guests]]` entry: initial enablement of one container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GuestConfig {
    pub vm_name: String,
    #[serde(default)]
    pub container_name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// `[[shared]]` entry: a path already shared when the service starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SharedPathConfig {
    pub vm_name: String,
    pub path: SharePath,
    /// Root of the volume holding `path`; `/` when omitted
    #[serde(default)]
    pub filesystem_root: SharePath,
}

impl Default for GuestShareConfig {
    fn default() -> Self {
        Self {
            default_vm: DEFAULT_VM_NAME.to_string(),
            default_container: DEFAULT_CONTAINER_NAME.to_string(),
            plugin_vm: PLUGIN_VM_NAME.to_string(),
            sharable_root_types: RootType::DEFAULT_SHARABLE.to_vec(),
            probe_errors: ProbeErrorPolicy::default(),
            logging: LoggingConfig::default(),
            volumes: Vec::new(),
            guests: Vec::new(),
            shared: Vec::new(),
        }
    }
}

impl GuestShareConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load the file at `path`, or the default location when `path` is `None`
    ///
    /// A missing file at the default location yields the built-in defaults;
    /// a missing explicit file is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let path = Self::default_path()?;
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading configuration");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// `$GS_HOME/config.toml`, else `<config_dir>/guest-share/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        if let Ok(home) = std::env::var(GS_HOME_ENV) {
            return Ok(PathBuf::from(home).join("config.toml"));
        }
        let base_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(base_dir.join("guest-share").join("config.toml"))
    }

    pub fn policy(&self) -> SharingPolicy {
        SharingPolicy {
            default_vm: self.default_vm.clone(),
            plugin_vm: self.plugin_vm.clone(),
            sharable_root_types: self.sharable_root_types.clone(),
        }
    }

    pub fn default_guest(&self) -> GuestId {
        GuestId::new(self.default_vm.clone(), self.default_container.clone())
    }

    pub fn volume_source(&self) -> StaticVolumeSource {
        StaticVolumeSource::new(self.volumes.clone())
    }

    /// Registry holding the configured enablement and shared paths
    pub fn initial_registry(&self) -> SharedPathRegistry {
        let mut registry = SharedPathRegistry::new();
        for guest in &self.guests {
            registry.set_enabled(&guest.vm_name, &guest.container_name, guest.enabled);
        }
        for shared in &self.shared {
            let entry = Entry::directory(shared.path.clone(), shared.filesystem_root.clone());
            registry.register_shared_path(&shared.vm_name, &entry);
        }
        registry
    }
}
