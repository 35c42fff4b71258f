// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Mounted volumes and entry classification
//!
//! [`VolumeRegistry`] is the process-wide view of mounted volumes. It is
//! meant to be handed out through a
//! [`SingletonInitializer`](crate::singleton::SingletonInitializer), see
//! [`volume_registry_initializer`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{FsResult, InitError};
use crate::path::SharePath;
use crate::singleton::{AsyncInit, SingletonInitializer};
use crate::types::{Entry, LocationInfo, RootType};

/// Kind of mounted volume
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeType {
    /// MyFiles, containing Downloads
    Downloads,
    Drive,
    Removable,
    Archive,
    Provided,
    Mtp,
    Smb,
    Crostini,
    GuestOs,
    AndroidFiles,
    MediaView,
    DocumentsProvider,
}

/// One mounted volume
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VolumeInfo {
    pub volume_id: String,
    pub volume_type: VolumeType,
    pub root: SharePath,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub read_only: bool,
}

impl VolumeInfo {
    pub fn new(volume_id: impl Into<String>, volume_type: VolumeType, root: impl Into<SharePath>) -> Self {
        Self {
            volume_id: volume_id.into(),
            volume_type,
            root: root.into(),
            label: String::new(),
            read_only: false,
        }
    }

    /// Classify a path that lies inside this volume
    fn classify(&self, path: &SharePath) -> Option<LocationInfo> {
        let relative = path.strip_prefix(&self.root)?;
        let (root_type, is_root_entry) = match self.volume_type {
            VolumeType::Drive => classify_drive_path(&relative),
            other => (plain_root_type(other), relative.is_root()),
        };
        Some(LocationInfo {
            root_type,
            volume_id: self.volume_id.clone(),
            is_root_entry,
            is_read_only: self.read_only,
        })
    }
}

fn plain_root_type(volume_type: VolumeType) -> RootType {
    match volume_type {
        VolumeType::Downloads => RootType::Downloads,
        VolumeType::Removable => RootType::Removable,
        VolumeType::Archive => RootType::Archive,
        VolumeType::Provided => RootType::Provided,
        VolumeType::Mtp => RootType::Mtp,
        VolumeType::Smb => RootType::Smb,
        VolumeType::Crostini => RootType::Crostini,
        VolumeType::GuestOs => RootType::GuestOs,
        VolumeType::AndroidFiles => RootType::AndroidFiles,
        VolumeType::MediaView => RootType::MediaView,
        VolumeType::DocumentsProvider => RootType::DocumentsProvider,
        VolumeType::Drive => RootType::Drive,
    }
}

/// Drive mounts several logical roots below one volume:
/// `/root` (My Drive), `/team_drives/<name>`, `/Computers/<name>` and the
/// id-addressed shared-with-me trees.
fn classify_drive_path(relative: &SharePath) -> (RootType, bool) {
    let segments = relative.segments();
    let Some(first) = segments.first() else {
        return (RootType::DriveFakeRoot, true);
    };
    match first.as_str() {
        "root" => (RootType::Drive, segments.len() == 1),
        "team_drives" if segments.len() == 1 => (RootType::SharedDrivesGrandRoot, true),
        "team_drives" => (RootType::SharedDrive, segments.len() == 2),
        "Computers" if segments.len() == 1 => (RootType::ComputersGrandRoot, true),
        "Computers" => (RootType::Computer, segments.len() == 2),
        ".files-by-id" | ".shortcut-targets-by-id" => {
            (RootType::DriveSharedWithMe, segments.len() == 1)
        }
        _ => (RootType::DriveFakeRoot, false),
    }
}

/// Volume/location service consumed by the sharing logic
#[cfg_attr(test, mockall::automock)]
pub trait VolumeManager: Send + Sync {
    /// Classification of `entry`, `None` when it is on no known volume
    fn location_info(&self, entry: &Entry) -> Option<LocationInfo>;
}

/// Enumerates the volumes mounted at startup
#[async_trait]
pub trait VolumeSource: Send + Sync {
    async fn list_volumes(&self) -> FsResult<Vec<VolumeInfo>>;
}

/// Fixed volume list, typically read from configuration
#[derive(Clone, Debug, Default)]
pub struct StaticVolumeSource {
    volumes: Vec<VolumeInfo>,
}

impl StaticVolumeSource {
    pub fn new(volumes: Vec<VolumeInfo>) -> Self {
        Self { volumes }
    }
}

#[async_trait]
impl VolumeSource for StaticVolumeSource {
    async fn list_volumes(&self) -> FsResult<Vec<VolumeInfo>> {
        Ok(self.volumes.clone())
    }
}

/// Registry of mounted volumes
pub struct VolumeRegistry {
    source: Arc<dyn VolumeSource>,
    volumes: RwLock<Vec<VolumeInfo>>,
}

impl VolumeRegistry {
    pub fn new(source: Arc<dyn VolumeSource>) -> Self {
        Self {
            source,
            volumes: RwLock::new(Vec::new()),
        }
    }

    pub fn volumes(&self) -> Vec<VolumeInfo> {
        self.volumes.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Record a newly mounted volume, replacing one with the same id
    pub fn mount(&self, volume: VolumeInfo) {
        let mut volumes = self.volumes.write().unwrap_or_else(PoisonError::into_inner);
        volumes.retain(|existing| existing.volume_id != volume.volume_id);
        tracing::debug!(volume_id = %volume.volume_id, root = %volume.root, "volume mounted");
        volumes.push(volume);
    }

    pub fn unmount(&self, volume_id: &str) -> Option<VolumeInfo> {
        let mut volumes = self.volumes.write().unwrap_or_else(PoisonError::into_inner);
        let index = volumes.iter().position(|volume| volume.volume_id == volume_id)?;
        tracing::debug!(volume_id, "volume unmounted");
        Some(volumes.remove(index))
    }

    /// Innermost volume containing `path`
    pub fn volume_for(&self, path: &SharePath) -> Option<VolumeInfo> {
        self.volumes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|volume| path.starts_with(&volume.root))
            .max_by_key(|volume| volume.root.depth())
            .cloned()
    }

    /// Directory entry for the root of a mounted volume
    pub fn root_entry(&self, volume_id: &str) -> Option<Entry> {
        self.volumes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|volume| volume.volume_id == volume_id)
            .map(|volume| Entry::directory(volume.root.clone(), volume.root.clone()))
    }
}

#[async_trait]
impl AsyncInit for VolumeRegistry {
    async fn initialize(&self) -> Result<(), InitError> {
        let listed = self.source.list_volumes().await?;
        tracing::info!(count = listed.len(), "volume registry initialized");
        let mut volumes = self.volumes.write().unwrap_or_else(PoisonError::into_inner);
        *volumes = listed;
        Ok(())
    }
}

impl VolumeManager for VolumeRegistry {
    fn location_info(&self, entry: &Entry) -> Option<LocationInfo> {
        self.volume_for(&entry.path)?.classify(&entry.path)
    }
}

/// Initializer handing out one [`VolumeRegistry`] backed by `source`
pub fn volume_registry_initializer(
    source: Arc<dyn VolumeSource>,
) -> SingletonInitializer<VolumeRegistry> {
    SingletonInitializer::new(move || VolumeRegistry::new(source.clone()))
}
