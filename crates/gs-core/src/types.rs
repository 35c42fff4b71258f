// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Core type definitions for guest sharing

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::path::SharePath;

/// Name of the built-in Linux VM
pub const DEFAULT_VM_NAME: &str = "termina";
/// Name of the default container inside [`DEFAULT_VM_NAME`]
pub const DEFAULT_CONTAINER_NAME: &str = "penguin";
/// Name of the plugin VM guest
pub const PLUGIN_VM_NAME: &str = "PvmDefault";

/// One guest environment instance
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuestId {
    pub vm_name: String,
    #[serde(default)]
    pub container_name: String,
}

impl GuestId {
    pub fn new(vm_name: impl Into<String>, container_name: impl Into<String>) -> Self {
        Self {
            vm_name: vm_name.into(),
            container_name: container_name.into(),
        }
    }

    pub fn default_guest() -> Self {
        Self::new(DEFAULT_VM_NAME, DEFAULT_CONTAINER_NAME)
    }
}

impl fmt::Display for GuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.container_name.is_empty() {
            f.write_str(&self.vm_name)
        } else {
            write!(f, "{}/{}", self.vm_name, self.container_name)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    File,
    Directory,
}

/// A filesystem entry as seen by the sharing logic
///
/// `path` is absolute. `filesystem_root` is the root of the volume holding
/// the entry; ancestor walks stop there.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    pub path: SharePath,
    pub kind: EntryKind,
    #[serde(default)]
    pub filesystem_root: SharePath,
}

impl Entry {
    pub fn directory(path: impl Into<SharePath>, filesystem_root: impl Into<SharePath>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Directory,
            filesystem_root: filesystem_root.into(),
        }
    }

    pub fn file(path: impl Into<SharePath>, filesystem_root: impl Into<SharePath>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
            filesystem_root: filesystem_root.into(),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Entry name; the root of a filesystem has an empty name
    pub fn name(&self) -> &str {
        self.path.file_name().unwrap_or("")
    }

    /// Path relative to the filesystem root, e.g. `/Downloads/a.txt`
    pub fn full_path(&self) -> SharePath {
        self.path
            .strip_prefix(&self.filesystem_root)
            .unwrap_or_else(|| self.path.clone())
    }

    pub fn is_filesystem_root(&self) -> bool {
        self.path == self.filesystem_root
    }
}

/// Classification of the storage root an entry lives under
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RootType {
    /// MyFiles, including Downloads
    Downloads,
    Removable,
    AndroidFiles,
    Archive,
    Provided,
    Mtp,
    Smb,
    Crostini,
    GuestOs,
    Drive,
    DriveOffline,
    DriveSharedWithMe,
    DriveRecent,
    SharedDrivesGrandRoot,
    SharedDrive,
    ComputersGrandRoot,
    Computer,
    DriveFakeRoot,
    Recent,
    MediaView,
    DocumentsProvider,
    Trash,
}

impl RootType {
    /// Root types that may be shared with a guest when no other rule objects
    pub const DEFAULT_SHARABLE: &'static [RootType] = &[
        RootType::Downloads,
        RootType::Removable,
        RootType::AndroidFiles,
        RootType::Computer,
        RootType::Drive,
        RootType::SharedDrivesGrandRoot,
        RootType::SharedDrive,
        RootType::DriveSharedWithMe,
        RootType::Crostini,
        RootType::GuestOs,
        RootType::Archive,
        RootType::Smb,
    ];
}

/// What the volume/location service knows about an entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocationInfo {
    pub root_type: RootType,
    pub volume_id: String,
    /// The entry is the root of its classification (volume root or Drive sub-root)
    pub is_root_entry: bool,
    pub is_read_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_full_path_is_volume_relative() {
        let entry = Entry::directory("/home/user/MyFiles/Downloads", "/home/user/MyFiles");
        assert_eq!(entry.full_path().to_string(), "/Downloads");
        assert_eq!(entry.name(), "Downloads");
        assert!(!entry.is_filesystem_root());

        let root = Entry::directory("/home/user/MyFiles", "/home/user/MyFiles");
        assert!(root.is_filesystem_root());
        assert_eq!(root.full_path(), SharePath::root());
        assert_eq!(root.name(), "MyFiles");
    }

    #[test]
    fn test_guest_display() {
        assert_eq!(GuestId::default_guest().to_string(), "termina/penguin");
        assert_eq!(GuestId::new(PLUGIN_VM_NAME, "").to_string(), "PvmDefault");
    }

    #[test]
    fn test_entry_deserializes_with_default_root() {
        let entry: Entry =
            serde_json::from_str(r#"{"path": "/MyFiles/Downloads", "kind": "directory"}"#).unwrap();
        assert!(entry.is_directory());
        assert_eq!(entry.filesystem_root, SharePath::root());
    }

    #[test]
    fn test_root_type_kebab_case() {
        let json = serde_json::to_string(&RootType::DriveSharedWithMe).unwrap();
        assert_eq!(json, "\"drive-shared-with-me\"");
        assert!(RootType::DEFAULT_SHARABLE.contains(&RootType::Smb));
        assert!(!RootType::DEFAULT_SHARABLE.contains(&RootType::ComputersGrandRoot));
    }
}
