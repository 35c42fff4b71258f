// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Sharing eligibility rules
//!
//! [`SharingPolicy::can_share`] is a pure function of its request. Rules are
//! checked in order and the first one that objects denies the share.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{DEFAULT_VM_NAME, Entry, LocationInfo, PLUGIN_VM_NAME, RootType};

/// Everything the policy looks at for one decision
#[derive(Clone, Copy, Debug)]
pub struct ShareRequest<'a> {
    pub vm_name: &'a str,
    pub entry: &'a Entry,
    pub persist: bool,
    /// Current enablement of `vm_name` across all of its containers
    pub vm_enabled: bool,
    pub location: Option<&'a LocationInfo>,
}

/// Why a share was refused
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denial {
    VmDisabled,
    PersistRequiresDirectory,
    UnknownLocation,
    AggregateRoot,
    ComputerRoot,
    AndroidFilesRoot,
    PluginVmOwnMount,
    DefaultVmOwnRoot,
    SharedWithMeRoot,
    RootTypeNotSharable,
}

impl Denial {
    pub fn as_str(&self) -> &'static str {
        match self {
            Denial::VmDisabled => "vm-disabled",
            Denial::PersistRequiresDirectory => "persist-requires-directory",
            Denial::UnknownLocation => "unknown-location",
            Denial::AggregateRoot => "aggregate-root",
            Denial::ComputerRoot => "computer-root",
            Denial::AndroidFilesRoot => "android-files-root",
            Denial::PluginVmOwnMount => "plugin-vm-own-mount",
            Denial::DefaultVmOwnRoot => "default-vm-own-root",
            Denial::SharedWithMeRoot => "shared-with-me-root",
            Denial::RootTypeNotSharable => "root-type-not-sharable",
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SharingPolicy {
    pub default_vm: String,
    pub plugin_vm: String,
    pub sharable_root_types: Vec<RootType>,
}

impl Default for SharingPolicy {
    fn default() -> Self {
        Self {
            default_vm: DEFAULT_VM_NAME.to_string(),
            plugin_vm: PLUGIN_VM_NAME.to_string(),
            sharable_root_types: RootType::DEFAULT_SHARABLE.to_vec(),
        }
    }
}

impl SharingPolicy {
    pub fn can_share(&self, request: &ShareRequest<'_>) -> bool {
        match self.evaluate(request) {
            Ok(()) => true,
            Err(denial) => {
                tracing::debug!(
                    vm = request.vm_name,
                    path = %request.entry.path,
                    ?denial,
                    "share denied"
                );
                false
            }
        }
    }

    /// Same decision as [`Self::can_share`], reporting the rule that objected
    pub fn evaluate(&self, request: &ShareRequest<'_>) -> Result<(), Denial> {
        let entry = request.entry;

        if !request.vm_enabled {
            return Err(Denial::VmDisabled);
        }

        if request.persist && !entry.is_directory() {
            return Err(Denial::PersistRequiresDirectory);
        }

        let location = request.location.ok_or(Denial::UnknownLocation)?;
        let full_path = entry.full_path();

        // Grand roots aggregate several mounts and cannot become one guest mount
        match location.root_type {
            RootType::ComputersGrandRoot | RootType::SharedDrivesGrandRoot
                if location.is_root_entry =>
            {
                return Err(Denial::AggregateRoot);
            }
            RootType::ComputersGrandRoot => return Err(Denial::AggregateRoot),
            RootType::Computer if location.is_root_entry => return Err(Denial::AggregateRoot),
            _ => {}
        }

        // `/Computers/<name>` and above
        if location.root_type == RootType::Computer && full_path.depth() <= 2 {
            return Err(Denial::ComputerRoot);
        }

        if location.root_type == RootType::AndroidFiles && location.is_root_entry {
            return Err(Denial::AndroidFilesRoot);
        }

        if request.vm_name == self.plugin_vm
            && location.root_type == RootType::Downloads
            && full_path.segments().first().map(String::as_str) == Some(self.plugin_vm.as_str())
        {
            return Err(Denial::PluginVmOwnMount);
        }

        if request.vm_name == self.default_vm && location.root_type == RootType::Crostini {
            return Err(Denial::DefaultVmOwnRoot);
        }

        if location.root_type == RootType::DriveSharedWithMe && location.is_root_entry {
            return Err(Denial::SharedWithMeRoot);
        }

        if self.sharable_root_types.contains(&location.root_type) {
            Ok(())
        } else {
            Err(Denial::RootTypeNotSharable)
        }
    }
}
