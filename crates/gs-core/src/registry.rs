// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Which paths are shared with which guests
//!
//! All mutation is synchronous. Owners that need shared access wrap the
//! registry in a lock (see [`crate::service::GuestShare`]); nothing in here
//! suspends part-way through an update.

use std::collections::{BTreeMap, HashMap};

use crate::events::GuestEvent;
use crate::path::SharePath;
use crate::types::{Entry, GuestId};

#[derive(Clone, Debug, Default)]
pub struct SharedPathRegistry {
    /// vm name -> container name -> enabled
    enabled: HashMap<String, HashMap<String, bool>>,
    /// path -> vm names sharing it; lists are never empty
    shared_paths: BTreeMap<SharePath, Vec<String>>,
    /// shared path -> root of the filesystem it was registered under
    filesystem_roots: HashMap<SharePath, SharePath>,
}

impl SharedPathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_enabled(&mut self, vm_name: &str, container_name: &str, enabled: bool) {
        self.enabled
            .entry(vm_name.to_string())
            .or_default()
            .insert(container_name.to_string(), enabled);
    }

    /// True if any container of `vm_name` is enabled
    pub fn is_enabled(&self, vm_name: &str) -> bool {
        self.enabled
            .get(vm_name)
            .is_some_and(|containers| containers.values().any(|enabled| *enabled))
    }

    pub fn enabled_guests(&self) -> Vec<GuestId> {
        let mut guests: Vec<GuestId> = self
            .enabled
            .iter()
            .flat_map(|(vm, containers)| {
                containers
                    .iter()
                    .filter(|(_, enabled)| **enabled)
                    .map(move |(container, _)| GuestId::new(vm.clone(), container.clone()))
            })
            .collect();
        guests.sort_by(|a, b| {
            (&a.vm_name, &a.container_name).cmp(&(&b.vm_name, &b.container_name))
        });
        guests
    }

    /// Share `entry` with `vm_name`
    ///
    /// Existing shares of the entry and of its descendants are folded into
    /// the new one when the new share still covers them. If an ancestor of
    /// the entry inside its filesystem root is already shared with the vm,
    /// nothing changes.
    pub fn register_shared_path(&mut self, vm_name: &str, entry: &Entry) {
        let path = &entry.path;
        let root = &entry.filesystem_root;
        if let Some(covering) = path
            .ancestors()
            .skip(1)
            .take_while(|ancestor| ancestor.depth() >= root.depth())
            .find(|ancestor| ancestor.starts_with(root) && self.is_shared_at(vm_name, ancestor))
        {
            tracing::debug!(
                vm = vm_name,
                %path,
                %covering,
                "path already shared through ancestor"
            );
            return;
        }

        // A descendant on a nested filesystem stops its walk at its own
        // root, so it only folds into `path` if that root is below `path`.
        let covered: Vec<SharePath> = self
            .shared_paths
            .keys()
            .filter(|other| other.starts_with(path))
            .filter(|other| {
                self.filesystem_roots
                    .get(*other)
                    .map_or(true, |other_root| path.starts_with(other_root))
            })
            .cloned()
            .collect();
        for other in &covered {
            self.remove_vm(vm_name, other);
        }

        self.shared_paths
            .entry(path.clone())
            .or_default()
            .push(vm_name.to_string());
        self.filesystem_roots.insert(path.clone(), root.clone());
        tracing::debug!(
            vm = vm_name,
            %path,
            %root,
            pruned = covered.len(),
            "shared path registered"
        );
    }

    /// Remove one share of `path` with `vm_name`; absent pairs are ignored
    pub fn unregister_shared_path(&mut self, vm_name: &str, path: &SharePath) {
        if self.remove_vm(vm_name, path) {
            tracing::debug!(vm = vm_name, %path, "shared path unregistered");
        }
    }

    fn remove_vm(&mut self, vm_name: &str, path: &SharePath) -> bool {
        let Some(vms) = self.shared_paths.get_mut(path) else {
            return false;
        };
        let Some(index) = vms.iter().position(|vm| vm == vm_name) else {
            return false;
        };
        vms.remove(index);
        if vms.is_empty() {
            self.shared_paths.remove(path);
            self.filesystem_roots.remove(path);
        }
        true
    }

    fn is_shared_at(&self, vm_name: &str, path: &SharePath) -> bool {
        self.shared_paths
            .get(path)
            .is_some_and(|vms| vms.iter().any(|vm| vm == vm_name))
    }

    /// True if `entry` or one of its ancestors, up to and including its
    /// filesystem root, is shared with `vm_name`
    pub fn is_path_shared(&self, vm_name: &str, entry: &Entry) -> bool {
        let root = &entry.filesystem_root;
        entry
            .path
            .ancestors()
            .take_while(|ancestor| ancestor.depth() > root.depth())
            .any(|ancestor| self.is_shared_at(vm_name, &ancestor))
            || self.is_shared_at(vm_name, root)
    }

    /// Vm names sharing exactly `path`
    pub fn vms_for(&self, path: &SharePath) -> &[String] {
        self.shared_paths.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn shared_paths(&self) -> &BTreeMap<SharePath, Vec<String>> {
        &self.shared_paths
    }

    pub fn shared_paths_for(&self, vm_name: &str) -> Vec<SharePath> {
        self.shared_paths
            .iter()
            .filter(|(_, vms)| vms.iter().any(|vm| vm == vm_name))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Apply one guest notification
    pub fn apply_event(&mut self, event: &GuestEvent) {
        match event {
            GuestEvent::Enable {
                vm_name,
                container_name,
            } => self.set_enabled(vm_name, container_name, true),
            GuestEvent::Disable {
                vm_name,
                container_name,
            } => self.set_enabled(vm_name, container_name, false),
            GuestEvent::Share { vm_name, entries } => {
                for entry in entries {
                    self.register_shared_path(vm_name, entry);
                }
            }
            GuestEvent::Unshare { vm_name, entries } => {
                for entry in entries {
                    self.unregister_shared_path(vm_name, &entry.path);
                }
            }
        }
    }
}
