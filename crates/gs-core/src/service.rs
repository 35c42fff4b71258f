// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The guest-share component: registry, policy and event intake in one place

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::task::JoinHandle;

use crate::config::GuestShareConfig;
use crate::events::{EventReceiver, GuestEvent};
use crate::lock::AsyncLock;
use crate::path::SharePath;
use crate::policy::{Denial, ShareRequest, SharingPolicy};
use crate::registry::SharedPathRegistry;
use crate::types::{Entry, GuestId};
use crate::volumes::VolumeManager;

/// Outcome of [`GuestShare::share_entries`] for one entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareOutcome {
    pub path: SharePath,
    pub result: Result<(), Denial>,
}

/// Owns the shared-path registry for one process
///
/// Registry reads and writes take a short synchronous lock and never await
/// while holding it. Multi-step sequences that must not interleave go
/// through [`Self::share_lock`].
pub struct GuestShare {
    registry: RwLock<SharedPathRegistry>,
    policy: SharingPolicy,
    volumes: Arc<dyn VolumeManager>,
    share_lock: AsyncLock,
}

impl GuestShare {
    pub fn new(policy: SharingPolicy, volumes: Arc<dyn VolumeManager>) -> Self {
        Self::with_registry(SharedPathRegistry::new(), policy, volumes)
    }

    pub fn with_registry(
        registry: SharedPathRegistry,
        policy: SharingPolicy,
        volumes: Arc<dyn VolumeManager>,
    ) -> Self {
        Self {
            registry: RwLock::new(registry),
            policy,
            volumes,
            share_lock: AsyncLock::new("guest-share"),
        }
    }

    /// Service seeded with the configured policy, guests and shared paths
    pub fn from_config(config: &GuestShareConfig, volumes: Arc<dyn VolumeManager>) -> Self {
        Self::with_registry(config.initial_registry(), config.policy(), volumes)
    }

    fn read(&self) -> RwLockReadGuard<'_, SharedPathRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SharedPathRegistry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn policy(&self) -> &SharingPolicy {
        &self.policy
    }

    /// Lock serializing share sequences and guest launches
    pub fn share_lock(&self) -> &AsyncLock {
        &self.share_lock
    }

    pub fn set_enabled(&self, vm_name: &str, container_name: &str, enabled: bool) {
        self.write().set_enabled(vm_name, container_name, enabled);
        tracing::info!(vm = vm_name, container = container_name, enabled, "guest enablement changed");
    }

    pub fn is_enabled(&self, vm_name: &str) -> bool {
        self.read().is_enabled(vm_name)
    }

    pub fn enabled_guests(&self) -> Vec<GuestId> {
        self.read().enabled_guests()
    }

    pub fn register_shared_path(&self, vm_name: &str, entry: &Entry) {
        self.write().register_shared_path(vm_name, entry);
    }

    pub fn unregister_shared_path(&self, vm_name: &str, path: &SharePath) {
        self.write().unregister_shared_path(vm_name, path);
    }

    pub fn is_path_shared(&self, vm_name: &str, entry: &Entry) -> bool {
        self.read().is_path_shared(vm_name, entry)
    }

    pub fn can_share_path(&self, vm_name: &str, entry: &Entry, persist: bool) -> bool {
        self.with_request(vm_name, entry, persist, |policy, request| {
            policy.can_share(request)
        })
    }

    /// The policy decision for one entry, with the rule that objected
    pub fn check_share(&self, vm_name: &str, entry: &Entry, persist: bool) -> Result<(), Denial> {
        self.with_request(vm_name, entry, persist, |policy, request| {
            policy.evaluate(request)
        })
    }

    fn with_request<R>(
        &self,
        vm_name: &str,
        entry: &Entry,
        persist: bool,
        decide: impl FnOnce(&SharingPolicy, &ShareRequest<'_>) -> R,
    ) -> R {
        let location = self.volumes.location_info(entry);
        let request = ShareRequest {
            vm_name,
            entry,
            persist,
            vm_enabled: self.is_enabled(vm_name),
            location: location.as_ref(),
        };
        decide(&self.policy, &request)
    }

    /// Check each entry and register the ones the policy allows
    ///
    /// Runs under [`Self::share_lock`], so concurrent share requests are
    /// applied one after another.
    pub async fn share_entries(
        &self,
        vm_name: &str,
        entries: &[Entry],
        persist: bool,
    ) -> Vec<ShareOutcome> {
        let _guard = self.share_lock.lock().await;
        entries
            .iter()
            .map(|entry| {
                let result = self.check_share(vm_name, entry, persist);
                match result {
                    Ok(()) => self.register_shared_path(vm_name, entry),
                    Err(denial) => {
                        tracing::debug!(vm = vm_name, path = %entry.path, ?denial, "share denied");
                    }
                }
                ShareOutcome {
                    path: entry.path.clone(),
                    result,
                }
            })
            .collect()
    }

    pub fn shared_paths(&self) -> BTreeMap<SharePath, Vec<String>> {
        self.read().shared_paths().clone()
    }

    pub fn snapshot(&self) -> SharedPathRegistry {
        self.read().clone()
    }

    /// Apply one lifecycle notification
    pub fn handle_event(&self, event: &GuestEvent) {
        tracing::debug!(event = event.kind(), vm = event.vm_name(), "guest event");
        self.write().apply_event(event);
    }

    /// Consume events from `rx` in delivery order until every sender is gone
    pub fn listen(self: Arc<Self>, mut rx: EventReceiver) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut handled: u64 = 0;
            while let Some(event) = rx.recv().await {
                self.handle_event(&event);
                handled += 1;
            }
            tracing::info!(handled, "guest event channel closed");
        })
    }
}
