// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Library-first core for sharing host paths with guest VMs and containers.
//!
//! This crate provides:
//! - A registry of which paths are shared with which guests, plus guest enablement
//! - The sharing policy deciding whether an entry may be shared at all
//! - A lazily initialized, process-wide volume registry
//! - Path resolution and collision-free naming for file operations
//! - A named async lock for serialized critical sections

pub mod config;
pub mod error;
pub mod events;
pub mod host_fs;
pub mod lock;
pub mod memory_fs;
pub mod path;
pub mod policy;
pub mod registry;
pub mod resolver;
pub mod service;
pub mod singleton;
pub mod types;
pub mod volumes;

/// Re-export key types for convenience
pub use config::GuestShareConfig;
pub use error::{ConfigError, FsError, FsResult, InitError};
pub use events::{EventReceiver, EventSender, GuestEvent, event_channel};
pub use host_fs::HostEntryProvider;
pub use lock::{AsyncLock, AsyncLockGuard};
pub use memory_fs::MemoryEntryProvider;
pub use path::SharePath;
pub use policy::{Denial, ShareRequest, SharingPolicy};
pub use registry::SharedPathRegistry;
pub use resolver::{EntryProvider, PathNameResolver, ProbeErrorPolicy};
pub use service::{GuestShare, ShareOutcome};
pub use singleton::{AsyncInit, InitPhase, SingletonInitializer};
pub use types::{Entry, EntryKind, GuestId, LocationInfo, RootType};
pub use volumes::{
    StaticVolumeSource, VolumeInfo, VolumeManager, VolumeRegistry, VolumeSource, VolumeType,
    volume_registry_initializer,
};
