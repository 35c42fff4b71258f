// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Path resolution and collision-free naming ahead of file operations

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{FsError, FsResult};
use crate::path::SharePath;
use crate::types::Entry;

/// Filesystem entry operations the resolver relies on
///
/// Paths passed to the lookup methods are relative to `dir`, or relative to
/// `dir`'s filesystem root when they start with `/`.
#[async_trait]
pub trait EntryProvider: Send + Sync {
    /// Look up a non-directory entry
    async fn get_file(&self, dir: &Entry, path: &str) -> FsResult<Entry>;

    /// Look up a directory entry
    async fn get_directory(&self, dir: &Entry, path: &str) -> FsResult<Entry>;

    /// Parent directory; the filesystem root is its own parent
    async fn get_parent(&self, entry: &Entry) -> FsResult<Entry>;

    /// Create a new empty file; fails with `AlreadyExists` if the name is taken
    async fn create_file(&self, dir: &Entry, name: &str) -> FsResult<Entry>;

    /// Replace the contents of a file
    async fn write(&self, file: &Entry, data: &[u8]) -> FsResult<()>;

    /// Whether anything named `name` exists directly in `dir`
    async fn exists(&self, dir: &Entry, name: &str) -> FsResult<bool> {
        match self.get_file(dir, name).await {
            Ok(_) => return Ok(true),
            Err(FsError::IsADirectory) => return Ok(true),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }
        match self.get_directory(dir, name).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Absolute target of a lookup of `path` from `dir`
pub fn lookup_target(dir: &Entry, path: &str) -> SharePath {
    if path.starts_with('/') {
        dir.filesystem_root.join(path)
    } else {
        dir.path.join(path)
    }
}

/// What a name probe does when the lookup fails for a reason other than
/// "not found"
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeErrorPolicy {
    /// Accept the candidate name, logging the failure
    #[default]
    TreatAsAvailable,
    /// Return the lookup error to the caller
    Propagate,
}

/// Split `name` into stem and extension (the extension keeps its dot)
///
/// Only the last path component is considered. A leading dot does not start
/// an extension, so `.bashrc` has none.
pub fn split_extension(name: &str) -> (&str, &str) {
    let component_start = name.rfind('/').map_or(0, |slash| slash + 1);
    match name.rfind('.') {
        Some(dot) if dot > component_start => name.split_at(dot),
        _ => (name, ""),
    }
}

#[derive(Clone)]
pub struct PathNameResolver {
    provider: Arc<dyn EntryProvider>,
    probe_errors: ProbeErrorPolicy,
}

impl PathNameResolver {
    pub fn new(provider: Arc<dyn EntryProvider>) -> Self {
        Self {
            provider,
            probe_errors: ProbeErrorPolicy::default(),
        }
    }

    pub fn with_probe_errors(mut self, policy: ProbeErrorPolicy) -> Self {
        self.probe_errors = policy;
        self
    }

    pub fn provider(&self) -> &Arc<dyn EntryProvider> {
        &self.provider
    }

    /// Resolve `path` below `root` to a file or directory entry
    ///
    /// The directory lookup only runs when the file lookup reports
    /// [`FsError::IsADirectory`]; any other lookup error is returned
    /// unchanged.
    pub async fn resolve_path(&self, root: &Entry, path: &str) -> FsResult<Entry> {
        match self.provider.get_file(root, path).await {
            Err(FsError::IsADirectory) => self.provider.get_directory(root, path).await,
            other => other,
        }
    }

    /// First name in `name`, `stem (1).ext`, `stem (2).ext`, ... that does
    /// not exist in `dir`
    pub async fn deduplicate_path(&self, dir: &Entry, name: &str) -> FsResult<String> {
        let (stem, extension) = split_extension(name);
        let mut candidate = name.to_string();
        let mut copy_number: u64 = 0;

        loop {
            match self.resolve_path(dir, &candidate).await {
                Ok(_) => {
                    copy_number += 1;
                    candidate = format!("{} ({}){}", stem, copy_number, extension);
                }
                Err(err) if err.is_not_found() => return Ok(candidate),
                Err(err) => match self.probe_errors {
                    ProbeErrorPolicy::TreatAsAvailable => {
                        tracing::warn!(
                            dir = %dir.path,
                            %candidate,
                            error = %err,
                            "name probe failed, treating name as available"
                        );
                        return Ok(candidate);
                    }
                    ProbeErrorPolicy::Propagate => return Err(err),
                },
            }
        }
    }
}
