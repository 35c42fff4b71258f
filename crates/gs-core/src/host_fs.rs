// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Entry provider backed by a directory on the host

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{FsError, FsResult};
use crate::path::SharePath;
use crate::resolver::{EntryProvider, lookup_target};
use crate::types::{Entry, EntryKind};

/// Serves entries below `root`, which acts as the filesystem root
///
/// Entry paths are the host's absolute paths.
#[derive(Clone, Debug)]
pub struct HostEntryProvider {
    root: SharePath,
}

impl HostEntryProvider {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: SharePath::parse(&root.as_ref().to_string_lossy()),
        }
    }

    pub fn root_entry(&self) -> Entry {
        Entry::directory(self.root.clone(), self.root.clone())
    }

    /// Entry for a host path below the root
    pub async fn entry_for(&self, path: impl AsRef<Path>) -> FsResult<Entry> {
        let path = SharePath::parse(&path.as_ref().to_string_lossy());
        if !path.starts_with(&self.root) {
            return Err(FsError::NotFound);
        }
        let kind = self.kind_of(&path).await?;
        Ok(self.make_entry(path, kind))
    }

    fn make_entry(&self, path: SharePath, kind: EntryKind) -> Entry {
        Entry {
            path,
            kind,
            filesystem_root: self.root.clone(),
        }
    }

    async fn kind_of(&self, path: &SharePath) -> FsResult<EntryKind> {
        let metadata = fs::metadata(host_path(path)).await.map_err(map_io)?;
        Ok(if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        })
    }

    fn target(&self, dir: &Entry, path: &str) -> FsResult<SharePath> {
        let target = lookup_target(dir, path);
        if target.starts_with(&self.root) {
            Ok(target)
        } else {
            Err(FsError::NotFound)
        }
    }
}

fn host_path(path: &SharePath) -> PathBuf {
    PathBuf::from(path.to_string())
}

fn map_io(err: io::Error) -> FsError {
    match err.kind() {
        io::ErrorKind::NotFound => FsError::NotFound,
        io::ErrorKind::AlreadyExists => FsError::AlreadyExists,
        _ => FsError::Io(err),
    }
}

#[async_trait]
impl EntryProvider for HostEntryProvider {
    async fn get_file(&self, dir: &Entry, path: &str) -> FsResult<Entry> {
        let target = self.target(dir, path)?;
        match self.kind_of(&target).await? {
            EntryKind::File => Ok(self.make_entry(target, EntryKind::File)),
            EntryKind::Directory => Err(FsError::IsADirectory),
        }
    }

    async fn get_directory(&self, dir: &Entry, path: &str) -> FsResult<Entry> {
        let target = self.target(dir, path)?;
        match self.kind_of(&target).await? {
            EntryKind::Directory => Ok(self.make_entry(target, EntryKind::Directory)),
            EntryKind::File => Err(FsError::NotADirectory),
        }
    }

    async fn get_parent(&self, entry: &Entry) -> FsResult<Entry> {
        if entry.path == self.root {
            return Ok(self.root_entry());
        }
        let parent = entry.path.parent().ok_or(FsError::NotFound)?;
        Ok(self.make_entry(parent, EntryKind::Directory))
    }

    async fn create_file(&self, dir: &Entry, name: &str) -> FsResult<Entry> {
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(FsError::InvalidName);
        }
        let target = dir.path.join(name);
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(host_path(&target))
            .await
            .map_err(map_io)?;
        Ok(self.make_entry(target, EntryKind::File))
    }

    async fn write(&self, file: &Entry, data: &[u8]) -> FsResult<()> {
        if !file.is_file() {
            return Err(FsError::IsADirectory);
        }
        fs::write(host_path(&file.path), data).await.map_err(map_io)
    }
}
