// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! In-memory entry provider for tests and dry runs

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{FsError, FsResult};
use crate::path::SharePath;
use crate::resolver::{EntryProvider, lookup_target};
use crate::types::{Entry, EntryKind};

/// Error factory used to inject lookup failures
pub type ErrorFn = Arc<dyn Fn() -> FsError + Send + Sync>;

#[derive(Clone, Debug)]
enum Node {
    Directory,
    File(Vec<u8>),
}

/// A single filesystem held in a map keyed by absolute path
///
/// Every entry it hands out carries the provider's root as its
/// `filesystem_root`.
pub struct MemoryEntryProvider {
    root: SharePath,
    nodes: Mutex<HashMap<SharePath, Node>>,
    lookup_failure: Mutex<Option<ErrorFn>>,
}

impl MemoryEntryProvider {
    pub fn new(root: impl Into<SharePath>) -> Self {
        let root = root.into();
        let mut nodes = HashMap::new();
        nodes.insert(root.clone(), Node::Directory);
        Self {
            root,
            nodes: Mutex::new(nodes),
            lookup_failure: Mutex::new(None),
        }
    }

    pub fn root_entry(&self) -> Entry {
        Entry::directory(self.root.clone(), self.root.clone())
    }

    /// Create or overwrite a file at an absolute path, creating parents
    pub fn add_file(&self, path: &str, data: &[u8]) -> FsResult<()> {
        let path = self.inside_root(path)?;
        let mut nodes = self.nodes();
        if matches!(nodes.get(&path), Some(Node::Directory)) {
            return Err(FsError::IsADirectory);
        }
        if let Some(parent) = path.parent() {
            Self::ensure_dirs(&mut nodes, &self.root, &parent)?;
        }
        nodes.insert(path, Node::File(data.to_vec()));
        Ok(())
    }

    /// Create a directory and its parents; existing directories are left alone
    pub fn add_dir(&self, path: &str) -> FsResult<()> {
        let path = self.inside_root(path)?;
        let mut nodes = self.nodes();
        Self::ensure_dirs(&mut nodes, &self.root, &path)
    }

    /// Entry at an absolute path, if present
    pub fn entry(&self, path: &str) -> Option<Entry> {
        let path = SharePath::parse(path);
        let kind = match self.nodes().get(&path)? {
            Node::Directory => EntryKind::Directory,
            Node::File(_) => EntryKind::File,
        };
        Some(self.make_entry(path, kind))
    }

    /// Contents of the file at an absolute path
    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        match self.nodes().get(&SharePath::parse(path))? {
            Node::File(data) => Some(data.clone()),
            Node::Directory => None,
        }
    }

    /// Number of entries, the root included
    pub fn len(&self) -> usize {
        self.nodes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every file and directory lookup fail with the produced error
    pub fn fail_lookups_with<F>(&self, error_fn: F)
    where
        F: Fn() -> FsError + Send + Sync + 'static,
    {
        *self.failure_slot() = Some(Arc::new(error_fn));
    }

    pub fn clear_lookup_failure(&self) {
        *self.failure_slot() = None;
    }

    fn nodes(&self) -> MutexGuard<'_, HashMap<SharePath, Node>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn failure_slot(&self) -> MutexGuard<'_, Option<ErrorFn>> {
        self.lookup_failure.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn injected_failure(&self) -> Option<FsError> {
        self.failure_slot().as_ref().map(|error_fn| error_fn())
    }

    fn inside_root(&self, path: &str) -> FsResult<SharePath> {
        let path = SharePath::parse(path);
        if path.starts_with(&self.root) {
            Ok(path)
        } else {
            Err(FsError::NotFound)
        }
    }

    fn ensure_dirs(
        nodes: &mut HashMap<SharePath, Node>,
        root: &SharePath,
        path: &SharePath,
    ) -> FsResult<()> {
        let missing: Vec<SharePath> = path
            .ancestors()
            .take_while(|ancestor| ancestor.starts_with(root))
            .collect();
        for dir in missing.into_iter().rev() {
            match nodes.get(&dir) {
                Some(Node::Directory) => {}
                Some(Node::File(_)) => return Err(FsError::NotADirectory),
                None => {
                    nodes.insert(dir, Node::Directory);
                }
            }
        }
        Ok(())
    }

    fn make_entry(&self, path: SharePath, kind: EntryKind) -> Entry {
        Entry {
            path,
            kind,
            filesystem_root: self.root.clone(),
        }
    }

    fn lookup(&self, dir: &Entry, path: &str, want: EntryKind) -> FsResult<Entry> {
        if let Some(err) = self.injected_failure() {
            return Err(err);
        }
        let target = lookup_target(dir, path);
        let nodes = self.nodes();
        match (nodes.get(&target), want) {
            (None, _) => Err(FsError::NotFound),
            (Some(Node::Directory), EntryKind::File) => Err(FsError::IsADirectory),
            (Some(Node::File(_)), EntryKind::Directory) => Err(FsError::NotADirectory),
            (Some(_), kind) => Ok(self.make_entry(target, kind)),
        }
    }
}

fn validate_name(name: &str) -> FsResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(FsError::InvalidName);
    }
    Ok(())
}

#[async_trait]
impl EntryProvider for MemoryEntryProvider {
    async fn get_file(&self, dir: &Entry, path: &str) -> FsResult<Entry> {
        self.lookup(dir, path, EntryKind::File)
    }

    async fn get_directory(&self, dir: &Entry, path: &str) -> FsResult<Entry> {
        self.lookup(dir, path, EntryKind::Directory)
    }

    async fn get_parent(&self, entry: &Entry) -> FsResult<Entry> {
        if entry.path == self.root {
            return Ok(self.root_entry());
        }
        let parent = entry.path.parent().ok_or(FsError::NotFound)?;
        match self.nodes().get(&parent) {
            Some(Node::Directory) => Ok(self.make_entry(parent, EntryKind::Directory)),
            Some(Node::File(_)) => Err(FsError::NotADirectory),
            None => Err(FsError::NotFound),
        }
    }

    async fn create_file(&self, dir: &Entry, name: &str) -> FsResult<Entry> {
        validate_name(name)?;
        let target = dir.path.join(name);
        let mut nodes = self.nodes();
        match nodes.get(&dir.path) {
            Some(Node::Directory) => {}
            Some(Node::File(_)) => return Err(FsError::NotADirectory),
            None => return Err(FsError::NotFound),
        }
        if nodes.contains_key(&target) {
            return Err(FsError::AlreadyExists);
        }
        nodes.insert(target.clone(), Node::File(Vec::new()));
        Ok(self.make_entry(target, EntryKind::File))
    }

    async fn write(&self, file: &Entry, data: &[u8]) -> FsResult<()> {
        match self.nodes().get_mut(&file.path) {
            Some(Node::File(contents)) => {
                *contents = data.to_vec();
                Ok(())
            }
            Some(Node::Directory) => Err(FsError::IsADirectory),
            None => Err(FsError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_kinds() {
        let fs = MemoryEntryProvider::new("/MyFiles");
        fs.add_file("/MyFiles/Downloads/a.txt", b"hi").unwrap();
        let root = fs.root_entry();

        let file = fs.get_file(&root, "Downloads/a.txt").await.unwrap();
        assert!(file.is_file());
        assert_eq!(file.filesystem_root.to_string(), "/MyFiles");
        assert_eq!(file.full_path().to_string(), "/Downloads/a.txt");

        assert!(matches!(
            fs.get_file(&root, "Downloads").await,
            Err(FsError::IsADirectory)
        ));
        assert!(matches!(
            fs.get_directory(&root, "Downloads/a.txt").await,
            Err(FsError::NotADirectory)
        ));
        assert!(matches!(fs.get_file(&root, "missing").await, Err(FsError::NotFound)));

        let downloads = fs.entry("/MyFiles/Downloads").unwrap();
        let by_root = fs.get_file(&downloads, "/Downloads/a.txt").await.unwrap();
        assert_eq!(by_root, file);
    }

    #[tokio::test]
    async fn test_parent_of_root_is_root() {
        let fs = MemoryEntryProvider::new("/MyFiles");
        fs.add_dir("/MyFiles/Downloads").unwrap();
        let root = fs.root_entry();
        assert_eq!(fs.get_parent(&root).await.unwrap(), root);
        let downloads = fs.entry("/MyFiles/Downloads").unwrap();
        assert_eq!(fs.get_parent(&downloads).await.unwrap(), root);
    }

    #[tokio::test]
    async fn test_create_and_write() {
        let fs = MemoryEntryProvider::new("/");
        let root = fs.root_entry();
        let file = fs.create_file(&root, "log.txt").await.unwrap();
        fs.write(&file, b"line").await.unwrap();
        assert_eq!(fs.read("/log.txt").unwrap(), b"line");

        assert!(matches!(
            fs.create_file(&root, "log.txt").await,
            Err(FsError::AlreadyExists)
        ));
        assert!(matches!(fs.create_file(&root, "a/b").await, Err(FsError::InvalidName)));
        assert!(matches!(fs.write(&root, b"x").await, Err(FsError::IsADirectory)));
    }

    #[test]
    fn test_add_dir_is_idempotent() {
        let fs = MemoryEntryProvider::new("/");
        fs.add_dir("/a/b").unwrap();
        let before = fs.len();
        fs.add_dir("/a/b").unwrap();
        fs.add_dir("/a").unwrap();
        assert_eq!(fs.len(), before);
        assert_eq!(before, 3);

        fs.add_file("/a/file", b"").unwrap();
        assert!(matches!(fs.add_dir("/a/file/c"), Err(FsError::NotADirectory)));
        assert!(matches!(fs.add_file("/a", b""), Err(FsError::IsADirectory)));
    }
}
