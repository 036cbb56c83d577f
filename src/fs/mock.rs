// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir,
    Symlink(PathBuf),
}

/// In-memory filesystem for tests.
///
/// Directories under a path registered with [`MockFileSystem::deny_under`]
/// reject writes and symlinks with `PermissionDenied`.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    denied: Arc<Mutex<HashSet<PathBuf>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(PathBuf::from("."), MockEntry::Dir);
        Self {
            entries: Arc::new(Mutex::new(entries)),
            denied: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.lock_entries();
        if let Some(parent) = path.parent() {
            ensure_dirs(&mut entries, parent);
        }
        entries.insert(path, MockEntry::File(content.into()));
    }

    pub fn deny_under(&self, path: impl AsRef<Path>) {
        self.lock_denied().insert(path.as_ref().to_path_buf());
    }

    pub fn symlink_target(&self, link: &Path) -> Option<PathBuf> {
        match self.lock_entries().get(link) {
            Some(MockEntry::Symlink(target)) => Some(target.clone()),
            _ => None,
        }
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.lock_entries().keys().cloned().collect();
        paths.sort();
        paths
    }

    fn is_denied(&self, path: &Path) -> bool {
        self.lock_denied().iter().any(|d| path.starts_with(d))
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_denied(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.denied.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn ensure_dirs(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    for ancestor in path.ancestors() {
        if ancestor.as_os_str().is_empty() {
            continue;
        }
        entries
            .entry(ancestor.to_path_buf())
            .or_insert(MockEntry::Dir);
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let entries = self.lock_entries();
        match entries.get(path) {
            Some(MockEntry::File(content)) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(_) => Err(anyhow!("Not a regular file: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if self.is_denied(path) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        self.add_file(path, contents);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        if self.is_denied(path) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        ensure_dirs(&mut self.lock_entries(), path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock_entries().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock_entries().get(path), Some(MockEntry::Dir))
    }

    fn symlink(&self, original: &Path, link: &Path) -> io::Result<()> {
        if self.is_denied(link) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {:?}", link),
            ));
        }
        let mut entries = self.lock_entries();
        if entries.contains_key(link) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("already exists: {:?}", link),
            ));
        }
        entries.insert(link.to_path_buf(), MockEntry::Symlink(original.to_path_buf()));
        Ok(())
    }
}
