/// Compiled templates keyed by canonical source path
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::compiler::CompiledTemplate;

/// Unbounded path → template map. Entries are only replaced or removed
/// wholesale; callers (or the file watcher) decide when.
///
/// Every [`TemplateCache::remove`] bumps the key's epoch, even when nothing
/// was cached. A compile that read its source before an eviction can detect
/// this through [`TemplateCache::put_if_current`] and not store stale output.
#[derive(Debug, Default)]
pub struct TemplateCache {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<PathBuf, Arc<CompiledTemplate>>,
    epochs: HashMap<PathBuf, u64>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical absolute form of `path`. Falls back to joining the working
    /// directory when the file no longer exists.
    pub fn key_for(path: &Path) -> PathBuf {
        match path.canonicalize() {
            Ok(canonical) => canonical,
            Err(_) if path.is_absolute() => path.to_path_buf(),
            Err(_) => std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf()),
        }
    }

    pub fn get(&self, path: &Path) -> Option<Arc<CompiledTemplate>> {
        self.inner.read().entries.get(&Self::key_for(path)).cloned()
    }

    pub fn put(&self, path: &Path, template: Arc<CompiledTemplate>) {
        let key = Self::key_for(path);
        log::debug!("caching template {}", key.display());
        self.inner.write().entries.insert(key, template);
    }

    /// Current invalidation epoch of `path`. Take it before reading the
    /// source and hand it to [`TemplateCache::put_if_current`].
    pub fn epoch(&self, path: &Path) -> u64 {
        self.inner
            .read()
            .epochs
            .get(&Self::key_for(path))
            .copied()
            .unwrap_or(0)
    }

    /// Store `template` unless `path` was evicted since `epoch` was taken.
    /// Returns whether it was stored.
    pub fn put_if_current(&self, path: &Path, epoch: u64, template: Arc<CompiledTemplate>) -> bool {
        let key = Self::key_for(path);
        let mut inner = self.inner.write();
        if inner.epochs.get(&key).copied().unwrap_or(0) != epoch {
            log::debug!("not caching {}, invalidated while compiling", key.display());
            return false;
        }
        log::debug!("caching template {}", key.display());
        inner.entries.insert(key, template);
        true
    }

    pub fn remove(&self, path: &Path) -> Option<Arc<CompiledTemplate>> {
        let key = Self::key_for(path);
        let mut inner = self.inner.write();
        *inner.epochs.entry(key.clone()).or_insert(0) += 1;
        let removed = inner.entries.remove(&key);
        if removed.is_some() {
            log::debug!("evicted template {}", key.display());
        }
        removed
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.inner.read().entries.contains_key(&Self::key_for(path))
    }

    pub fn clear(&self) {
        self.inner.write().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}
