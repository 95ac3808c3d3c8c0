use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Serializes writes to one backup group.
///
/// A tag edit and a reconcile on the same group must not interleave, or the
/// reconcile could broadcast a trail read before the edit landed. Groups are
/// keyed by directory and lowercased base name; different groups never
/// block each other.
#[derive(Debug, Default)]
pub struct GroupLocks {
    locks: Mutex<HashMap<(PathBuf, String), Arc<Mutex<()>>>>,
}

impl GroupLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, directory: &Path, base_name: &str) -> Arc<Mutex<()>> {
        let key = (directory.to_path_buf(), base_name.to_lowercase());
        self.locks.lock().entry(key).or_default().clone()
    }

    /// Run `f` while holding the group's lock.
    pub fn with_group<R>(&self, directory: &Path, base_name: &str, f: impl FnOnce() -> R) -> R {
        let handle = self.handle(directory, base_name);
        let _guard = handle.lock();
        f()
    }

    /// Drop the group's lock if nobody holds or waits on it.
    pub fn prune(&self, directory: &Path, base_name: &str) {
        let key = (directory.to_path_buf(), base_name.to_lowercase());
        let mut locks = self.locks.lock();
        if locks.get(&key).is_some_and(|handle| Arc::strong_count(handle) == 1) {
            locks.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
