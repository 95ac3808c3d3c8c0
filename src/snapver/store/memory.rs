use super::{AttrResult, AttributeStore, Slot};
use crate::error::AttributeStoreError;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// In-memory attribute store for tests.
///
/// Uses a `Mutex` rather than `RefCell` because stores are shared with scan
/// worker threads. Failures can be injected per path.
#[derive(Default)]
pub struct InMemoryStore {
    slots: Mutex<HashMap<(PathBuf, Slot), Vec<u8>>>,
    failing_reads: Mutex<HashSet<PathBuf>>,
    failing_writes: Mutex<HashSet<(PathBuf, Slot)>>,
    unsupported: Mutex<HashSet<PathBuf>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a slot directly, bypassing failure injection.
    pub fn insert(&self, path: &Path, slot: Slot, value: Vec<u8>) {
        self.slots.lock().insert((path.to_path_buf(), slot), value);
    }

    pub fn remove(&self, path: &Path, slot: Slot) {
        self.slots.lock().remove(&(path.to_path_buf(), slot));
    }

    pub fn get(&self, path: &Path, slot: Slot) -> Option<Vec<u8>> {
        self.slots.lock().get(&(path.to_path_buf(), slot)).cloned()
    }

    /// Move every slot of `from` to `to`, the way native attributes follow a
    /// renamed file.
    pub fn rename(&self, from: &Path, to: &Path) {
        let mut slots = self.slots.lock();
        for slot in [Slot::Tag, Slot::Audit] {
            if let Some(value) = slots.remove(&(from.to_path_buf(), slot)) {
                slots.insert((to.to_path_buf(), slot), value);
            }
        }
    }

    pub fn fail_reads_for(&self, path: &Path) {
        self.failing_reads.lock().insert(path.to_path_buf());
    }

    pub fn fail_writes_for(&self, path: &Path, slot: Slot) {
        self.failing_writes.lock().insert((path.to_path_buf(), slot));
    }

    pub fn mark_unsupported(&self, path: &Path) {
        self.unsupported.lock().insert(path.to_path_buf());
    }

    pub fn clear_failures(&self) {
        self.failing_reads.lock().clear();
        self.failing_writes.lock().clear();
        self.unsupported.lock().clear();
    }
}

impl AttributeStore for InMemoryStore {
    fn read(&self, path: &Path, slot: Slot) -> AttrResult<Option<Vec<u8>>> {
        if self.unsupported.lock().contains(path) {
            return Ok(None);
        }
        if self.failing_reads.lock().contains(path) {
            return Err(AttributeStoreError::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::Other, "simulated read error"),
            });
        }
        Ok(self.get(path, slot))
    }

    fn write(&self, path: &Path, slot: Slot, value: &[u8]) -> AttrResult<()> {
        if self.unsupported.lock().contains(path) {
            return Err(AttributeStoreError::Unsupported {
                path: path.to_path_buf(),
            });
        }
        if self
            .failing_writes
            .lock()
            .contains(&(path.to_path_buf(), slot))
        {
            return Err(AttributeStoreError::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::Other, "simulated write error"),
            });
        }
        self.insert(path, slot, value.to_vec());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn discard(&self, path: &Path) -> AttrResult<()> {
        if self
            .failing_writes
            .lock()
            .contains(&(path.to_path_buf(), Slot::Audit))
        {
            return Err(AttributeStoreError::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::Other, "simulated discard error"),
            });
        }
        let mut slots = self.slots.lock();
        for slot in [Slot::Tag, Slot::Audit] {
            slots.remove(&(path.to_path_buf(), slot));
        }
        Ok(())
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use crate::audit;
    use crate::model::{AuditTrail, MetadataEntry};

    pub struct StoreFixture {
        pub store: InMemoryStore,
    }

    impl Default for StoreFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl StoreFixture {
        pub fn new() -> Self {
            Self {
                store: InMemoryStore::new(),
            }
        }

        pub fn with_trail(self, path: &Path, entries: Vec<MetadataEntry>) -> Self {
            let trail = AuditTrail::from_entries(entries);
            self.store
                .insert(path, Slot::Audit, audit::encode(&trail).into_bytes());
            self
        }

        pub fn with_tag(self, path: &Path, tag: &str) -> Self {
            self.store.insert(path, Slot::Tag, tag.as_bytes().to_vec());
            self
        }
    }
}
