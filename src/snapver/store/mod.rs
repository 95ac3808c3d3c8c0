//! # Attribute Storage Layer
//!
//! Metadata lives next to backup files, never inside them. The
//! [`AttributeStore`] trait attaches small blobs to a file path under a
//! logical [`Slot`], leaving the file's content and timestamps alone.
//!
//! ## Implementations
//!
//! - [`native::XattrStore`]: native extended attributes (`user.snapver.tag`,
//!   `user.snapver.audit`). Attributes follow the file through renames.
//! - [`sidecar::SidecarStore`]: hidden files beside the backup
//!   (`.doc.bak.snapver-audit`) for filesystems without extended attributes.
//!   Sidecars stay behind when their backup is renamed or deleted; they are
//!   reported by [`AttributeStore::orphans`] so a reconcile can adopt them.
//! - [`memory::InMemoryStore`]: path-keyed map with failure injection, for
//!   tests.
//!
//! [`FsAttributeStore`] picks one of the filesystem backends at startup.
//!
//! ## Unsupported filesystems
//!
//! When a filesystem cannot hold attributes, `read` returns `Ok(None)` and
//! `write` fails with [`AttributeStoreError::Unsupported`]. Callers treat that
//! as "metadata disabled for this path", never as a fatal error.

use crate::config::AttributeBackend;
use crate::error::AttributeStoreError;
use std::fmt;
use std::path::{Path, PathBuf};

pub mod memory;
pub mod native;
pub mod sidecar;

pub type AttrResult<T> = std::result::Result<T, AttributeStoreError>;

/// Logical attribute slots attached to every backup file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The current metadata value.
    Tag,
    /// The serialized audit trail.
    Audit,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Tag => "tag",
            Slot::Audit => "audit",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key-value persistence of text blobs attached to file paths.
///
/// Implementations must be shareable across threads: attribute reads of a
/// scan fan out over a worker pool.
pub trait AttributeStore: Send + Sync {
    /// Read a slot. `Ok(None)` when the slot was never written or the
    /// filesystem has no attribute support.
    fn read(&self, path: &Path, slot: Slot) -> AttrResult<Option<Vec<u8>>>;

    /// Replace a slot's contents.
    fn write(&self, path: &Path, slot: Slot, value: &[u8]) -> AttrResult<()>;

    /// Short backend name for diagnostics.
    fn backend_name(&self) -> &'static str;

    /// Paths in `directory` whose file is gone but whose slots are still
    /// stored, limited to file names `belongs` accepts. Only stores that keep
    /// slots apart from the file can leave any behind.
    fn orphans(
        &self,
        _directory: &Path,
        _belongs: &dyn Fn(&str) -> bool,
    ) -> AttrResult<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    /// Drop every slot stored for `path`.
    fn discard(&self, _path: &Path) -> AttrResult<()> {
        Ok(())
    }

    /// Read a slot as UTF-8 text.
    fn read_text(&self, path: &Path, slot: Slot) -> AttrResult<Option<String>> {
        match self.read(path, slot)? {
            None => Ok(None),
            Some(bytes) => String::from_utf8(bytes).map(Some).map_err(|e| {
                AttributeStoreError::Corrupt {
                    path: path.to_path_buf(),
                    reason: format!("{} slot is not UTF-8: {}", slot, e),
                }
            }),
        }
    }
}

impl<S: AttributeStore + ?Sized> AttributeStore for std::sync::Arc<S> {
    fn read(&self, path: &Path, slot: Slot) -> AttrResult<Option<Vec<u8>>> {
        (**self).read(path, slot)
    }

    fn write(&self, path: &Path, slot: Slot, value: &[u8]) -> AttrResult<()> {
        (**self).write(path, slot, value)
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }

    fn orphans(
        &self,
        directory: &Path,
        belongs: &dyn Fn(&str) -> bool,
    ) -> AttrResult<Vec<PathBuf>> {
        (**self).orphans(directory, belongs)
    }

    fn discard(&self, path: &Path) -> AttrResult<()> {
        (**self).discard(path)
    }
}

/// The production store: native attributes or sidecar files.
#[derive(Debug, Clone)]
pub enum FsAttributeStore {
    Native(native::XattrStore),
    Sidecar(sidecar::SidecarStore),
}

impl FsAttributeStore {
    pub fn from_backend(backend: AttributeBackend, namespace: &str) -> Self {
        match backend {
            AttributeBackend::Native => {
                FsAttributeStore::Native(native::XattrStore::new(namespace))
            }
            AttributeBackend::Sidecar => FsAttributeStore::Sidecar(sidecar::SidecarStore::new()),
            AttributeBackend::Auto => {
                if native::native_supported() {
                    FsAttributeStore::Native(native::XattrStore::new(namespace))
                } else {
                    FsAttributeStore::Sidecar(sidecar::SidecarStore::new())
                }
            }
        }
    }
}

impl AttributeStore for FsAttributeStore {
    fn read(&self, path: &Path, slot: Slot) -> AttrResult<Option<Vec<u8>>> {
        match self {
            FsAttributeStore::Native(s) => s.read(path, slot),
            FsAttributeStore::Sidecar(s) => s.read(path, slot),
        }
    }

    fn write(&self, path: &Path, slot: Slot, value: &[u8]) -> AttrResult<()> {
        match self {
            FsAttributeStore::Native(s) => s.write(path, slot, value),
            FsAttributeStore::Sidecar(s) => s.write(path, slot, value),
        }
    }

    fn backend_name(&self) -> &'static str {
        match self {
            FsAttributeStore::Native(s) => s.backend_name(),
            FsAttributeStore::Sidecar(s) => s.backend_name(),
        }
    }

    fn orphans(
        &self,
        directory: &Path,
        belongs: &dyn Fn(&str) -> bool,
    ) -> AttrResult<Vec<PathBuf>> {
        match self {
            FsAttributeStore::Native(s) => s.orphans(directory, belongs),
            FsAttributeStore::Sidecar(s) => s.orphans(directory, belongs),
        }
    }

    fn discard(&self, path: &Path) -> AttrResult<()> {
        match self {
            FsAttributeStore::Native(s) => s.discard(path),
            FsAttributeStore::Sidecar(s) => s.discard(path),
        }
    }
}
