use super::{AttrResult, AttributeStore, Slot};
use crate::error::AttributeStoreError;
use std::io;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_NAMESPACE: &str = "user.snapver";

/// Native extended attributes via the platform's xattr API.
#[derive(Debug, Clone)]
pub struct XattrStore {
    namespace: String,
}

impl Default for XattrStore {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl XattrStore {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.trim_end_matches('.').to_string(),
        }
    }

    pub fn attr_name(&self, slot: Slot) -> String {
        format!("{}.{}", self.namespace, slot.as_str())
    }
}

/// Whether this platform has an xattr API at all. Individual filesystems may
/// still refuse attributes.
pub fn native_supported() -> bool {
    xattr::SUPPORTED_PLATFORM
}

fn is_unsupported(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::Unsupported {
        return true;
    }
    #[cfg(unix)]
    {
        if let Some(code) = err.raw_os_error() {
            return code == libc::ENOTSUP || code == libc::EOPNOTSUPP;
        }
    }
    false
}

impl AttributeStore for XattrStore {
    fn read(&self, path: &Path, slot: Slot) -> AttrResult<Option<Vec<u8>>> {
        if !native_supported() {
            return Ok(None);
        }
        match xattr::get(path, self.attr_name(slot)) {
            Ok(value) => Ok(value),
            Err(e) if is_unsupported(&e) => {
                debug!(path = %path.display(), "filesystem has no xattr support");
                Ok(None)
            }
            Err(source) => Err(AttributeStoreError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn write(&self, path: &Path, slot: Slot, value: &[u8]) -> AttrResult<()> {
        if !native_supported() {
            return Err(AttributeStoreError::Unsupported {
                path: path.to_path_buf(),
            });
        }
        xattr::set(path, self.attr_name(slot), value).map_err(|source| {
            if is_unsupported(&source) {
                AttributeStoreError::Unsupported {
                    path: path.to_path_buf(),
                }
            } else {
                AttributeStoreError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })
    }

    fn backend_name(&self) -> &'static str {
        "xattr"
    }
}
