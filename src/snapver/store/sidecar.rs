use super::{AttrResult, AttributeStore, Slot};
use crate::error::AttributeStoreError;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Fallback store keeping each slot in a hidden file beside the backup.
///
/// Sidecars do not follow a renamed backup. The ones left behind show up in
/// [`AttributeStore::orphans`] until a reconcile adopts and discards them.
#[derive(Debug, Clone, Default)]
pub struct SidecarStore;

impl SidecarStore {
    pub fn new() -> Self {
        Self
    }
}

/// `dir/doc.bak` -> `dir/.doc.bak.snapver-audit`
pub fn sidecar_path(path: &Path, slot: Slot) -> Option<PathBuf> {
    let name = path.file_name()?.to_string_lossy();
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    Some(parent.join(format!(".{}.snapver-{}", name, slot.as_str())))
}

/// `.doc.bak.snapver-audit` -> `doc.bak`
fn primary_name(sidecar_name: &str) -> Option<&str> {
    let rest = sidecar_name.strip_prefix('.')?;
    [Slot::Tag, Slot::Audit]
        .iter()
        .find_map(|slot| rest.strip_suffix(&format!(".snapver-{}", slot.as_str())))
        .filter(|name| !name.is_empty())
}

fn io_error(path: &Path, source: io::Error) -> AttributeStoreError {
    AttributeStoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl AttributeStore for SidecarStore {
    fn read(&self, path: &Path, slot: Slot) -> AttrResult<Option<Vec<u8>>> {
        let Some(sidecar) = sidecar_path(path, slot) else {
            return Ok(None);
        };
        match fs::read(&sidecar) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(path, e)),
        }
    }

    fn write(&self, path: &Path, slot: Slot, value: &[u8]) -> AttrResult<()> {
        // A sidecar without its backup would be an orphan nobody scans.
        if !path.is_file() {
            return Err(io_error(
                path,
                io::Error::new(io::ErrorKind::NotFound, "backup file does not exist"),
            ));
        }
        let sidecar = sidecar_path(path, slot).ok_or_else(|| {
            io_error(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            )
        })?;

        let tmp = sidecar.with_file_name(format!(
            ".snapver-{}-{}.tmp",
            slot.as_str(),
            Uuid::new_v4()
        ));
        fs::write(&tmp, value).map_err(|e| io_error(path, e))?;
        fs::rename(&tmp, &sidecar).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            io_error(path, e)
        })?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sidecar"
    }

    fn orphans(
        &self,
        directory: &Path,
        belongs: &dyn Fn(&str) -> bool,
    ) -> AttrResult<Vec<PathBuf>> {
        let entries = fs::read_dir(directory).map_err(|e| io_error(directory, e))?;
        let mut found = BTreeSet::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(primary) = primary_name(&name) else {
                continue;
            };
            if !belongs(primary) {
                continue;
            }
            let path = directory.join(primary);
            if fs::symlink_metadata(&path).is_err() {
                found.insert(path);
            }
        }
        Ok(found.into_iter().collect())
    }

    fn discard(&self, path: &Path) -> AttrResult<()> {
        for slot in [Slot::Tag, Slot::Audit] {
            let Some(sidecar) = sidecar_path(path, slot) else {
                continue;
            };
            match fs::remove_file(&sidecar) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(path, e)),
            }
        }
        Ok(())
    }
}
