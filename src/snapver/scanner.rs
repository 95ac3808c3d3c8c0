//! # File Scanner
//!
//! Finds the backup files of one document in a directory.
//!
//! A file belongs to base name `doc` (compared case-insensitively) when it is
//! not hidden, starts with `doc` followed by a non-alphanumeric character, and
//! ends with the backup extension once numeric version suffixes are stripped:
//!
//! ```text
//! doc.bak                          yes
//! doc.bak.1, doc.bak~2             yes (suffixes stripped)
//! doc_old.bak, DOC.txt.bak         yes
//! doc.txt.2025-05-03_115301.bak    yes (Notepad++ naming)
//! document.bak                     no  (different word)
//! .doc.bak.snapver-tag             no  (hidden sidecar)
//! ```
//!
//! Unreadable entries do not abort a scan: they come back as
//! [`ScanWarning`]s next to the files that could be read.

use crate::error::{Result, SnapverError};
use crate::model::{BackupFile, MasterDocument, ScanWarning};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<BackupFile>,
    pub warnings: Vec<ScanWarning>,
}

/// Derive the group base name from any file name: everything before the
/// first dot, so `doc.txt`, `doc.bak.2` and the Notepad++ backup
/// `doc.txt.2025-05-03_115301.bak` all belong to `doc`.
pub fn base_name_of(file_name: &str) -> String {
    file_name.split('.').next().unwrap_or(file_name).to_string()
}

pub fn matches_base(file_name: &str, base_name: &str, backup_ext: &str) -> bool {
    let name = file_name.to_lowercase();
    let base = base_name.to_lowercase();
    if base.is_empty() || name.starts_with('.') {
        return false;
    }
    let Some(rest) = name.strip_prefix(&base) else {
        return false;
    };
    if rest.chars().next().is_some_and(char::is_alphanumeric) {
        return false;
    }
    strip_version_suffix(&name).ends_with(&backup_ext.to_lowercase())
}

fn strip_version_suffix(name: &str) -> &str {
    let mut current = name;
    while let Some(idx) = current.rfind(['.', '~']) {
        let tail = &current[idx + 1..];
        if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
            break;
        }
        current = &current[..idx];
    }
    current
}

fn scan_error(directory: &Path, e: std::io::Error) -> SnapverError {
    SnapverError::Scan {
        directory: directory.to_path_buf(),
        message: e.to_string(),
    }
}

/// Lines in a file: line terminators, plus one for a trailing partial line.
pub fn count_lines(bytes: &[u8]) -> usize {
    let terminators = bytes.iter().filter(|&&b| b == b'\n').count();
    match bytes.last() {
        None | Some(b'\n') => terminators,
        Some(_) => terminators + 1,
    }
}

/// Enumerate the backups of `base_name` in `directory`.
///
/// Fails only when the directory itself cannot be listed.
pub fn scan(directory: &Path, base_name: &str, backup_ext: &str) -> Result<ScanOutcome> {
    let entries = fs::read_dir(directory).map_err(|e| scan_error(directory, e))?;

    let mut outcome = ScanOutcome::default();
    let mut candidates = Vec::new();

    for entry in entries {
        match entry {
            Ok(entry) => {
                let name = entry.file_name();
                if matches_base(&name.to_string_lossy(), base_name, backup_ext) {
                    candidates.push(entry.path());
                }
            }
            Err(e) => outcome.warnings.push(ScanWarning {
                path: directory.to_path_buf(),
                reason: format!("unreadable directory entry: {}", e),
            }),
        }
    }

    let inspected: Vec<(PathBuf, std::result::Result<Option<BackupFile>, String>)> = candidates
        .into_par_iter()
        .map(|path| {
            let result = inspect(&path, base_name);
            (path, result)
        })
        .collect();

    for (path, result) in inspected {
        match result {
            Ok(Some(file)) => outcome.files.push(file),
            Ok(None) => debug!(path = %path.display(), "skipping non-file match"),
            Err(reason) => {
                warn!(path = %path.display(), %reason, "unreadable backup");
                outcome.warnings.push(ScanWarning { path, reason });
            }
        }
    }

    outcome.files.sort_by(|a, b| a.path.cmp(&b.path));
    outcome.warnings.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(
        directory = %directory.display(),
        base = base_name,
        found = outcome.files.len(),
        warnings = outcome.warnings.len(),
        "scan finished"
    );
    Ok(outcome)
}

fn inspect(path: &Path, base_name: &str) -> std::result::Result<Option<BackupFile>, String> {
    let meta = fs::metadata(path).map_err(|e| e.to_string())?;
    if !meta.is_file() {
        return Ok(None);
    }
    let created = meta
        .created()
        .or_else(|_| meta.modified())
        .map_err(|e| format!("no timestamp: {}", e))?;
    let bytes = fs::read(path).map_err(|e| e.to_string())?;

    Ok(Some(BackupFile {
        path: path.to_path_buf(),
        base_name: base_name.to_string(),
        created_at: DateTime::<Utc>::from(created),
        total_lines: count_lines(&bytes),
    }))
}

/// List the working documents in `production_dir` with their backup counts.
///
/// Newest-modified first; documents whose timestamp cannot be read go last.
pub fn list_masters(
    production_dir: &Path,
    backup_dir: &Path,
    backup_ext: &str,
) -> Result<Vec<MasterDocument>> {
    let backup_names: Vec<String> = fs::read_dir(backup_dir)
        .map_err(|e| scan_error(backup_dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();

    let mut masters = Vec::new();
    for entry in fs::read_dir(production_dir).map_err(|e| scan_error(production_dir, e))? {
        let Ok(entry) = entry else { continue };
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }

        let base_name = base_name_of(&name);
        let backup_count = backup_names
            .iter()
            .filter(|b| matches_base(b, &base_name, backup_ext))
            .count();

        masters.push(MasterDocument {
            path: entry.path(),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
            base_name,
            backup_count,
        });
    }

    masters.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.path.cmp(&b.path)));
    Ok(masters)
}
