use crate::commands::helpers::tag_versions;
use crate::commands::scan::{present, scan_group};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::merge;
use crate::model::{ReconcileReport, ScanReport};
use crate::store::AttributeStore;
use std::path::Path;

/// Rescan the group from disk, then reconcile its audit trails.
pub fn files<S: AttributeStore + ?Sized>(
    store: &S,
    directory: &Path,
    base_name: &str,
    backup_ext: &str,
) -> Result<CmdResult> {
    let report = scan_group(directory, base_name, backup_ext)?;
    let reconciled = reconcile_scanned(store, &report, backup_ext);

    let mut result = present(store, report);
    add_reconcile_messages(&mut result, &reconciled);
    Ok(result.with_reconcile(reconciled))
}

/// Reconcile a known membership and re-read its tags without rescanning.
pub fn metadata<S: AttributeStore + ?Sized>(
    store: &S,
    report: ScanReport,
    backup_ext: &str,
) -> CmdResult {
    let (before, _) = tag_versions(store, &report.versions);
    let reconciled = reconcile_scanned(store, &report, backup_ext);

    let mut result = present(store, report);
    add_reconcile_messages(&mut result, &reconciled);

    let changed = before
        .iter()
        .zip(&result.versions)
        .any(|(old, new)| old.tag != new.tag);
    result.add_message(CmdMessage::info(if changed {
        "Tags refreshed (changes)"
    } else {
        "Tags refreshed (no changes)"
    }));
    result.with_reconcile(reconciled)
}

fn reconcile_scanned<S: AttributeStore + ?Sized>(
    store: &S,
    report: &ScanReport,
    backup_ext: &str,
) -> ReconcileReport {
    merge::reconcile_group(
        store,
        &report.directory,
        &report.base_name,
        &report.paths(),
        backup_ext,
    )
}

fn add_reconcile_messages(result: &mut CmdResult, report: &ReconcileReport) {
    for path in &report.adopted {
        result.add_message(CmdMessage::info(format!(
            "Recovered history left behind by {}",
            path.display()
        )));
    }
    for failure in &report.unreadable {
        result.add_message(CmdMessage::warning(format!(
            "Unreadable audit history on {} (left unchanged): {}",
            failure.path.display(),
            failure.reason
        )));
    }
    for failure in &report.failed {
        result.add_message(CmdMessage::error(format!(
            "Could not update metadata of {}: {}",
            failure.path.display(),
            failure.reason
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::MessageLevel;
    use crate::metadata::{get_history, set_tag};
    use crate::store::memory::InMemoryStore;
    use crate::store::Slot;
    use chrono::Utc;
    use std::fs;
    use tempfile::TempDir;

    fn group() -> (TempDir, Vec<std::path::PathBuf>) {
        let dir = TempDir::new().unwrap();
        let paths: Vec<_> = ["doc.bak", "doc.bak.1", "doc.bak.2"]
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                fs::write(&path, format!("{}\n", name)).unwrap();
                path
            })
            .collect();
        (dir, paths)
    }

    #[test]
    fn refresh_files_spreads_history() {
        let (dir, paths) = group();
        let store = InMemoryStore::new();
        set_tag(&store, &paths[0], "approved", Utc::now()).unwrap();

        let result = files(&store, dir.path(), "doc", ".bak").unwrap();

        let reconciled = result.reconcile.as_ref().unwrap();
        assert!(reconciled.is_complete());
        assert_eq!(reconciled.succeeded.len(), 3);
        assert!(result
            .versions
            .iter()
            .all(|v| v.tag.as_deref() == Some("approved")));
        for path in &paths {
            assert_eq!(get_history(&store, path).unwrap().len(), 1);
        }
    }

    #[test]
    fn refresh_metadata_reports_changes_once() {
        let (dir, paths) = group();
        let store = InMemoryStore::new();
        set_tag(&store, &paths[2], "final", Utc::now()).unwrap();
        let report = scan_group(dir.path(), "doc", ".bak").unwrap();

        let first = metadata(&store, report.clone(), ".bak");
        assert!(first
            .messages
            .iter()
            .any(|m| m.content == "Tags refreshed (changes)"));

        let second = metadata(&store, report, ".bak");
        assert!(second
            .messages
            .iter()
            .any(|m| m.content == "Tags refreshed (no changes)"));
    }

    #[test]
    fn write_failures_become_errors() {
        let (dir, paths) = group();
        let store = InMemoryStore::new();
        set_tag(&store, &paths[0], "x", Utc::now()).unwrap();
        store.fail_writes_for(&paths[1], Slot::Audit);

        let result = files(&store, dir.path(), "doc", ".bak").unwrap();

        let errors: Vec<_> = result
            .messages
            .iter()
            .filter(|m| m.level == MessageLevel::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].content.contains("doc.bak.1"));
    }
}
