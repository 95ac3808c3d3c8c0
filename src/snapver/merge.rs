//! # Audit Merger
//!
//! Backup tools rename and copy files freely, and a copy or rename can drop
//! or fork a file's attributes. [`reconcile`] rebuilds one canonical trail
//! for a whole group and writes it back to every member, so one surviving
//! copy is enough to restore the lineage everywhere.
//!
//! The canonical trail is the deduplicated union of every readable member's
//! entries (identity is the full `(timestamp, previous, new)` triple), stably
//! sorted by timestamp. Re-running on a converged group finds nothing to
//! change.
//!
//! A member whose trail cannot be decoded is reported and left alone, so
//! entries it still holds are never overwritten. Slots that a sidecar store
//! kept for vanished files are adopted into the union and then dropped.

use crate::audit;
use crate::metadata::read_trail;
use crate::model::{AuditTrail, MergeFailure, MetadataEntry, ReconcileReport};
use crate::scanner::matches_base;
use crate::store::{AttributeStore, Slot};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Union of several trails, oldest first. Duplicates keep their first
/// occurrence; equal timestamps keep input order.
pub fn merge_trails<I>(trails: I) -> AuditTrail
where
    I: IntoIterator<Item = AuditTrail>,
{
    let mut seen: HashSet<MetadataEntry> = HashSet::new();
    let mut union = Vec::new();
    for trail in trails {
        for entry in trail.into_entries() {
            if seen.insert(entry.clone()) {
                union.push(entry);
            }
        }
    }
    union.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    AuditTrail::from_entries(union)
}

/// Reconcile the audit trails of a group's members.
pub fn reconcile<S: AttributeStore + ?Sized>(store: &S, members: &[PathBuf]) -> ReconcileReport {
    reconcile_adopting(store, members, &[])
}

/// Reconcile a scanned group, adopting the slots that renamed or deleted
/// members left behind in `directory`.
pub fn reconcile_group<S: AttributeStore + ?Sized>(
    store: &S,
    directory: &Path,
    base_name: &str,
    members: &[PathBuf],
    backup_ext: &str,
) -> ReconcileReport {
    let belongs = |name: &str| matches_base(name, base_name, backup_ext);
    let orphans = store.orphans(directory, &belongs).unwrap_or_else(|e| {
        warn!(directory = %directory.display(), error = %e, "cannot list orphaned slots");
        Vec::new()
    });
    reconcile_adopting(store, members, &orphans)
}

/// Reconcile `members`, folding in the trails stored for `orphans`.
///
/// Members whose audit slot cannot be read contribute nothing and are not
/// overwritten. Write failures are collected, never propagated: the
/// remaining members are still updated and a later run retries the failed
/// ones. Orphans are discarded only once every member holds their entries.
pub fn reconcile_adopting<S: AttributeStore + ?Sized>(
    store: &S,
    members: &[PathBuf],
    orphans: &[PathBuf],
) -> ReconcileReport {
    let reads: Vec<_> = members
        .par_iter()
        .chain(orphans.par_iter())
        .map(|path| read_trail(store, path))
        .collect();
    let (member_reads, orphan_reads) = reads.split_at(members.len());

    let mut report = ReconcileReport::default();
    let mut current: Vec<Option<&AuditTrail>> = Vec::with_capacity(members.len());
    let mut readable = Vec::new();
    let mut adoptable = Vec::new();

    for (path, read) in members.iter().zip(member_reads) {
        match read {
            Ok(trail) => {
                readable.push(trail.clone());
                current.push(Some(trail));
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "audit slot unreadable");
                report.unreadable.push(MergeFailure {
                    path: path.clone(),
                    reason: e.to_string(),
                });
                current.push(None);
            }
        }
    }

    for (path, read) in orphans.iter().zip(orphan_reads) {
        match read {
            Ok(trail) if !trail.is_empty() => {
                debug!(path = %path.display(), entries = trail.len(), "adopting orphaned trail");
                readable.push(trail.clone());
                adoptable.push(path.clone());
            }
            Ok(_) => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "orphaned audit slot unreadable");
                report.unreadable.push(MergeFailure {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let canonical = merge_trails(readable);
    report.entries = canonical.len();
    report.current_tag = canonical.current_tag().map(str::to_string);

    let Some(tag) = canonical.current_tag() else {
        report.succeeded = members
            .iter()
            .zip(&current)
            .filter(|(_, trail)| trail.is_some())
            .map(|(path, _)| path.clone())
            .collect();
        return report;
    };

    let encoded = audit::encode(&canonical);

    for (path, existing) in members.iter().zip(current) {
        let Some(existing) = existing else {
            continue;
        };
        if existing == &canonical && tag_matches(store, path, tag) {
            debug!(path = %path.display(), "already converged");
            report.succeeded.push(path.clone());
            continue;
        }

        let written = store
            .write(path, Slot::Audit, encoded.as_bytes())
            .and_then(|_| store.write(path, Slot::Tag, tag.as_bytes()));

        match written {
            Ok(()) => report.succeeded.push(path.clone()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "merge write failed");
                report.failed.push(MergeFailure {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if !members.is_empty() && report.succeeded.len() == members.len() {
        for path in adoptable {
            match store.discard(&path) {
                Ok(()) => report.adopted.push(path),
                Err(e) => warn!(path = %path.display(), error = %e, "orphaned slots kept"),
            }
        }
    }

    debug!(
        members = members.len(),
        entries = report.entries,
        adopted = report.adopted.len(),
        failed = report.failed.len(),
        "reconcile finished"
    );
    report
}

fn tag_matches<S: AttributeStore + ?Sized>(store: &S, path: &Path, tag: &str) -> bool {
    matches!(store.read_text(path, Slot::Tag), Ok(Some(ref t)) if t == tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{get_history, get_tag};
    use crate::store::memory::fixtures::StoreFixture;
    use crate::store::memory::InMemoryStore;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn members() -> Vec<PathBuf> {
        vec![
            PathBuf::from("/b/doc.bak"),
            PathBuf::from("/b/doc.bak.1"),
            PathBuf::from("/b/doc_old.bak"),
        ]
    }

    #[test]
    fn union_is_broadcast_to_every_member() {
        let m = members();
        let e1 = MetadataEntry::new(at(0), "", "draft");
        let e2 = MetadataEntry::new(at(5), "draft", "review");
        let e3 = MetadataEntry::new(at(9), "review", "final");

        let fixture = StoreFixture::new()
            .with_trail(&m[0], vec![e1.clone(), e2.clone()])
            .with_trail(&m[1], vec![e1.clone(), e3.clone()]);

        let report = reconcile(&fixture.store, &m);

        assert!(report.is_complete());
        assert_eq!(report.succeeded.len(), 3);
        assert_eq!(report.entries, 3);
        assert_eq!(report.current_tag.as_deref(), Some("final"));

        for path in &m {
            assert_eq!(
                get_history(&fixture.store, path).unwrap(),
                vec![e1.clone(), e2.clone(), e3.clone()]
            );
            assert_eq!(get_tag(&fixture.store, path).unwrap(), "final");
        }
    }

    #[test]
    fn second_run_changes_nothing() {
        let m = members();
        let fixture = StoreFixture::new()
            .with_trail(&m[0], vec![MetadataEntry::new(at(0), "", "a")])
            .with_trail(&m[2], vec![MetadataEntry::new(at(1), "a", "b")]);

        reconcile(&fixture.store, &m);
        let before: Vec<_> = m
            .iter()
            .map(|p| fixture.store.get(p, Slot::Audit))
            .collect();

        // any write now would be an error
        for path in &m {
            fixture.store.fail_writes_for(path, Slot::Audit);
            fixture.store.fail_writes_for(path, Slot::Tag);
        }
        let report = reconcile(&fixture.store, &m);

        assert!(report.is_complete());
        assert_eq!(report.succeeded.len(), 3);
        let after: Vec<_> = m
            .iter()
            .map(|p| fixture.store.get(p, Slot::Audit))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn identical_entries_are_kept_once() {
        let e = MetadataEntry::new(at(0), "", "same");
        let merged = merge_trails(vec![
            AuditTrail::from_entries(vec![e.clone()]),
            AuditTrail::from_entries(vec![e.clone()]),
        ]);
        assert_eq!(merged.entries(), &[e]);
    }

    #[test]
    fn same_timestamp_different_values_both_survive() {
        let a = MetadataEntry::new(at(0), "", "left");
        let b = MetadataEntry::new(at(0), "", "right");
        let merged = merge_trails(vec![
            AuditTrail::from_entries(vec![a.clone()]),
            AuditTrail::from_entries(vec![b.clone()]),
        ]);
        assert_eq!(merged.entries(), &[a, b]);
    }

    #[test]
    fn empty_group_writes_nothing() {
        let store = InMemoryStore::new();
        let m = members();
        store.insert(&m[0], Slot::Tag, b"orphan".to_vec());

        let report = reconcile(&store, &m);

        assert_eq!(report.entries, 0);
        assert_eq!(report.current_tag, None);
        assert_eq!(report.succeeded.len(), 3);
        assert_eq!(store.get(&m[1], Slot::Audit), None);
        assert_eq!(store.get(&m[0], Slot::Tag).as_deref(), Some(&b"orphan"[..]));
    }

    #[test]
    fn write_failure_is_isolated_and_retried_later() {
        let m = members();
        let fixture =
            StoreFixture::new().with_trail(&m[0], vec![MetadataEntry::new(at(0), "", "kept")]);
        fixture.store.fail_writes_for(&m[1], Slot::Audit);

        let report = reconcile(&fixture.store, &m);

        assert!(!report.is_complete());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, m[1]);
        assert_eq!(report.succeeded, vec![m[0].clone(), m[2].clone()]);
        assert_eq!(get_tag(&fixture.store, &m[2]).unwrap(), "kept");

        fixture.store.clear_failures();
        let retry = reconcile(&fixture.store, &m);
        assert!(retry.is_complete());
        assert_eq!(get_tag(&fixture.store, &m[1]).unwrap(), "kept");
    }

    #[test]
    fn unreadable_member_is_reported_and_left_alone() {
        let m = members();
        let fixture = StoreFixture::new()
            .with_trail(&m[0], vec![MetadataEntry::new(at(0), "", "good")]);
        fixture.store.insert(&m[1], Slot::Audit, b"not a trail".to_vec());

        let report = reconcile(&fixture.store, &m);

        assert!(report.is_complete());
        assert_eq!(report.unreadable.len(), 1);
        assert_eq!(report.unreadable[0].path, m[1]);
        assert_eq!(report.succeeded, vec![m[0].clone(), m[2].clone()]);
        assert_eq!(report.entries, 1);
        assert_eq!(
            fixture.store.get(&m[1], Slot::Audit).as_deref(),
            Some(&b"not a trail"[..])
        );
        assert_eq!(get_tag(&fixture.store, &m[2]).unwrap(), "good");
    }

    #[test]
    fn legacy_multi_line_history_is_kept() {
        let m = members();
        let store = InMemoryStore::new();
        store.insert(
            &m[0],
            Slot::Audit,
            b"[2024-05-01 09:00:00] line one\nline two\n[2024-05-01 10:00:00] shipped\n".to_vec(),
        );
        crate::metadata::set_tag(&store, &m[1], "new", at(120)).unwrap();

        let report = reconcile(&store, &m);

        assert!(report.unreadable.is_empty());
        assert_eq!(report.entries, 3);
        for path in &m {
            let values: Vec<String> = get_history(&store, path)
                .unwrap()
                .into_iter()
                .map(|e| e.new_value)
                .collect();
            assert_eq!(values, vec!["line one\nline two", "shipped", "new"]);
        }
    }

    #[test]
    fn renamed_member_keeps_its_attributes() {
        let store = InMemoryStore::new();
        let old = PathBuf::from("/b/doc.bak.1");
        crate::metadata::set_tag(&store, &old, "reviewed", at(0)).unwrap();

        // native attributes travel with the file
        let renamed = PathBuf::from("/b/doc_old.bak");
        store.rename(&old, &renamed);
        let group = vec![PathBuf::from("/b/doc.bak"), renamed];
        let report = reconcile(&store, &group);

        assert_eq!(report.entries, 1);
        for path in &group {
            assert_eq!(get_tag(&store, path).unwrap(), "reviewed");
        }
        assert_eq!(store.get(&old, Slot::Audit), None);
    }

    #[test]
    fn orphaned_trail_is_adopted_then_discarded() {
        let m = members();
        let gone = PathBuf::from("/b/doc.bak.7");
        let fixture = StoreFixture::new()
            .with_trail(&gone, vec![MetadataEntry::new(at(0), "", "before rename")])
            .with_trail(&m[0], vec![MetadataEntry::new(at(3), "", "later")]);

        let report = reconcile_adopting(&fixture.store, &m, &[gone.clone()]);

        assert_eq!(report.adopted, vec![gone.clone()]);
        assert_eq!(report.entries, 2);
        assert_eq!(get_history(&fixture.store, &m[2]).unwrap().len(), 2);
        assert_eq!(fixture.store.get(&gone, Slot::Audit), None);
    }

    #[test]
    fn orphan_is_kept_while_a_member_misses_its_entries() {
        let m = members();
        let gone = PathBuf::from("/b/doc.bak.7");
        let fixture = StoreFixture::new()
            .with_trail(&gone, vec![MetadataEntry::new(at(0), "", "only copy")]);
        fixture.store.fail_writes_for(&m[1], Slot::Audit);

        let report = reconcile_adopting(&fixture.store, &m, &[gone.clone()]);

        assert_eq!(report.failed.len(), 1);
        assert!(report.adopted.is_empty());
        assert!(fixture.store.get(&gone, Slot::Audit).is_some());

        fixture.store.clear_failures();
        let retry = reconcile_adopting(&fixture.store, &m, &[gone.clone()]);
        assert_eq!(retry.adopted, vec![gone.clone()]);
        assert_eq!(get_tag(&fixture.store, &m[1]).unwrap(), "only copy");
    }

    #[test]
    fn orphan_is_kept_while_a_member_is_unreadable() {
        let m = members();
        let gone = PathBuf::from("/b/doc.bak.7");
        let fixture = StoreFixture::new()
            .with_trail(&gone, vec![MetadataEntry::new(at(0), "", "only copy")]);
        fixture.store.insert(&m[0], Slot::Audit, b"not a trail".to_vec());

        let report = reconcile_adopting(&fixture.store, &m, &[gone.clone()]);

        assert_eq!(report.unreadable.len(), 1);
        assert!(report.adopted.is_empty());
        assert!(fixture.store.get(&gone, Slot::Audit).is_some());
        assert_eq!(get_tag(&fixture.store, &m[2]).unwrap(), "only copy");
    }

    #[test]
    fn history_never_shrinks() {
        let m = members();
        let store = InMemoryStore::new();
        let p = Path::new("/b/doc.bak");

        crate::metadata::set_tag(&store, p, "one", at(0)).unwrap();
        reconcile(&store, &m);
        let before = get_history(&store, &m[2]).unwrap();

        crate::metadata::set_tag(&store, &m[2], "two", at(1)).unwrap();
        reconcile(&store, &m);
        let after = get_history(&store, &m[0]).unwrap();

        assert!(after.len() >= before.len());
        assert!(before.iter().all(|e| after.contains(e)));
        assert_eq!(get_tag(&store, &m[1]).unwrap(), "two");
    }
}
