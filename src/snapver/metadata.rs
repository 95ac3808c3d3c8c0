//! # Tags and History
//!
//! Every backup file carries two attribute slots: `tag`, the current value,
//! and `audit`, the full change history. The audit trail is authoritative;
//! the tag slot is a fast copy of its newest entry.
//!
//! ## Write ordering
//!
//! [`set_tag`] re-reads the trail, appends, writes `audit`, then writes
//! `tag`. If the second write fails the trail already holds the new value,
//! and [`get_tag`] recovers it from there because the trail head wins over a
//! stale tag slot.

use crate::audit;
use crate::error::AttributeStoreError;
use crate::model::{AuditTrail, MetadataEntry};
use crate::store::{AttrResult, AttributeStore, Slot};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::debug;

/// Read and decode a file's audit slot, oldest entry first. A missing slot
/// is an empty trail.
pub fn read_trail<S: AttributeStore + ?Sized>(store: &S, path: &Path) -> AttrResult<AuditTrail> {
    let Some(bytes) = store.read(path, Slot::Audit)? else {
        return Ok(AuditTrail::new());
    };
    let mut entries = audit::decode_bytes(&bytes)
        .map_err(|reason| AttributeStoreError::Corrupt {
            path: path.to_path_buf(),
            reason,
        })?
        .into_entries();
    entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    Ok(AuditTrail::from_entries(entries))
}

pub fn get_tag<S: AttributeStore + ?Sized>(store: &S, path: &Path) -> AttrResult<String> {
    let slot = store.read_text(path, Slot::Tag);

    match read_trail(store, path) {
        Ok(trail) => {
            if let Some(head) = trail.current_tag() {
                return Ok(head.to_string());
            }
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "audit slot unusable, using tag slot");
            if matches!(slot, Ok(None)) {
                return Err(e);
            }
        }
    }

    Ok(slot?.unwrap_or_default())
}

/// Full history for display, oldest first.
pub fn get_history<S: AttributeStore + ?Sized>(
    store: &S,
    path: &Path,
) -> AttrResult<Vec<MetadataEntry>> {
    Ok(read_trail(store, path)?.into_entries())
}

/// Outcome of [`set_tag`].
#[derive(Debug)]
pub struct TagUpdate {
    pub trail: AuditTrail,
    pub entry: MetadataEntry,
    /// Set when the trail was written but the tag slot was not. The new value
    /// is still readable through [`get_tag`].
    pub tag_slot_error: Option<AttributeStoreError>,
}

/// Record a new tag value.
///
/// Fails without touching anything if the trail cannot be read or decoded,
/// so a damaged trail is never overwritten by a shorter one.
pub fn set_tag<S: AttributeStore + ?Sized>(
    store: &S,
    path: &Path,
    new_value: &str,
    now: DateTime<Utc>,
) -> AttrResult<TagUpdate> {
    let mut trail = read_trail(store, path)?;

    let previous = match trail.current_tag() {
        Some(head) => head.to_string(),
        None => store
            .read_text(path, Slot::Tag)
            .ok()
            .flatten()
            .unwrap_or_default(),
    };

    let entry = MetadataEntry::new(trail.next_timestamp(now), previous, new_value);
    trail.push(entry.clone());

    store.write(path, Slot::Audit, audit::encode(&trail).as_bytes())?;
    let tag_slot_error = store.write(path, Slot::Tag, new_value.as_bytes()).err();

    Ok(TagUpdate {
        trail,
        entry,
        tag_slot_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::fixtures::StoreFixture;
    use crate::store::memory::InMemoryStore;
    use chrono::{Duration, TimeZone};

    fn path() -> &'static Path {
        Path::new("/backups/doc.bak")
    }

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    #[test]
    fn empty_file_has_empty_tag_and_history() {
        let store = InMemoryStore::new();
        assert_eq!(get_tag(&store, path()).unwrap(), "");
        assert!(get_history(&store, path()).unwrap().is_empty());
    }

    #[test]
    fn set_then_get_round_trip() {
        let store = InMemoryStore::new();

        set_tag(&store, path(), "v1", at(0)).unwrap();
        assert_eq!(get_tag(&store, path()).unwrap(), "v1");
        assert_eq!(get_history(&store, path()).unwrap().len(), 1);

        let update = set_tag(&store, path(), "v2", at(1)).unwrap();
        assert_eq!(update.entry.previous_value, "v1");
        assert_eq!(update.entry.new_value, "v2");
        assert!(update.tag_slot_error.is_none());

        let history = get_history(&store, path()).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].new_value, "v2");
        assert_eq!(get_tag(&store, path()).unwrap(), "v2");
    }

    #[test]
    fn tag_recovered_from_trail_when_tag_slot_missing() {
        let fixture = StoreFixture::new().with_trail(
            path(),
            vec![
                MetadataEntry::new(at(0), "", "draft"),
                MetadataEntry::new(at(5), "draft", "final"),
            ],
        );
        assert_eq!(get_tag(&fixture.store, path()).unwrap(), "final");
    }

    #[test]
    fn failed_tag_write_is_recovered_from_trail() {
        let store = InMemoryStore::new();
        set_tag(&store, path(), "old", at(0)).unwrap();

        store.fail_writes_for(path(), Slot::Tag);
        let update = set_tag(&store, path(), "new", at(1)).unwrap();

        assert!(update.tag_slot_error.is_some());
        assert_eq!(store.get(path(), Slot::Tag).as_deref(), Some(&b"old"[..]));
        assert_eq!(get_tag(&store, path()).unwrap(), "new");
    }

    #[test]
    fn failed_audit_write_leaves_tag_alone() {
        let store = InMemoryStore::new();
        set_tag(&store, path(), "old", at(0)).unwrap();

        store.fail_writes_for(path(), Slot::Audit);
        assert!(set_tag(&store, path(), "new", at(1)).is_err());

        assert_eq!(get_tag(&store, path()).unwrap(), "old");
        assert_eq!(get_history(&store, path()).unwrap().len(), 1);
    }

    #[test]
    fn previous_value_comes_from_tag_slot_without_trail() {
        let fixture = StoreFixture::new().with_tag(path(), "legacy");
        let update = set_tag(&fixture.store, path(), "fresh", at(0)).unwrap();
        assert_eq!(update.entry.previous_value, "legacy");
    }

    #[test]
    fn corrupt_trail_is_not_overwritten() {
        let store = InMemoryStore::new();
        store.insert(path(), Slot::Audit, b"garbage line".to_vec());

        let err = set_tag(&store, path(), "x", at(0)).unwrap_err();
        assert!(matches!(err, AttributeStoreError::Corrupt { .. }));
        assert_eq!(
            store.get(path(), Slot::Audit).as_deref(),
            Some(&b"garbage line"[..])
        );
    }

    #[test]
    fn unsupported_filesystem_fails_set_but_reads_empty() {
        let store = InMemoryStore::new();
        store.mark_unsupported(path());

        assert!(set_tag(&store, path(), "x", at(0))
            .unwrap_err()
            .is_unsupported());
        assert_eq!(get_tag(&store, path()).unwrap(), "");
    }

    #[test]
    fn clock_going_backwards_still_appends_last() {
        let store = InMemoryStore::new();
        set_tag(&store, path(), "a", at(10)).unwrap();
        set_tag(&store, path(), "b", at(0)).unwrap();

        let history = get_history(&store, path()).unwrap();
        assert_eq!(history.last().unwrap().new_value, "b");
        assert!(history[1].timestamp > history[0].timestamp);
        assert_eq!(get_tag(&store, path()).unwrap(), "b");
    }
}
