use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::metadata;
use crate::store::AttributeStore;
use chrono::{DateTime, Utc};
use std::path::Path;

pub fn get<S: AttributeStore + ?Sized>(store: &S, path: &Path) -> Result<CmdResult> {
    let tag = metadata::get_tag(store, path)?;
    Ok(CmdResult::default().with_tag(tag))
}

/// Record a new tag. Every call appends to the history, even when the value
/// is unchanged.
pub fn set<S: AttributeStore + ?Sized>(
    store: &S,
    path: &Path,
    value: &str,
    now: DateTime<Utc>,
) -> Result<CmdResult> {
    let update = metadata::set_tag(store, path, value, now)?;
    let mut result = CmdResult::default()
        .with_tag(update.entry.new_value.clone())
        .with_history(update.trail.into_entries());

    if let Some(e) = update.tag_slot_error {
        result.add_message(CmdMessage::warning(format!(
            "History updated but tag slot write failed: {}",
            e
        )));
    }
    let shown = if value.is_empty() { "(empty)" } else { value };
    result.add_message(CmdMessage::success(format!(
        "Tag of {} set to {}",
        path.display(),
        shown
    )));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::MessageLevel;
    use crate::error::SnapverError;
    use crate::store::memory::InMemoryStore;
    use crate::store::Slot;

    fn path() -> &'static Path {
        Path::new("/b/doc.bak")
    }

    #[test]
    fn set_records_history() {
        let store = InMemoryStore::new();

        let result = set(&store, path(), "reviewed", Utc::now()).unwrap();

        assert_eq!(result.tag.as_deref(), Some("reviewed"));
        assert_eq!(result.history.len(), 1);
        assert_eq!(result.history[0].previous_value, "");
        assert_eq!(
            get(&store, path()).unwrap().tag.as_deref(),
            Some("reviewed")
        );
    }

    #[test]
    fn repeated_value_is_still_recorded() {
        let store = InMemoryStore::new();
        set(&store, path(), "same", Utc::now()).unwrap();
        let result = set(&store, path(), "same", Utc::now()).unwrap();

        assert_eq!(result.history.len(), 2);
        assert_eq!(result.history[1].previous_value, "same");
    }

    #[test]
    fn tag_slot_failure_is_a_warning() {
        let store = InMemoryStore::new();
        store.fail_writes_for(path(), Slot::Tag);

        let result = set(&store, path(), "x", Utc::now()).unwrap();

        assert!(result
            .messages
            .iter()
            .any(|m| m.level == MessageLevel::Warning));
        assert_eq!(get(&store, path()).unwrap().tag.as_deref(), Some("x"));
    }

    #[test]
    fn unsupported_is_an_error() {
        let store = InMemoryStore::new();
        store.mark_unsupported(path());

        let err = set(&store, path(), "x", Utc::now()).unwrap_err();
        assert!(matches!(err, SnapverError::AttributeStore(ref e) if e.is_unsupported()));
    }
}
