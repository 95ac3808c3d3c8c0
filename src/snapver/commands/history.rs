use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::metadata;
use crate::store::AttributeStore;
use std::path::Path;

pub fn run<S: AttributeStore + ?Sized>(store: &S, path: &Path) -> Result<CmdResult> {
    let history = metadata::get_history(store, path)?;
    let mut result = CmdResult::default();
    if history.is_empty() {
        result.add_message(CmdMessage::info(format!(
            "No metadata history for {}",
            path.display()
        )));
    }
    Ok(result.with_history(history))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MetadataEntry;
    use crate::store::memory::fixtures::StoreFixture;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn history_is_oldest_first() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let path = Path::new("/b/doc.bak");
        // stored out of order, as a hand-edited sidecar might be
        let fixture = StoreFixture::new().with_trail(
            path,
            vec![
                MetadataEntry::new(t + Duration::hours(1), "a", "b"),
                MetadataEntry::new(t, "", "a"),
            ],
        );

        let result = run(&fixture.store, path).unwrap();

        assert_eq!(result.history.len(), 2);
        assert_eq!(result.history[0].new_value, "a");
        assert_eq!(result.history[1].new_value, "b");
        assert!(result.messages.is_empty());
    }

    #[test]
    fn empty_history_says_so() {
        let fixture = StoreFixture::new();
        let result = run(&fixture.store, Path::new("/b/doc.bak")).unwrap();
        assert!(result.history.is_empty());
        assert_eq!(result.messages.len(), 1);
    }
}
