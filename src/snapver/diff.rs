//! # Diff Engine
//!
//! Change magnitude between consecutive versions, computed on a Myers line
//! alignment (a shortest edit script, so the kept lines form a longest common
//! subsequence). Each aligned hunk contributes:
//!
//! - inserted lines,
//! - deleted lines,
//! - `max(old, new)` for a replaced hunk: paired lines are modifications and
//!   the surplus lines are insertions or deletions.
//!
//! Line terminators are not part of the comparison, so `a\r\n` equals `a\n`
//! and a missing final newline is not a change.
//!
//! A pair that takes longer than [`DIFF_TIMEOUT`] gets a coarser alignment,
//! which can only overstate the count.

use crate::model::{ChangeCount, VersionRecord};
use rayon::prelude::*;
use similar::{Algorithm, DiffTag, TextDiff};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DIFF_TIMEOUT: Duration = Duration::from_secs(2);

pub fn count_changes(old: &str, new: &str) -> usize {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();

    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .timeout(DIFF_TIMEOUT)
        .diff_slices(&old_lines, &new_lines);

    diff.ops()
        .iter()
        .map(|op| {
            let (tag, old_range, new_range) = op.as_tag_tuple();
            match tag {
                DiffTag::Equal => 0,
                DiffTag::Delete => old_range.len(),
                DiffTag::Insert => new_range.len(),
                DiffTag::Replace => old_range.len().max(new_range.len()),
            }
        })
        .sum()
}

/// Read a version as text. Not UTF-8, or gone since the scan, means no diff.
pub fn read_text(path: &Path) -> Result<String, String> {
    let bytes = fs::read(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let mut text =
        String::from_utf8(bytes).map_err(|_| format!("{} is not UTF-8 text", path.display()))?;
    if text.starts_with('\u{feff}') {
        text.drain(..'\u{feff}'.len_utf8());
    }
    Ok(text)
}

pub fn change_count(older: &Path, newer: &Path) -> ChangeCount {
    match (read_text(older), read_text(newer)) {
        (Ok(old), Ok(new)) => ChangeCount::Lines(count_changes(&old, &new)),
        (Err(reason), _) | (_, Err(reason)) => ChangeCount::Unavailable(reason),
    }
}

/// Fill in `changed_lines` for an ascending version sequence. Each file is
/// read once; V1 has no predecessor and always reports 0.
pub fn annotate(records: &mut [VersionRecord]) {
    let contents: Vec<Result<String, String>> = records
        .par_iter()
        .map(|r| read_text(&r.file.path))
        .collect();

    for (i, record) in records.iter_mut().enumerate() {
        let count = if i == 0 {
            ChangeCount::Lines(0)
        } else {
            match (&contents[i - 1], &contents[i]) {
                (Ok(old), Ok(new)) => ChangeCount::Lines(count_changes(old, new)),
                (Err(reason), _) | (_, Err(reason)) => ChangeCount::Unavailable(reason.clone()),
            }
        };
        record.changed_lines = Some(count);
    }
}
