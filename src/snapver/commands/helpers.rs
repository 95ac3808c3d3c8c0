use crate::commands::{CmdMessage, DisplayVersion};
use crate::error::{Result, SnapverError};
use crate::metadata;
use crate::model::{ScanReport, VersionRecord};
use crate::scanner::base_name_of;
use crate::store::AttributeStore;
use rayon::prelude::*;
use std::path::Path;

/// Parse a version selector: `V3`, `v3` or `3`.
pub fn parse_version(selector: &str) -> Result<usize> {
    let trimmed = selector.trim();
    let digits = trimmed
        .strip_prefix(['V', 'v'])
        .unwrap_or(trimmed);
    match digits.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(SnapverError::Api(format!(
            "Invalid version '{}' (expected V<n>, e.g. V3)",
            selector
        ))),
    }
}

pub fn find_version<'a>(report: &'a ScanReport, version: usize) -> Result<&'a VersionRecord> {
    report.find_version(version).ok_or_else(|| {
        SnapverError::VersionNotFound(format!(
            "V{} of '{}' ({} versions found)",
            version,
            report.base_name,
            report.versions.len()
        ))
    })
}

/// The group a command-line file argument refers to: a bare base name or
/// any file of the group, with or without a directory part.
pub fn base_for_argument(argument: &str) -> String {
    let name = Path::new(argument)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| argument.to_string());
    base_name_of(&name)
}

/// Attach current tags to versions, newest first. Tags are read in parallel;
/// a file whose metadata cannot be read gets no tag and a warning.
pub fn tag_versions<S: AttributeStore + ?Sized>(
    store: &S,
    versions: &[VersionRecord],
) -> (Vec<DisplayVersion>, Vec<CmdMessage>) {
    let tagged: Vec<_> = versions
        .par_iter()
        .rev()
        .map(|record| (record, metadata::get_tag(store, &record.file.path)))
        .collect();

    let mut rows = Vec::with_capacity(tagged.len());
    let mut messages = Vec::new();
    for (record, tag) in tagged {
        let tag = match tag {
            Ok(tag) => Some(tag),
            Err(e) => {
                messages.push(CmdMessage::warning(format!(
                    "Cannot read tag of {}: {}",
                    record.label(),
                    e
                )));
                None
            }
        };
        rows.push(DisplayVersion {
            record: record.clone(),
            tag,
        });
    }
    (rows, messages)
}
