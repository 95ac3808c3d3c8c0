use crate::commands::helpers::tag_versions;
use crate::commands::{CmdMessage, CmdResult};
use crate::diff;
use crate::error::Result;
use crate::model::ScanReport;
use crate::ranker;
use crate::scanner;
use crate::store::AttributeStore;
use std::path::Path;

/// Scan, rank and diff one group. Unreadable files are listed as warnings;
/// the report holds the readable subset.
pub fn scan_group(directory: &Path, base_name: &str, backup_ext: &str) -> Result<ScanReport> {
    let outcome = scanner::scan(directory, base_name, backup_ext)?;
    let mut versions = ranker::rank(outcome.files);
    diff::annotate(&mut versions);

    Ok(ScanReport {
        directory: directory.to_path_buf(),
        base_name: base_name.to_string(),
        versions,
        warnings: outcome.warnings,
    })
}

/// Turn a report into a displayable result with tags attached.
pub fn present<S: AttributeStore + ?Sized>(store: &S, report: ScanReport) -> CmdResult {
    let (rows, tag_messages) = tag_versions(store, &report.versions);
    let mut result = CmdResult::default();

    if report.versions.is_empty() {
        result.add_message(CmdMessage::info(format!(
            "No backups of '{}' found in {}",
            report.base_name,
            report.directory.display()
        )));
    }
    for warning in &report.warnings {
        result.add_message(CmdMessage::warning(format!(
            "Skipped {}: {}",
            warning.path.display(),
            warning.reason
        )));
    }
    for message in tag_messages {
        result.add_message(message);
    }

    result.with_versions(rows).with_report(report)
}

pub fn run<S: AttributeStore + ?Sized>(
    store: &S,
    directory: &Path,
    base_name: &str,
    backup_ext: &str,
) -> Result<CmdResult> {
    let report = scan_group(directory, base_name, backup_ext)?;
    Ok(present(store, report))
}
