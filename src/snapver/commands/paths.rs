use crate::commands::helpers::find_version;
use crate::commands::CmdResult;
use crate::error::Result;
use crate::model::ScanReport;

/// Resolve version numbers to backup paths, in the order given.
pub fn run(report: &ScanReport, versions: &[usize]) -> Result<CmdResult> {
    let paths = versions
        .iter()
        .map(|v| find_version(report, *v).map(|record| record.file.path.clone()))
        .collect::<Result<Vec<_>>>()?;
    Ok(CmdResult::default().with_paths(paths))
}
