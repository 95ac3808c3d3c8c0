use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::scanner;
use std::path::Path;

pub fn run(production_dir: &Path, backup_dir: &Path, backup_ext: &str) -> Result<CmdResult> {
    let masters = scanner::list_masters(production_dir, backup_dir, backup_ext)?;
    let mut result = CmdResult::default();
    if masters.is_empty() {
        result.add_message(CmdMessage::info(format!(
            "No documents found in {}",
            production_dir.display()
        )));
    }
    Ok(result.with_masters(masters))
}
