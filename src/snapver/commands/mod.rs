use crate::config::SnapverConfig;
use crate::model::{MasterDocument, MetadataEntry, ReconcileReport, ScanReport, VersionRecord};
use std::path::PathBuf;

pub mod config;
pub mod helpers;
pub mod history;
pub mod masters;
pub mod paths;
pub mod refresh;
pub mod scan;
pub mod tag;

/// One backup group: a base name within a backup directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub directory: PathBuf,
    pub base_name: String,
}

impl GroupKey {
    pub fn new(directory: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            base_name: base_name.into(),
        }
    }
}

/// A version row as shown to the user. `tag` is `None` when metadata could
/// not be read for this file.
#[derive(Debug, Clone)]
pub struct DisplayVersion {
    pub record: VersionRecord,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub report: Option<ScanReport>,
    /// Newest first.
    pub versions: Vec<DisplayVersion>,
    pub history: Vec<MetadataEntry>,
    pub reconcile: Option<ReconcileReport>,
    pub masters: Vec<MasterDocument>,
    pub paths: Vec<PathBuf>,
    pub tag: Option<String>,
    pub config: Option<SnapverConfig>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_report(mut self, report: ScanReport) -> Self {
        self.report = Some(report);
        self
    }

    pub fn with_versions(mut self, versions: Vec<DisplayVersion>) -> Self {
        self.versions = versions;
        self
    }

    pub fn with_history(mut self, history: Vec<MetadataEntry>) -> Self {
        self.history = history;
        self
    }

    pub fn with_reconcile(mut self, report: ReconcileReport) -> Self {
        self.reconcile = Some(report);
        self
    }

    pub fn with_masters(mut self, masters: Vec<MasterDocument>) -> Self {
        self.masters = masters;
        self
    }

    pub fn with_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_tag(mut self, tag: String) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn with_config(mut self, config: SnapverConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Messages at warning level or above.
    pub fn problems(&self) -> impl Iterator<Item = &CmdMessage> {
        self.messages
            .iter()
            .filter(|m| matches!(m.level, MessageLevel::Warning | MessageLevel::Error))
    }
}
