use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A physical backup file found on disk.
///
/// Identity is the path. The filesystem owns these files; nothing in this
/// crate creates or deletes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupFile {
    pub path: PathBuf,
    pub base_name: String,
    pub created_at: DateTime<Utc>,
    pub total_lines: usize,
}

/// Magnitude of change between a version and its predecessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeCount {
    Lines(usize),
    Unavailable(String),
}

impl ChangeCount {
    pub fn lines(&self) -> Option<usize> {
        match self {
            ChangeCount::Lines(n) => Some(*n),
            ChangeCount::Unavailable(_) => None,
        }
    }
}

impl fmt::Display for ChangeCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeCount::Lines(n) => write!(f, "{}", n),
            ChangeCount::Unavailable(_) => write!(f, "n/a"),
        }
    }
}

/// A backup file placed in its group's version sequence.
///
/// `changed_lines` is `None` until the diff pass has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub file: BackupFile,
    pub version: usize,
    pub changed_lines: Option<ChangeCount>,
}

impl VersionRecord {
    pub fn label(&self) -> String {
        format!("V{}", self.version)
    }
}

/// One audit record. Never edited once written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub timestamp: DateTime<Utc>,
    pub previous_value: String,
    pub new_value: String,
}

impl MetadataEntry {
    pub fn new(
        timestamp: DateTime<Utc>,
        previous_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            previous_value: previous_value.into(),
            new_value: new_value.into(),
        }
    }
}

/// Ordered audit history of one lineage, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditTrail {
    entries: Vec<MetadataEntry>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<MetadataEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[MetadataEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<MetadataEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry with the latest timestamp (the last one, for a sorted trail).
    pub fn latest(&self) -> Option<&MetadataEntry> {
        self.entries.last()
    }

    /// The tag value this trail implies, if it has any entries.
    pub fn current_tag(&self) -> Option<&str> {
        self.latest().map(|e| e.new_value.as_str())
    }

    pub fn push(&mut self, entry: MetadataEntry) {
        self.entries.push(entry);
    }

    /// A timestamp for a new entry: `now` at microsecond precision, nudged
    /// past the latest entry so the appended record sorts last.
    pub fn next_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now = now.trunc_subsecs(6);
        match self.latest() {
            Some(last) if last.timestamp >= now => last.timestamp + Duration::microseconds(1),
            _ => now,
        }
    }
}

/// A directory entry the scanner could not read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanWarning {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of scanning one group, versions in ascending order (V1 first).
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub directory: PathBuf,
    pub base_name: String,
    pub versions: Vec<VersionRecord>,
    pub warnings: Vec<ScanWarning>,
}

impl ScanReport {
    /// Versions newest first, the order a user browses them in.
    pub fn newest_first(&self) -> impl Iterator<Item = &VersionRecord> {
        self.versions.iter().rev()
    }

    pub fn files(&self) -> Vec<BackupFile> {
        self.versions.iter().map(|v| v.file.clone()).collect()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.versions.iter().map(|v| v.file.path.clone()).collect()
    }

    pub fn find_version(&self, version: usize) -> Option<&VersionRecord> {
        self.versions.iter().find(|v| v.version == version)
    }
}

/// A group member that did not receive the broadcast trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of one reconcile pass over a group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<MergeFailure>,
    /// Members whose audit slot could not be read. They contributed nothing
    /// and were left as they were.
    pub unreadable: Vec<MergeFailure>,
    /// Slots of vanished files folded into the trail and then discarded.
    pub adopted: Vec<PathBuf>,
    pub entries: usize,
    pub current_tag: Option<String>,
}

impl ReconcileReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A working document in the production directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterDocument {
    pub path: PathBuf,
    pub modified: Option<DateTime<Utc>>,
    pub base_name: String,
    pub backup_count: usize,
}
