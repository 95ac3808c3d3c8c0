//! # API Facade
//!
//! The single entry point for every snapver operation, whatever the UI. It
//! dispatches to `commands/*.rs` and the core modules, and adds the concerns
//! that span calls:
//!
//! - **Group locks**: tag edits and reconciles on one group are serialized.
//! - **Scan membership**: the last scan of each group is remembered, so a
//!   version number or a bare path resolves to the group the user saw.
//! - **Log sink**: every warning and error is forwarded to the [`LogSink`]
//!   with the operation name, then returned as usual.
//!
//! Like the command layer it never prints and never exits.
//!
//! `SnapverApi<S: AttributeStore>` is generic over storage: production uses
//! [`crate::store::FsAttributeStore`], tests use
//! [`crate::store::memory::InMemoryStore`].

use crate::commands::{self, GroupKey};
use crate::config::SnapverConfig;
use crate::error::{Result, SnapverError};
use crate::events::{LogSink, TracingSink};
use crate::lock::GroupLocks;
use crate::merge;
use crate::metadata;
use crate::model::{AuditTrail, BackupFile, MetadataEntry, ReconcileReport, ScanReport};
use crate::scanner::base_name_of;
use crate::session::{ScanBatch, ScanSession};
use crate::store::AttributeStore;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

pub use crate::commands::config::ConfigAction;
pub use crate::commands::helpers::{base_for_argument, parse_version};
pub use crate::commands::{CmdMessage, CmdResult, DisplayVersion, MessageLevel};

pub struct SnapverApi<S: AttributeStore> {
    store: S,
    config: SnapverConfig,
    config_dir: PathBuf,
    sink: Arc<dyn LogSink>,
    locks: GroupLocks,
    session: ScanSession,
    reports: Mutex<HashMap<(PathBuf, String), ScanReport>>,
    membership: Mutex<HashMap<PathBuf, GroupKey>>,
}

impl<S: AttributeStore> SnapverApi<S> {
    pub fn new(store: S, config: SnapverConfig, config_dir: PathBuf) -> Self {
        Self {
            store,
            config,
            config_dir,
            sink: Arc::new(TracingSink),
            locks: GroupLocks::new(),
            session: ScanSession::new(),
            reports: Mutex::new(HashMap::new()),
            membership: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SnapverConfig {
        &self.config
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    fn backup_ext(&self) -> &str {
        &self.config.backup_extension
    }

    // --- Core operations ---

    /// Scan, rank and diff one group, and remember its membership.
    pub fn scan_group(&self, directory: &Path, base_name: &str) -> Result<ScanReport> {
        let report = self.logged(
            "scan",
            commands::scan::scan_group(directory, base_name, self.backup_ext()),
        )?;
        for warning in &report.warnings {
            self.sink.warning(format!(
                "scan: skipped {}: {}",
                warning.path.display(),
                warning.reason
            ));
        }
        self.remember(&report);
        Ok(report)
    }

    pub fn get_tag(&self, path: &Path) -> Result<String> {
        self.logged("get tag", metadata::get_tag(&self.store, path).map_err(Into::into))
    }

    /// Append a tag change to the file's trail and update its tag slot.
    pub fn set_tag(&self, path: &Path, value: &str) -> Result<AuditTrail> {
        let group = self.group_of(path);
        let update = self.locks.with_group(&group.directory, &group.base_name, || {
            metadata::set_tag(&self.store, path, value, Utc::now())
        });
        let update = self.logged("set tag", update.map_err(Into::into))?;
        if let Some(e) = &update.tag_slot_error {
            self.sink.warning(format!("set tag: {}", e));
        }
        Ok(update.trail)
    }

    pub fn get_history(&self, path: &Path) -> Result<Vec<MetadataEntry>> {
        self.logged(
            "history",
            metadata::get_history(&self.store, path).map_err(Into::into),
        )
    }

    /// Union-then-broadcast the audit trails of a group.
    pub fn reconcile(&self, group: &[BackupFile]) -> ReconcileReport {
        let Some(first) = group.first() else {
            return ReconcileReport::default();
        };
        let key = self.group_of(&first.path);
        let members: Vec<PathBuf> = group.iter().map(|f| f.path.clone()).collect();

        let report = self.locks.with_group(&key.directory, &key.base_name, || {
            merge::reconcile_group(
                &self.store,
                &key.directory,
                &key.base_name,
                &members,
                self.backup_ext(),
            )
        });
        for failure in &report.unreadable {
            self.sink.warning(format!(
                "reconcile: unreadable audit on {}: {}",
                failure.path.display(),
                failure.reason
            ));
        }
        for failure in &report.failed {
            self.sink.error(format!(
                "reconcile: write failed for {}: {}",
                failure.path.display(),
                failure.reason
            ));
        }
        report
    }

    // --- Named commands ---

    /// Scan without touching metadata.
    pub fn scan(&self, directory: &Path, base_name: &str) -> Result<CmdResult> {
        let report = self.logged(
            "scan",
            commands::scan::scan_group(directory, base_name, self.backup_ext()),
        )?;
        self.remember(&report);
        Ok(self.forward("scan", commands::scan::present(&self.store, report)))
    }

    /// RefreshFiles: rescan the group and reconcile its trails.
    pub fn refresh_files(&self, directory: &Path, base_name: &str) -> Result<CmdResult> {
        let result = self.locks.with_group(directory, base_name, || {
            commands::refresh::files(&self.store, directory, base_name, self.backup_ext())
        });
        let result = self.logged("refresh files", result)?;
        if let Some(report) = &result.report {
            self.remember(report);
        }
        Ok(self.forward("refresh files", result))
    }

    /// RefreshMetadata: reconcile the last scanned membership and re-read tags.
    pub fn refresh_metadata(&self, directory: &Path, base_name: &str) -> Result<CmdResult> {
        let report = self.last_report(directory, base_name)?;
        let result = self.locks.with_group(directory, base_name, || {
            commands::refresh::metadata(&self.store, report, self.backup_ext())
        });
        Ok(self.forward("refresh metadata", result))
    }

    pub fn view_tag(&self, directory: &Path, base_name: &str, version: usize) -> Result<CmdResult> {
        let path = self.version_path(directory, base_name, version)?;
        self.logged("get tag", commands::tag::get(&self.store, &path))
    }

    /// EditTag: set the tag of one version, then spread the new entry to the
    /// rest of the group.
    pub fn edit_tag(
        &self,
        directory: &Path,
        base_name: &str,
        version: usize,
        value: &str,
    ) -> Result<CmdResult> {
        let report = self.last_report(directory, base_name)?;
        let path = commands::helpers::find_version(&report, version)?
            .file
            .path
            .clone();

        let (mut result, reconciled) = self
            .locks
            .with_group(directory, base_name, || {
                let result = commands::tag::set(&self.store, &path, value, Utc::now())?;
                let reconciled = merge::reconcile_group(
                    &self.store,
                    directory,
                    &report.base_name,
                    &report.paths(),
                    self.backup_ext(),
                );
                Ok::<_, SnapverError>((result, reconciled))
            })
            .map_err(|e| self.log_error("edit tag", e))?;

        for failure in &reconciled.failed {
            result.add_message(CmdMessage::warning(format!(
                "Tag not yet copied to {}: {}",
                failure.path.display(),
                failure.reason
            )));
        }
        Ok(self.forward("edit tag", result.with_reconcile(reconciled)))
    }

    /// ViewHistory for one version.
    pub fn view_history(
        &self,
        directory: &Path,
        base_name: &str,
        version: usize,
    ) -> Result<CmdResult> {
        let path = self.version_path(directory, base_name, version)?;
        let result = self.logged("history", commands::history::run(&self.store, &path))?;
        Ok(self.forward("history", result))
    }

    /// VersionPath: backup paths for version numbers, e.g. to hand to an editor.
    pub fn version_paths(
        &self,
        directory: &Path,
        base_name: &str,
        versions: &[usize],
    ) -> Result<CmdResult> {
        let report = self.last_report(directory, base_name)?;
        commands::paths::run(&report, versions)
    }

    /// ListMasters over the configured production and backup directories.
    pub fn list_masters(&self, backup_dir: &Path) -> Result<CmdResult> {
        let production = self.config.production_directory.clone().ok_or_else(|| {
            SnapverError::Config(
                "production-dir is not set (snapver config production-dir <DIR>)".to_string(),
            )
        })?;
        self.logged(
            "masters",
            commands::masters::run(&production, backup_dir, self.backup_ext()),
        )
    }

    pub fn config_action(&self, action: ConfigAction) -> Result<CmdResult> {
        commands::config::run(&self.config_dir, action)
    }

    /// Drop everything remembered about a group: its last scan, its
    /// membership and its lock.
    pub fn forget(&self, directory: &Path, base_name: &str) {
        let key = (directory.to_path_buf(), base_name.to_lowercase());
        if let Some(report) = self.reports.lock().remove(&key) {
            let mut membership = self.membership.lock();
            for path in report.paths() {
                membership.remove(&path);
            }
        }
        self.locks.prune(directory, base_name);
    }

    // --- Background scans ---

    /// Start a scan on a worker thread. Starting another scan makes this one
    /// stale; see [`SnapverApi::accept_scan`].
    pub fn spawn_scan(&self, directory: &Path, base_name: &str) -> Receiver<ScanBatch> {
        let directory = directory.to_path_buf();
        let base_name = base_name.to_string();
        let backup_ext = self.backup_ext().to_string();
        self.session.spawn(move || {
            commands::scan::scan_group(&directory, &base_name, &backup_ext)
        })
    }

    /// Present a finished background scan, or `None` if a newer scan has
    /// started since.
    pub fn accept_scan(&self, batch: ScanBatch) -> Option<Result<CmdResult>> {
        let report = match self.session.accept(batch)? {
            Ok(report) => report,
            Err(e) => return Some(Err(self.log_error("scan", e))),
        };
        self.remember(&report);
        Some(Ok(self.forward(
            "scan",
            commands::scan::present(&self.store, report),
        )))
    }

    // --- Internals ---

    /// Record a group's latest membership, replacing the previous scan's.
    /// A group with no versions left is forgotten.
    fn remember(&self, report: &ScanReport) {
        if report.versions.is_empty() {
            self.forget(&report.directory, &report.base_name);
            return;
        }
        let key = GroupKey::new(&report.directory, &report.base_name);
        let previous = self.reports.lock().insert(
            (report.directory.clone(), report.base_name.to_lowercase()),
            report.clone(),
        );

        let mut membership = self.membership.lock();
        if let Some(previous) = previous {
            for path in previous.paths() {
                if membership.get(&path) == Some(&key) {
                    membership.remove(&path);
                }
            }
        }
        for path in report.paths() {
            membership.insert(path, key.clone());
        }
    }

    /// The last scan of a group, scanning now if there is none.
    fn last_report(&self, directory: &Path, base_name: &str) -> Result<ScanReport> {
        let cached = self
            .reports
            .lock()
            .get(&(directory.to_path_buf(), base_name.to_lowercase()))
            .cloned();
        match cached {
            Some(report) => Ok(report),
            None => self.scan_group(directory, base_name),
        }
    }

    fn version_path(&self, directory: &Path, base_name: &str, version: usize) -> Result<PathBuf> {
        let report = self.last_report(directory, base_name)?;
        Ok(commands::helpers::find_version(&report, version)?
            .file
            .path
            .clone())
    }

    /// The group a path belongs to: last scan membership, else derived from
    /// its name.
    fn group_of(&self, path: &Path) -> GroupKey {
        if let Some(key) = self.membership.lock().get(path) {
            return key.clone();
        }
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        GroupKey::new(directory, base_name_of(&name))
    }

    fn log_error(&self, operation: &str, error: SnapverError) -> SnapverError {
        self.sink.error(format!("{}: {}", operation, error));
        error
    }

    fn logged<T>(&self, operation: &str, result: Result<T>) -> Result<T> {
        result.map_err(|e| self.log_error(operation, e))
    }

    fn forward(&self, operation: &str, result: CmdResult) -> CmdResult {
        for message in result.problems() {
            let line = format!("{}: {}", operation, message.content);
            match message.level {
                MessageLevel::Error => self.sink.error(line),
                _ => self.sink.warning(line),
            }
        }
        result
    }
}
