use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

struct Workspace {
    _tmp: TempDir,
    home: PathBuf,
    backups: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let home = tmp.path().join("home");
        let backups = tmp.path().join("backups");
        fs::create_dir_all(&backups).unwrap();
        Self {
            _tmp: tmp,
            home,
            backups,
        }
    }

    fn with_versions(self) -> Self {
        for (name, content) in [
            ("doc.bak", "one\n"),
            ("doc.bak.1", "one\ntwo\n"),
            ("doc.bak.2", "one\ntwo\nthree\n"),
        ] {
            fs::write(self.backups.join(name), content).unwrap();
            thread::sleep(Duration::from_millis(30));
        }
        self
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("snapver").unwrap();
        cmd.env("SNAPVER_HOME", &self.home)
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .arg("--dir")
            .arg(&self.backups);
        cmd
    }

    fn use_sidecars(&self) {
        self.cmd()
            .args(["config", "attribute-backend", "sidecar"])
            .assert()
            .success()
            .stdout(predicate::str::contains("attribute-backend set to sidecar"));
    }

    fn backup(&self, name: &str) -> PathBuf {
        self.backups.join(name)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().to_string()
}

#[test]
fn scan_lists_versions_newest_first() {
    let ws = Workspace::new().with_versions();
    ws.use_sidecars();

    let output = ws.cmd().args(["scan", "doc"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();

    let v3 = stdout.find("V3").expect("V3 listed");
    let v1 = stdout.find("V1").expect("V1 listed");
    assert!(v3 < v1);
}

#[test]
fn tag_edit_view_and_history() {
    let ws = Workspace::new().with_versions();
    ws.use_sidecars();

    ws.cmd()
        .args(["tag", "doc", "V2", "approved"])
        .assert()
        .success()
        .stdout(predicate::str::contains("approved"));

    // reconciled onto every member, addressed through any file of the group
    ws.cmd()
        .args(["tag", "doc.txt", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("approved"));

    ws.cmd()
        .args(["history", "doc", "v1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(none) -> approved"));

    assert!(ws.backups.join(".doc.bak.snapver-audit").is_file());
}

#[test]
fn path_prints_backup_location() {
    let ws = Workspace::new().with_versions();
    ws.use_sidecars();

    let output = ws.cmd().args(["path", "doc", "1", "V3"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(file_name(Path::new(lines[0])), file_name(&ws.backup("doc.bak")));
    assert_eq!(file_name(Path::new(lines[1])), "doc.bak.2");
}

#[test]
fn unknown_version_fails() {
    let ws = Workspace::new().with_versions();
    ws.use_sidecars();

    ws.cmd()
        .args(["tag", "doc", "V9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn invalid_version_selector_fails() {
    let ws = Workspace::new().with_versions();

    ws.cmd()
        .args(["history", "doc", "latest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid version"));
}

#[test]
fn config_rejects_unknown_backend() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["config", "attribute-backend", "floppy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Unknown attribute backend"));

    ws.cmd()
        .args(["config", "attribute-backend"])
        .assert()
        .success()
        .stdout(predicate::str::contains("auto"));
}

#[test]
fn masters_requires_production_dir() {
    let ws = Workspace::new();

    ws.cmd()
        .arg("masters")
        .assert()
        .failure()
        .stderr(predicate::str::contains("production-dir"));
}

#[test]
fn masters_counts_backups() {
    let ws = Workspace::new().with_versions();
    let production = ws._tmp.path().join("docs");
    fs::create_dir_all(&production).unwrap();
    fs::write(production.join("doc.txt"), "one\n").unwrap();
    fs::write(production.join("notes.txt"), "x\n").unwrap();

    ws.cmd()
        .args(["config", "production-dir"])
        .arg(&production)
        .assert()
        .success();

    ws.cmd()
        .arg("masters")
        .assert()
        .success()
        .stdout(predicate::str::contains("doc.txt").and(predicate::str::contains("3 backups")))
        .stdout(predicate::str::contains("notes.txt"));
}
