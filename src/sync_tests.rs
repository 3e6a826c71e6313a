use crate::config::SubmodulerConfig;
use crate::orchestrator::Orchestrator;
use crate::outcome::{Bucket, OperationOutcome};
use crate::runner::scripted::ScriptedRunner;
use crate::runner::CommandOutput;
use crate::sync::{sync_commit_message, SyncOptions};
use crate::version::SemVerTriple;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MANIFEST: &str = r#"[submodule "a"]
	path = sub/a
[submodule "b"]
	path = sub/b
"#;

fn managed_child(root: &Path, name: &str, version: Option<&str>) -> PathBuf {
    let dir = root.join("sub").join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(".submoduler.ini"), "[default]\n").unwrap();
    if let Some(version) = version {
        let lib = dir.join("lib").join(name);
        fs::create_dir_all(&lib).unwrap();
        fs::write(
            lib.join("version.rb"),
            format!("module {}\n  VERSION = \"{}\"\nend\n", name.to_uppercase(), version),
        )
        .unwrap();
    }
    dir
}

fn workspace(a: Option<&str>, b: Option<&str>) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(".gitmodules"), MANIFEST).unwrap();
    managed_child(temp.path(), "a", a);
    managed_child(temp.path(), "b", b);
    temp
}

fn orchestrator(temp: &TempDir, runner: ScriptedRunner) -> Orchestrator<ScriptedRunner> {
    Orchestrator::new(temp.path(), SubmodulerConfig::default(), runner)
}

fn version_file(temp: &TempDir, name: &str) -> String {
    fs::read_to_string(
        temp.path()
            .join("sub")
            .join(name)
            .join("lib")
            .join(name)
            .join("version.rb"),
    )
    .unwrap()
}

#[test]
fn test_commit_message() {
    assert_eq!(
        sync_commit_message(&SemVerTriple::new(1, 3, 1)),
        "Sync version to 1.3.1"
    );
}

#[test]
fn test_syncs_lower_versions_to_highest() {
    let temp = workspace(Some("1.2.0"), Some("1.3.1"));
    let orch = orchestrator(&temp, ScriptedRunner::new());

    let report = orch.sync_version(&SyncOptions::default()).unwrap();

    assert_eq!(report.entries[0].outcome, OperationOutcome::Succeeded);
    assert_eq!(report.entries[0].message, "1.2.0 → 1.3.1");
    assert_eq!(report.entries[1].outcome, OperationOutcome::AlreadySatisfied);
    assert_eq!(report.notes[0], "Target version: 1.3.1 (from b)");
    assert!(report.success);

    assert_eq!(version_file(&temp, "a"), "module A\n  VERSION = \"1.3.1\"\nend\n");
    assert_eq!(version_file(&temp, "b"), "module B\n  VERSION = \"1.3.1\"\nend\n");

    let a_dir = temp.path().join("sub/a");
    let calls = orch.runner().calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.dir == a_dir));
    assert_eq!(calls[0].argv, vec!["git", "add", "--", "lib/a/version.rb"]);
    assert_eq!(
        calls[1].argv,
        vec!["git", "commit", "-m", "Sync version to 1.3.1", "--", "lib/a/version.rb"]
    );
}

#[test]
fn test_dry_run_leaves_files_alone() {
    let temp = workspace(Some("1.2.0"), Some("1.3.1"));
    let orch = orchestrator(&temp, ScriptedRunner::new());

    let report = orch.sync_version(&SyncOptions { dry_run: true }).unwrap();

    assert!(orch.runner().calls().is_empty());
    assert_eq!(version_file(&temp, "a"), "module A\n  VERSION = \"1.2.0\"\nend\n");
    assert_eq!(report.entries[0].message, "[DRY RUN] 1.2.0 → 1.3.1");
    assert!(report.notes.contains(&"DRY RUN - No changes were made".to_string()));
}

#[test]
fn test_second_run_is_idempotent() {
    let temp = workspace(Some("0.9.9"), Some("2.0.0"));
    orchestrator(&temp, ScriptedRunner::new())
        .sync_version(&SyncOptions::default())
        .unwrap();

    let orch = orchestrator(&temp, ScriptedRunner::new());
    let report = orch.sync_version(&SyncOptions::default()).unwrap();

    assert_eq!(report.summary.count(Bucket::AlreadySatisfied), 2);
    assert!(orch.runner().calls().is_empty());
}

#[test]
fn test_unmanaged_and_versionless_children_are_skipped() {
    let temp = workspace(Some("1.0.0"), None);
    fs::write(
        temp.path().join(".gitmodules"),
        format!("{}[submodule \"c\"]\n\tpath = sub/c\n", MANIFEST),
    )
    .unwrap();
    fs::create_dir_all(temp.path().join("sub/c")).unwrap();

    let report = orchestrator(&temp, ScriptedRunner::new())
        .sync_version(&SyncOptions::default())
        .unwrap();

    assert_eq!(report.entries[0].outcome, OperationOutcome::AlreadySatisfied);
    assert_eq!(
        report.entries[1].outcome,
        OperationOutcome::skipped("No version file found")
    );
    assert_eq!(
        report.entries[2].outcome,
        OperationOutcome::skipped("No .submoduler.ini (skipping)")
    );
    assert_eq!(report.summary.total, 3);
    assert!(report.success);
}

#[test]
fn test_no_versions_fails() {
    let temp = workspace(None, None);
    let report = orchestrator(&temp, ScriptedRunner::new())
        .sync_version(&SyncOptions::default())
        .unwrap();

    assert!(!report.success);
    assert_eq!(report.notes, vec!["No versions found in submodules."]);
    assert_eq!(report.summary.count(Bucket::Skipped), 2);
}

#[test]
fn test_no_children_succeeds() {
    let temp = TempDir::new().unwrap();
    let report = orchestrator(&temp, ScriptedRunner::new())
        .sync_version(&SyncOptions::default())
        .unwrap();

    assert!(report.success);
    assert_eq!(report.summary.total, 0);
    assert_eq!(report.notes, vec!["No submodules found."]);
}

#[test]
fn test_commit_failure_is_recorded() {
    let temp = workspace(Some("1.0.0"), Some("1.1.0"));
    let runner = ScriptedRunner::new().on(&["git", "commit"], CommandOutput::failed("nope"));

    let report = orchestrator(&temp, runner)
        .sync_version(&SyncOptions::default())
        .unwrap();

    assert_eq!(
        report.entries[0].outcome,
        OperationOutcome::failed("Version written but `git commit` failed")
    );
    assert_eq!(report.entries[0].details, vec!["nope"]);
    assert!(!report.success);
}

#[test]
fn test_leading_zero_versions_take_part() {
    let temp = workspace(Some("1.02.0"), Some("1.1.9"));
    let report = orchestrator(&temp, ScriptedRunner::new())
        .sync_version(&SyncOptions::default())
        .unwrap();

    assert_eq!(report.notes[0], "Target version: 1.2.0 (from a)");
    assert_eq!(report.entries[0].outcome, OperationOutcome::AlreadySatisfied);
    assert_eq!(report.entries[1].message, "1.1.9 → 1.2.0");
}

#[test]
fn test_unparsable_version_has_its_own_reason() {
    let temp = workspace(Some("1.0.0"), Some("2.0.beta"));
    let report = orchestrator(&temp, ScriptedRunner::new())
        .sync_version(&SyncOptions::default())
        .unwrap();

    assert_eq!(
        report.entries[1].outcome,
        OperationOutcome::skipped("Unparsable version in lib/b/version.rb")
    );
    assert_eq!(report.entries[0].outcome, OperationOutcome::AlreadySatisfied);
}
