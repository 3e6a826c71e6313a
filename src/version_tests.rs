use crate::version::{
    declared_version, replace_version, SemVerTriple, SyncAction, SyncPlan, VersionInspector,
    VersionRecord,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn v(s: &str) -> SemVerTriple {
    s.parse().unwrap()
}

fn record(name: &str, version: &str) -> VersionRecord {
    VersionRecord {
        repository_name: name.to_string(),
        path: PathBuf::from(format!("sub/{name}")),
        file: PathBuf::from(format!("sub/{name}/lib/{name}/version.rb")),
        version: v(version),
    }
}

#[test]
fn test_parse_triple() {
    assert_eq!(v("1.2.3"), SemVerTriple::new(1, 2, 3));
    assert_eq!(v("1.2.3").to_string(), "1.2.3");
}

#[test]
fn test_parse_accepts_leading_zeros() {
    assert_eq!(v("1.02.0"), SemVerTriple::new(1, 2, 0));
    assert_eq!(v("01.2.3"), SemVerTriple::new(1, 2, 3));
    assert_eq!(v(" 0.0.007 ").to_string(), "0.0.7");
}

#[test]
fn test_parse_rejects_non_numeric_and_suffixes() {
    for bad in [
        "1.2.x",
        "1.2",
        "1.2.3.4",
        "one.two.three",
        "1.2.3-beta.1",
        "1.2.3+build",
        "1..3",
        "-1.2.3",
        "99999999999999999999.0.0",
        "",
    ] {
        assert!(bad.parse::<SemVerTriple>().is_err(), "{bad} should be rejected");
    }
}

#[test]
fn test_ordering_is_componentwise() {
    assert!(v("2.0.0") > v("1.99.99"));
    assert!(v("1.10.0") > v("1.9.9"));
    assert!(v("1.2.10") > v("1.2.9"));
    assert_eq!(v("1.2.3").cmp(&v("1.2.3")), std::cmp::Ordering::Equal);
}

#[test]
fn test_declared_version_quotes() {
    assert_eq!(
        declared_version("module A\n  VERSION = \"0.4.1\"\nend\n"),
        Some("0.4.1")
    );
    assert_eq!(declared_version("VERSION='2.0.0'"), Some("2.0.0"));
    assert_eq!(declared_version("VERSION = \"1.0.0'"), None);
    assert_eq!(declared_version("MY_VERSION = \"1.0.0\""), None);
    assert_eq!(declared_version("version = \"1.0.0\""), None);
}

#[test]
fn test_replace_keeps_other_bytes() {
    let content = "# frozen_string_literal: true\n\nmodule Gem\n  VERSION = '1.2.0'\n  OTHER_VERSION = \"9.9.9\"\nend\n";
    let updated = replace_version(content, &v("1.3.1")).unwrap();
    assert_eq!(
        updated,
        "# frozen_string_literal: true\n\nmodule Gem\n  VERSION = '1.3.1'\n  OTHER_VERSION = \"9.9.9\"\nend\n"
    );
}

#[test]
fn test_replace_only_first_assignment() {
    let content = "VERSION = \"1.0.0\"\nVERSION = \"1.0.0\"\n";
    let updated = replace_version(content, &v("2.0.0")).unwrap();
    assert_eq!(updated, "VERSION = \"2.0.0\"\nVERSION = \"1.0.0\"\n");
}

#[test]
fn test_find_prefers_one_level_match() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("lib/a/deep/er")).unwrap();
    fs::create_dir_all(root.join("lib/b")).unwrap();
    fs::write(root.join("lib/a/deep/er/version.rb"), "VERSION = \"9.0.0\"").unwrap();
    fs::write(root.join("lib/b/version.rb"), "VERSION = \"1.0.0\"").unwrap();

    let inspector = VersionInspector::new();
    let file = inspector.find_version_file(root).unwrap();
    assert_eq!(file, root.join("lib/b/version.rb"));
    assert_eq!(inspector.extract_version(&file), Some(v("1.0.0")));
}

#[test]
fn test_find_falls_back_to_recursive() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("lib/a/deep")).unwrap();
    fs::write(root.join("lib/a/deep/version.rb"), "VERSION = '3.1.4'").unwrap();

    let inspector = VersionInspector::new();
    assert_eq!(
        inspector.version_of(root).map(|(_, v)| v),
        Some(v("3.1.4"))
    );
}

#[test]
fn test_missing_or_unparsable_is_none() {
    let temp = TempDir::new().unwrap();
    let inspector = VersionInspector::new();
    assert!(inspector.find_version_file(temp.path()).is_none());

    fs::create_dir_all(temp.path().join("lib/x")).unwrap();
    fs::write(temp.path().join("lib/x/version.rb"), "VERSION = \"1.x.0\"").unwrap();
    assert!(inspector.version_of(temp.path()).is_none());
}

#[test]
fn test_write_version() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("version.rb");
    fs::write(&file, "VERSION = \"0.1.0\"\n").unwrap();

    let inspector = VersionInspector::new();
    assert!(inspector.write_version(&file, &v("0.2.0")).unwrap());
    assert_eq!(fs::read_to_string(&file).unwrap(), "VERSION = \"0.2.0\"\n");

    fs::write(&file, "# nothing here\n").unwrap();
    assert!(!inspector.write_version(&file, &v("0.2.0")).unwrap());
    assert_eq!(fs::read_to_string(&file).unwrap(), "# nothing here\n");
}

#[test]
fn test_plan_targets_highest() {
    let records = vec![record("a", "1.2.0"), record("b", "1.3.1")];
    let plan = SyncPlan::build(&records).unwrap();

    assert_eq!(plan.target_version, v("1.3.1"));
    assert_eq!(plan.source, "b");
    assert_eq!(
        plan.entries[0].1,
        SyncAction::Bump { from: v("1.2.0") }
    );
    assert_eq!(plan.entries[1].1, SyncAction::AlreadySatisfied);
    assert_eq!(plan.pending(), 1);
}

#[test]
fn test_highest_tie_keeps_first() {
    let records = vec![
        record("first", "2.0.0"),
        record("low", "1.0.0"),
        record("second", "2.0.0"),
    ];
    assert_eq!(
        SyncPlan::highest(&records).unwrap().repository_name,
        "first"
    );
}

#[test]
fn test_plan_empty() {
    assert!(SyncPlan::build(&[]).is_none());
}
