use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

fn cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gpx-cleaner"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn dir_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_success() {
    let dir = tempdir().unwrap();
    fs::copy("tests/fixtures/basic/duplicates.gpx", dir.path().join("walk.gpx")).unwrap();

    let out = cli(&["2", dir_arg(dir.path())]);
    assert_eq!(out.status.code(), Some(0));
    assert!(
        dir.path()
            .join("output/walk.cleaned_every2ndDiffTrkpt.gpx")
            .is_file()
    );
}

#[test]
fn test_elevation_offset_flag() {
    let dir = tempdir().unwrap();
    fs::copy("tests/fixtures/basic/duplicates.gpx", dir.path().join("walk.gpx")).unwrap();

    let out = cli(&["1", dir_arg(dir.path()), "--elevation-offset", "-5"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(dir.path().join("output/walk.cleaned_elevatedBy-5m.gpx").is_file());
}

#[test]
fn test_skipped_file_still_succeeds() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("broken.gpx"), "<gpx><trk>").unwrap();

    let out = cli(&["1", dir_arg(dir.path())]);
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn test_argument_errors_exit_one() {
    let dir = tempdir().unwrap();
    let path = dir_arg(dir.path());

    assert_eq!(cli(&[]).status.code(), Some(1));
    assert_eq!(cli(&["2"]).status.code(), Some(1));
    assert_eq!(cli(&["2", path, "extra"]).status.code(), Some(1));
    assert_eq!(cli(&["0", path]).status.code(), Some(1));
    assert_eq!(cli(&["two", path]).status.code(), Some(1));
    assert_eq!(cli(&["1.5", path]).status.code(), Some(1));
    assert_eq!(cli(&["1", path, "--elevation-offset", "inf"]).status.code(), Some(1));
}

#[test]
fn test_missing_directory_exits_one() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing");

    let out = cli(&["1", dir_arg(&missing)]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("can't find directory"));
}

#[test]
fn test_help_exits_zero() {
    assert_eq!(cli(&["--help"]).status.code(), Some(0));
}

#[test]
fn test_version_exits_zero() {
    let out = cli(&["--version"]);
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}
