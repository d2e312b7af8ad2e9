// tests/integration_test.rs
mod common;

use common::{fixture, git_available};
use std::process::Command;

fn graft() -> Command {
    Command::new(env!("CARGO_BIN_EXE_git-graft"))
}

#[test]
fn test_git_graft_help() {
    let output = graft().arg("--help").output().expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("git-graft"));
    assert!(stdout.contains("last-release"));
    assert!(stdout.contains("rebase"));
}

#[test]
fn test_git_graft_version() {
    let output = graft().arg("--version").output().expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_subcommand_is_usage_error() {
    let output = graft().output().expect("Failed to execute command");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_last_release_command() {
    if !git_available() {
        eprintln!("git binary not found, skipping");
        return;
    }
    let fx = fixture(("d.txt", "d\n"));

    let output = graft()
        .arg("-C")
        .arg(&fx.work)
        .args(["--no-fetch", "last-release", "master"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.trim(), "v/master/0.0.10");
}

#[test]
fn test_several_repositories_are_labelled() {
    if !git_available() {
        eprintln!("git binary not found, skipping");
        return;
    }
    let first = fixture(("d.txt", "d\n"));
    let second = fixture(("e.txt", "e\n"));

    let output = graft()
        .arg("-C")
        .arg(&first.work)
        .arg("-C")
        .arg(&second.work)
        .args(["--jobs", "2", "--no-fetch", "branches", "--remote", "origin"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(&first.work.display().to_string()));
    assert!(stdout.contains(&second.work.display().to_string()));
    assert!(stdout.contains("  - DEV_BRANCH"));
    assert!(stdout.contains("✓"));
    assert!(stdout.contains("2 done"));
}

#[test]
fn test_failure_sets_exit_code() {
    let dir = tempfile::tempdir().unwrap();

    let output = graft()
        .arg("-C")
        .arg(dir.path())
        .args(["--no-fetch", "describe", "no-such-revision"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("ERROR:"));
}
