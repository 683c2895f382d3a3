//! Exit status and usage output of the `webarena-fleet` binary.

use std::process::{Command, Output};

fn fleet(args: &[&str]) -> Output {
    let dir = tempfile::tempdir().unwrap();
    Command::new(env!("CARGO_BIN_EXE_webarena-fleet"))
        .args(args)
        .current_dir(dir.path())
        .env_remove("FLEET_CONFIG")
        .env_remove("FLEET_WORKERS")
        .output()
        .expect("failed to run webarena-fleet")
}

#[test]
fn test_run_with_two_arguments_exits_one() {
    let output = fleet(&["run", "0", "10"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage:"), "stderr: {}", stderr);
    assert!(stderr.contains("<RESULT_DIR>"), "stderr: {}", stderr);
    assert!(output.stdout.is_empty());
}

#[test]
fn test_run_with_extra_argument_exits_one() {
    let output = fleet(&["run", "0", "10", "out", "extra", "--dry-run"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage:"));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_help_exits_zero() {
    let output = fleet(&["run", "--help"]);

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage:"));
}
