//! Process executor tests against real processes
//!
//! These spawn small shell commands and check that:
//! 1. Success is reported if and only if the exit code is zero
//! 2. Child stdout and stderr land in the session log, in order
//! 3. Arguments reach the child byte for byte
//! 4. Dry runs never spawn and never write to the log
#![cfg(unix)]

use std::ffi::{OsStr, OsString};
use std::fs;
use std::os::unix::ffi::OsStrExt;
use tempfile::TempDir;

use nessie::executor::{ExecutionOutcome, Executor, ProcessExecutor, RunMode};
use nessie::session_log::SessionLog;

fn sh(script: &str) -> Vec<OsString> {
	vec!["sh".into(), "-c".into(), script.into()]
}

fn executor_in(dir: &TempDir) -> ProcessExecutor {
	ProcessExecutor::new(SessionLog::open(&dir.path().join("nessie.log")).unwrap())
}

#[test]
fn test_exit_code_decides_outcome() {
	let dir = TempDir::new().unwrap();
	let mut executor = executor_in(&dir);

	assert_eq!(executor.execute(&sh("exit 0"), RunMode::Execute), ExecutionOutcome::Success);
	assert_eq!(
		executor.execute(&sh("exit 3"), RunMode::Execute),
		ExecutionOutcome::Failure { exit_code: Some(3) }
	);
	assert!(!executor.execute(&[OsString::from("false")], RunMode::Execute).is_success());
}

#[test]
fn test_output_is_appended_to_log() {
	let dir = TempDir::new().unwrap();
	let log_path = dir.path().join("nessie.log");
	let mut executor = ProcessExecutor::new(SessionLog::start(&log_path).unwrap());

	executor.execute(&sh("echo first; echo oops >&2"), RunMode::Execute);
	executor.execute(&sh("echo second"), RunMode::Execute);

	let contents = fs::read_to_string(&log_path).unwrap();
	let lines: Vec<_> = contents.lines().collect();
	assert!(lines[0].starts_with("==== "), "Session header comes first");
	assert_eq!(&lines[1..], &["first", "oops", "second"]);
}

#[test]
fn test_failed_command_output_still_logged() {
	let dir = TempDir::new().unwrap();
	let mut executor = executor_in(&dir);

	let outcome = executor.execute(&sh("echo 'rsync error: some files' >&2; exit 23"), RunMode::Execute);

	assert_eq!(outcome, ExecutionOutcome::Failure { exit_code: Some(23) });
	let contents = fs::read_to_string(dir.path().join("nessie.log")).unwrap();
	assert!(contents.contains("rsync error: some files"));
}

#[test]
fn test_non_utf8_argument_reaches_child() {
	let dir = TempDir::new().unwrap();
	let target = dir.path().join(OsStr::from_bytes(b"caf\xe9"));
	// Some filesystems refuse non-UTF-8 names; nothing to check then.
	if fs::create_dir(&target).is_err() {
		return;
	}
	let mut executor = executor_in(&dir);

	let mut argv = sh("test -d \"$1\"");
	argv.push("sh".into());
	argv.push(target.into_os_string());

	assert!(executor.execute(&argv, RunMode::Execute).is_success());
}

#[test]
fn test_dry_run_has_no_side_effects() {
	let dir = TempDir::new().unwrap();
	let mut executor = executor_in(&dir);
	let target = dir.path().join("should-not-exist");

	let outcome = executor.execute(
		&sh(&format!("echo hi; touch '{}'; exit 1", target.display())),
		RunMode::DryRun,
	);

	assert!(outcome.is_success());
	assert!(!target.exists());
	assert_eq!(fs::read_to_string(dir.path().join("nessie.log")).unwrap(), "");
}

// vim: ts=4
