//! External command execution
//!
//! Every state-changing external invocation (transfers, transcodes) goes
//! through an [`Executor`]. In dry-run mode the command line is only printed;
//! in execute mode the process runs to completion with its output appended to
//! the session log.

use std::ffi::OsString;
use std::process::Command;

use crate::logging::*;
use crate::session_log::SessionLog;

/// Whether commands are simulated or actually run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
	DryRun,
	Execute,
}

impl RunMode {
	pub fn from_dry_run(dry_run: bool) -> Self {
		if dry_run {
			RunMode::DryRun
		} else {
			RunMode::Execute
		}
	}

	pub fn is_dry_run(self) -> bool {
		self == RunMode::DryRun
	}

	/// Prefix printed before a command rendering
	pub fn tag(self) -> &'static str {
		match self {
			RunMode::DryRun => "[DRYRUN]",
			RunMode::Execute => "[RUN]",
		}
	}
}

/// Result of one invocation; nothing but success or failure is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
	Success,
	/// Non-zero exit, or no exit code at all (spawn failure, signal)
	Failure { exit_code: Option<i32> },
}

impl ExecutionOutcome {
	pub fn is_success(self) -> bool {
		self == ExecutionOutcome::Success
	}
}

/// Capability to run an external command
///
/// Arguments are `OsString`s so local paths reach the child byte for byte,
/// whatever their encoding.
pub trait Executor {
	/// Run (or simulate) `argv`, where `argv[0]` is the program
	fn execute(&mut self, argv: &[OsString], mode: RunMode) -> ExecutionOutcome;
}

/// Quote one argument for a POSIX shell
///
/// Arguments made only of characters the shell treats literally are left as
/// they are; anything else is wrapped in single quotes.
pub fn shell_quote(arg: &str) -> String {
	if arg.is_empty() {
		return "''".to_string();
	}

	let is_safe = |c: char| c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c);
	if arg.chars().all(is_safe) {
		return arg.to_string();
	}

	format!("'{}'", arg.replace('\'', r#"'"'"'"#))
}

/// Shell-escaped, copy-pasteable rendering of a command line
///
/// Only used for display, so arguments that are not valid UTF-8 are
/// rendered lossily.
pub fn render_command(argv: &[OsString]) -> String {
	argv.iter().map(|a| shell_quote(&a.to_string_lossy())).collect::<Vec<_>>().join(" ")
}

/// Executor that spawns real processes
///
/// Owns the session log for the whole run; all child output is appended to
/// it and nothing from the child reaches the console.
#[derive(Debug)]
pub struct ProcessExecutor {
	log: SessionLog,
}

impl ProcessExecutor {
	pub fn new(log: SessionLog) -> Self {
		ProcessExecutor { log }
	}

	pub fn log(&self) -> &SessionLog {
		&self.log
	}

	fn spawn_and_wait(&self, argv: &[OsString]) -> ExecutionOutcome {
		let (program, args) = match argv.split_first() {
			Some(split) => split,
			None => {
				warn!("Refusing to run an empty command");
				return ExecutionOutcome::Failure { exit_code: None };
			}
		};

		let (stdout, stderr) = match self.log.child_stdio() {
			Ok(stdio) => stdio,
			Err(e) => {
				error!("{}", e);
				return ExecutionOutcome::Failure { exit_code: None };
			}
		};

		match Command::new(program).args(args).stdout(stdout).stderr(stderr).status() {
			Ok(status) if status.success() => ExecutionOutcome::Success,
			Ok(status) => {
				debug!("{} exited with {}", program.to_string_lossy(), status);
				ExecutionOutcome::Failure { exit_code: status.code() }
			}
			Err(e) => {
				error!("Failed to spawn '{}': {}", program.to_string_lossy(), e);
				ExecutionOutcome::Failure { exit_code: None }
			}
		}
	}
}

impl Executor for ProcessExecutor {
	fn execute(&mut self, argv: &[OsString], mode: RunMode) -> ExecutionOutcome {
		println!("{} {}", mode.tag(), render_command(argv));

		match mode {
			RunMode::DryRun => ExecutionOutcome::Success,
			RunMode::Execute => self.spawn_and_wait(argv),
		}
	}
}

/// A command seen by [`RecordingExecutor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
	pub argv: Vec<OsString>,
	pub mode: RunMode,
}

impl Invocation {
	pub fn program(&self) -> &str {
		self.argv.first().and_then(|a| a.to_str()).unwrap_or("")
	}

	pub fn has_arg(&self, arg: &str) -> bool {
		self.argv.iter().any(|a| a == arg)
	}
}

type FailurePredicate = Box<dyn Fn(&[OsString]) -> bool>;

/// Executor that records invocations instead of spawning anything
///
/// Every call succeeds unless a failure predicate matches the command.
#[derive(Default)]
pub struct RecordingExecutor {
	pub invocations: Vec<Invocation>,
	fail_when: Vec<FailurePredicate>,
}

impl RecordingExecutor {
	pub fn new() -> Self {
		Self::default()
	}

	/// Make matching commands report a non-zero exit
	pub fn fail_when(mut self, predicate: impl Fn(&[OsString]) -> bool + 'static) -> Self {
		self.fail_when.push(Box::new(predicate));
		self
	}

	/// Recorded invocations of one program
	pub fn calls_to(&self, program: &str) -> Vec<&Invocation> {
		self.invocations.iter().filter(|i| i.program() == program).collect()
	}
}

impl Executor for RecordingExecutor {
	fn execute(&mut self, argv: &[OsString], mode: RunMode) -> ExecutionOutcome {
		self.invocations.push(Invocation { argv: argv.to_vec(), mode });

		if self.fail_when.iter().any(|p| p(argv)) {
			ExecutionOutcome::Failure { exit_code: Some(1) }
		} else {
			ExecutionOutcome::Success
		}
	}
}

impl std::fmt::Debug for RecordingExecutor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RecordingExecutor")
			.field("invocations", &self.invocations)
			.field("fail_when", &self.fail_when.len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn argv(parts: &[&str]) -> Vec<OsString> {
		parts.iter().map(OsString::from).collect()
	}

	#[test]
	fn test_shell_quote() {
		assert_eq!(shell_quote("--archive"), "--archive");
		assert_eq!(shell_quote("nas:/volume1/a_b.wav"), "nas:/volume1/a_b.wav");
		assert_eq!(shell_quote(""), "''");
		assert_eq!(shell_quote("--exclude=_Original Audio/"), "'--exclude=_Original Audio/'");
		assert_eq!(shell_quote("it's"), r#"'it'"'"'s'"#);
		assert_eq!(shell_quote("*.pkf"), "'*.pkf'");
	}

	#[test]
	fn test_render_command() {
		let cmd = argv(&["rsync", "-e", "ssh -o ServerAliveInterval=10", "src/"]);
		assert_eq!(render_command(&cmd), "rsync -e 'ssh -o ServerAliveInterval=10' src/");
	}

	#[test]
	fn test_run_mode_tags() {
		assert_eq!(RunMode::from_dry_run(true).tag(), "[DRYRUN]");
		assert_eq!(RunMode::from_dry_run(false).tag(), "[RUN]");
		assert!(RunMode::DryRun.is_dry_run());
	}

	#[test]
	fn test_dry_run_never_spawns() {
		let dir = TempDir::new().unwrap();
		let log_path = dir.path().join("nessie.log");
		let mut executor = ProcessExecutor::new(SessionLog::open(&log_path).unwrap());

		let marker = dir.path().join("created");
		let outcome = executor.execute(
			&argv(&["touch", marker.to_str().unwrap()]),
			RunMode::DryRun,
		);

		assert!(outcome.is_success());
		assert!(!marker.exists());
		assert_eq!(std::fs::read_to_string(&log_path).unwrap(), "");
	}

	#[test]
	fn test_missing_program_fails() {
		let dir = TempDir::new().unwrap();
		let mut executor =
			ProcessExecutor::new(SessionLog::open(&dir.path().join("nessie.log")).unwrap());

		let outcome =
			executor.execute(&argv(&["nessie-no-such-program-xyz"]), RunMode::Execute);
		assert_eq!(outcome, ExecutionOutcome::Failure { exit_code: None });
	}

	#[test]
	fn test_empty_command_fails() {
		let dir = TempDir::new().unwrap();
		let mut executor =
			ProcessExecutor::new(SessionLog::open(&dir.path().join("nessie.log")).unwrap());
		assert!(!executor.execute(&[], RunMode::Execute).is_success());
	}

	#[test]
	fn test_recording_executor_failure_predicate() {
		let mut executor =
			RecordingExecutor::new().fail_when(|argv| argv.iter().any(|a| a == "--checksum"));

		assert!(executor.execute(&argv(&["rsync", "a/", "b"]), RunMode::Execute).is_success());
		assert!(!executor
			.execute(&argv(&["rsync", "a/", "b", "--checksum"]), RunMode::Execute)
			.is_success());

		assert_eq!(executor.calls_to("rsync").len(), 2);
		assert!(executor.invocations[1].has_arg("--checksum"));
	}
}

// vim: ts=4
