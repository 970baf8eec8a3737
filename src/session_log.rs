//! Append-only session log
//!
//! One file collects the raw output of every external process the run
//! spawns. It is opened once at startup, never truncated, and starts each
//! session with a timestamp header.

use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::error::SyncError;

/// Log file location, relative to the working directory
pub const DEFAULT_LOG_PATH: &str = "nessie.log";

pub struct SessionLog {
	path: PathBuf,
	file: File,
}

impl SessionLog {
	/// Open (or create) the log in append mode
	pub fn open(path: &Path) -> Result<Self, SyncError> {
		let file = OpenOptions::new()
			.create(true)
			.append(true)
			.open(path)
			.map_err(|e| SyncError::LogFile { path: path.to_path_buf(), source: e })?;
		Ok(SessionLog { path: path.to_path_buf(), file })
	}

	/// Open the log and write the session header for the current time
	pub fn start(path: &Path) -> Result<Self, SyncError> {
		let mut log = Self::open(path)?;
		log.write_header(Local::now())?;
		Ok(log)
	}

	pub fn write_header(&mut self, at: DateTime<Local>) -> Result<(), SyncError> {
		writeln!(self.file, "==== {} ====", at.format("%Y-%m-%d %H:%M:%S"))
			.map_err(|e| SyncError::LogFile { path: self.path.clone(), source: e })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Handles for a child's stdout and stderr, both appending to the log
	pub fn child_stdio(&self) -> Result<(Stdio, Stdio), SyncError> {
		let clone = || {
			self.file
				.try_clone()
				.map_err(|e| SyncError::LogFile { path: self.path.clone(), source: e })
		};
		Ok((Stdio::from(clone()?), Stdio::from(clone()?)))
	}
}

impl std::fmt::Debug for SessionLog {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionLog").field("path", &self.path).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;
	use tempfile::TempDir;

	#[test]
	fn test_header_format() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("nessie.log");
		let mut log = SessionLog::open(&path).unwrap();
		let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
		log.write_header(at).unwrap();

		assert_eq!(std::fs::read_to_string(&path).unwrap(), "==== 2024-03-09 07:05:01 ====\n");
	}

	#[test]
	fn test_log_is_never_truncated() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("nessie.log");
		std::fs::write(&path, "previous session\n").unwrap();

		drop(SessionLog::start(&path).unwrap());
		drop(SessionLog::start(&path).unwrap());

		let contents = std::fs::read_to_string(&path).unwrap();
		assert!(contents.starts_with("previous session\n"));
		assert_eq!(contents.matches("==== ").count(), 2);
	}

	#[test]
	fn test_open_in_missing_directory_fails() {
		let dir = TempDir::new().unwrap();
		let result = SessionLog::open(&dir.path().join("no/such/dir/nessie.log"));
		assert!(matches!(result, Err(SyncError::LogFile { .. })));
	}
}

// vim: ts=4
