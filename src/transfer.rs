//! rsync invocation for one source/destination pair
//!
//! A job is transferred in two passes over the same pair. The fast pass lets
//! rsync decide what changed from size and modification time. The checksum
//! pass repeats the scan with `--checksum`, so any file whose content differs
//! despite matching size and mtime (or that was damaged in the first pass) is
//! sent again. Both passes use `--update`, so a newer file on the destination
//! is never overwritten.
//!
//! The rsync policy is fixed; only the pass, the dry-run flag and the remote
//! rsync path vary.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::error::SyncError;
use crate::executor::{Executor, RunMode};
use crate::logging::*;
use crate::transcode::ORIGINAL_AUDIO_DIR;

/// Local transfer program
pub const TRANSFER_PROGRAM: &str = "rsync";

/// Remote shell; the keep-alive is the only liveness check on a hung transfer
pub const SSH_TRANSPORT: &str = "ssh -o ServerAliveInterval=10";

/// One of the two transfer passes, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPass {
	/// Size and mtime heuristics only
	Fast,
	/// Byte-level comparison
	Checksum,
}

impl TransferPass {
	/// Passes in the order they must run
	pub const SEQUENCE: [TransferPass; 2] = [TransferPass::Fast, TransferPass::Checksum];

	pub fn checksum(self) -> bool {
		self == TransferPass::Checksum
	}
}

/// Source, destination and remote tool for one job's transfer
#[derive(Debug, Clone, Copy)]
pub struct TransferRequest<'a> {
	pub source: &'a Path,
	pub destination: &'a str,
	pub remote_tool: &'a str,
}

/// A fully built rsync command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferInvocation {
	pub argv: Vec<OsString>,
	pub checksum: bool,
	pub dry_run: bool,
}

/// Give `source` exactly one trailing `/` so rsync copies its contents
///
/// Works on path components, so names that are not valid UTF-8 pass
/// through untouched.
pub fn contents_source(source: &Path) -> OsString {
	let trimmed: PathBuf = source.components().collect();
	let mut contents = trimmed.into_os_string();
	if !matches!(source.components().last(), Some(Component::RootDir) | None) {
		contents.push("/");
	}
	contents
}

/// Build the rsync command for one pass
pub fn build_transfer_command(
	request: &TransferRequest<'_>,
	pass: TransferPass,
	mode: RunMode,
) -> TransferInvocation {
	let mut argv: Vec<OsString> = vec![TRANSFER_PROGRAM.into()];

	// Simulation flag goes right after the program; itemization stays on.
	if mode.is_dry_run() {
		argv.push("--dry-run".into());
	}

	argv.extend(
		[
			"-e",
			SSH_TRANSPORT,
			"--verbose",
			"--itemize-changes",
			"--update",
		]
		.iter()
		.map(OsString::from),
	);
	argv.push(format!("--rsync-path={}", request.remote_tool).into());
	argv.extend(
		[
			"--archive",
			"--human-readable",
			"--progress",
			"--partial",
			"--exclude",
			".DS_Store",
			// Left behind by drive recovery tools
			"--exclude",
			"DS_Store",
			"--exclude=*.pkf",
			"--exclude=*.reapeaks",
		]
		.iter()
		.map(OsString::from),
	);
	argv.push(format!("--exclude={}/", ORIGINAL_AUDIO_DIR).into());
	argv.push(contents_source(request.source));
	argv.push(request.destination.into());

	if pass.checksum() {
		argv.push("--checksum".into());
	}

	TransferInvocation { argv, checksum: pass.checksum(), dry_run: mode.is_dry_run() }
}

/// Run one transfer pass
///
/// rsync always runs through the executor. In dry-run mode the command
/// carries `--dry-run` and the executor only prints it.
pub fn run_transfer<E: Executor + ?Sized>(
	executor: &mut E,
	request: &TransferRequest<'_>,
	pass: TransferPass,
	mode: RunMode,
) -> Result<(), SyncError> {
	let invocation = build_transfer_command(request, pass, mode);
	info!(
		"rsync {} -> {} (checksum={})",
		request.source.display(),
		request.destination,
		invocation.checksum
	);

	if executor.execute(&invocation.argv, mode).is_success() {
		Ok(())
	} else {
		Err(SyncError::TransferFailed {
			source_dir: contents_source(request.source).to_string_lossy().into_owned(),
			destination: request.destination.to_string(),
			checksum: invocation.checksum,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::executor::RecordingExecutor;

	fn request() -> TransferRequest<'static> {
		TransferRequest {
			source: Path::new("/Volumes/Media/Projects"),
			destination: "nas:/volume1/Archive/Projects",
			remote_tool: "/usr/bin/rsync",
		}
	}

	#[test]
	fn test_contents_source() {
		assert_eq!(contents_source(Path::new("/a/b")), "/a/b/");
		assert_eq!(contents_source(Path::new("/a/b/")), "/a/b/");
		assert_eq!(contents_source(Path::new("/a/b//")), "/a/b/");
		assert_eq!(contents_source(Path::new("relative/dir")), "relative/dir/");
		assert_eq!(contents_source(Path::new("/")), "/");
	}

	#[cfg(unix)]
	#[test]
	fn test_contents_source_keeps_raw_bytes() {
		use std::ffi::OsStr;
		use std::os::unix::ffi::{OsStrExt, OsStringExt};

		let source = Path::new(OsStr::from_bytes(b"/media/caf\xe9"));
		assert_eq!(contents_source(source).into_vec(), b"/media/caf\xe9/".to_vec());
	}

	#[test]
	fn test_fast_pass_arguments() {
		let inv = build_transfer_command(&request(), TransferPass::Fast, RunMode::Execute);
		let expected: Vec<OsString> = [
			"rsync",
			"-e",
			"ssh -o ServerAliveInterval=10",
			"--verbose",
			"--itemize-changes",
			"--update",
			"--rsync-path=/usr/bin/rsync",
			"--archive",
			"--human-readable",
			"--progress",
			"--partial",
			"--exclude",
			".DS_Store",
			"--exclude",
			"DS_Store",
			"--exclude=*.pkf",
			"--exclude=*.reapeaks",
			"--exclude=_Original Audio/",
			"/Volumes/Media/Projects/",
			"nas:/volume1/Archive/Projects",
		]
		.iter()
		.map(OsString::from)
		.collect();

		assert_eq!(inv.argv, expected);
		assert!(!inv.checksum);
		assert!(!inv.dry_run);
	}

	#[test]
	fn test_checksum_pass_only_adds_flag() {
		let fast = build_transfer_command(&request(), TransferPass::Fast, RunMode::Execute);
		let verify = build_transfer_command(&request(), TransferPass::Checksum, RunMode::Execute);

		assert_eq!(verify.argv.last().and_then(|a| a.to_str()), Some("--checksum"));
		assert_eq!(&verify.argv[..verify.argv.len() - 1], &fast.argv[..]);
	}

	#[test]
	fn test_dry_run_flag_follows_program() {
		let inv = build_transfer_command(&request(), TransferPass::Checksum, RunMode::DryRun);
		assert_eq!(inv.argv[0], "rsync");
		assert_eq!(inv.argv[1], "--dry-run");
		assert!(inv.argv.iter().any(|a| a == "--itemize-changes"));
		assert!(inv.dry_run);

		let real = build_transfer_command(&request(), TransferPass::Checksum, RunMode::Execute);
		let mut without_flag = inv.argv.clone();
		without_flag.remove(1);
		assert_eq!(without_flag, real.argv);
	}

	#[test]
	fn test_failed_pass_reports_pair() {
		let mut executor = RecordingExecutor::new().fail_when(|_| true);
		let err = run_transfer(&mut executor, &request(), TransferPass::Checksum, RunMode::Execute)
			.unwrap_err();

		match err {
			SyncError::TransferFailed { source_dir, destination, checksum } => {
				assert_eq!(source_dir, "/Volumes/Media/Projects/");
				assert_eq!(destination, "nas:/volume1/Archive/Projects");
				assert!(checksum);
			}
			other => panic!("unexpected error: {}", other),
		}
	}

	#[test]
	fn test_pass_sequence() {
		assert_eq!(TransferPass::SEQUENCE.map(TransferPass::checksum), [false, true]);
	}
}

// vim: ts=4
