//! Top-level audio transcoding
//!
//! Audio files sitting directly in a job's source directory are re-encoded
//! to 320k stereo AAC next to the original. The original then moves into
//! [`ORIGINAL_AUDIO_DIR`], which stays local: the transfer always excludes it.

use globset::{GlobBuilder, GlobMatcher};
use serde::Deserialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use filetime::FileTime;

use crate::error::SyncError;
use crate::executor::{render_command, Executor, RunMode};
use crate::logging::*;

/// Reserved subdirectory for pre-transcode originals
pub const ORIGINAL_AUDIO_DIR: &str = "_Original Audio";

pub const TRANSCODE_PROGRAM: &str = "ffmpeg";
pub const PROBE_PROGRAM: &str = "ffprobe";

/// Inputs above this rate are downsampled to it; lower rates are kept
pub const MAX_OUTPUT_SAMPLE_RATE: u32 = 48_000;

const AUDIO_PATTERN: &str = "*.{wav,aiff,m4a}";
const OUTPUT_EXTENSION: &str = "aac";

/// Capability to read an audio file's sample rate
///
/// Probing only reads the file. It runs in dry-run mode as well and does not
/// go through the [`Executor`], since the transcode command cannot be built
/// without the rate.
pub trait SampleRateProbe {
	fn sample_rate(&self, path: &Path) -> Result<u32, SyncError>;
}

/// Probe backed by `ffprobe` JSON output
#[derive(Debug, Default, Clone, Copy)]
pub struct FfprobeProbe;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
	#[serde(default)]
	streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
	sample_rate: Option<serde_json::Value>,
}

/// Extract the first audio stream's sample rate from ffprobe JSON
///
/// ffprobe reports the rate as a string; a bare number is accepted too.
pub fn parse_probe_output(json: &[u8]) -> Result<u32, String> {
	let output: ProbeOutput =
		serde_json::from_slice(json).map_err(|e| format!("invalid ffprobe output: {}", e))?;

	let rate = output
		.streams
		.first()
		.and_then(|s| s.sample_rate.as_ref())
		.ok_or_else(|| "no audio stream with a sample rate".to_string())?;

	match rate {
		serde_json::Value::String(s) => {
			s.trim().parse().map_err(|_| format!("unparseable sample rate '{}'", s))
		}
		serde_json::Value::Number(n) => n
			.as_u64()
			.and_then(|n| u32::try_from(n).ok())
			.ok_or_else(|| format!("unparseable sample rate {}", n)),
		other => Err(format!("unexpected sample rate value {}", other)),
	}
}

impl SampleRateProbe for FfprobeProbe {
	fn sample_rate(&self, path: &Path) -> Result<u32, SyncError> {
		let output = Command::new(PROBE_PROGRAM)
			.args(["-v", "error", "-select_streams", "a:0"])
			.args(["-show_entries", "stream=sample_rate", "-of", "json"])
			.arg(path)
			.output()
			.map_err(|e| SyncError::ProbeFailed {
				path: path.to_path_buf(),
				message: format!("failed to run {}: {}", PROBE_PROGRAM, e),
			})?;

		if !output.status.success() {
			return Err(SyncError::ProbeFailed {
				path: path.to_path_buf(),
				message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
			});
		}

		parse_probe_output(&output.stdout)
			.map_err(|message| SyncError::ProbeFailed { path: path.to_path_buf(), message })
	}
}

/// Case-insensitive matcher for transcodable file names
fn audio_matcher() -> Result<GlobMatcher, SyncError> {
	let glob = GlobBuilder::new(AUDIO_PATTERN).case_insensitive(true).build().map_err(|e| {
		SyncError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))
	})?;
	Ok(glob.compile_matcher())
}

/// Regular files directly inside `dir` that should be transcoded, by name
pub fn find_top_level_audio(dir: &Path) -> Result<Vec<PathBuf>, SyncError> {
	let matcher = audio_matcher()?;
	let mut found = Vec::new();

	for entry in fs::read_dir(dir)? {
		let entry = entry?;
		if !entry.file_type()?.is_file() {
			continue;
		}
		if matcher.is_match(entry.file_name()) {
			found.push(entry.path());
		}
	}

	found.sort();
	Ok(found)
}

/// Sibling path for the encoded file: same stem, `.aac`
pub fn aac_output_path(input: &Path) -> PathBuf {
	input.with_extension(OUTPUT_EXTENSION)
}

/// ffmpeg command re-encoding `input` to `output`
pub fn transcode_command(input: &Path, output: &Path, input_sample_rate: u32) -> Vec<OsString> {
	let mut argv: Vec<OsString> =
		vec![TRANSCODE_PROGRAM.into(), "-y".into(), "-i".into(), input.into()];
	argv.extend(["-c:a", "aac", "-b:a", "320k"].iter().map(OsString::from));
	// Field recorders write 4-channel files; keep the first two
	argv.extend(["-ac", "2"].iter().map(OsString::from));

	if input_sample_rate > MAX_OUTPUT_SAMPLE_RATE {
		argv.push("-ar".into());
		argv.push(MAX_OUTPUT_SAMPLE_RATE.to_string().into());
	}

	argv.push(output.into());
	argv
}

/// Copy the original's access and modification times onto the output
///
/// Where the platform records a creation time, the output's is pulled back
/// to the original's first: setting an mtime older than the birth time
/// moves the birth time with it on macOS.
pub fn preserve_timestamps(original: &Path, output: &Path) -> Result<(), SyncError> {
	let meta = fs::metadata(original)?;
	let atime = FileTime::from_last_access_time(&meta);
	let mtime = FileTime::from_last_modification_time(&meta);

	if let Some(created) = FileTime::from_creation_time(&meta) {
		if created < mtime {
			filetime::set_file_times(output, atime, created)?;
		}
	}

	filetime::set_file_times(output, atime, mtime)?;
	Ok(())
}

/// Move `original` into `originals_dir`
fn relocate_original(original: &Path, originals_dir: &Path, mode: RunMode) -> Result<(), SyncError> {
	let argv: Vec<OsString> = vec!["mv".into(), original.into(), originals_dir.into()];
	println!("{} {}", mode.tag(), render_command(&argv));

	if mode.is_dry_run() {
		return Ok(());
	}

	let file_name = original.file_name().ok_or_else(|| SyncError::RelocateFailed {
		path: original.to_path_buf(),
		source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
	})?;

	fs::rename(original, originals_dir.join(file_name))
		.map_err(|e| SyncError::RelocateFailed { path: original.to_path_buf(), source: e })
}

/// Result of one transcoding pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscodeSummary {
	pub files_processed: usize,
}

/// Transcode every audio file directly inside `source_dir`
///
/// Stops at the first probe, transcode or relocation failure.
pub fn transcode_top_level_audio<E, P>(
	executor: &mut E,
	probe: &P,
	source_dir: &Path,
	mode: RunMode,
) -> Result<TranscodeSummary, SyncError>
where
	E: Executor + ?Sized,
	P: SampleRateProbe + ?Sized,
{
	let originals_dir = source_dir.join(ORIGINAL_AUDIO_DIR);
	if !mode.is_dry_run() {
		fs::create_dir_all(&originals_dir)?;
	}

	println!("Starting conversion of audio...");
	let mut summary = TranscodeSummary::default();

	for input in find_top_level_audio(source_dir)? {
		let output = aac_output_path(&input);
		let rate = probe.sample_rate(&input)?;
		debug!("{}: {} Hz", input.display(), rate);

		let argv = transcode_command(&input, &output, rate);
		if !executor.execute(&argv, mode).is_success() {
			return Err(SyncError::TranscodeFailed { path: input });
		}

		if !mode.is_dry_run() {
			preserve_timestamps(&input, &output)?;
		}

		relocate_original(&input, &originals_dir, mode)?;
		summary.files_processed += 1;
	}

	if summary.files_processed > 0 || mode.is_dry_run() {
		println!("Conversion process completed: {} audio files", summary.files_processed);
	}
	Ok(summary)
}


// vim: ts=4
