//! Error types for nessie operations

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::validation::ValidationError;

/// Main error type for archival runs
///
/// Every variant is fatal to the whole run: there is no retry and no per-job
/// isolation.
#[derive(Debug)]
pub enum SyncError {
	/// A required external tool is not resolvable on PATH
	MissingDependency { tool: String },

	/// Configuration could not be loaded
	Config(ConfigError),

	/// Input failed validation before any work started
	Validation(ValidationError),

	/// One or more files would exceed the remote path length budget
	PathLengthExceeded { max_bytes: usize, offending: Vec<PathBuf> },

	/// Sample rate query failed for an audio file
	ProbeFailed { path: PathBuf, message: String },

	/// The transcoder exited non-zero for an audio file
	TranscodeFailed { path: PathBuf },

	/// Moving an original into the reserved directory failed
	RelocateFailed { path: PathBuf, source: io::Error },

	/// A transfer pass exited non-zero
	TransferFailed { source_dir: String, destination: String, checksum: bool },

	/// The session log could not be opened or written
	LogFile { path: PathBuf, source: io::Error },

	/// A job failed; wraps the stage error with the job's name
	Job { name: String, source: Box<SyncError> },

	/// I/O error
	Io(io::Error),
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::MissingDependency { tool } => write!(f, "{} is not installed", tool),
			SyncError::Config(e) => write!(f, "Configuration error: {}", e),
			SyncError::Validation(e) => write!(f, "{}", e),
			SyncError::PathLengthExceeded { max_bytes, offending } => {
				write!(
					f,
					"{} file(s) exceed {} bytes of total path length on the remote system:",
					offending.len(),
					max_bytes
				)?;
				for path in offending {
					write!(f, "\n{}", path.display())?;
				}
				Ok(())
			}
			SyncError::ProbeFailed { path, message } => {
				write!(f, "Sample rate query failed for {}: {}", path.display(), message)
			}
			SyncError::TranscodeFailed { path } => {
				write!(f, "ffmpeg failed for file {}", path.display())
			}
			SyncError::RelocateFailed { path, source } => {
				write!(f, "Moving original file failed for {}: {}", path.display(), source)
			}
			SyncError::TransferFailed { source_dir, destination, checksum } => write!(
				f,
				"rsync failed for {} to {} with checksum={}",
				source_dir, destination, checksum
			),
			SyncError::LogFile { path, source } => {
				write!(f, "Cannot use log file {}: {}", path.display(), source)
			}
			SyncError::Job { name, source } => write!(f, "Job '{}' failed: {}", name, source),
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
		}
	}
}

impl Error for SyncError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			SyncError::Config(e) => Some(e),
			SyncError::Validation(e) => Some(e),
			SyncError::RelocateFailed { source, .. } => Some(source),
			SyncError::LogFile { source, .. } => Some(source),
			SyncError::Job { source, .. } => Some(source.as_ref()),
			SyncError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

impl From<ConfigError> for SyncError {
	fn from(e: ConfigError) -> Self {
		SyncError::Config(e)
	}
}

impl From<ValidationError> for SyncError {
	fn from(e: ValidationError) -> Self {
		SyncError::Validation(e)
	}
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
	/// Configuration file does not exist
	NotFound { path: PathBuf },

	/// Configuration file exists but could not be read
	ReadFailed { path: PathBuf, source: io::Error },

	/// Configuration file is malformed
	ParseFailed { path: PathBuf, message: String },

	/// A job record is structurally valid but has unusable values
	InvalidJob { job: String, source: ValidationError },
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::NotFound { path } => {
				write!(f, "Configuration file {} not found", path.display())
			}
			ConfigError::ReadFailed { path, source } => {
				write!(f, "Failed to read {}: {}", path.display(), source)
			}
			ConfigError::ParseFailed { path, message } => {
				write!(f, "Failed to parse {}: {}", path.display(), message)
			}
			ConfigError::InvalidJob { job, source } => write!(f, "Job '{}': {}", job, source),
		}
	}
}

impl Error for ConfigError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			ConfigError::ReadFailed { source, .. } => Some(source),
			ConfigError::InvalidJob { source, .. } => Some(source),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_path_length_error_lists_every_file() {
		let err = SyncError::PathLengthExceeded {
			max_bytes: 255,
			offending: vec![PathBuf::from("/a/one.wav"), PathBuf::from("/a/two.wav")],
		};
		let msg = err.to_string();
		assert!(msg.contains("255 bytes"));
		assert!(msg.contains("/a/one.wav"));
		assert!(msg.contains("/a/two.wav"));
	}

	#[test]
	fn test_job_error_names_job_and_cause() {
		let err = SyncError::Job {
			name: "projects".to_string(),
			source: Box::new(SyncError::TransferFailed {
				source_dir: "/src/".to_string(),
				destination: "nas:/dst".to_string(),
				checksum: true,
			}),
		};
		let msg = err.to_string();
		assert!(msg.contains("'projects'"));
		assert!(msg.contains("checksum=true"));
		assert!(err.source().is_some());
	}

	#[test]
	fn test_config_error_converts() {
		let err: SyncError = ConfigError::NotFound { path: PathBuf::from("config.json") }.into();
		assert!(matches!(err, SyncError::Config(_)));
		assert!(err.to_string().contains("config.json not found"));
	}
}

// vim: ts=4
