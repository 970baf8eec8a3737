//! Job configuration
//!
//! The configuration file is a mapping from job name to job settings:
//!
//! ```json
//! {
//!     "projects": {
//!         "local": "/Volumes/Media/Projects",
//!         "remote": "nas:/volume1/Archive/Projects",
//!         "remote_rsync_path": "/usr/bin/rsync",
//!         "compress_top_level_audio": true
//!     },
//!     "lessons": { "local": "/Volumes/Media/Lessons", "remote": "nas:/volume1/Lessons", "skip": true }
//! }
//! ```
//!
//! JSON files are read with `json5`, so comments and trailing commas are
//! accepted. A `.toml` path is read as TOML with one table per job. Either
//! way, jobs keep the order they have in the file, since that order is the
//! execution order.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::validation::{validate_directory, validate_remote_tool_path, ValidationError, Validator};

/// Config file read when `NESSIE_CONFIG` is not set
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "NESSIE_CONFIG";

/// rsync invocation name on the remote host when a job sets none
pub const DEFAULT_REMOTE_RSYNC_PATH: &str = "rsync";

/// Job settings as they appear in the file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobSettings {
	local: String,
	remote: String,
	#[serde(default)]
	remote_rsync_path: Option<String>,
	#[serde(default)]
	compress_top_level_audio: bool,
	#[serde(default)]
	skip: bool,
}

/// One archival task: mirror `local_path` into `remote_path`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
	/// Configuration key, only used in diagnostics
	pub name: String,
	pub local_path: PathBuf,
	/// Destination in rsync syntax, e.g. `host:/path` or a local mount
	pub remote_path: String,
	/// rsync path on the remote host, if it is not plain `rsync`
	pub remote_transfer_tool_path: Option<String>,
	pub skip: bool,
	/// Transcode top-level audio before transferring
	pub compress_audio: bool,
}

impl Job {
	pub fn new(name: impl Into<String>, local: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
		Job {
			name: name.into(),
			local_path: local.into(),
			remote_path: remote.into(),
			remote_transfer_tool_path: None,
			skip: false,
			compress_audio: false,
		}
	}

	pub fn with_remote_rsync_path(mut self, path: impl Into<String>) -> Self {
		self.remote_transfer_tool_path = Some(path.into());
		self
	}

	pub fn with_skip(mut self, skip: bool) -> Self {
		self.skip = skip;
		self
	}

	pub fn with_compress_audio(mut self, compress: bool) -> Self {
		self.compress_audio = compress;
		self
	}

	/// rsync path to pass to the remote side
	pub fn remote_tool(&self) -> &str {
		self.remote_transfer_tool_path.as_deref().unwrap_or(DEFAULT_REMOTE_RSYNC_PATH)
	}

	fn from_settings(name: String, settings: JobSettings) -> Self {
		Job {
			name,
			local_path: PathBuf::from(settings.local),
			remote_path: settings.remote,
			remote_transfer_tool_path: settings.remote_rsync_path,
			skip: settings.skip,
			compress_audio: settings.compress_top_level_audio,
		}
	}
}

impl Validator for Job {
	fn validate(&self) -> Result<(), ValidationError> {
		validate_directory("local", &self.local_path.to_string_lossy())?;
		validate_directory("remote", &self.remote_path)?;
		validate_remote_tool_path(self.remote_transfer_tool_path.as_deref())
	}
}

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
	Json,
	Toml,
}

impl ConfigFormat {
	/// Pick the format from the file extension; anything but `.toml` is JSON
	pub fn from_path(path: &Path) -> Self {
		match path.extension().and_then(|e| e.to_str()) {
			Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
			_ => ConfigFormat::Json,
		}
	}
}

/// All configured jobs, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveConfig {
	pub jobs: Vec<Job>,
}

impl<'de> Deserialize<'de> for ArchiveConfig {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		struct JobsVisitor;

		impl<'de> Visitor<'de> for JobsVisitor {
			type Value = Vec<Job>;

			fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str("a map of job names to job settings")
			}

			fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
			where
				A: MapAccess<'de>,
			{
				let mut seen = HashSet::new();
				let mut jobs = Vec::with_capacity(map.size_hint().unwrap_or(0));
				while let Some((name, settings)) = map.next_entry::<String, JobSettings>()? {
					if !seen.insert(name.clone()) {
						return Err(de::Error::custom(format!("duplicate job `{}`", name)));
					}
					jobs.push(Job::from_settings(name, settings));
				}
				Ok(jobs)
			}
		}

		let jobs = deserializer.deserialize_map(JobsVisitor)?;
		Ok(ArchiveConfig { jobs })
	}
}

impl ArchiveConfig {
	/// Path of the configuration file for this process
	pub fn resolve_path() -> PathBuf {
		Self::path_from_override(std::env::var_os(CONFIG_ENV_VAR))
	}

	/// Config path given the value of `NESSIE_CONFIG`; unset or empty means the default
	pub fn path_from_override(value: Option<OsString>) -> PathBuf {
		value
			.filter(|v| !v.is_empty())
			.map(PathBuf::from)
			.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
	}

	/// Read, parse and validate a configuration file
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		if !path.exists() {
			return Err(ConfigError::NotFound { path: path.to_path_buf() });
		}

		let text = std::fs::read_to_string(path)
			.map_err(|e| ConfigError::ReadFailed { path: path.to_path_buf(), source: e })?;

		let config = Self::parse(&text, ConfigFormat::from_path(path))
			.map_err(|message| ConfigError::ParseFailed { path: path.to_path_buf(), message })?;

		config.validate_jobs()?;
		Ok(config)
	}

	/// Parse configuration text without validating field values
	pub fn parse(text: &str, format: ConfigFormat) -> Result<Self, String> {
		match format {
			ConfigFormat::Json => json5::from_str(text).map_err(|e| e.to_string()),
			ConfigFormat::Toml => toml::from_str(text).map_err(|e| e.to_string()),
		}
	}

	/// Check every job's values once, so bad settings surface before any work
	pub fn validate_jobs(&self) -> Result<(), ConfigError> {
		for job in &self.jobs {
			job.validate()
				.map_err(|e| ConfigError::InvalidJob { job: job.name.clone(), source: e })?;
		}
		Ok(())
	}

	/// Jobs that will actually run
	pub fn active_jobs(&self) -> impl Iterator<Item = &Job> {
		self.jobs.iter().filter(|j| !j.skip)
	}
}


// vim: ts=4
