//! Remote path length prediction
//!
//! Before anything is transferred, every regular file under a job's local
//! root is relocated under the remote root and the resulting path is measured
//! in UTF-8 bytes. The whole path is compared against the budget, not each
//! component, which over-approximates what most filesystems enforce.

use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;

use super::ValidationError;
use crate::logging::*;

/// Default byte budget for a relocated remote path
pub const DEFAULT_MAX_PATH_BYTES: usize = 255;

/// A local file paired with the path it would have on the remote side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
	pub local_path: PathBuf,
	pub remote_path: String,
}

impl CandidateFile {
	/// Length of the remote path once encoded as UTF-8
	pub fn encoded_len(&self) -> usize {
		self.remote_path.len()
	}
}

/// Outcome of a path length pass over one local tree
#[derive(Debug, Clone)]
pub struct PathLengthReport {
	pub max_bytes: usize,
	pub files_checked: usize,
	/// Every file whose relocated path is over budget, in walk order
	pub offending: Vec<CandidateFile>,
}

impl PathLengthReport {
	pub fn passed(&self) -> bool {
		self.offending.is_empty()
	}

	/// Local paths of the offending files
	pub fn offending_paths(&self) -> Vec<PathBuf> {
		self.offending.iter().map(|c| c.local_path.clone()).collect()
	}
}

/// Lexically normalize a slash-separated path
///
/// Collapses repeated separators, drops `.` segments and resolves `..`
/// against the preceding segment. A leading `/` is kept and `..` never climbs
/// above it. Nothing touches the filesystem, so this works for paths on the
/// remote host, including `host:/path` forms.
pub fn normalize_lexical(path: &str) -> String {
	if path.is_empty() {
		return ".".to_string();
	}

	let absolute = path.starts_with('/');
	let mut segments: Vec<&str> = Vec::new();

	for segment in path.split('/') {
		match segment {
			"" | "." => {}
			".." => match segments.last() {
				Some(&last) if last != ".." => {
					segments.pop();
				}
				_ if absolute => {}
				_ => segments.push(".."),
			},
			other => segments.push(other),
		}
	}

	let joined = segments.join("/");
	match (absolute, joined.is_empty()) {
		(true, _) => format!("/{}", joined),
		(false, true) => ".".to_string(),
		(false, false) => joined,
	}
}

/// Render a relative local path with `/` separators
///
/// Names that are not valid UTF-8 are decoded lossily; invalid sequences
/// become U+FFFD.
fn relative_to_string(relative: &Path) -> String {
	relative
		.components()
		.filter_map(|c| match c {
			Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
			Component::ParentDir => Some("..".to_string()),
			_ => None,
		})
		.collect::<Vec<_>>()
		.join("/")
}

/// Compute the path a local file would have under the remote root
pub fn relocate(remote_root: &str, relative: &Path) -> String {
	normalize_lexical(&format!("{}/{}", remote_root, relative_to_string(relative)))
}

/// Walk `local_root` and check every regular file's relocated path length
///
/// Symlinks are not followed and only regular files are considered. An
/// entry that cannot be read fails the check, since files below it would go
/// unmeasured.
pub fn check_path_lengths(
	local_root: &Path,
	remote_root: &str,
	max_bytes: usize,
) -> Result<PathLengthReport, ValidationError> {
	if !local_root.is_dir() {
		return Err(ValidationError::PathError(format!(
			"Local directory {} does not exist or is not a directory",
			local_root.display()
		)));
	}

	let walker = WalkBuilder::new(local_root)
		.standard_filters(false)
		.follow_links(false)
		.sort_by_file_name(|a, b| a.cmp(b))
		.build();

	let mut report = PathLengthReport { max_bytes, files_checked: 0, offending: Vec::new() };

	for entry in walker {
		let entry = entry.map_err(|e| {
			ValidationError::PathError(format!(
				"Cannot read entry under {}: {}",
				local_root.display(),
				e
			))
		})?;

		if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
			continue;
		}

		let relative = match entry.path().strip_prefix(local_root) {
			Ok(r) => r,
			Err(_) => {
				warn!("Walked path {} escaped its root", entry.path().display());
				continue;
			}
		};

		let candidate = CandidateFile {
			local_path: entry.path().to_path_buf(),
			remote_path: relocate(remote_root, relative),
		};
		report.files_checked += 1;

		if candidate.encoded_len() > max_bytes {
			debug!(
				"{} bytes: {} -> {}",
				candidate.encoded_len(),
				candidate.local_path.display(),
				candidate.remote_path
			);
			report.offending.push(candidate);
		}
	}

	Ok(report)
}


// vim: ts=4
