//! Dependency checks run before anything else

use std::path::PathBuf;

use crate::error::SyncError;
use crate::logging::*;
use crate::transcode::TRANSCODE_PROGRAM;
use crate::transfer::TRANSFER_PROGRAM;

/// Tools that must resolve on PATH for any run
pub const REQUIRED_TOOLS: [&str; 2] = [TRANSCODE_PROGRAM, TRANSFER_PROGRAM];

/// Resolve one tool on PATH
pub fn locate_tool(tool: &str) -> Result<PathBuf, SyncError> {
	which::which(tool).map_err(|_| SyncError::MissingDependency { tool: tool.to_string() })
}

/// Fail on the first required tool that is not installed
pub fn check_dependencies() -> Result<(), SyncError> {
	check_tools(&REQUIRED_TOOLS)
}

pub fn check_tools(tools: &[&str]) -> Result<(), SyncError> {
	for tool in tools {
		let path = locate_tool(tool)?;
		debug!("Found {} at {}", tool, path.display());
	}
	Ok(())
}


// vim: ts=4
