//! Configuration validation functions

use super::ValidationError;

/// Validate a required directory setting (`local` or `remote`)
///
/// # Arguments
/// * `field` - Configuration key, used in the error message
/// * `value` - Configured path
///
/// # Returns
/// `Ok(())` if valid, `Err(ValidationError)` if blank
pub fn validate_directory(field: &str, value: &str) -> Result<(), ValidationError> {
	if value.trim().is_empty() {
		return Err(ValidationError::ConfigError(format!("{} must not be empty", field)));
	}
	Ok(())
}

/// Validate an optional remote rsync path override
pub fn validate_remote_tool_path(value: Option<&str>) -> Result<(), ValidationError> {
	match value {
		Some(path) if path.trim().is_empty() => Err(ValidationError::ConfigError(
			"remote_rsync_path must not be empty when set".to_string(),
		)),
		_ => Ok(()),
	}
}

/// Validate the remote path byte budget
pub fn validate_max_path_bytes(max_bytes: usize) -> Result<(), ValidationError> {
	if max_bytes == 0 {
		return Err(ValidationError::ConfigError(
			"Maximum path length must be greater than 0".to_string(),
		));
	}
	Ok(())
}


// vim: ts=4
