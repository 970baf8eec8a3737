//! Logging prelude module for convenient access to tracing macros.
//!
//! Diagnostics go through `tracing` to stderr. Command renderings and stage
//! summaries meant for the operator are printed to stdout by the modules that
//! produce them, and raw tool output lands in the session log.
//!
//! # Usage
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("Starting job {}", name);
//! warn!("Skipping unreadable entry");
//! ```

pub use tracing::{debug, error, info, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// By default, logs at INFO level and above are displayed. Control the log level
/// with the `RUST_LOG` environment variable:
///
/// ```bash
/// RUST_LOG=debug nessie --dry-run
/// RUST_LOG=nessie::transfer=trace nessie
/// ```
pub fn init_tracing() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.with_writer(std::io::stderr)
		.with_target(false)
		.init();
}

// vim: ts=4
