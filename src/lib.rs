//! # nessie - verified archival of media project directories
//!
//! nessie mirrors configured local directories to network storage with
//! rsync. Before anything is copied it checks that every file's path fits
//! the remote path budget. It can transcode top-level audio to AAC, keeping
//! the originals in a local-only folder. Each job is then transferred twice:
//! a fast pass, followed by a `--checksum` pass that catches anything the
//! size and mtime heuristics missed.
//!
//! ## Library use
//!
//! ```rust,ignore
//! use nessie::config::ArchiveConfig;
//! use nessie::executor::{ProcessExecutor, RunMode};
//! use nessie::runner::JobRunner;
//! use nessie::session_log::SessionLog;
//! use nessie::transcode::FfprobeProbe;
//!
//! let config = ArchiveConfig::load("config.json".as_ref())?;
//! let mut executor = ProcessExecutor::new(SessionLog::start("nessie.log".as_ref())?);
//! let summary = JobRunner::new(&mut executor, &FfprobeProbe, RunMode::DryRun)
//!     .run_all(&config.jobs)?;
//! println!("{} jobs archived", summary.completed());
//! ```
//!
//! Orchestration never spawns processes directly; swap in
//! [`executor::RecordingExecutor`] to observe the exact commands a run
//! would issue.

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod preflight;
pub mod runner;
pub mod session_log;
pub mod transcode;
pub mod transfer;
pub mod validation;

// Re-export commonly used types and functions
pub use config::{ArchiveConfig, Job};
pub use error::{ConfigError, SyncError};
pub use executor::{ExecutionOutcome, Executor, ProcessExecutor, RecordingExecutor, RunMode};
pub use runner::{JobRunner, JobState, RunSummary};

// vim: ts=4
