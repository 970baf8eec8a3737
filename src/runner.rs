//! Job runner
//!
//! Jobs run one at a time in configuration order. Each job moves through
//!
//! ```text
//! Pending -> PathValidated -> [AudioCompressed] -> TransferredUnverified
//!         -> TransferredVerified -> Done
//! ```
//!
//! and a skipped job goes straight from `Pending` to `Skipped`. The first
//! failure in any job ends the whole run; later jobs never start.

use crate::config::Job;
use crate::error::SyncError;
use crate::executor::{Executor, RunMode};
use crate::logging::*;
use crate::transcode::{transcode_top_level_audio, SampleRateProbe};
use crate::transfer::{run_transfer, TransferPass, TransferRequest};
use crate::validation::{
	check_path_lengths, validate_max_path_bytes, ValidationError, DEFAULT_MAX_PATH_BYTES,
};

/// Lifecycle of one job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
	Pending,
	PathValidated,
	AudioCompressed,
	TransferredUnverified,
	TransferredVerified,
	Done,
	Skipped,
	Failed,
}

impl JobState {
	/// Whether `next` may follow `self`
	pub fn can_advance_to(self, next: JobState) -> bool {
		use JobState::*;

		match (self, next) {
			(Done, _) | (Skipped, _) | (Failed, _) => false,
			(_, Failed) => true,
			(Pending, PathValidated) | (Pending, Skipped) => true,
			(PathValidated, AudioCompressed) | (PathValidated, TransferredUnverified) => true,
			(AudioCompressed, TransferredUnverified) => true,
			(TransferredUnverified, TransferredVerified) => true,
			(TransferredVerified, Done) => true,
			_ => false,
		}
	}

	pub fn is_terminal(self) -> bool {
		matches!(self, JobState::Done | JobState::Skipped | JobState::Failed)
	}
}

/// States a job went through, ending in a terminal state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
	pub name: String,
	pub history: Vec<JobState>,
}

impl JobReport {
	fn new(name: &str) -> Self {
		JobReport { name: name.to_string(), history: vec![JobState::Pending] }
	}

	pub fn state(&self) -> JobState {
		self.history.last().copied().unwrap_or(JobState::Pending)
	}

	fn advance(&mut self, next: JobState) {
		debug_assert!(
			self.state().can_advance_to(next),
			"illegal job transition {:?} -> {:?}",
			self.state(),
			next
		);
		debug!("job '{}': {:?} -> {:?}", self.name, self.state(), next);
		self.history.push(next);
	}
}

/// Outcome of a run in which every job finished or was skipped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
	pub jobs: Vec<JobReport>,
}

impl RunSummary {
	pub fn completed(&self) -> usize {
		self.jobs.iter().filter(|j| j.state() == JobState::Done).count()
	}

	pub fn skipped(&self) -> usize {
		self.jobs.iter().filter(|j| j.state() == JobState::Skipped).count()
	}
}

/// Drives jobs through validation, transcoding and transfer
pub struct JobRunner<'a, E: Executor + ?Sized, P: SampleRateProbe + ?Sized> {
	executor: &'a mut E,
	probe: &'a P,
	mode: RunMode,
	max_path_bytes: usize,
}

impl<'a, E: Executor + ?Sized, P: SampleRateProbe + ?Sized> JobRunner<'a, E, P> {
	pub fn new(executor: &'a mut E, probe: &'a P, mode: RunMode) -> Self {
		JobRunner { executor, probe, mode, max_path_bytes: DEFAULT_MAX_PATH_BYTES }
	}

	/// Override the remote path byte budget
	pub fn with_max_path_bytes(mut self, max_path_bytes: usize) -> Result<Self, ValidationError> {
		validate_max_path_bytes(max_path_bytes)?;
		self.max_path_bytes = max_path_bytes;
		Ok(self)
	}

	/// Run every job in order, stopping at the first failure
	pub fn run_all(&mut self, jobs: &[Job]) -> Result<RunSummary, SyncError> {
		let mut summary = RunSummary::default();
		for job in jobs {
			summary.jobs.push(self.run_job(job)?);
		}
		Ok(summary)
	}

	/// Run one job to a terminal state
	///
	/// Errors are wrapped with the job's name.
	pub fn run_job(&mut self, job: &Job) -> Result<JobReport, SyncError> {
		let mut report = JobReport::new(&job.name);

		if job.skip {
			info!("Skipping job '{}'", job.name);
			report.advance(JobState::Skipped);
			return Ok(report);
		}

		info!("Starting job '{}': {} -> {}", job.name, job.local_path.display(), job.remote_path);
		match self.drive(job, &mut report) {
			Ok(()) => {
				report.advance(JobState::Done);
				Ok(report)
			}
			Err(e) => {
				error!("Job '{}' failed in state {:?}", job.name, report.state());
				report.advance(JobState::Failed);
				Err(SyncError::Job { name: job.name.clone(), source: Box::new(e) })
			}
		}
	}

	fn drive(&mut self, job: &Job, report: &mut JobReport) -> Result<(), SyncError> {
		let lengths = check_path_lengths(&job.local_path, &job.remote_path, self.max_path_bytes)?;
		if !lengths.passed() {
			return Err(SyncError::PathLengthExceeded {
				max_bytes: lengths.max_bytes,
				offending: lengths.offending_paths(),
			});
		}
		debug!("{} files fit the remote path budget", lengths.files_checked);
		report.advance(JobState::PathValidated);

		if job.compress_audio {
			let summary =
				transcode_top_level_audio(&mut *self.executor, self.probe, &job.local_path, self.mode)?;
			info!("Transcoded {} audio files", summary.files_processed);
			report.advance(JobState::AudioCompressed);
		}

		let request = TransferRequest {
			source: &job.local_path,
			destination: &job.remote_path,
			remote_tool: job.remote_tool(),
		};

		for pass in TransferPass::SEQUENCE {
			run_transfer(&mut *self.executor, &request, pass, self.mode)?;
			report.advance(match pass {
				TransferPass::Fast => JobState::TransferredUnverified,
				TransferPass::Checksum => JobState::TransferredVerified,
			});
		}

		Ok(())
	}
}


// vim: ts=4
