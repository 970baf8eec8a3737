use clap::{Arg, ArgAction, Command};
use std::path::Path;

use nessie::config::ArchiveConfig;
use nessie::error::SyncError;
use nessie::executor::{ProcessExecutor, RunMode};
use nessie::logging::{self, *};
use nessie::preflight;
use nessie::runner::JobRunner;
use nessie::session_log::{SessionLog, DEFAULT_LOG_PATH};
use nessie::transcode::FfprobeProbe;

fn run(mode: RunMode) -> Result<(), SyncError> {
	preflight::check_dependencies()?;

	let config_path = ArchiveConfig::resolve_path();
	let config = ArchiveConfig::load(&config_path)?;
	info!(
		"Loaded {} job(s) from {}, {} active",
		config.jobs.len(),
		config_path.display(),
		config.active_jobs().count()
	);

	let log = SessionLog::start(Path::new(DEFAULT_LOG_PATH))?;
	let mut executor = ProcessExecutor::new(log);

	let summary = JobRunner::new(&mut executor, &FfprobeProbe, mode).run_all(&config.jobs)?;
	info!("{} job(s) archived, {} skipped", summary.completed(), summary.skipped());
	Ok(())
}

fn main() {
	let matches = Command::new("nessie")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Archive files to NAS")
		.arg(
			Arg::new("dry-run")
				.long("dry-run")
				.action(ArgAction::SetTrue)
				.help("Only print the commands that would be executed"),
		)
		.get_matches();

	logging::init_tracing();

	let mode = RunMode::from_dry_run(matches.get_flag("dry-run"));
	if let Err(e) = run(mode) {
		eprintln!("Error: {}", e);
		std::process::exit(1);
	}

	println!("Archive process completed successfully.");
}

// vim: ts=4
