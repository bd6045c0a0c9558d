//! Fans descriptor ingestion out over isolated worker processes.
//!
//! Handles already in storage are skipped, so an interrupted run resumes
//! where it stopped. Every completed unit is written to storage as it
//! arrives; units cut off by the deadline are counted, never stored. The
//! archive is exported at the end whether or not the deadline expired.

use std::path::Path;

use ignore::WalkBuilder;
use svdmap_model::MemoryMap;
use svdmap_storage::{Storage, StorageError, codec};
use svdmap_worker::{PoolConfig, ProcessPool, UnitOutcome, UnitReport, WorkerCommand};

use crate::error::{IngestError, Result};
use crate::outcome::Outcome;

/// Lines of worker stderr kept in a failed outcome.
const STDERR_TAIL_LINES: usize = 10;

/// Ingestion settings.
#[derive(Debug, Clone)]
pub struct IngestOptions {
	/// File extensions to pick up, without the dot.
	pub extensions: Vec<String>,
	pub pool: PoolConfig,
}

impl Default for IngestOptions {
	fn default() -> Self {
		Self {
			extensions: vec!["json".to_string()],
			pool: PoolConfig::default(),
		}
	}
}

/// Counts of one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
	/// Descriptors found in the input directory.
	pub total: usize,
	/// Already present in storage.
	pub skipped: usize,
	pub completed: usize,
	pub succeeded: usize,
	/// Succeeded with at least one warning.
	pub warned: usize,
	pub failed: usize,
	pub timed_out: usize,
}

impl IngestReport {
	fn record(&mut self, outcome: &Outcome<MemoryMap>) {
		self.completed += 1;
		if !outcome.success() {
			self.failed += 1;
		} else {
			self.succeeded += 1;
			if !outcome.warnings.is_empty() {
				self.warned += 1;
			}
		}
	}
}

/// Finds descriptor files below `input_dir` and returns their handles.
///
/// A handle is the path relative to `input_dir` with `/` separators.
pub fn discover(input_dir: &Path, extensions: &[String]) -> Result<Vec<String>> {
	if !input_dir.is_dir() {
		return Err(IngestError::InputDir(input_dir.to_path_buf()));
	}

	let mut handles = Vec::new();
	for entry in WalkBuilder::new(input_dir).standard_filters(false).build() {
		let entry = entry?;
		if !entry.file_type().is_some_and(|kind| kind.is_file()) {
			continue;
		}
		let path = entry.path();
		let wanted = path
			.extension()
			.and_then(|ext| ext.to_str())
			.is_some_and(|ext| extensions.iter().any(|want| want == ext));
		if !wanted {
			continue;
		}

		let Ok(relative) = path.strip_prefix(input_dir) else {
			continue;
		};
		let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
		match parts {
			Some(parts) => handles.push(parts.join("/")),
			None => tracing::warn!(path = %path.display(), "ingest.discover.non_utf8"),
		}
	}
	handles.sort();
	Ok(handles)
}

/// Ingests every new descriptor below `input_dir` into `storage`.
///
/// `command` is the worker program; each unit appends its handle as the
/// last argument and expects one serialized outcome on stdout.
pub async fn ingest(storage: &mut Storage, input_dir: &Path, command: WorkerCommand, options: &IngestOptions) -> Result<IngestReport> {
	let all = discover(input_dir, &options.extensions)?;
	let total = all.len();
	let fresh: Vec<String> = all.into_iter().filter(|handle| !storage.contains(handle)).collect();

	let mut report = IngestReport {
		total,
		skipped: total - fresh.len(),
		..IngestReport::default()
	};
	if report.skipped > 0 {
		tracing::info!(skipped = report.skipped, "ingest.skip_cached");
	}

	let pending = fresh.len();
	let pool = ProcessPool::new(command, options.pool);
	let mut write_error: Option<StorageError> = None;

	let batch = pool
		.run(fresh, |unit| {
			let handle = unit.input.clone();
			let outcome = decode_unit(unit);
			report.record(&outcome);
			tracing::info!(
				handle = %handle,
				completed = report.completed,
				pending,
				warned = report.warned,
				failed = report.failed,
				"ingest.progress"
			);
			if let Some(error) = &outcome.error {
				tracing::debug!(handle = %handle, error = %error, "ingest.unit_failed");
			}
			if write_error.is_none()
				&& let Err(err) = storage.set(&handle, &outcome)
			{
				write_error = Some(err);
			}
		})
		.await;

	report.timed_out = batch.timed_out.len();
	if batch.expired() {
		tracing::warn!(timed_out = report.timed_out, deadline = ?options.pool.deadline, "ingest.timeout");
	}
	if let Some(err) = write_error {
		return Err(err.into());
	}

	let exported = storage.export_archive()?;
	tracing::info!(
		exported,
		completed = report.completed,
		failed = report.failed,
		timed_out = report.timed_out,
		"ingest.done"
	);
	Ok(report)
}

/// Turns a worker's exit into the outcome stored for its handle.
fn decode_unit(unit: UnitReport) -> Outcome<MemoryMap> {
	let args = vec![unit.input];
	match unit.outcome {
		UnitOutcome::Failed(reason) => Outcome::failed(args, reason),
		UnitOutcome::Exited { status, stdout, stderr } => {
			let text = String::from_utf8_lossy(&stdout);
			match codec::decode::<Outcome<MemoryMap>>(text.trim()) {
				Ok(mut outcome) if status.success() => {
					outcome.args = args;
					outcome
				}
				Ok(_) => Outcome::failed(args, format!("worker exited with {status}{}", stderr_tail(&stderr))),
				Err(err) => Outcome::failed(args, format!("worker exited with {status} without an outcome ({err}){}", stderr_tail(&stderr))),
			}
		}
	}
}

fn stderr_tail(stderr: &[u8]) -> String {
	let text = String::from_utf8_lossy(stderr);
	let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
	if lines.is_empty() {
		return String::new();
	}
	let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
	format!(": {}", lines[start..].join("\n"))
}
