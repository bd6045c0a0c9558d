//! Maintenance passes over an ingested store.

use std::path::Path;

use svdmap_model::{MemoryMap, Shadow};
use svdmap_storage::Storage;

use crate::error::Result;
use crate::outcome::Outcome;

/// Result of [`check_storage`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckReport {
	pub total: usize,
	/// Stored outcomes whose unit failed.
	pub errors: usize,
}

/// Decodes every stored outcome.
///
/// A payload that does not decode is an error of the store itself and is
/// returned; failed units are only counted.
pub fn check_storage(storage: &Storage) -> Result<CheckReport> {
	let mut report = CheckReport::default();
	for handle in storage.handles() {
		let outcome: Outcome<MemoryMap> = storage.get_as(&handle)?;
		report.total += 1;
		if !outcome.success() {
			report.errors += 1;
		}
	}
	tracing::info!(total = report.total, errors = report.errors, "ingest.check");
	Ok(report)
}

/// Result of [`make_shadows`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShadowReport {
	pub total: usize,
	pub projected: usize,
	/// Outcomes skipped because their unit failed.
	pub skipped: usize,
	/// Files written by the directory export, if one was requested.
	pub exported_files: Option<usize>,
}

/// Projects every successful memory map in `input` to a shadow in `output`
/// under the same handle, then exports `output` as an archive and, when
/// `output_dir` is given, as one JSON file per handle.
pub fn make_shadows(input: &Storage, output: &mut Storage, output_dir: Option<&Path>) -> Result<ShadowReport> {
	let mut report = ShadowReport::default();
	for handle in input.handles() {
		report.total += 1;
		let outcome: Outcome<MemoryMap> = input.get_as(&handle)?;
		let Some(map) = outcome.returned.filter(|_| outcome.error.is_none()) else {
			report.skipped += 1;
			continue;
		};
		output.set(&handle, &Shadow::project(handle.as_str(), &map))?;
		report.projected += 1;
	}

	output.export_archive()?;
	if let Some(dir) = output_dir {
		report.exported_files = Some(output.export_dir(dir)?);
	}

	tracing::info!(total = report.total, projected = report.projected, skipped = report.skipped, "ingest.make_shadows");
	Ok(report)
}
