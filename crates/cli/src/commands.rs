use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use svdmap_config::Config;
use svdmap_ingest::{IngestOptions, JsonDescriptorParser};
use svdmap_rank::{Fingerprint, KnowledgeBase};
use svdmap_storage::Storage;
use svdmap_worker::WorkerCommand;

/// Archive name prefix of knowledge bases picked up by `rank-batch`.
const KB_ARCHIVE_PREFIX: &str = "shadow_maps";
const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Arguments of `svdmap ingest`. Flags override the config file.
#[derive(clap::Args, Debug)]
pub(crate) struct IngestArgs {
	/// Directory containing descriptor files
	pub input_dir: PathBuf,

	/// Output storage prefix
	pub out: PathBuf,

	/// Deadline for the whole run in seconds, 0 for none
	#[arg(long, value_name = "SECS")]
	pub timeout: Option<u64>,

	/// Concurrent worker processes
	#[arg(long, value_name = "N")]
	pub workers: Option<usize>,

	/// Descriptor file extension, repeatable
	#[arg(long = "ext", value_name = "EXT")]
	pub extensions: Vec<String>,
}

impl IngestArgs {
	pub(crate) fn apply(&self, options: &mut IngestOptions) {
		if let Some(secs) = self.timeout {
			options.pool.deadline = (secs > 0).then(|| Duration::from_secs(secs));
		}
		if let Some(workers) = self.workers {
			options.pool.workers = workers.max(1);
		}
		if !self.extensions.is_empty() {
			options.extensions = self.extensions.iter().map(|ext| ext.trim_start_matches('.').to_string()).collect();
		}
	}
}

pub(crate) fn ingest(args: IngestArgs, config: &Config) -> Result<()> {
	let mut options = config.ingest_options();
	args.apply(&mut options);

	let input_dir = args
		.input_dir
		.canonicalize()
		.with_context(|| format!("input directory {} does not exist", args.input_dir.display()))?;
	let exe = std::env::current_exe().context("cannot locate the svdmap executable")?;
	let command = WorkerCommand::new(exe).arg("worker").arg("--root").arg(input_dir.clone());

	let mut storage = Storage::open_with(&args.out, config.storage_options())?;
	let runtime = svdmap_worker::runtime(options.pool.workers).context("failed to start the async runtime")?;
	let report = runtime.block_on(svdmap_ingest::ingest(&mut storage, &input_dir, command, &options))?;
	storage.close();

	let mut out = std::io::stdout().lock();
	if report.skipped > 0 {
		writeln!(out, "Skipped {} cached descriptors.", report.skipped)?;
	}
	writeln!(
		out,
		"Completed {} files with {} errors ({} with warnings). {} timed out.",
		report.completed, report.failed, report.warned, report.timed_out
	)?;
	Ok(())
}

pub(crate) fn worker(root: &Path, handle: &str) -> Result<()> {
	let mut out = std::io::stdout().lock();
	svdmap_ingest::run_worker(&JsonDescriptorParser, root, handle, &mut out)?;
	Ok(())
}

pub(crate) fn check(prefix: &Path, config: &Config) -> Result<()> {
	let storage = Storage::open_with(prefix, config.storage_options())?;
	let report = svdmap_ingest::check_storage(&storage)?;

	let mut out = std::io::stdout().lock();
	writeln!(out, "Initial parser found {} errors in {} files.", report.errors, report.total)?;
	writeln!(out, "Storage has been read successfully.")?;
	Ok(())
}

pub(crate) fn make_shadows(prefix: &Path, output_prefix: &Path, output_dir: Option<&Path>, config: &Config) -> Result<()> {
	let input = Storage::open_with(prefix, config.storage_options())?;
	let mut output = Storage::open_with(output_prefix, config.storage_options())?;
	let report = svdmap_ingest::make_shadows(&input, &mut output, output_dir)?;
	output.close();

	let mut out = std::io::stdout().lock();
	writeln!(
		out,
		"Projected {} of {} memory maps, skipped {} failed.",
		report.projected, report.total, report.skipped
	)?;
	if let (Some(files), Some(dir)) = (report.exported_files, output_dir) {
		writeln!(out, "Wrote {files} shadow files to {}.", dir.display())?;
	}
	Ok(())
}

pub(crate) fn rank(knowledge_base: &Path, fingerprint: &Path, config: &Config) -> Result<()> {
	let kb = load_knowledge_base(knowledge_base, config)?;
	let fingerprint = Fingerprint::load(fingerprint)?;

	let ranking = svdmap_rank::rank(&fingerprint, &kb);
	write!(std::io::stdout().lock(), "{ranking}")?;
	Ok(())
}

pub(crate) fn rank_batch(fingerprints: &Path, kb_dir: &Path, config: &Config) -> Result<()> {
	let mut knowledge_bases = Vec::new();
	for archive in knowledge_base_archives(kb_dir)? {
		let stem = archive_stem(&archive);
		knowledge_bases.push((stem, load_knowledge_base(&archive, config)?));
	}
	if knowledge_bases.is_empty() {
		tracing::warn!(dir = %kb_dir.display(), "cli.rank_batch.no_knowledge_base");
	}

	let mut out = std::io::stdout().lock();
	for path in fingerprint_files(fingerprints)? {
		writeln!(out, "Ranking fingerprint {}...", path.display())?;
		let fingerprint = Fingerprint::load(&path)?;
		let ranks_dir = path.with_extension("");
		std::fs::create_dir_all(&ranks_dir).with_context(|| format!("cannot create {}", ranks_dir.display()))?;

		for (stem, kb) in &knowledge_bases {
			writeln!(out, "  Using knowledge base {stem}...")?;
			let target = ranks_dir.join(format!("ranking_using_{stem}.txt"));
			let report = svdmap_rank::rank(&fingerprint, kb).to_string();
			std::fs::write(&target, report).with_context(|| format!("cannot write {}", target.display()))?;
		}
	}
	Ok(())
}

pub(crate) fn stats(knowledge_base: &Path, config: &Config) -> Result<()> {
	let kb = load_knowledge_base(knowledge_base, config)?;
	write!(std::io::stdout().lock(), "{}", kb.stats())?;
	Ok(())
}

fn load_knowledge_base(prefix: &Path, config: &Config) -> Result<KnowledgeBase> {
	let storage = Storage::open_with(prefix, config.storage_options())?;
	let kb = KnowledgeBase::load(&storage).with_context(|| format!("cannot load knowledge base {}", prefix.display()))?;
	storage.close();
	if kb.is_empty() {
		tracing::warn!(prefix = %prefix.display(), "cli.knowledge_base.empty");
	}
	Ok(kb)
}

/// `shadow_maps*.tar.gz` files directly inside `dir`, sorted.
pub(crate) fn knowledge_base_archives(dir: &Path) -> Result<Vec<PathBuf>> {
	let entries = std::fs::read_dir(dir).with_context(|| format!("cannot read {}", dir.display()))?;
	let mut archives = Vec::new();
	for entry in entries {
		let path = entry?.path();
		let wanted = path
			.file_name()
			.and_then(|name| name.to_str())
			.is_some_and(|name| name.starts_with(KB_ARCHIVE_PREFIX) && name.ends_with(ARCHIVE_SUFFIX));
		if wanted && path.is_file() {
			archives.push(path);
		}
	}
	archives.sort();
	Ok(archives)
}

/// File name of `archive` without the archive suffix.
pub(crate) fn archive_stem(archive: &Path) -> String {
	let name = archive
		.file_name()
		.map(|name| name.to_string_lossy().into_owned())
		.unwrap_or_default();
	name.strip_suffix(ARCHIVE_SUFFIX).map(str::to_string).unwrap_or(name)
}

/// `.json` files anywhere below `dir`, sorted.
pub(crate) fn fingerprint_files(dir: &Path) -> Result<Vec<PathBuf>> {
	let mut files = Vec::new();
	for entry in WalkBuilder::new(dir).standard_filters(false).build() {
		let entry = entry?;
		if entry.file_type().is_some_and(|kind| kind.is_file()) && entry.path().extension().is_some_and(|ext| ext == "json") {
			files.push(entry.into_path());
		}
	}
	files.sort();
	Ok(files)
}
