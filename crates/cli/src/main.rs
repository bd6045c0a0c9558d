//! svdmap binary.
//!
//! Turns directories of device descriptors into memory-map stores, derives
//! shadow knowledge bases from them and ranks firmware fingerprints against
//! those. Reports go to stdout, logs go to stderr.

mod commands;


use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// svdmap command line arguments.
#[derive(Parser, Debug)]
#[command(name = "svdmap")]
#[command(about = "Extract memory maps from device descriptors and rank firmware against them")]
struct Args {
	/// Configuration file
	#[arg(short, long, value_name = "PATH", global = true)]
	config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Ingest a directory of descriptor files
	Ingest(commands::IngestArgs),

	/// Check generated storage for errors
	Check {
		/// Storage prefix
		prefix: PathBuf,
	},

	/// Create shadows for all memory maps in storage
	MakeShadows {
		/// Memory-map storage prefix
		prefix: PathBuf,
		/// Shadow storage prefix
		output_prefix: PathBuf,
		/// Also write one JSON file per shadow here
		output_dir: Option<PathBuf>,
	},

	/// Rank known devices by similarity to a firmware fingerprint
	Rank {
		/// Shadow storage prefix or archive
		knowledge_base: PathBuf,
		/// Fingerprint JSON file
		fingerprint: PathBuf,
	},

	/// Rank every fingerprint below a directory against every knowledge base
	RankBatch {
		/// Directory searched for fingerprint `.json` files
		fingerprints: PathBuf,
		/// Directory holding `shadow_maps*.tar.gz` archives
		kb_dir: PathBuf,
	},

	/// Summarize the equivalence groups of a knowledge base
	Stats {
		/// Shadow storage prefix or archive
		knowledge_base: PathBuf,
	},

	/// Ingest one descriptor and print its outcome
	#[command(hide = true)]
	Worker {
		/// Input directory the handle is relative to
		#[arg(long, value_name = "DIR")]
		root: PathBuf,
		handle: String,
	},
}

fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	setup_tracing(args.verbose);

	let config = svdmap_config::Config::resolve(args.config.as_deref())?;
	match args.command {
		Command::Ingest(ingest) => commands::ingest(ingest, &config),
		Command::Check { prefix } => commands::check(&prefix, &config),
		Command::MakeShadows {
			prefix,
			output_prefix,
			output_dir,
		} => commands::make_shadows(&prefix, &output_prefix, output_dir.as_deref(), &config),
		Command::Rank {
			knowledge_base,
			fingerprint,
		} => commands::rank(&knowledge_base, &fingerprint, &config),
		Command::RankBatch { fingerprints, kb_dir } => commands::rank_batch(&fingerprints, &kb_dir, &config),
		Command::Stats { knowledge_base } => commands::stats(&knowledge_base, &config),
		Command::Worker { root, handle } => commands::worker(&root, &handle),
	}
}

fn setup_tracing(verbose: bool) {
	use std::fs::{File, OpenOptions};
	use std::sync::Mutex;

	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::prelude::*;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("warn,svdmap=debug")
		} else {
			EnvFilter::new("warn,svdmap=info")
		}
	});

	// SVDMAP_LOG_DIR adds a per-process log file, workers included.
	let log_file: Option<(PathBuf, File)> = std::env::var("SVDMAP_LOG_DIR")
		.ok()
		.map(PathBuf::from)
		.filter(|dir| std::fs::create_dir_all(dir).is_ok())
		.and_then(|dir| {
			let path = dir.join(format!("svdmap.{}.log", std::process::id()));
			let file = OpenOptions::new().create(true).append(true).open(&path).ok()?;
			Some((path, file))
		});

	let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
	let (log_path, file_layer) = match log_file {
		Some((path, file)) => {
			let layer = tracing_subscriber::fmt::layer()
				.with_writer(Mutex::new(file))
				.with_ansi(false)
				.with_target(true);
			(Some(path), Some(layer))
		}
		None => (None, None),
	};

	tracing_subscriber::registry()
		.with(filter)
		.with(stderr_layer)
		.with(file_layer)
		.init();

	if let Some(path) = log_path {
		tracing::debug!(path = %path.display(), "cli.tracing.file");
	}
}
