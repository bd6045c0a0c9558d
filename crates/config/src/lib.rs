//! Configuration for svdmap.
//!
//! Configuration is an optional TOML file. Every field has a default, so an
//! empty file and no file at all behave the same:
//!
//! ```toml
//! [ingest]
//! workers = 0          # 0 = available parallelism
//! timeout_secs = 0     # 0 = no deadline
//! grace_ms = 500
//! extensions = ["json"]
//!
//! [storage]
//! map_size_mib = 1024
//! ```
//!
//! The file is looked up at `$XDG_CONFIG_HOME/svdmap/config.toml` unless a
//! path is given explicitly. Command-line flags override file values.

pub mod error;

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use error::{ConfigError, Result};
use serde::Deserialize;
use svdmap_ingest::IngestOptions;
use svdmap_storage::StorageOptions;
use svdmap_worker::PoolConfig;

#[cfg(test)]
mod tests;

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	pub ingest: IngestConfig,
	pub storage: StorageConfig,
}

/// The `[ingest]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
	/// Concurrent worker processes; `0` uses the available parallelism.
	pub workers: usize,
	/// Bound on a whole ingestion run; `0` waits for every descriptor.
	pub timeout_secs: u64,
	/// Cooperative termination grace period after the deadline.
	pub grace_ms: u64,
	/// Descriptor file extensions, without the dot.
	pub extensions: Vec<String>,
}

impl Default for IngestConfig {
	fn default() -> Self {
		Self {
			workers: 0,
			timeout_secs: 0,
			grace_ms: 500,
			extensions: vec!["json".to_string()],
		}
	}
}

/// The `[storage]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
	/// Upper bound of the local cache size.
	pub map_size_mib: usize,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self { map_size_mib: 1024 }
	}
}

impl Config {
	/// Parse a TOML string into a [`Config`].
	pub fn parse(input: &str) -> Result<Self> {
		Ok(toml::from_str(input)?)
	}

	/// Load configuration from a file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
			path: path.to_path_buf(),
			error: e,
		})?;
		Self::parse(&content)
	}

	/// Returns `$XDG_CONFIG_HOME/svdmap/config.toml` or its platform equivalent.
	pub fn default_path() -> Option<PathBuf> {
		dirs::config_dir().map(|dir| dir.join("svdmap").join("config.toml"))
	}

	/// Loads `explicit` if given, else the default file if it exists, else
	/// the defaults.
	///
	/// An explicit path that does not exist is an error.
	pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
		if let Some(path) = explicit {
			tracing::debug!(path = %path.display(), "config.load");
			return Self::load(path);
		}
		match Self::default_path().filter(|path| path.is_file()) {
			Some(path) => {
				tracing::debug!(path = %path.display(), "config.load");
				Self::load(path)
			}
			None => Ok(Self::default()),
		}
	}

	/// Ingestion settings with the zero sentinels resolved.
	pub fn ingest_options(&self) -> IngestOptions {
		let defaults = PoolConfig::default();
		let ingest = &self.ingest;
		IngestOptions {
			extensions: ingest.extensions.clone(),
			pool: PoolConfig {
				workers: if ingest.workers == 0 { defaults.workers } else { ingest.workers },
				deadline: (ingest.timeout_secs > 0).then(|| Duration::from_secs(ingest.timeout_secs)),
				grace: Duration::from_millis(ingest.grace_ms),
				poll: defaults.poll,
			},
		}
	}

	pub fn storage_options(&self) -> StorageOptions {
		StorageOptions::default().map_size_mib(self.storage.map_size_mib)
	}
}
