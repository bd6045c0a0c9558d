use std::path::PathBuf;

use svdmap_storage::StorageError;
use thiserror::Error;

/// Errors raised while loading ranking inputs.
#[derive(Debug, Error)]
pub enum RankError {
	#[error(transparent)]
	Storage(#[from] StorageError),

	#[error("failed to read fingerprint {path}: {error}")]
	Io {
		path: PathBuf,
		#[source]
		error: std::io::Error,
	},

	/// The fingerprint file is not `{"read": [...], "write": [...]}`.
	#[error("invalid fingerprint {path}: {reason}")]
	Fingerprint { path: PathBuf, reason: String },
}

/// Result type for ranking.
pub type Result<T> = std::result::Result<T, RankError>;
