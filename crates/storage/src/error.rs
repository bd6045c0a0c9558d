//! Error types for the storage layer.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by [`Storage`](crate::Storage) and the serialization capability.
#[derive(Debug, Error)]
pub enum StorageError {
	/// The handle is not present in the storage index.
	#[error("handle not found: {0}")]
	NotFound(String),

	/// Persisted data does not have the shape the requested type expects.
	#[error("type mismatch: {0}")]
	Type(String),

	/// Payload text is not valid JSON.
	#[error("malformed payload: {0}")]
	Json(#[from] serde_json::Error),

	/// LMDB cache failure.
	#[error("cache error: {0}")]
	Cache(#[from] heed3::Error),

	/// Archive could not be read or written.
	#[error("archive {path}: {error}")]
	Archive {
		/// Archive file path.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Filesystem failure outside the archive.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// A handle cannot be represented as a relative archive path.
	#[error("invalid handle {0:?}: handles must be non-empty relative paths without '..'")]
	InvalidHandle(String),

	/// A per-handle export would land outside the output directory.
	#[error("output directory traversal detected: {0}")]
	PathTraversal(PathBuf),
}

impl StorageError {
	/// Builds a [`StorageError::Type`] from anything displayable.
	pub fn type_mismatch(reason: impl std::fmt::Display) -> Self {
		Self::Type(reason.to_string())
	}
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
