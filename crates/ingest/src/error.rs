use std::path::PathBuf;

use svdmap_storage::StorageError;
use thiserror::Error;

/// Errors raised by ingestion and the maintenance tasks.
#[derive(Debug, Error)]
pub enum IngestError {
	/// A register lies outside the 32-bit address space; the descriptor is
	/// almost certainly malformed.
	#[error("register {peripheral}.{register} has base address {address:#x} above 0xFFFFFFFF")]
	AddressOutOfRange { peripheral: String, register: String, address: u64 },

	/// The descriptor could not be read or has the wrong shape.
	#[error("invalid descriptor {path}: {reason}")]
	Descriptor { path: PathBuf, reason: String },

	/// Input directory is missing or not a directory.
	#[error("input directory {0} does not exist or is not a directory")]
	InputDir(PathBuf),

	#[error("input discovery failed: {0}")]
	Walk(#[from] ignore::Error),

	#[error(transparent)]
	Storage(#[from] StorageError),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

/// Result type for ingestion.
pub type Result<T> = std::result::Result<T, IngestError>;
