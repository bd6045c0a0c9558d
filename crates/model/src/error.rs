use svdmap_storage::StorageError;
use thiserror::Error;

/// Errors raised while parsing model text forms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
	/// Address text is not `BBBBBBBB:b`.
	#[error("malformed address {0:?}: expected hex byte offset, ':' and bit offset 0-7")]
	AddressFormat(String),

	/// Reset value or mask text is not hexadecimal.
	#[error("malformed reset field {0:?}: expected \"CONFLICT\" or hex")]
	ResetFormat(String),
}

impl From<ModelError> for StorageError {
	fn from(err: ModelError) -> Self {
		StorageError::type_mismatch(err)
	}
}

/// Result type for model parsing.
pub type Result<T> = std::result::Result<T, ModelError>;
