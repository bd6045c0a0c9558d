//! Serialization capability shared by every persisted entity.
//!
//! Storage payloads are JSON text. An entity reaches that text through one of
//! three explicit routes:
//!
//! 1. a hand-written [`Serializable`] impl (the entity controls its own shape),
//! 2. a serde-derived schema model registered with [`schema_model!`](crate::schema_model),
//! 3. plain structural JSON, i.e. [`Native`] itself.
//!
//! Reading is always driven by the caller's type parameter. The raw payload
//! does not say which type produced it.

use serde_json::Map;

use crate::error::{Result, StorageError};

/// Structural JSON value, the intermediate form of every payload.
pub type Native = serde_json::Value;

/// Entities that can be stored and restored.
pub trait Serializable: Sized {
	/// Converts the entity to its structural form.
	fn serialize(&self) -> Result<Native>;

	/// Rebuilds the entity from its structural form.
	///
	/// Fails with [`StorageError::Type`] when `data` does not have the
	/// expected shape.
	fn unserialize(data: Native) -> Result<Self>;
}

impl Serializable for Native {
	fn serialize(&self) -> Result<Native> {
		Ok(self.clone())
	}

	fn unserialize(data: Native) -> Result<Self> {
		Ok(data)
	}
}

/// Serializes an entity into payload text.
pub fn encode<T: Serializable>(entity: &T) -> Result<String> {
	Ok(serde_json::to_string(&entity.serialize()?)?)
}

/// Restores an entity of type `T` from payload text.
pub fn decode<T: Serializable>(raw: &str) -> Result<T> {
	let native: Native = serde_json::from_str(raw)?;
	T::unserialize(native)
}

/// Implements [`Serializable`] for serde-derived schema models.
///
/// ```ignore
/// #[derive(serde::Serialize, serde::Deserialize)]
/// struct Point { x: i32, y: i32 }
/// svdmap_storage::schema_model!(Point);
/// ```
#[macro_export]
macro_rules! schema_model {
	($($ty:ty),+ $(,)?) => {
		$(
			impl $crate::Serializable for $ty {
				fn serialize(&self) -> $crate::Result<$crate::Native> {
					Ok($crate::serde_json::to_value(self)?)
				}

				fn unserialize(data: $crate::Native) -> $crate::Result<Self> {
					$crate::serde_json::from_value(data).map_err($crate::StorageError::type_mismatch)
				}
			}
		)+
	};
}

/// Unwraps a JSON object or fails with a type error naming `what`.
pub fn expect_object(data: Native, what: &str) -> Result<Map<String, Native>> {
	match data {
		Native::Object(map) => Ok(map),
		other => Err(StorageError::Type(format!("{what}: expected object, got {}", kind(&other)))),
	}
}

/// Unwraps a JSON array or fails with a type error naming `what`.
pub fn expect_array(data: Native, what: &str) -> Result<Vec<Native>> {
	match data {
		Native::Array(items) => Ok(items),
		other => Err(StorageError::Type(format!("{what}: expected list, got {}", kind(&other)))),
	}
}

/// Unwraps a JSON string or fails with a type error naming `what`.
pub fn expect_str(data: Native, what: &str) -> Result<String> {
	match data {
		Native::String(s) => Ok(s),
		other => Err(StorageError::Type(format!("{what}: expected str, got {}", kind(&other)))),
	}
}

/// Removes a required key from an object.
pub fn take_field(map: &mut Map<String, Native>, key: &str) -> Result<Native> {
	map.remove(key)
		.ok_or_else(|| StorageError::Type(format!("missing field {key:?}")))
}

fn kind(value: &Native) -> &'static str {
	match value {
		Native::Null => "null",
		Native::Bool(_) => "bool",
		Native::Number(_) => "number",
		Native::String(_) => "str",
		Native::Array(_) => "list",
		Native::Object(_) => "object",
	}
}
