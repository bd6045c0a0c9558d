use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use svdmap_storage::codec::{self, Native, Serializable};
use svdmap_storage::serde_json::{self, json};
use svdmap_storage::StorageError;

use crate::capture::capture_warnings;

/// Result envelope of one ingestion unit.
///
/// `returned` is set on success and `error` on failure; `warnings` holds
/// whatever the unit logged at warn level or above either way.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
	pub args: Vec<String>,
	pub kwargs: BTreeMap<String, String>,
	pub returned: Option<T>,
	pub error: Option<String>,
	pub warnings: Vec<String>,
}

impl<T> Outcome<T> {
	/// Runs `f`, capturing its error, panic and warnings instead of
	/// propagating them.
	pub fn contained<F, E>(args: Vec<String>, kwargs: BTreeMap<String, String>, f: F) -> Self
	where
		F: FnOnce() -> Result<T, E>,
		E: fmt::Display,
	{
		let (result, warnings) = capture_warnings(|| catch_unwind(AssertUnwindSafe(f)));
		let (returned, error) = match result {
			Ok(Ok(value)) => (Some(value), None),
			Ok(Err(err)) => (None, Some(err.to_string())),
			Err(payload) => (None, Some(format!("panicked: {}", svdmap_worker::panic_message(payload.as_ref())))),
		};

		Self {
			args,
			kwargs,
			returned,
			error,
			warnings,
		}
	}

	/// A failed outcome produced outside the unit itself.
	pub fn failed(args: Vec<String>, error: impl Into<String>) -> Self {
		Self {
			args,
			kwargs: BTreeMap::new(),
			returned: None,
			error: Some(error.into()),
			warnings: Vec::new(),
		}
	}

	/// True when the unit did not fail.
	pub fn success(&self) -> bool {
		self.error.is_none()
	}
}

/// `returned` is stored as JSON text of the payload's serialized form,
/// `"null"` when there is none.
impl<T: Serializable> Serializable for Outcome<T> {
	fn serialize(&self) -> svdmap_storage::Result<Native> {
		let returned = match &self.returned {
			Some(value) => codec::encode(value)?,
			None => "null".to_string(),
		};
		Ok(json!({
			"args": self.args,
			"kwargs": self.kwargs,
			"returned": returned,
			"error": self.error,
			"warnings": self.warnings,
		}))
	}

	fn unserialize(data: Native) -> svdmap_storage::Result<Self> {
		let mut map = codec::expect_object(data, "outcome")?;

		let args = string_list(codec::take_field(&mut map, "args")?, "args")?;
		let kwargs = codec::expect_object(codec::take_field(&mut map, "kwargs")?, "kwargs")?
			.into_iter()
			.map(|(key, value)| Ok((key, codec::expect_str(value, "kwargs value")?)))
			.collect::<svdmap_storage::Result<_>>()?;

		let returned_text = codec::expect_str(codec::take_field(&mut map, "returned")?, "returned")?;
		let returned = match serde_json::from_str::<Native>(&returned_text)? {
			Native::Null => None,
			native => Some(T::unserialize(native)?),
		};

		let error = match codec::take_field(&mut map, "error")? {
			Native::Null => None,
			Native::String(text) if text == "None" => {
				tracing::warn!("outcome has a legacy \"None\" error string; re-export the archive");
				None
			}
			Native::String(text) => Some(text),
			other => return Err(StorageError::type_mismatch(format!("error: expected str or null, got {other}"))),
		};

		let warnings = string_list(codec::take_field(&mut map, "warnings")?, "warnings")?;

		Ok(Self {
			args,
			kwargs,
			returned,
			error,
			warnings,
		})
	}
}

fn string_list(data: Native, what: &str) -> svdmap_storage::Result<Vec<String>> {
	codec::expect_array(data, what)?
		.into_iter()
		.map(|item| codec::expect_str(item, what))
		.collect()
}
