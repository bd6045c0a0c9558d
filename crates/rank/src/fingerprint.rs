use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use svdmap_model::Shadow;
use svdmap_model::shadow::word_set;

use crate::error::{RankError, Result};

/// Word addresses a firmware image was observed to read and write.
///
/// Same JSON shape as a [`Shadow`] without the name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
	#[serde(with = "word_set")]
	pub read: BTreeSet<u64>,
	#[serde(with = "word_set")]
	pub write: BTreeSet<u64>,
}

svdmap_storage::schema_model!(Fingerprint);

impl Fingerprint {
	/// Reads an analyzer result file.
	pub fn load(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path).map_err(|error| RankError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		svdmap_storage::decode::<Self>(&text).map_err(|err| RankError::Fingerprint {
			path: path.to_path_buf(),
			reason: err.to_string(),
		})
	}
}

impl From<&Shadow> for Fingerprint {
	fn from(shadow: &Shadow) -> Self {
		Self {
			read: shadow.read.clone(),
			write: shadow.write.clone(),
		}
	}
}
