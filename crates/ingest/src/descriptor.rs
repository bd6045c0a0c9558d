//! Device descriptions as delivered by a descriptor parser.
//!
//! Parsing vendor descriptor formats is outside this crate. A
//! [`DescriptorParser`] turns a file into a [`Device`]; the bundled
//! [`JsonDescriptorParser`] reads the serde JSON form of that model.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

/// Access mode of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
	ReadOnly,
	WriteOnly,
	ReadWrite,
	#[serde(alias = "read-writeOnce")]
	ReadWriteOnce,
	#[serde(alias = "writeOnce")]
	WriteOnce,
}

impl Access {
	pub const fn is_readable(self) -> bool {
		matches!(self, Self::ReadOnly | Self::ReadWrite | Self::ReadWriteOnce)
	}

	pub const fn is_writable(self) -> bool {
		matches!(self, Self::WriteOnly | Self::ReadWrite | Self::ReadWriteOnce | Self::WriteOnce)
	}
}

/// One memory-mapped register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
	pub name: String,
	/// Absolute byte address.
	pub base_address: u64,
	/// Width in bits.
	pub size: u32,
	pub access: Access,
	#[serde(default)]
	pub reset_value: u64,
	#[serde(default)]
	pub reset_mask: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peripheral {
	pub name: String,
	#[serde(default)]
	pub registers: Vec<Register>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
	pub name: String,
	#[serde(default)]
	pub peripherals: Vec<Peripheral>,
}

/// Turns a descriptor file into a [`Device`].
pub trait DescriptorParser: Send + Sync {
	fn parse(&self, path: &Path) -> Result<Device>;
}

/// Reads devices stored as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDescriptorParser;

impl DescriptorParser for JsonDescriptorParser {
	fn parse(&self, path: &Path) -> Result<Device> {
		let text = std::fs::read_to_string(path).map_err(|err| IngestError::Descriptor {
			path: path.to_path_buf(),
			reason: err.to_string(),
		})?;
		serde_json::from_str(&text).map_err(|err| IngestError::Descriptor {
			path: path.to_path_buf(),
			reason: err.to_string(),
		})
	}
}
