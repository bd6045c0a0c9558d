use std::fmt;
use std::str::FromStr;

use svdmap_storage::codec::{self, Native, Serializable};
use svdmap_storage::serde_json::json;
use svdmap_storage::StorageError;

use crate::error::ModelError;
use crate::span::AddressSpan;

const CONFLICT: &str = "CONFLICT";

/// Reset value of a register location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResetValue {
	Known(u64),
	/// Overlapping definitions disagreed; no numeric meaning.
	Conflicting,
}

impl fmt::Display for ResetValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Known(value) => write!(f, "{value:#x}"),
			Self::Conflicting => f.write_str(CONFLICT),
		}
	}
}

impl FromStr for ResetValue {
	type Err = ModelError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s == CONFLICT {
			return Ok(Self::Conflicting);
		}
		parse_hex(s).map(Self::Known)
	}
}

/// Parses `0x`-prefixed or bare hexadecimal.
fn parse_hex(s: &str) -> Result<u64, ModelError> {
	let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
	if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
		return Err(ModelError::ResetFormat(s.to_string()));
	}
	u64::from_str_radix(digits, 16).map_err(|_| ModelError::ResetFormat(s.to_string()))
}

/// One register (or field) location with its reset state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
	pub location: AddressSpan,
	pub reset_value: ResetValue,
	/// Bits that are meaningful at reset.
	pub reset_mask: u64,
	/// Number of definitions merged into this entry.
	pub hits: u32,
}

impl Value {
	pub fn new(location: AddressSpan, reset_value: u64, reset_mask: u64) -> Self {
		Self {
			location,
			reset_value: ResetValue::Known(reset_value),
			reset_mask,
			hits: 1,
		}
	}

	/// True when overlapping definitions assigned different reset values.
	pub fn conflict(&self) -> bool {
		self.reset_value == ResetValue::Conflicting
	}

	pub fn mark_conflict(&mut self) {
		self.reset_value = ResetValue::Conflicting;
	}

	/// Discards `bits` leading bits: the location moves up and the reset
	/// value and mask drop their low bits so they stay aligned with it.
	pub fn shift_right(&mut self, bits: i64) {
		let before = self.location.start();
		self.location.shift_right(bits);
		let shift = (self.location.start() - before).bits() as u32;
		if let ResetValue::Known(value) = &mut self.reset_value {
			*value = value.checked_shr(shift).unwrap_or(0);
		}
		self.reset_mask = self.reset_mask.checked_shr(shift).unwrap_or(0);
	}
}

impl Serializable for Value {
	fn serialize(&self) -> svdmap_storage::Result<Native> {
		let mut native = json!({
			"location": self.location.serialize()?,
			"reset_value": self.reset_value.to_string(),
			"reset_mask": format!("{:#x}", self.reset_mask),
		});
		if self.hits != 1
			&& let Native::Object(map) = &mut native
		{
			map.insert("hits".to_string(), json!(self.hits));
		}
		Ok(native)
	}

	fn unserialize(data: Native) -> svdmap_storage::Result<Self> {
		let mut map = codec::expect_object(data, "value")?;
		let location = AddressSpan::unserialize(codec::take_field(&mut map, "location")?)?;
		let reset_value = codec::expect_str(codec::take_field(&mut map, "reset_value")?, "reset_value")?.parse()?;
		let reset_mask = parse_hex(&codec::expect_str(codec::take_field(&mut map, "reset_mask")?, "reset_mask")?)?;
		let hits = match map.remove("hits") {
			None => 1,
			Some(hits) => hits
				.as_u64()
				.and_then(|h| u32::try_from(h).ok())
				.ok_or_else(|| StorageError::type_mismatch(format!("hits: expected int, got {hits}")))?,
		};

		Ok(Self {
			location,
			reset_value,
			reset_mask,
			hits,
		})
	}
}
