use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::memory_map::{Direction, MemoryMap};

/// Word size of the projection, in bytes.
pub const WORD: u64 = 4;

/// Word-granular read and write address sets of one device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shadow {
	pub name: String,
	#[serde(with = "word_set")]
	pub read: BTreeSet<u64>,
	#[serde(with = "word_set")]
	pub write: BTreeSet<u64>,
}

svdmap_storage::schema_model!(Shadow);

impl Shadow {
	/// Projects every entry of `map` onto the 4-byte words it touches.
	pub fn project(name: impl Into<String>, map: &MemoryMap) -> Self {
		let mut shadow = Shadow {
			name: name.into(),
			..Default::default()
		};
		for direction in Direction::ALL {
			let words = match direction {
				Direction::Read => &mut shadow.read,
				Direction::Write => &mut shadow.write,
			};
			for value in map.values(direction) {
				let first = word_of(value.location.start().byte_offset());
				let last = word_of(value.location.last_bit().byte_offset());
				let mut word = first;
				while word <= last {
					words.insert(word);
					word += WORD;
				}
			}
		}
		shadow
	}
}

fn word_of(byte_offset: i64) -> u64 {
	u64::try_from(byte_offset).unwrap_or(0) & !(WORD - 1)
}

/// Serde helpers for sets of word addresses.
///
/// Written as sorted 8-digit lower-case hex strings. Read from hex strings
/// (with or without `0x`) or plain integers.
pub mod word_set {
	use std::collections::BTreeSet;

	use serde::de::Error as _;
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(words: &BTreeSet<u64>, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_seq(words.iter().map(|word| format!("{word:08x}")))
	}

	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Word {
		Int(u64),
		Hex(String),
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeSet<u64>, D::Error> {
		Vec::<Word>::deserialize(deserializer)?
			.into_iter()
			.map(|word| match word {
				Word::Int(value) => Ok(value),
				Word::Hex(text) => {
					let digits = text.strip_prefix("0x").unwrap_or(&text);
					u64::from_str_radix(digits, 16).map_err(|_| D::Error::custom(format!("invalid word address {text:?}")))
				}
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use svdmap_storage::serde_json::json;
	use svdmap_storage::{Serializable, StorageError};

	use super::*;
	use crate::address::Address;
	use crate::span::AddressSpan;
	use crate::value::Value;

	#[test]
	fn value_inside_one_word_projects_once() {
		let mut map = MemoryMap::new();
		map.add_read(Value::new(AddressSpan::new(Address::new(0x105, 2), Address::from_bits(9)), 0, 0));

		let shadow = Shadow::project("dev", &map);
		assert_eq!(shadow.read, BTreeSet::from([0x104]));
		assert!(shadow.write.is_empty());
	}

	#[test]
	fn spanning_value_covers_every_word() {
		let mut map = MemoryMap::new();
		map.add_written(Value::new(AddressSpan::bytes(0x2, 96), 0, 0));

		let shadow = Shadow::project("dev", &map);
		assert_eq!(shadow.write, BTreeSet::from([0x0, 0x4, 0x8, 0xC]));
	}

	#[test]
	fn word_aligned_register_ends_in_its_word() {
		let mut map = MemoryMap::new();
		map.add_read(Value::new(AddressSpan::bytes(0x4000_0000, 32), 0, 0));
		map.add_read(Value::new(AddressSpan::bytes(0x4000_0008, 32), 0, 0));

		let shadow = Shadow::project("dev", &map);
		assert_eq!(shadow.read, BTreeSet::from([0x4000_0000, 0x4000_0008]));
	}

	#[test]
	fn words_serialize_sorted_as_hex() {
		let shadow = Shadow {
			name: "stm32".into(),
			read: BTreeSet::from([0x4000_0008, 0x4000_0000]),
			write: BTreeSet::new(),
		};

		let native = svdmap_storage::Serializable::serialize(&shadow).unwrap();
		assert_eq!(native, json!({"name": "stm32", "read": ["40000000", "40000008"], "write": []}));
		assert_eq!(Shadow::unserialize(native).unwrap(), shadow);
	}

	#[test]
	fn words_accept_integers_and_prefixed_hex() {
		let native = json!({"name": "x", "read": [16, "0x14", "00000018"], "write": []});
		let shadow = Shadow::unserialize(native).unwrap();
		assert_eq!(shadow.read, BTreeSet::from([0x10, 0x14, 0x18]));
	}

	#[test]
	fn bad_word_is_type_error() {
		let native = json!({"name": "x", "read": ["zz"], "write": []});
		assert!(matches!(Shadow::unserialize(native), Err(StorageError::Type(_))));
	}
}
