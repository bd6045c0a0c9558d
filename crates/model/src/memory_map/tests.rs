use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;
use crate::address::Address;
use crate::value::ResetValue;

fn reg(byte: i64, size_bits: i64, reset: u64) -> Value {
	Value::new(AddressSpan::bytes(byte, size_bits), reset, u64::MAX)
}

fn assert_sorted_disjoint(values: &[Value]) {
	for pair in values.windows(2) {
		let (a, b) = (&pair[0].location, &pair[1].location);
		assert!(a.start() < b.start(), "{a} must start before {b}");
		assert!(!a.overlaps(b), "{a} overlaps {b}");
	}
}

#[test]
fn inserts_keep_start_order() {
	let mut map = MemoryMap::new();
	for byte in [8, 0, 12, 4] {
		assert_eq!(map.add_read(reg(byte, 32, 0)), Insertion::Inserted);
	}

	let starts: Vec<_> = map.read_values().iter().map(|v| v.location.start().byte_offset()).collect();
	assert_eq!(starts, vec![0, 4, 8, 12]);
	assert!(map.written_values().is_empty());
}

#[test]
fn identical_value_is_repeated() {
	let mut map = MemoryMap::new();
	map.add_read(reg(4, 32, 7));
	assert_eq!(map.add_read(reg(4, 32, 7)), Insertion::Repeated);

	let values = map.read_values();
	assert_eq!(values.len(), 1);
	assert_eq!(values[0].hits, 2);
	assert!(!values[0].conflict());
	assert_eq!(values[0].reset_value, ResetValue::Known(7));
}

#[test]
fn differing_reset_is_conflict() {
	let mut map = MemoryMap::new();
	map.add_written(reg(4, 32, 1));
	assert_eq!(map.add_written(reg(4, 32, 2)), Insertion::Conflict(AddressSpan::bytes(4, 32)));

	let values = map.written_values();
	assert_eq!(values.len(), 1);
	assert!(values[0].conflict());
	assert_eq!(values[0].hits, 2);
	assert_eq!(map.conflicts(), 1);
}

#[test]
fn overlapping_spans_merge_to_union() {
	let mut map = MemoryMap::new();
	map.add_read(reg(0, 16, 0));
	let outcome = map.add_read(reg(1, 16, 0));

	assert_eq!(outcome, Insertion::Conflict(AddressSpan::bytes(0, 16)));
	let values = map.read_values();
	assert_eq!(values.len(), 1);
	assert_eq!(values[0].location, AddressSpan::bytes(0, 24));
	assert!(values[0].conflict());
	assert_eq!(values[0].hits, 2);
}

#[test]
fn existing_entry_keeps_its_mask() {
	let mut map = MemoryMap::new();
	map.add_read(Value::new(AddressSpan::bytes(0, 32), 1, 0xff));
	map.add_read(Value::new(AddressSpan::bytes(0, 32), 2, 0xffff));

	assert_eq!(map.read_values()[0].reset_mask, 0xff);
}

#[test]
fn grown_span_absorbs_later_entries() {
	let mut map = MemoryMap::new();
	map.add_read(reg(0, 32, 0));
	map.add_read(reg(4, 32, 0));
	map.add_read(reg(8, 32, 0));
	map.add_read(reg(16, 32, 0));

	// Reaches from the first entry into the third.
	map.add_read(reg(2, 64, 9));

	let values = map.read_values();
	assert_sorted_disjoint(values);
	assert_eq!(values.len(), 2);
	assert_eq!(values[0].location, AddressSpan::bytes(0, 96));
	assert_eq!(values[0].hits, 4);
	assert_eq!(values[1].location, AddressSpan::bytes(16, 32));
}

#[test]
fn zero_size_spans_at_same_start_collide() {
	let mut map = MemoryMap::new();
	let empty = |reset| Value::new(AddressSpan::new(Address::new(4, 0), Address::ZERO), reset, 0);

	assert_eq!(map.add_read(empty(0)), Insertion::Inserted);
	assert_eq!(map.add_read(empty(0)), Insertion::Repeated);
	assert!(matches!(map.add_read(empty(1)), Insertion::Conflict(_)));
	assert_eq!(map.read_values().len(), 1);
}

#[test]
fn directions_are_independent() {
	let mut map = MemoryMap::new();
	map.add(Direction::Read, reg(0, 32, 1));
	map.add(Direction::Write, reg(0, 32, 2));

	assert_eq!(map.values(Direction::Read).len(), 1);
	assert_eq!(map.values(Direction::Write).len(), 1);
	assert_eq!(map.conflicts(), 0);
}

#[test]
fn serialized_lists_roundtrip() {
	let mut map = MemoryMap::new();
	map.add_read(reg(0x4000_0000, 32, 0x10));
	map.add_read(reg(0x4000_0000, 32, 0x10));
	map.add_written(reg(0x4000_0004, 16, 0));
	map.add_written(reg(0x4000_0005, 16, 3));

	let native = map.serialize().unwrap();
	assert_eq!(native["read_values"][0]["hits"], 2);
	assert_eq!(native["written_values"][0]["reset_value"], "CONFLICT");
	assert_eq!(MemoryMap::unserialize(native).unwrap(), map);
}

#[test]
fn missing_list_is_type_error() {
	let native = json!({"read_values": []});
	assert!(matches!(MemoryMap::unserialize(native), Err(svdmap_storage::StorageError::Type(_))));
}

proptest! {
	#[test]
	fn insertions_keep_lists_sorted_and_disjoint(
		regs in prop::collection::vec((0i64..64, 0i64..8, 0i64..48, 0u64..3, any::<bool>()), 0..40),
	) {
		let mut map = MemoryMap::new();
		for (byte, bit, size, reset, write) in regs {
			let value = Value::new(AddressSpan::new(Address::new(byte, bit), Address::from_bits(size)), reset, 0);
			let direction = if write { Direction::Write } else { Direction::Read };
			map.add(direction, value);
		}

		for direction in Direction::ALL {
			let values = map.values(direction);
			for pair in values.windows(2) {
				prop_assert!(pair[0].location.start() < pair[1].location.start());
				prop_assert!(!pair[0].location.overlaps(&pair[1].location));
			}
		}
	}

	#[test]
	fn repeated_insert_is_idempotent(byte in 0i64..1024, size in 1i64..64, reset in any::<u64>()) {
		let mut map = MemoryMap::new();
		let value = Value::new(AddressSpan::bytes(byte, size), reset, 0);
		map.add_read(value.clone());
		prop_assert_eq!(map.add_read(value), Insertion::Repeated);
		prop_assert_eq!(map.read_values().len(), 1);
		prop_assert_eq!(map.read_values()[0].hits, 2);
		prop_assert!(!map.read_values()[0].conflict());
	}
}
