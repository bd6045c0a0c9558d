//! Conflict-aware merging of register definitions.
//!
//! A [`MemoryMap`] keeps two independent lists, one per access
//! [`Direction`]. Each list is strictly ordered by span start and no two
//! entries overlap. Insertion preserves that after every call:
//!
//! * an identical `(span, reset value)` repeats the existing entry,
//! * any other collision turns the existing entry into a conflict whose span
//!   grows to the union, absorbing later entries the grown span now reaches,
//! * otherwise the value is inserted at its sorted position.
//!
//! Conflicts are logged at warn level and never fail the insertion.

use std::fmt;

use svdmap_storage::codec::{self, Native, Serializable};
use svdmap_storage::serde_json::json;

use crate::span::AddressSpan;
use crate::value::Value;

#[cfg(test)]
mod tests;

/// Access direction of a register list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
	Read,
	Write,
}

impl Direction {
	pub const ALL: [Direction; 2] = [Direction::Read, Direction::Write];

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Read => "read",
			Self::Write => "write",
		}
	}
}

impl fmt::Display for Direction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// What [`MemoryMap::add`] did with a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
	/// Stored as a new entry.
	Inserted,
	/// Same span and reset value as an existing entry; its hit count grew.
	Repeated,
	/// Collided with the existing entry at this span (as it was before the
	/// merge); the entry is now conflicting and covers both spans.
	Conflict(AddressSpan),
}

/// Merged read and write register lists of one device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryMap {
	read_values: Vec<Value>,
	written_values: Vec<Value>,
}

impl MemoryMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Entries of one direction, ordered by start.
	pub fn values(&self, direction: Direction) -> &[Value] {
		match direction {
			Direction::Read => &self.read_values,
			Direction::Write => &self.written_values,
		}
	}

	pub fn read_values(&self) -> &[Value] {
		&self.read_values
	}

	pub fn written_values(&self) -> &[Value] {
		&self.written_values
	}

	fn values_mut(&mut self, direction: Direction) -> &mut Vec<Value> {
		match direction {
			Direction::Read => &mut self.read_values,
			Direction::Write => &mut self.written_values,
		}
	}

	/// Inserts `value` into the list for `direction`.
	pub fn add(&mut self, direction: Direction, value: Value) -> Insertion {
		let outcome = insert(self.values_mut(direction), value);
		if let Insertion::Conflict(span) = outcome {
			tracing::warn!(direction = direction.as_str(), span = %span, "conflicting registers at {span}");
		}
		outcome
	}

	pub fn add_read(&mut self, value: Value) -> Insertion {
		self.add(Direction::Read, value)
	}

	pub fn add_written(&mut self, value: Value) -> Insertion {
		self.add(Direction::Write, value)
	}

	/// Number of conflicting entries across both lists.
	pub fn conflicts(&self) -> usize {
		self.read_values.iter().chain(&self.written_values).filter(|v| v.conflict()).count()
	}

	pub fn is_empty(&self) -> bool {
		self.read_values.is_empty() && self.written_values.is_empty()
	}
}

/// Two spans name the same location when they overlap or share a start.
///
/// The shared-start case covers zero-size spans, which never overlap.
fn collides(a: &AddressSpan, b: &AddressSpan) -> bool {
	a.overlaps(b) || a.start() == b.start()
}

fn insert(list: &mut Vec<Value>, value: Value) -> Insertion {
	for index in 0..list.len() {
		let existing = &mut list[index];

		if collides(&existing.location, &value.location) {
			existing.hits = existing.hits.saturating_add(1);
			if existing.location == value.location && existing.reset_value == value.reset_value {
				return Insertion::Repeated;
			}

			let before = existing.location;
			existing.location |= value.location;
			existing.mark_conflict();
			absorb_following(list, index);
			return Insertion::Conflict(before);
		}

		if existing.location.start() > value.location.start() {
			list.insert(index, value);
			return Insertion::Inserted;
		}
	}

	list.push(value);
	Insertion::Inserted
}

/// Folds entries after `index` into it while they collide with its span.
fn absorb_following(list: &mut Vec<Value>, index: usize) {
	while index + 1 < list.len() && collides(&list[index].location, &list[index + 1].location) {
		let next = list.remove(index + 1);
		let merged = &mut list[index];
		merged.location |= next.location;
		merged.hits = merged.hits.saturating_add(next.hits);
	}
}

impl Serializable for MemoryMap {
	fn serialize(&self) -> svdmap_storage::Result<Native> {
		let encode_list = |values: &[Value]| values.iter().map(Serializable::serialize).collect::<svdmap_storage::Result<Vec<_>>>();
		Ok(json!({
			"read_values": encode_list(&self.read_values)?,
			"written_values": encode_list(&self.written_values)?,
		}))
	}

	fn unserialize(data: Native) -> svdmap_storage::Result<Self> {
		let mut map = codec::expect_object(data, "memory map")?;
		let mut decode_list = |key: &str| -> svdmap_storage::Result<Vec<Value>> {
			codec::expect_array(codec::take_field(&mut map, key)?, key)?
				.into_iter()
				.map(Value::unserialize)
				.collect()
		};
		let read_values = decode_list("read_values")?;
		let written_values = decode_list("written_values")?;

		Ok(Self {
			read_values,
			written_values,
		})
	}
}
