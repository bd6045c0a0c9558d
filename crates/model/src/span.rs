use std::fmt;
use std::ops::BitOrAssign;

use svdmap_storage::codec::{self, Native, Serializable};
use svdmap_storage::serde_json::json;

use crate::address::Address;

/// A half-open bit interval `[start, start + size)`.
///
/// `size` is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressSpan {
	start: Address,
	size: Address,
}

impl AddressSpan {
	/// Creates a span. A negative `size` is clamped to zero.
	pub fn new(start: Address, size: Address) -> Self {
		Self {
			start,
			size: size.max(Address::ZERO),
		}
	}

	/// Span of `size_bits` bits starting at byte `byte_offset`.
	pub fn bytes(byte_offset: i64, size_bits: i64) -> Self {
		Self::new(Address::new(byte_offset, 0), Address::from_bits(size_bits))
	}

	pub fn start(&self) -> Address {
		self.start
	}

	pub fn size(&self) -> Address {
		self.size
	}

	/// First bit past the span.
	pub fn end(&self) -> Address {
		self.start + self.size
	}

	/// Moves the end, keeping the start. An end before the start empties the span.
	pub fn set_end(&mut self, end: Address) {
		self.size = (end - self.start).max(Address::ZERO);
	}

	/// Last bit inside the span. For an empty span this is the bit before `start`.
	pub fn last_bit(&self) -> Address {
		self.start + Address::from_bits(self.size.bits() - 1)
	}

	pub fn is_empty(&self) -> bool {
		self.size.is_zero()
	}

	/// Half-open interval intersection test.
	pub fn overlaps(&self, other: &AddressSpan) -> bool {
		self.start < other.end() && other.start < self.end()
	}

	/// Smallest span covering both.
	#[must_use]
	pub fn union(&self, other: &AddressSpan) -> AddressSpan {
		let mut merged = *self;
		merged |= *other;
		merged
	}

	/// Advances the start by `bits` while shrinking the size by the same amount.
	///
	/// Discards consumed leading bits. At most `size` bits can be discarded.
	pub fn shift_right(&mut self, bits: i64) {
		let bits = Address::from_bits(bits.clamp(0, self.size.bits()));
		self.start += bits;
		self.size -= bits;
	}
}

impl BitOrAssign for AddressSpan {
	fn bitor_assign(&mut self, other: AddressSpan) {
		let end = self.end().max(other.end());
		self.start = self.start.min(other.start);
		self.set_end(end);
	}
}

impl fmt::Display for AddressSpan {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}..{}", self.start, self.end())
	}
}

impl Serializable for AddressSpan {
	fn serialize(&self) -> svdmap_storage::Result<Native> {
		Ok(json!({
			"start": self.start.serialize()?,
			"size": self.size.serialize()?,
		}))
	}

	fn unserialize(data: Native) -> svdmap_storage::Result<Self> {
		let mut map = codec::expect_object(data, "address span")?;
		let start = Address::unserialize(codec::take_field(&mut map, "start")?)?;
		let size = Address::unserialize(codec::take_field(&mut map, "size")?)?;
		Ok(Self::new(start, size))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn derived_bounds() {
		let span = AddressSpan::bytes(0x10, 32);
		assert_eq!(span.end(), Address::new(0x14, 0));
		assert_eq!(span.last_bit(), Address::new(0x13, 7));
	}

	#[test]
	fn overlap_is_half_open() {
		let a = AddressSpan::bytes(0, 32);
		assert!(a.overlaps(&AddressSpan::bytes(3, 8)));
		assert!(!a.overlaps(&AddressSpan::bytes(4, 8)));
		assert!(AddressSpan::bytes(4, 8).overlaps(&AddressSpan::new(Address::new(4, 7), Address::from_bits(1))));
	}

	#[test]
	fn union_spans_both() {
		let merged = AddressSpan::bytes(4, 8).union(&AddressSpan::bytes(0, 40));
		assert_eq!(merged, AddressSpan::bytes(0, 40));

		let merged = AddressSpan::bytes(0, 16).union(&AddressSpan::bytes(1, 16));
		assert_eq!(merged, AddressSpan::bytes(0, 24));
	}

	#[test]
	fn shift_right_discards_leading_bits() {
		let mut span = AddressSpan::bytes(8, 32);
		span.shift_right(12);
		assert_eq!(span.start(), Address::new(9, 4));
		assert_eq!(span.size(), Address::from_bits(20));
		assert_eq!(span.end(), Address::new(12, 0));

		span.shift_right(100);
		assert!(span.is_empty());
		assert_eq!(span.start(), Address::new(12, 0));
	}

	#[test]
	fn serializes_as_start_and_size() {
		let span = AddressSpan::new(Address::new(0x4000_0000, 0), Address::from_bits(32));
		let native = span.serialize().unwrap();
		assert_eq!(native, json!({"start": "40000000:0", "size": "00000004:0"}));
		assert_eq!(AddressSpan::unserialize(native).unwrap(), span);
	}
}
