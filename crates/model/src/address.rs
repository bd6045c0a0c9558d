use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use svdmap_storage::codec::{self, Native, Serializable};

use crate::error::ModelError;

/// An absolute bit position: `byte_offset * 8 + bit_offset`.
///
/// Negative bit counts only appear as intermediates of subtraction. Text
/// form is `BBBBBBBB:b` (upper-case hex byte offset, decimal bit offset).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address {
	bits: i64,
}

impl Address {
	/// Address of bit zero.
	pub const ZERO: Self = Self { bits: 0 };

	/// Builds an address from a byte offset and a bit offset within it.
	pub const fn new(byte_offset: i64, bit_offset: i64) -> Self {
		Self {
			bits: byte_offset * 8 + bit_offset,
		}
	}

	/// Builds an address from a raw bit count.
	pub const fn from_bits(bits: i64) -> Self {
		Self { bits }
	}

	/// Raw bit count.
	pub const fn bits(self) -> i64 {
		self.bits
	}

	/// Whole bytes, rounded toward negative infinity.
	pub const fn byte_offset(self) -> i64 {
		self.bits.div_euclid(8)
	}

	/// Bit within [`Self::byte_offset`], always `0..8`.
	pub const fn bit_offset(self) -> u8 {
		self.bits.rem_euclid(8) as u8
	}

	pub const fn is_zero(self) -> bool {
		self.bits == 0
	}
}

impl Add for Address {
	type Output = Address;

	fn add(self, rhs: Address) -> Address {
		Address::from_bits(self.bits + rhs.bits)
	}
}

impl AddAssign for Address {
	fn add_assign(&mut self, rhs: Address) {
		*self = *self + rhs;
	}
}

impl Neg for Address {
	type Output = Address;

	fn neg(self) -> Address {
		Address::from_bits(-self.bits)
	}
}

impl Sub for Address {
	type Output = Address;

	fn sub(self, rhs: Address) -> Address {
		self + (-rhs)
	}
}

impl SubAssign for Address {
	fn sub_assign(&mut self, rhs: Address) {
		*self = *self - rhs;
	}
}

impl Ord for Address {
	fn cmp(&self, other: &Self) -> Ordering {
		(self.byte_offset(), self.bit_offset()).cmp(&(other.byte_offset(), other.bit_offset()))
	}
}

impl PartialOrd for Address {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

/// Only the literal zero compares equal to an address, and only to [`Address::ZERO`].
impl PartialEq<i64> for Address {
	fn eq(&self, other: &i64) -> bool {
		*other == 0 && self.is_zero()
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let byte = self.byte_offset();
		if byte < 0 {
			write!(f, "-{:08X}:{}", byte.unsigned_abs(), self.bit_offset())
		} else {
			write!(f, "{byte:08X}:{}", self.bit_offset())
		}
	}
}

impl fmt::Debug for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Address({self})")
	}
}

impl FromStr for Address {
	type Err = ModelError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let malformed = || ModelError::AddressFormat(s.to_string());

		let (byte, bit) = s.split_once(':').ok_or_else(malformed)?;
		if byte.is_empty() || !byte.bytes().all(|b| b.is_ascii_hexdigit()) {
			return Err(malformed());
		}
		if bit.is_empty() || !bit.bytes().all(|b| b.is_ascii_digit()) {
			return Err(malformed());
		}

		let byte = u64::from_str_radix(byte, 16).map_err(|_| malformed())?;
		let bit: u8 = bit.parse().map_err(|_| malformed())?;
		if bit >= 8 || byte > (i64::MAX / 8) as u64 {
			return Err(malformed());
		}
		Ok(Address::new(byte as i64, i64::from(bit)))
	}
}

impl Serializable for Address {
	fn serialize(&self) -> svdmap_storage::Result<Native> {
		Ok(Native::String(self.to_string()))
	}

	fn unserialize(data: Native) -> svdmap_storage::Result<Self> {
		Ok(codec::expect_str(data, "address")?.parse()?)
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;

	#[test]
	fn splits_bits_into_byte_and_bit() {
		let addr = Address::new(0x4000_0010, 3);
		assert_eq!(addr.byte_offset(), 0x4000_0010);
		assert_eq!(addr.bit_offset(), 3);
		assert_eq!(addr.to_string(), "40000010:3");
	}

	#[test]
	fn subtraction_goes_through_negation() {
		let a = Address::new(4, 2);
		let b = Address::new(1, 7);
		assert_eq!(a - b, Address::from_bits(35 - 15));
		assert_eq!(b - a, -(a - b));
		assert!((b - a).bits() < 0);
	}

	#[test]
	fn orders_by_byte_then_bit() {
		assert!(Address::new(1, 7) < Address::new(2, 0));
		assert!(Address::new(2, 1) > Address::new(2, 0));
		assert_eq!(Address::new(0, 8), Address::new(1, 0));
	}

	#[test]
	fn compares_equal_to_literal_zero_only() {
		assert!(Address::ZERO == 0);
		assert!(Address::new(0, 0) == 0);
		assert!(Address::new(0, 1) != 0);
		assert!(Address::new(0, 1) != 1);
	}

	#[test]
	fn parses_either_hex_case() {
		assert_eq!("0000abcd:1".parse::<Address>().unwrap(), Address::new(0xABCD, 1));
		assert_eq!("0000ABCD:1".parse::<Address>().unwrap(), Address::new(0xABCD, 1));
	}

	#[test]
	fn rejects_malformed_text() {
		for text in ["", "12", "12:", ":3", "12:8", "xyz:1", "12:1:2", "+12:1", "12:-1", "-12:1"] {
			assert!(
				matches!(text.parse::<Address>(), Err(ModelError::AddressFormat(_))),
				"{text:?} should not parse"
			);
		}
	}

	proptest! {
		#[test]
		fn text_form_roundtrips(byte in 0i64..=0xFFFF_FFFF, bit in 0i64..8) {
			let addr = Address::new(byte, bit);
			prop_assert_eq!(addr.to_string().parse::<Address>().unwrap(), addr);
		}
	}
}
