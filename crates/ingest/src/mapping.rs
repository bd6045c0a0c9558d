use svdmap_model::{Address, AddressSpan, MemoryMap, Value};

use crate::descriptor::Device;
use crate::error::{IngestError, Result};

/// Highest register base address a descriptor may use.
pub const MAX_BASE_ADDRESS: u64 = 0xFFFF_FFFF;

/// Merges every register of `device` into a memory map.
///
/// Readable registers go to the read list and writable ones to the write
/// list; read-write registers land in both.
pub fn build_memory_map(device: &Device) -> Result<MemoryMap> {
	let mut map = MemoryMap::new();
	for peripheral in &device.peripherals {
		for register in &peripheral.registers {
			if register.base_address > MAX_BASE_ADDRESS {
				return Err(IngestError::AddressOutOfRange {
					peripheral: peripheral.name.clone(),
					register: register.name.clone(),
					address: register.base_address,
				});
			}

			let location = AddressSpan::new(Address::new(register.base_address as i64, 0), Address::from_bits(i64::from(register.size)));
			let value = Value::new(location, register.reset_value, register.reset_mask);
			if register.access.is_readable() {
				map.add_read(value.clone());
			}
			if register.access.is_writable() {
				map.add_written(value);
			}
		}
	}

	tracing::debug!(
		device = %device.name,
		read = map.read_values().len(),
		written = map.written_values().len(),
		conflicts = map.conflicts(),
		"ingest.memory_map"
	);
	Ok(map)
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::descriptor::{Access, Peripheral, Register};

	fn device(registers: Vec<Register>) -> Device {
		Device {
			name: "dev".into(),
			peripherals: vec![Peripheral {
				name: "P".into(),
				registers,
			}],
		}
	}

	fn register(name: &str, base_address: u64, access: Access, reset_value: u64) -> Register {
		Register {
			name: name.into(),
			base_address,
			size: 32,
			access,
			reset_value,
			reset_mask: 0xFFFF_FFFF,
		}
	}

	#[test]
	fn access_mode_selects_lists() {
		let map = build_memory_map(&device(vec![
			register("RO", 0x100, Access::ReadOnly, 0),
			register("WO", 0x104, Access::WriteOnly, 0),
			register("RW", 0x108, Access::ReadWrite, 0),
			register("W1", 0x10C, Access::WriteOnce, 0),
		]))
		.unwrap();

		let starts = |values: &[Value]| values.iter().map(|v| v.location.start().byte_offset()).collect::<Vec<_>>();
		assert_eq!(starts(map.read_values()), vec![0x100, 0x108]);
		assert_eq!(starts(map.written_values()), vec![0x104, 0x108, 0x10C]);
	}

	#[test]
	fn repeated_peripheral_registers_merge() {
		let map = build_memory_map(&device(vec![
			register("A", 0x200, Access::ReadOnly, 5),
			register("A_ALIAS", 0x200, Access::ReadOnly, 5),
		]))
		.unwrap();

		assert_eq!(map.read_values().len(), 1);
		assert_eq!(map.read_values()[0].hits, 2);
		assert_eq!(map.conflicts(), 0);
	}

	#[test]
	fn base_address_above_32_bits_is_rejected() {
		let err = build_memory_map(&device(vec![register("HIGH", 0x1_0000_0000, Access::ReadOnly, 0)])).unwrap_err();
		assert!(matches!(err, IngestError::AddressOutOfRange { address: 0x1_0000_0000, .. }));
	}

	#[test]
	fn highest_valid_base_address_is_accepted() {
		let map = build_memory_map(&device(vec![register("TOP", MAX_BASE_ADDRESS, Access::ReadOnly, 0)])).unwrap();
		assert_eq!(map.read_values()[0].location.start().byte_offset(), 0xFFFF_FFFF);
	}
}
