//! Register address model for device memory maps.
//!
//! [`Address`] counts bits, [`AddressSpan`] is a half-open bit interval and
//! [`Value`] places one register's reset state on a span. A [`MemoryMap`]
//! merges register definitions per access direction, and [`Shadow`] reduces
//! a map to the 4-byte words it touches for fingerprint comparison.
//!
//! Every type here persists through [`svdmap_storage::Serializable`].

pub mod address;
pub mod error;
pub mod memory_map;
pub mod shadow;
pub mod span;
pub mod value;

pub use address::Address;
pub use error::{ModelError, Result};
pub use memory_map::{Direction, Insertion, MemoryMap};
pub use shadow::{Shadow, WORD};
pub use span::AddressSpan;
pub use value::{ResetValue, Value};
