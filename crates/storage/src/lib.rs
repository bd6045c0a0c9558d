//! # Storage
//!
//! ## Purpose
//! Durable, resumable persistence for arbitrary serializable entities, keyed
//! by a stable string handle. Every other svdmap component stores through
//! this crate; it knows nothing about memory maps or shadows.
//!
//! ## Mental model
//! A [`Storage`] is a `handle -> JSON text` map with two on-disk forms:
//! - `<prefix>.cache`: an LMDB environment (via heed) holding a single
//!   `storage` database. This is the working copy.
//! - `<prefix>.tar.gz`: a gzip-compressed tar with one entry per handle.
//!   This is the distributable copy.
//!
//! ## Invariants
//! - Each `set`/`delete` commits its own write transaction before returning.
//!   - Enforced in: `LocalCache::put`, `LocalCache::delete`.
//!   - Tested by: `tests::set_then_reopen_reads_committed_value`.
//! - The in-memory index mirrors the cache's handle set.
//!   - Enforced in: `Storage::open_with`, `Storage::set_raw`, `Storage::delete`, `Storage::import_archive`.
//!   - Tested by: `tests::delete_removes_handle`, `tests::archive_roundtrip_into_fresh_storage`.
//! - Handles are valid relative archive paths.
//!   - Enforced in: `handle::validate`.
//!   - Tested by: `tests::rejects_absolute_and_parent_handles`.
//! - Per-handle export never writes outside the output directory.
//!   - Enforced in: `Storage::export_dir`.
//!   - Tested by: `tests::export_dir_rejects_traversal_before_writing`.
//!
//! ## Lifecycle
//! - `Storage::open` creates the cache if missing and imports the archive of
//!   the same prefix when only the archive exists.
//! - Dropping a `Storage` releases the environment; `Storage::close` also
//!   waits until LMDB has let go of it.
//!
//! ## Concurrency & ordering
//! - One writable `Storage` per prefix. LMDB serializes writers, but two
//!   instances would keep diverging in-memory indexes.
//! - Handle iteration follows key order.

mod archive;
mod cache;
pub mod codec;
mod error;
mod handle;
mod storage;

#[cfg(test)]
mod tests;

pub use codec::{Native, Serializable, decode, encode};
pub use error::{Result, StorageError};
pub use serde_json;
pub use storage::{Storage, StorageOptions};
