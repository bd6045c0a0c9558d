use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::cache::LocalCache;
use crate::codec::{self, Native, Serializable};
use crate::error::{Result, StorageError};
use crate::{archive, handle};

const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Tunables for opening a [`Storage`].
#[derive(Debug, Clone, Copy)]
pub struct StorageOptions {
	/// Upper bound of the LMDB memory map in bytes.
	pub map_size: usize,
}

impl StorageOptions {
	/// Sets the cache map size in MiB.
	#[must_use]
	pub fn map_size_mib(mut self, mib: usize) -> Self {
		self.map_size = mib * 1024 * 1024;
		self
	}
}

impl Default for StorageOptions {
	fn default() -> Self {
		Self { map_size: 1024 * 1024 * 1024 }
	}
}

/// Handle-keyed store for serializable entities.
///
/// Pairs a transactional local cache (`<prefix>.cache`) with a portable
/// archive (`<prefix>.tar.gz`). Payloads read once are kept in an in-memory
/// index until the handle is rewritten or deleted through this instance.
pub struct Storage {
	prefix: PathBuf,
	cache: LocalCache,
	/// Handle to payload, `None` until first read.
	index: RefCell<BTreeMap<String, Option<String>>>,
}

impl Storage {
	/// Opens the storage at `prefix` with default options.
	pub fn open(prefix: impl AsRef<Path>) -> Result<Self> {
		Self::open_with(prefix, StorageOptions::default())
	}

	/// Opens or creates the local cache for `prefix`.
	///
	/// A trailing `.tar.gz` on `prefix` is ignored. When no cache exists yet
	/// but an archive does, the archive is imported before returning.
	pub fn open_with(prefix: impl AsRef<Path>, options: StorageOptions) -> Result<Self> {
		let prefix = strip_archive_suffix(prefix.as_ref());
		let cache_path = prefix.with_extension("cache");
		let archive_path = prefix.with_extension(&ARCHIVE_SUFFIX[1..]);

		let fresh = !cache_path.exists();
		let import_afterwards = fresh && archive_path.exists();
		if fresh {
			info!(cache = %cache_path.display(), "storage.create");
			if import_afterwards {
				info!(archive = %archive_path.display(), "storage.import_pending");
			}
		}

		let cache = LocalCache::open(&cache_path, options.map_size)?;
		let index = cache.handles()?.into_iter().map(|handle| (handle, None)).collect();
		let mut storage = Self {
			prefix,
			cache,
			index: RefCell::new(index),
		};

		if import_afterwards && let Err(err) = storage.import_archive() {
			// Leave no half-imported cache behind, otherwise the next open
			// would skip the import.
			storage.cache.close();
			let _ = fs::remove_dir_all(&cache_path);
			return Err(err);
		}

		Ok(storage)
	}

	/// Logical prefix shared by the cache and the archive.
	pub fn prefix(&self) -> &Path {
		&self.prefix
	}

	/// Location of the LMDB environment directory.
	pub fn cache_path(&self) -> PathBuf {
		self.prefix.with_extension("cache")
	}

	/// Location of the portable archive.
	pub fn archive_path(&self) -> PathBuf {
		self.prefix.with_extension(&ARCHIVE_SUFFIX[1..])
	}

	/// Returns the stored payload text for `handle`.
	pub fn get_raw(&self, handle: &str) -> Result<String> {
		let mut index = self.index.borrow_mut();
		let slot = index
			.get_mut(handle)
			.ok_or_else(|| StorageError::NotFound(handle.to_string()))?;
		if let Some(raw) = slot {
			return Ok(raw.clone());
		}
		let raw = self
			.cache
			.get(handle)?
			.ok_or_else(|| StorageError::NotFound(handle.to_string()))?;
		*slot = Some(raw.clone());
		Ok(raw)
	}

	/// Returns the payload decoded as plain JSON.
	pub fn get_native(&self, handle: &str) -> Result<Native> {
		Ok(serde_json::from_str(&self.get_raw(handle)?)?)
	}

	/// Returns the payload decoded as `T`.
	pub fn get_as<T: Serializable>(&self, handle: &str) -> Result<T> {
		codec::decode(&self.get_raw(handle)?)
	}

	/// Serializes `entity` and stores it under `handle`, committing before returning.
	pub fn set<T: Serializable>(&mut self, handle: &str, entity: &T) -> Result<()> {
		let payload = codec::encode(entity)?;
		self.set_raw(handle, payload)
	}

	/// Stores already-serialized payload text under `handle`.
	pub fn set_raw(&mut self, handle: &str, payload: String) -> Result<()> {
		handle::validate(handle)?;
		self.cache.put(handle, &payload)?;
		debug!(handle, bytes = payload.len(), "storage.set");
		self.index.get_mut().insert(handle.to_string(), Some(payload));
		Ok(())
	}

	/// Removes `handle`, committing before returning.
	pub fn delete(&mut self, handle: &str) -> Result<()> {
		if !self.contains(handle) {
			return Err(StorageError::NotFound(handle.to_string()));
		}
		self.cache.delete(handle)?;
		debug!(handle, "storage.delete");
		self.index.get_mut().remove(handle);
		Ok(())
	}

	/// Returns true when `handle` is stored.
	pub fn contains(&self, handle: &str) -> bool {
		self.index.borrow().contains_key(handle)
	}

	/// Number of stored handles.
	pub fn len(&self) -> usize {
		self.index.borrow().len()
	}

	/// Returns true when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// All handles in index order.
	pub fn handles(&self) -> Vec<String> {
		self.index.borrow().keys().cloned().collect()
	}

	/// Writes every handle into the archive, replacing the previous archive.
	pub fn export_archive(&self) -> Result<usize> {
		let mut entries = Vec::with_capacity(self.len());
		for handle in self.handles() {
			let payload = self.get_raw(&handle)?;
			entries.push((handle, payload));
		}
		let path = self.archive_path();
		let written = archive::write(&path, entries)?;
		info!(archive = %path.display(), entries = written, "storage.export_archive");
		Ok(written)
	}

	/// Upserts every archive entry into the cache.
	pub fn import_archive(&mut self) -> Result<usize> {
		let path = self.archive_path();
		let entries = archive::read(&path)?;
		for (handle, payload) in &entries {
			handle::validate(handle)?;
			serde_json::from_str::<Native>(payload)
				.map_err(|e| StorageError::Type(format!("archive entry {handle:?}: {e}")))?;
		}

		self.cache
			.put_many(entries.iter().map(|(handle, payload)| (handle.as_str(), payload.as_str())))?;
		let count = entries.len();
		let index = self.index.get_mut();
		for (handle, payload) in entries {
			index.insert(handle, Some(payload));
		}
		info!(archive = %path.display(), entries = count, "storage.import_archive");
		Ok(count)
	}

	/// Writes each payload to `<dir>/<handle>` with its extension replaced by
	/// `.json`.
	///
	/// Every destination is resolved before anything is written. If any of
	/// them falls outside `dir`, the export aborts with
	/// [`StorageError::PathTraversal`] and no file is created.
	pub fn export_dir(&self, dir: &Path) -> Result<usize> {
		fs::create_dir_all(dir)?;
		let root = dir.canonicalize()?;

		let mut planned = Vec::with_capacity(self.len());
		for handle in self.handles() {
			let destination = handle::resolve_within(&root, Path::new(&handle)).with_extension("json");
			if destination == root || !destination.starts_with(&root) {
				return Err(StorageError::PathTraversal(destination));
			}
			planned.push((handle, destination));
		}

		for (handle, destination) in &planned {
			if let Some(parent) = destination.parent() {
				fs::create_dir_all(parent)?;
				if !parent.canonicalize()?.starts_with(&root) {
					return Err(StorageError::PathTraversal(destination.clone()));
				}
			}
			fs::write(destination, self.get_raw(handle)?)?;
		}
		info!(dir = %root.display(), files = planned.len(), "storage.export_dir");
		Ok(planned.len())
	}

	/// Closes the cache, waiting until the environment can be reopened.
	pub fn close(self) {
		self.cache.close();
	}
}

impl fmt::Debug for Storage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Storage")
			.field("prefix", &self.prefix)
			.field("handles", &self.len())
			.finish()
	}
}

fn strip_archive_suffix(prefix: &Path) -> PathBuf {
	match prefix.to_str().and_then(|s| s.strip_suffix(ARCHIVE_SUFFIX)) {
		Some(stripped) => PathBuf::from(stripped),
		None => prefix.to_path_buf(),
	}
}
