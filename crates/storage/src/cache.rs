//! LMDB-backed local cache.
//!
//! One environment per storage prefix, holding a single `storage` database
//! that maps handle to payload text. Every mutation runs in its own write
//! transaction and is committed before the call returns.

use std::fs;
use std::path::Path;

use heed3::types::Str;
use heed3::{Database, Env, EnvOpenOptions};

use crate::error::Result;

const DB_STORAGE: &str = "storage";

pub(crate) struct LocalCache {
	env: Env,
	db: Database<Str, Str>,
}

impl LocalCache {
	/// Opens (or creates) the cache environment in `dir`.
	pub(crate) fn open(dir: &Path, map_size: usize) -> Result<Self> {
		fs::create_dir_all(dir)?;

		// SAFETY: a storage prefix is opened by at most one writable Storage at
		// a time, and the memory map is never handed out beyond a transaction.
		let env = unsafe { EnvOpenOptions::new().map_size(map_size).max_dbs(1).open(dir)? };

		let mut wtxn = env.write_txn()?;
		let db = env
			.database_options()
			.types::<Str, Str>()
			.name(DB_STORAGE)
			.create(&mut wtxn)?;
		wtxn.commit()?;

		Ok(Self { env, db })
	}

	/// Lists every stored handle in key order.
	pub(crate) fn handles(&self) -> Result<Vec<String>> {
		let rtxn = self.env.read_txn()?;
		let mut handles = Vec::new();
		for entry in self.db.iter(&rtxn)? {
			let (handle, _) = entry?;
			handles.push(handle.to_owned());
		}
		Ok(handles)
	}

	pub(crate) fn get(&self, handle: &str) -> Result<Option<String>> {
		let rtxn = self.env.read_txn()?;
		Ok(self.db.get(&rtxn, handle)?.map(str::to_owned))
	}

	/// Inserts or replaces one payload and commits.
	pub(crate) fn put(&self, handle: &str, payload: &str) -> Result<()> {
		let mut wtxn = self.env.write_txn()?;
		self.db.put(&mut wtxn, handle, payload)?;
		wtxn.commit()?;
		Ok(())
	}

	/// Upserts a batch of payloads in one transaction.
	pub(crate) fn put_many<'a>(&self, entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<()> {
		let mut wtxn = self.env.write_txn()?;
		for (handle, payload) in entries {
			self.db.put(&mut wtxn, handle, payload)?;
		}
		wtxn.commit()?;
		Ok(())
	}

	/// Removes one payload and commits. Returns whether it existed.
	pub(crate) fn delete(&self, handle: &str) -> Result<bool> {
		let mut wtxn = self.env.write_txn()?;
		let existed = self.db.delete(&mut wtxn, handle)?;
		wtxn.commit()?;
		Ok(existed)
	}

	/// Closes the environment and blocks until LMDB has released it.
	pub(crate) fn close(self) {
		self.env.prepare_for_closing().wait();
	}
}
