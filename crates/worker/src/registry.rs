use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// One live worker process.
#[derive(Debug, Clone)]
pub struct WorkerRecord {
	/// Process id, also the id of the worker's process group.
	pub pid: u32,
	pub input: String,
	pub generation: u64,
	pub started: Instant,
}

/// Worker processes that have been spawned and not yet reaped.
///
/// Units insert their record right after spawn and remove it only after
/// the process has been waited on, so an empty registry means no worker
/// process of this pool is left.
#[derive(Debug, Default, Clone)]
pub struct WorkerRegistry {
	inner: Arc<RwLock<HashMap<u32, WorkerRecord>>>,
}

impl WorkerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&self, record: WorkerRecord) {
		if let Ok(mut guard) = self.inner.write() {
			guard.insert(record.pid, record);
		}
	}

	pub fn remove(&self, pid: u32) {
		if let Ok(mut guard) = self.inner.write() {
			guard.remove(&pid);
		}
	}

	/// Live pids in ascending order.
	pub fn pids(&self) -> Vec<u32> {
		let Ok(guard) = self.inner.read() else {
			return Vec::new();
		};
		let mut pids: Vec<_> = guard.keys().copied().collect();
		pids.sort_unstable();
		pids
	}

	pub fn len(&self) -> usize {
		self.inner.read().map(|guard| guard.len()).unwrap_or(0)
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns snapshots sorted by pid.
	pub fn snapshots(&self) -> Vec<WorkerRecord> {
		let Ok(guard) = self.inner.read() else {
			return Vec::new();
		};
		let mut records: Vec<_> = guard.values().cloned().collect();
		records.sort_by_key(|record| record.pid);
		records
	}
}
