use std::future::Future;

use tokio::task::{Id, JoinError, JoinSet};

use crate::TaskClass;

/// Tokio [`JoinSet`] tagged with a [`TaskClass`].
///
/// Completions carry the task [`Id`] so a caller can still tell which unit
/// failed when the task itself panicked.
#[derive(Debug)]
pub struct WorkerJoinSet<T> {
	class: TaskClass,
	inner: JoinSet<T>,
}

impl<T> WorkerJoinSet<T>
where
	T: Send + 'static,
{
	pub fn new(class: TaskClass) -> Self {
		Self { class, inner: JoinSet::new() }
	}

	pub fn len(&self) -> usize {
		self.inner.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Spawns a future into the set on the current runtime.
	pub fn spawn<F>(&mut self, fut: F) -> Id
	where
		F: Future<Output = T> + Send + 'static,
	{
		tracing::trace!(worker_class = self.class.as_str(), pending = self.inner.len(), "worker.join_set.spawn");
		self.inner.spawn(fut).id()
	}

	/// Waits for the next completed task.
	pub async fn join_next(&mut self) -> Option<Result<(Id, T), JoinError>> {
		self.inner.join_next_with_id().await
	}
}
