use tokio::task::JoinHandle;

use crate::TaskClass;

/// Spawns blocking work with worker classification metadata.
pub fn spawn_blocking<F, R>(class: TaskClass, f: F) -> JoinHandle<R>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn_blocking");
	tokio::task::spawn_blocking(f)
}

/// Builds the multi-threaded runtime that drives a pool.
pub fn runtime(threads: usize) -> std::io::Result<tokio::runtime::Runtime> {
	tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.worker_threads(threads.max(1))
		.thread_name("svdmap-worker")
		.build()
}
