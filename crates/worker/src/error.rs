use thiserror::Error;

/// Errors raised while starting or supervising worker processes.
#[derive(Debug, Error)]
pub enum WorkerError {
	/// The worker program could not be started.
	#[error("failed to spawn worker {program}: {error}")]
	Spawn {
		program: String,
		#[source]
		error: std::io::Error,
	},

	/// Reading worker output or waiting on it failed.
	#[error("worker I/O failed: {0}")]
	Io(#[from] std::io::Error),

	/// Delivering a termination signal failed for a reason other than the
	/// process being gone.
	#[cfg(unix)]
	#[error("failed to signal worker group {pid}: {errno}")]
	Signal { pid: u32, errno: nix::errno::Errno },
}

/// Result type for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;
