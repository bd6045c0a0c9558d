use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::join_set::WorkerJoinSet;
use crate::reap::{self, SweepReport, Termination};
use crate::registry::{WorkerRecord, WorkerRegistry};
use crate::token::{BatchToken, GenerationClock};
use crate::{TaskClass, WorkerError, join_error_panic_message};

/// Program and leading arguments of a worker process.
///
/// Each unit runs `<program> <args…> <input>`.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
	program: PathBuf,
	args: Vec<OsString>,
	envs: Vec<(OsString, OsString)>,
}

impl WorkerCommand {
	pub fn new(program: impl Into<PathBuf>) -> Self {
		Self {
			program: program.into(),
			args: Vec::new(),
			envs: Vec::new(),
		}
	}

	pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
		self.args.push(arg.into());
		self
	}

	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<OsString>,
	{
		self.args.extend(args.into_iter().map(Into::into));
		self
	}

	pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
		self.envs.push((key.into(), value.into()));
		self
	}

	pub fn program(&self) -> &Path {
		&self.program
	}

	fn spawn(&self, input: &str) -> crate::Result<Child> {
		let mut cmd = Command::new(&self.program);
		cmd.args(&self.args)
			.arg(input)
			.envs(self.envs.iter().map(|(k, v)| (k, v)))
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true);

		#[cfg(unix)]
		cmd.process_group(0);

		cmd.spawn().map_err(|error| WorkerError::Spawn {
			program: self.program.display().to_string(),
			error,
		})
	}
}

/// Pool sizing and timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
	/// Maximum concurrent worker processes, at least 1.
	pub workers: usize,
	/// Bound on the whole batch. `None` waits for every unit.
	pub deadline: Option<Duration>,
	/// Time workers get to exit after `SIGTERM` before `SIGKILL` sweeps start.
	pub grace: Duration,
	/// Interval between termination sweeps.
	pub poll: Duration,
}

impl Default for PoolConfig {
	fn default() -> Self {
		Self {
			workers: std::thread::available_parallelism().map(usize::from).unwrap_or(1),
			deadline: None,
			grace: Duration::from_millis(500),
			poll: Duration::from_millis(50),
		}
	}
}

/// What became of one input.
#[derive(Debug)]
pub struct UnitReport {
	pub input: String,
	pub outcome: UnitOutcome,
}

#[derive(Debug)]
pub enum UnitOutcome {
	/// The worker ran to exit.
	Exited {
		status: ExitStatus,
		stdout: Vec<u8>,
		stderr: Vec<u8>,
	},
	/// The worker could not be started or supervised.
	Failed(String),
}

/// Summary of one [`ProcessPool::run`] call.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
	pub submitted: usize,
	/// Units delivered to the completion callback.
	pub completed: usize,
	/// Inputs that had not completed when the deadline expired, sorted.
	pub timed_out: Vec<String>,
	/// Termination counts, present when the deadline expired.
	pub sweep: Option<SweepReport>,
	pub elapsed: Duration,
}

impl BatchReport {
	pub fn expired(&self) -> bool {
		self.sweep.is_some()
	}
}

enum UnitEnd {
	Finished(UnitReport),
	/// Cancelled before completion; its result, if any, is dropped.
	Abandoned,
}

/// Runs one worker process per input with bounded concurrency and an
/// optional deadline over the whole batch.
#[derive(Debug)]
pub struct ProcessPool {
	command: Arc<WorkerCommand>,
	config: PoolConfig,
	registry: WorkerRegistry,
	clock: GenerationClock,
}

impl ProcessPool {
	pub fn new(command: WorkerCommand, config: PoolConfig) -> Self {
		Self {
			command: Arc::new(command),
			config,
			registry: WorkerRegistry::new(),
			clock: GenerationClock::new(),
		}
	}

	pub fn config(&self) -> &PoolConfig {
		&self.config
	}

	/// Worker processes currently alive.
	pub fn registry(&self) -> &WorkerRegistry {
		&self.registry
	}

	/// Runs every input and hands each completion to `on_complete` in
	/// arrival order.
	///
	/// When the deadline expires, queued units are cancelled, live workers
	/// are terminated, and completions that arrive afterwards are dropped.
	/// The call returns only after every worker process has been reaped.
	pub async fn run<F>(&self, inputs: Vec<String>, mut on_complete: F) -> BatchReport
	where
		F: FnMut(UnitReport),
	{
		let started = Instant::now();
		let token = BatchToken::new(self.clock.next());
		let permits = Arc::new(Semaphore::new(self.config.workers.max(1)));
		let mut units = WorkerJoinSet::new(TaskClass::Unit);
		let mut pending: HashMap<tokio::task::Id, String> = HashMap::new();

		for input in inputs {
			let unit = Unit {
				command: Arc::clone(&self.command),
				registry: self.registry.clone(),
				token: token.clone(),
				grace: self.config.grace,
				input: input.clone(),
			};
			let id = units.spawn(unit.run(Arc::clone(&permits)));
			pending.insert(id, input);
		}

		let submitted = pending.len();
		tracing::info!(batch = token.generation(), submitted, workers = self.config.workers.max(1), "worker.pool.start");

		let deadline = self.config.deadline.map(|limit| started + limit);
		let mut completed = 0;
		let mut expired = false;
		loop {
			let next = match deadline {
				Some(at) => match tokio::time::timeout_at(at, units.join_next()).await {
					Ok(next) => next,
					Err(_) => {
						expired = true;
						break;
					}
				},
				None => units.join_next().await,
			};
			let Some(joined) = next else {
				break;
			};

			let report = match joined {
				Ok((id, UnitEnd::Finished(report))) => {
					pending.remove(&id);
					report
				}
				Ok((_, UnitEnd::Abandoned)) => continue,
				Err(err) => {
					let input = pending.remove(&err.id()).unwrap_or_default();
					let reason = join_error_panic_message(err).unwrap_or_else(|| "cancelled".to_string());
					tracing::error!(input = %input, reason = %reason, "worker.unit.panic");
					UnitReport {
						input,
						outcome: UnitOutcome::Failed(format!("unit supervisor panicked: {reason}")),
					}
				}
			};
			completed += 1;
			on_complete(report);
		}

		let sweep = if expired {
			tracing::warn!(batch = token.generation(), outstanding = pending.len(), "worker.pool.deadline");
			token.cancel();
			let report = reap::terminate(&self.registry, self.config.grace, self.config.poll).await;
			let mut late = 0usize;
			while let Some(joined) = units.join_next().await {
				if matches!(joined, Ok((_, UnitEnd::Finished(_)))) {
					late += 1;
				}
			}
			if late > 0 {
				tracing::debug!(late, "worker.pool.discarded");
			}
			Some(report)
		} else {
			None
		};

		let mut timed_out: Vec<String> = pending.into_values().collect();
		timed_out.sort();

		let report = BatchReport {
			submitted,
			completed,
			timed_out,
			sweep,
			elapsed: started.elapsed(),
		};
		tracing::info!(
			batch = token.generation(),
			completed = report.completed,
			timed_out = report.timed_out.len(),
			elapsed_ms = report.elapsed.as_millis() as u64,
			"worker.pool.done"
		);
		report
	}
}

/// Supervision of one input from permit to reap.
struct Unit {
	command: Arc<WorkerCommand>,
	registry: WorkerRegistry,
	token: BatchToken,
	grace: Duration,
	input: String,
}

impl Unit {
	async fn run(self, permits: Arc<Semaphore>) -> UnitEnd {
		let _permit = tokio::select! {
			biased;
			_ = self.token.cancelled() => return UnitEnd::Abandoned,
			permit = permits.acquire_owned() => match permit {
				Ok(permit) => permit,
				Err(_) => return UnitEnd::Abandoned,
			},
		};
		if self.token.is_cancelled() {
			return UnitEnd::Abandoned;
		}

		let mut child = match self.command.spawn(&self.input) {
			Ok(child) => child,
			Err(err) => return self.finished(UnitOutcome::Failed(err.to_string())),
		};
		let Some(pid) = child.id() else {
			return self.finished(UnitOutcome::Failed("worker exited before it could be tracked".to_string()));
		};
		self.registry.insert(WorkerRecord {
			pid,
			input: self.input.clone(),
			generation: self.token.generation(),
			started: std::time::Instant::now(),
		});
		tracing::debug!(pid, input = %self.input, "worker.unit.start");

		let stdout = child.stdout.take();
		let stderr = child.stderr.take();
		let collected = tokio::select! {
			result = collect(&mut child, stdout, stderr) => Some(result),
			_ = self.token.cancelled() => None,
		};

		let end = match collected {
			Some(Ok((status, stdout, stderr))) => {
				tracing::debug!(pid, input = %self.input, status = %status, "worker.unit.exit");
				self.finished(UnitOutcome::Exited { status, stdout, stderr })
			}
			Some(Err(err)) => {
				let _ = child.start_kill();
				let _ = child.wait().await;
				self.finished(UnitOutcome::Failed(WorkerError::from(err).to_string()))
			}
			None => {
				// The sweep signals every registered group; this covers a worker
				// registered after the sweep looked. It fires after the sweep's
				// own escalation so the two do not race.
				if tokio::time::timeout(self.grace.saturating_mul(2), child.wait()).await.is_err() {
					let _ = reap::signal_group(pid, Termination::Kill);
					let _ = child.wait().await;
				}
				UnitEnd::Abandoned
			}
		};
		self.registry.remove(pid);
		end
	}

	fn finished(&self, outcome: UnitOutcome) -> UnitEnd {
		UnitEnd::Finished(UnitReport {
			input: self.input.clone(),
			outcome,
		})
	}
}

async fn collect<O, E>(child: &mut Child, stdout: Option<O>, stderr: Option<E>) -> std::io::Result<(ExitStatus, Vec<u8>, Vec<u8>)>
where
	O: AsyncRead + Unpin,
	E: AsyncRead + Unpin,
{
	let (stdout, stderr) = tokio::try_join!(read_all(stdout), read_all(stderr))?;
	let status = child.wait().await?;
	Ok((status, stdout, stderr))
}

async fn read_all<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
	let mut buf = Vec::new();
	if let Some(mut pipe) = pipe {
		pipe.read_to_end(&mut buf).await?;
	}
	Ok(buf)
}
