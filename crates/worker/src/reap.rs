//! Termination sweeps over live worker processes.
//!
//! A sweep looks up every registered worker through `sysinfo`, classifies
//! it, and signals the process group of each one still present. Workers
//! that disappear between the lookup and the signal are counted as
//! vanished. Reaping itself stays with the unit that spawned the worker,
//! which removes the registry entry once `wait` returns.

use std::time::Duration;

use sysinfo::{ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};
use tokio::time::Instant;

use crate::registry::WorkerRegistry;
use crate::{TaskClass, spawn_blocking};

/// Signal escalation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
	/// Polite request, `SIGTERM`.
	Terminate,
	/// Forced, `SIGKILL`.
	Kill,
}

impl Termination {
	const fn as_str(self) -> &'static str {
		match self {
			Self::Terminate => "terminate",
			Self::Kill => "kill",
		}
	}
}

/// Observed state of one worker during a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
	Running,
	/// Sleeping, blocked or stopped; still needs a signal.
	Sleeping,
	/// Exited and waiting to be reaped by its unit.
	Zombie,
	/// No longer known to the OS.
	Vanished,
}

impl From<Option<ProcessStatus>> for ProcessState {
	fn from(status: Option<ProcessStatus>) -> Self {
		match status {
			None => Self::Vanished,
			Some(ProcessStatus::Zombie | ProcessStatus::Dead) => Self::Zombie,
			Some(ProcessStatus::Run | ProcessStatus::Waking | ProcessStatus::Wakekill) => Self::Running,
			Some(_) => Self::Sleeping,
		}
	}
}

/// Counts accumulated over one or more sweeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
	pub sweeps: usize,
	pub running: usize,
	pub sleeping: usize,
	pub zombies: usize,
	pub vanished: usize,
	/// Process groups a signal was delivered to.
	pub signalled: usize,
}

impl SweepReport {
	fn merge(&mut self, other: SweepReport) {
		self.sweeps += other.sweeps;
		self.running += other.running;
		self.sleeping += other.sleeping;
		self.zombies += other.zombies;
		self.vanished += other.vanished;
		self.signalled += other.signalled;
	}
}

/// Looks up the state of each pid.
pub fn probe(pids: &[u32]) -> Vec<(u32, ProcessState)> {
	let targets: Vec<sysinfo::Pid> = pids.iter().map(|&pid| sysinfo::Pid::from_u32(pid)).collect();
	let mut system = System::new();
	system.refresh_processes_specifics(ProcessesToUpdate::Some(&targets), true, ProcessRefreshKind::nothing());

	pids.iter()
		.map(|&pid| {
			let status = system.process(sysinfo::Pid::from_u32(pid)).map(|process| process.status());
			(pid, ProcessState::from(status))
		})
		.collect()
}

/// Runs one sweep over every registered worker.
pub async fn sweep(registry: &WorkerRegistry, signal: Termination) -> SweepReport {
	let pids = registry.pids();
	let mut report = SweepReport {
		sweeps: 1,
		..SweepReport::default()
	};
	if pids.is_empty() {
		return report;
	}

	let states = match spawn_blocking(TaskClass::Sweep, move || probe(&pids)).await {
		Ok(states) => states,
		Err(err) => {
			tracing::error!(error = %err, "worker.sweep.probe_failed");
			return report;
		}
	};

	for (pid, state) in states {
		match state {
			ProcessState::Running => report.running += 1,
			ProcessState::Sleeping => report.sleeping += 1,
			ProcessState::Zombie => report.zombies += 1,
			ProcessState::Vanished => {
				report.vanished += 1;
				continue;
			}
		}

		// A zombie leader can still have live descendants in its group.
		match signal_group(pid, signal) {
			Ok(true) => report.signalled += 1,
			Ok(false) => {
				if state != ProcessState::Zombie {
					report.vanished += 1;
				}
			}
			Err(err) => tracing::warn!(pid, error = %err, "worker.sweep.signal_failed"),
		}
	}

	tracing::debug!(
		signal = signal.as_str(),
		running = report.running,
		sleeping = report.sleeping,
		zombies = report.zombies,
		vanished = report.vanished,
		"worker.sweep"
	);
	report
}

/// Terminates every registered worker and returns once the registry is empty.
///
/// Sends `SIGTERM`, waits up to `grace` for workers to exit, then repeats
/// `SIGKILL` sweeps every `poll` until no worker is left.
pub async fn terminate(registry: &WorkerRegistry, grace: Duration, poll: Duration) -> SweepReport {
	let poll = poll.max(Duration::from_millis(1));
	for record in registry.snapshots() {
		tracing::debug!(pid = record.pid, input = %record.input, elapsed_ms = record.started.elapsed().as_millis() as u64, "worker.terminate");
	}

	let mut total = sweep(registry, Termination::Terminate).await;

	let grace_end = Instant::now() + grace;
	while !registry.is_empty() && Instant::now() < grace_end {
		tokio::time::sleep(poll.min(grace_end.saturating_duration_since(Instant::now()))).await;
	}

	while !registry.is_empty() {
		total.merge(sweep(registry, Termination::Kill).await);
		tokio::time::sleep(poll).await;
	}

	tracing::info!(sweeps = total.sweeps, signalled = total.signalled, vanished = total.vanished, "worker.terminate.done");
	total
}

/// Signals the process group led by `pid`.
///
/// Returns `Ok(false)` when the group no longer exists.
#[cfg(unix)]
pub(crate) fn signal_group(pid: u32, signal: Termination) -> crate::Result<bool> {
	use nix::errno::Errno;
	use nix::sys::signal::{Signal, killpg};
	use nix::unistd::Pid;

	let signal = match signal {
		Termination::Terminate => Signal::SIGTERM,
		Termination::Kill => Signal::SIGKILL,
	};
	let Ok(raw) = i32::try_from(pid) else {
		return Ok(false);
	};
	match killpg(Pid::from_raw(raw), signal) {
		Ok(()) => Ok(true),
		Err(Errno::ESRCH) => Ok(false),
		Err(errno) => Err(crate::WorkerError::Signal { pid, errno }),
	}
}

#[cfg(not(unix))]
pub(crate) fn signal_group(_pid: u32, _signal: Termination) -> crate::Result<bool> {
	Ok(false)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classifies_own_process_as_alive() {
		let pid = std::process::id();
		let states = probe(&[pid, 0x7fff_fff0]);

		assert_eq!(states[0].0, pid);
		assert!(matches!(states[0].1, ProcessState::Running | ProcessState::Sleeping));
		assert_eq!(states[1], (0x7fff_fff0, ProcessState::Vanished));
	}

	#[test]
	fn status_mapping() {
		assert_eq!(ProcessState::from(Some(ProcessStatus::Zombie)), ProcessState::Zombie);
		assert_eq!(ProcessState::from(Some(ProcessStatus::Run)), ProcessState::Running);
		assert_eq!(ProcessState::from(Some(ProcessStatus::Sleep)), ProcessState::Sleeping);
		assert_eq!(ProcessState::from(Some(ProcessStatus::Stop)), ProcessState::Sleeping);
		assert_eq!(ProcessState::from(None), ProcessState::Vanished);
	}

	#[tokio::test]
	async fn empty_registry_terminates_immediately() {
		let registry = WorkerRegistry::new();
		let report = terminate(&registry, Duration::from_secs(5), Duration::from_millis(10)).await;
		assert_eq!(report, SweepReport { sweeps: 1, ..SweepReport::default() });
	}
}
