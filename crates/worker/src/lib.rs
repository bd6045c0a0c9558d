//! Process-isolated worker pool.
//!
//! [`ProcessPool`] runs one OS process per input, at most `workers` at a
//! time, and reports completions in arrival order. A batch deadline cancels
//! queued units and hands live workers to the termination sweep in
//! [`reap`], which escalates from `SIGTERM` to repeated `SIGKILL` until
//! every worker has been reaped.
//!
//! Each worker leads its own process group on unix so signals also reach
//! anything it started.

mod class;
mod error;
mod join_set;
mod panic;
mod pool;
pub mod reap;
mod registry;
mod spawn;
mod token;


pub use class::TaskClass;
pub use error::{Result, WorkerError};
pub use join_set::WorkerJoinSet;
pub use panic::{join_error_panic_message, panic_message};
pub use pool::{BatchReport, PoolConfig, ProcessPool, UnitOutcome, UnitReport, WorkerCommand};
pub use reap::SweepReport;
pub use registry::{WorkerRecord, WorkerRegistry};
pub use spawn::{runtime, spawn_blocking};
