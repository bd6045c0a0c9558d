//! Descriptor ingestion.
//!
//! Purpose: turn a directory of device descriptors into a store of
//! `Outcome<MemoryMap>` entries, one per descriptor, and derive shadow
//! fingerprints from that store.
//!
//! Mental model:
//! * a worker process runs [`worker::run_worker`] for one handle and prints
//!   its [`Outcome`],
//! * [`orchestrator::ingest`] runs those workers through a
//!   [`svdmap_worker::ProcessPool`] and stores what comes back,
//! * [`tasks`] re-reads the store to check it or to project shadows.
//!
//! Per-descriptor failures never escape a unit. Parser errors, panics and
//! out-of-range registers become `Outcome::error`; warnings become
//! `Outcome::warnings`. Only storage and discovery errors fail a run.

pub mod capture;
pub mod descriptor;
pub mod error;
pub mod mapping;
pub mod orchestrator;
pub mod outcome;
pub mod tasks;
pub mod worker;


pub use descriptor::{Access, DescriptorParser, Device, JsonDescriptorParser, Peripheral, Register};
pub use error::{IngestError, Result};
pub use mapping::build_memory_map;
pub use orchestrator::{IngestOptions, IngestReport, discover, ingest};
pub use outcome::Outcome;
pub use tasks::{CheckReport, ShadowReport, check_storage, make_shadows};
pub use worker::{ingest_file, run_worker};
