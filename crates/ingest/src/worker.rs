//! Worker side of the ingestion protocol.
//!
//! The orchestrator starts one process per descriptor. That process calls
//! [`run_worker`], which writes a single serialized
//! `Outcome<MemoryMap>` document to its output and exits.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use svdmap_model::MemoryMap;
use svdmap_storage::codec;

use crate::descriptor::DescriptorParser;
use crate::error::Result;
use crate::mapping::build_memory_map;
use crate::outcome::Outcome;

/// Parses `root/handle` and builds its memory map inside a contained unit.
pub fn ingest_file(parser: &dyn DescriptorParser, root: &Path, handle: &str) -> Outcome<MemoryMap> {
	Outcome::contained(vec![handle.to_string()], BTreeMap::new(), || {
		let device = parser.parse(&root.join(handle))?;
		build_memory_map(&device)
	})
}

/// Runs one unit and writes its outcome as one JSON line to `out`.
pub fn run_worker(parser: &dyn DescriptorParser, root: &Path, handle: &str, out: &mut impl Write) -> Result<()> {
	let outcome = ingest_file(parser, root, handle);
	tracing::debug!(handle, success = outcome.success(), warnings = outcome.warnings.len(), "ingest.worker.done");
	let text = codec::encode(&outcome)?;
	writeln!(out, "{text}")?;
	out.flush()?;
	Ok(())
}
