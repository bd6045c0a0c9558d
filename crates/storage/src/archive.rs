//! Portable `.tar.gz` representation of a storage instance.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::error::{Result, StorageError};

/// Writes one regular-file entry per `(handle, payload)` pair, replacing any
/// existing archive at `path`.
pub(crate) fn write<I, H, P>(path: &Path, entries: I) -> Result<usize>
where
	I: IntoIterator<Item = (H, P)>,
	H: AsRef<str>,
	P: AsRef<str>,
{
	let wrap = |error| StorageError::Archive { path: path.to_path_buf(), error };

	let file = File::create(path).map_err(wrap)?;
	let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
	let mut builder = tar::Builder::new(encoder);

	let mut written = 0;
	for (handle, payload) in entries {
		let data = payload.as_ref().as_bytes();
		let mut header = tar::Header::new_gnu();
		header.set_size(data.len() as u64);
		header.set_mode(0o644);
		header.set_entry_type(tar::EntryType::Regular);
		builder.append_data(&mut header, handle.as_ref(), data).map_err(wrap)?;
		written += 1;
	}

	let encoder = builder.into_inner().map_err(wrap)?;
	let mut writer = encoder.finish().map_err(wrap)?;
	std::io::Write::flush(&mut writer).map_err(wrap)?;
	Ok(written)
}

/// Reads every regular-file entry as `(handle, payload)`.
pub(crate) fn read(path: &Path) -> Result<Vec<(String, String)>> {
	let wrap = |error| StorageError::Archive { path: path.to_path_buf(), error };

	let file = File::open(path).map_err(wrap)?;
	let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

	let mut entries = Vec::new();
	for entry in archive.entries().map_err(wrap)? {
		let mut entry = entry.map_err(wrap)?;
		if !entry.header().entry_type().is_file() {
			continue;
		}
		let handle = String::from_utf8(entry.path_bytes().into_owned())
			.map_err(|e| StorageError::type_mismatch(format!("archive entry name: {e}")))?;
		let mut payload = String::new();
		entry.read_to_string(&mut payload).map_err(wrap)?;
		entries.push((handle, payload));
	}
	Ok(entries)
}
