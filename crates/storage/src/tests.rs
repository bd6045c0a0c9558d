use std::path::Path;

use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::cache::LocalCache;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Device {
	name: String,
	registers: u32,
}

crate::schema_model!(Device);

fn open_in(dir: &TempDir, name: &str) -> Storage {
	Storage::open(dir.path().join(name)).unwrap()
}

fn device(name: &str, registers: u32) -> Device {
	Device {
		name: name.to_string(),
		registers,
	}
}

#[test]
fn set_then_get_returns_written_value() {
	let dir = TempDir::new().unwrap();
	let mut storage = open_in(&dir, "kb");

	storage.set("x", &device("stm32", 12)).unwrap();

	assert_eq!(storage.get_as::<Device>("x").unwrap(), device("stm32", 12));
	assert_eq!(storage.get_raw("x").unwrap(), r#"{"name":"stm32","registers":12}"#);
	assert_eq!(storage.get_native("x").unwrap(), json!({"name": "stm32", "registers": 12}));
	assert!(storage.contains("x"));
	assert_eq!(storage.len(), 1);
}

#[test]
fn plain_json_is_stored_structurally() {
	let dir = TempDir::new().unwrap();
	let mut storage = open_in(&dir, "kb");

	storage.set("list", &json!([1, "two", null])).unwrap();

	assert_eq!(storage.get_raw("list").unwrap(), r#"[1,"two",null]"#);
}

#[test]
fn set_overwrites_existing_handle() {
	let dir = TempDir::new().unwrap();
	let mut storage = open_in(&dir, "kb");

	storage.set("x", &device("a", 1)).unwrap();
	storage.set("x", &device("b", 2)).unwrap();

	assert_eq!(storage.len(), 1);
	assert_eq!(storage.get_as::<Device>("x").unwrap(), device("b", 2));
}

#[test]
fn missing_handle_is_not_found() {
	let dir = TempDir::new().unwrap();
	let mut storage = open_in(&dir, "kb");

	assert!(matches!(storage.get_raw("nope"), Err(StorageError::NotFound(h)) if h == "nope"));
	assert!(matches!(storage.delete("nope"), Err(StorageError::NotFound(_))));
}

#[test]
fn delete_removes_handle() {
	let dir = TempDir::new().unwrap();
	let mut storage = open_in(&dir, "kb");
	storage.set("x", &device("a", 1)).unwrap();
	storage.set("y", &device("b", 2)).unwrap();

	storage.delete("x").unwrap();

	assert!(!storage.contains("x"));
	assert_eq!(storage.handles(), vec!["y".to_string()]);
	assert!(matches!(storage.get_raw("x"), Err(StorageError::NotFound(_))));
}

#[test]
fn typed_read_reports_shape_mismatch() {
	let dir = TempDir::new().unwrap();
	let mut storage = open_in(&dir, "kb");
	storage.set("x", &json!({"name": 3})).unwrap();

	assert!(matches!(storage.get_as::<Device>("x"), Err(StorageError::Type(_))));
}

#[test]
fn handles_iterate_in_key_order() {
	let dir = TempDir::new().unwrap();
	let mut storage = open_in(&dir, "kb");
	for handle in ["c", "a", "b/z", "b/a"] {
		storage.set(handle, &json!(handle)).unwrap();
	}

	assert_eq!(storage.handles(), vec!["a", "b/a", "b/z", "c"]);
}

#[test]
fn set_then_reopen_reads_committed_value() {
	let dir = TempDir::new().unwrap();
	let mut storage = open_in(&dir, "kb");
	storage.set("x", &device("a", 1)).unwrap();
	storage.close();

	let storage = open_in(&dir, "kb");

	assert_eq!(storage.handles(), vec!["x".to_string()]);
	assert_eq!(storage.get_as::<Device>("x").unwrap(), device("a", 1));
}

#[test]
fn archive_roundtrip_into_fresh_storage() {
	let source_dir = TempDir::new().unwrap();
	let mut source = open_in(&source_dir, "kb");
	source.set("vendor/a.svd", &device("a", 1)).unwrap();
	source.set("vendor/b.svd", &device("b", 2)).unwrap();
	source.set("c.svd", &json!({"anything": [true]})).unwrap();
	assert_eq!(source.export_archive().unwrap(), 3);

	let target_dir = TempDir::new().unwrap();
	std::fs::copy(source.archive_path(), target_dir.path().join("kb.tar.gz")).unwrap();
	let target = open_in(&target_dir, "kb");

	assert_eq!(target.handles(), source.handles());
	for handle in source.handles() {
		assert_eq!(target.get_raw(&handle).unwrap(), source.get_raw(&handle).unwrap());
	}
}

#[test]
fn archive_suffix_on_prefix_is_ignored() {
	let dir = TempDir::new().unwrap();
	let storage = Storage::open(dir.path().join("shadows.tar.gz")).unwrap();

	assert_eq!(storage.prefix(), dir.path().join("shadows").as_path());
	assert_eq!(storage.cache_path(), dir.path().join("shadows.cache"));
	assert_eq!(storage.archive_path(), dir.path().join("shadows.tar.gz"));
}

#[test]
fn import_upserts_over_existing_entries() {
	let dir = TempDir::new().unwrap();
	let mut storage = open_in(&dir, "kb");
	storage.set("x", &device("old", 1)).unwrap();
	storage.set("y", &device("kept", 2)).unwrap();
	storage.export_archive().unwrap();

	storage.set("x", &device("new", 3)).unwrap();
	storage.delete("y").unwrap();
	assert_eq!(storage.import_archive().unwrap(), 2);

	assert_eq!(storage.get_as::<Device>("x").unwrap(), device("old", 1));
	assert_eq!(storage.get_as::<Device>("y").unwrap(), device("kept", 2));
}

#[test]
fn rejects_absolute_and_parent_handles() {
	let dir = TempDir::new().unwrap();
	let mut storage = open_in(&dir, "kb");

	for handle in ["", "/etc/passwd", "../escape", "a/../../b", "."] {
		assert!(
			matches!(storage.set(handle, &json!(1)), Err(StorageError::InvalidHandle(_))),
			"{handle:?} should be rejected"
		);
	}
	assert!(storage.is_empty());
}

#[test]
fn export_dir_writes_json_per_handle() {
	let dir = TempDir::new().unwrap();
	let mut storage = open_in(&dir, "kb");
	storage.set("vendor/a.svd", &device("a", 1)).unwrap();
	storage.set("b.xml", &device("b", 2)).unwrap();

	let out = dir.path().join("out");
	assert_eq!(storage.export_dir(&out).unwrap(), 2);

	let a = std::fs::read_to_string(out.join("vendor/a.json")).unwrap();
	assert_eq!(a, storage.get_raw("vendor/a.svd").unwrap());
	assert!(out.join("b.json").is_file());
}

#[test]
fn export_dir_rejects_traversal_before_writing() {
	let dir = TempDir::new().unwrap();
	let prefix = dir.path().join("kb");

	// Seed the cache directly, the public API refuses such handles.
	let cache = LocalCache::open(&prefix.with_extension("cache"), 16 * 1024 * 1024).unwrap();
	cache.put("aaa.svd", "{}").unwrap();
	cache.put("sub/../../escape.svd", "{}").unwrap();
	cache.close();

	let storage = Storage::open(&prefix).unwrap();
	let out = dir.path().join("out");
	let err = storage.export_dir(&out).unwrap_err();

	assert!(matches!(err, StorageError::PathTraversal(_)));
	assert!(!out.join("aaa.json").exists());
	assert!(!dir.path().join("escape.json").exists());
}

#[test]
fn resolve_within_pops_parent_components() {
	let base = Path::new("/out");

	assert_eq!(handle::resolve_within(base, Path::new("a/./b")), Path::new("/out/a/b"));
	assert_eq!(handle::resolve_within(base, Path::new("a/../../x")), Path::new("/x"));
	assert_eq!(handle::resolve_within(base, Path::new("/etc/x")), Path::new("/etc/x"));
}
