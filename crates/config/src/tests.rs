use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use super::*;

#[test]
fn empty_file_uses_defaults() {
	let config = Config::parse("").unwrap();
	assert_eq!(config, Config::default());
	assert_eq!(config.ingest.grace_ms, 500);
	assert_eq!(config.ingest.extensions, vec!["json"]);
	assert_eq!(config.storage.map_size_mib, 1024);
}

#[test]
fn partial_tables_keep_other_defaults() {
	let config = Config::parse(
		r#"
[ingest]
workers = 3
extensions = ["json", "svdj"]
"#,
	)
	.unwrap();

	assert_eq!(config.ingest.workers, 3);
	assert_eq!(config.ingest.extensions, vec!["json", "svdj"]);
	assert_eq!(config.ingest.timeout_secs, 0);
	assert_eq!(config.storage, StorageConfig::default());
}

#[test]
fn unknown_keys_are_rejected() {
	let err = Config::parse("[ingest]\nworkerz = 2\n").unwrap_err();
	assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn wrong_type_is_rejected() {
	assert!(Config::parse("[storage]\nmap_size_mib = \"big\"\n").is_err());
}

#[test]
fn zero_sentinels_resolve_to_pool_defaults() {
	let options = Config::default().ingest_options();
	let defaults = PoolConfig::default();

	assert_eq!(options.pool.workers, defaults.workers);
	assert_eq!(options.pool.deadline, None);
	assert_eq!(options.pool.grace, Duration::from_millis(500));
	assert_eq!(options.extensions, vec!["json"]);
}

#[test]
fn explicit_values_reach_pool_and_storage() {
	let config = Config::parse(
		r#"
[ingest]
workers = 2
timeout_secs = 30
grace_ms = 100

[storage]
map_size_mib = 16
"#,
	)
	.unwrap();

	let options = config.ingest_options();
	assert_eq!(options.pool.workers, 2);
	assert_eq!(options.pool.deadline, Some(Duration::from_secs(30)));
	assert_eq!(options.pool.grace, Duration::from_millis(100));
	assert_eq!(config.storage_options().map_size, 16 * 1024 * 1024);
}

#[test]
fn load_reads_file_and_reports_missing_path() {
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("config.toml");
	std::fs::write(&path, "[ingest]\ntimeout_secs = 5\n").unwrap();

	assert_eq!(Config::load(&path).unwrap().ingest.timeout_secs, 5);
	assert_eq!(Config::resolve(Some(&path)).unwrap().ingest.timeout_secs, 5);

	let missing = dir.path().join("missing.toml");
	let err = Config::resolve(Some(&missing)).unwrap_err();
	assert!(matches!(err, ConfigError::Io { path, .. } if path == missing));
}
