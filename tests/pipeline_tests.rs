//! End-to-end tests for the torrent pipeline without HTTP.

use std::fs;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tempfile::TempDir;
use torrent_forge::bencode::{decode, encode, Value};
use torrent_forge::cache::{CacheBackend, CacheStore, DiskCache};
use torrent_forge::generator::{JsonLinesRegistry, MemoryRegistry, TorrentService};
use torrent_forge::torrent::{build, Torrent};
use torrent_forge::{Config, Error};

fn config(root: &TempDir) -> Config {
    Config {
        root_dir: root.path().to_path_buf(),
        tracker_url: "http://tracker.example/announce".into(),
        piece_length: 16 * 1024,
        ..Config::default()
    }
}

fn memory_service(root: &TempDir) -> (TorrentService, Arc<MemoryRegistry>) {
    let registry = Arc::new(MemoryRegistry::new());
    let service = TorrentService::new(
        &config(root),
        Arc::new(Mutex::new(CacheStore::new(32))),
        registry.clone(),
    )
    .unwrap();
    (service, registry)
}

#[test]
fn test_sample_dictionary_round_trip() {
    let input = b"d3:cow3:moo4:spam4:eggse";
    let value = decode(input).unwrap();

    assert_eq!(value.get(b"cow").and_then(Value::as_str), Some("moo"));
    assert_eq!(value.get(b"spam").and_then(Value::as_str), Some("eggs"));
    assert_eq!(encode(&value), input.to_vec());
}

#[test]
fn test_builds_are_deterministic() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("data.bin");
    fs::write(&path, (0..100_000u32).map(|i| (i % 251) as u8).collect::<Vec<_>>()).unwrap();

    let seeds = vec!["http://seed.example/data.bin".to_string()];
    let a = build(&path, 32 * 1024, "http://t.example/announce", &seeds).unwrap();
    let b = build(&path, 32 * 1024, "http://t.example/announce", &seeds).unwrap();

    assert_eq!(a.to_bytes(), b.to_bytes());
    assert_eq!(a.info_hash(), b.info_hash());
    assert_eq!(Torrent::from_bytes(&a.to_bytes()).unwrap(), a);
}

#[test]
fn test_cache_invalidated_by_mtime_change() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("grows.log");
    fs::write(&path, b"first version").unwrap();
    let (service, registry) = memory_service(&root);

    let before = service.torrent_for("grows.log").unwrap();
    assert!(service.torrent_for("grows.log").unwrap().cache_hit);

    fs::write(&path, b"second, longer version").unwrap();
    fs::File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(5))
        .unwrap();

    let after = service.torrent_for("grows.log").unwrap();
    assert!(!after.cache_hit);
    assert_ne!(after.bytes, before.bytes);
    assert_eq!(Torrent::from_bytes(&after.bytes).unwrap().total_length(), 22);
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_disk_cache_shared_between_services() {
    let root = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    fs::write(root.path().join("a.bin"), vec![5u8; 20_000]).unwrap();

    let cache: Arc<dyn CacheBackend> = Arc::new(DiskCache::open(cache_dir.path()).unwrap());
    let registry = Arc::new(
        JsonLinesRegistry::open(cache_dir.path().join("registry").join("log.jsonl")).unwrap(),
    );

    let first = TorrentService::new(&config(&root), cache.clone(), registry.clone()).unwrap();
    let built = first.torrent_for("a.bin").unwrap();
    assert!(!built.cache_hit);

    // A second service over the same directory sees the entry
    let reopened: Arc<dyn CacheBackend> = Arc::new(DiskCache::open(cache_dir.path()).unwrap());
    let second =
        TorrentService::new(&config(&root), reopened, Arc::new(MemoryRegistry::new())).unwrap();
    let served = second.torrent_for("a.bin").unwrap();
    assert!(served.cache_hit);
    assert_eq!(served.bytes, built.bytes);

    let records = registry.read_all().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "a.bin");
}

#[test]
fn test_disk_cache_keeps_one_entry_per_changing_file() {
    let root = TempDir::new().unwrap();
    let cache_dir = TempDir::new().unwrap();
    let path = root.path().join("nightly.tar");

    let cache = Arc::new(DiskCache::open(cache_dir.path()).unwrap());
    let service =
        TorrentService::new(&config(&root), cache.clone(), Arc::new(MemoryRegistry::new()))
            .unwrap();

    let start = SystemTime::now();
    for round in 1..=5u64 {
        fs::write(&path, vec![round as u8; 10_000]).unwrap();
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(start + Duration::from_secs(round * 10))
            .unwrap();

        let response = service.torrent_for("nightly.tar").unwrap();
        assert!(!response.cache_hit, "round {round}");
    }

    assert_eq!(fs::read_dir(cache_dir.path()).unwrap().count(), 1);
    assert_eq!(cache.stats().total_entries, 1);
    assert!(service.torrent_for("nightly.tar").unwrap().cache_hit);
}

#[test]
fn test_traversal_and_missing_files() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("ok.bin"), b"ok").unwrap();
    let (service, registry) = memory_service(&root);

    assert!(matches!(service.torrent_for("../ok.bin"), Err(Error::Security(_))));
    assert!(matches!(
        service.torrent_for("sub/%2E%2E/ok.bin"),
        Err(Error::Security(_))
    ));
    assert!(matches!(service.torrent_for("nothing.bin"), Err(Error::NotFound(_))));
    assert!(registry.is_empty());
}

#[cfg(unix)]
#[test]
fn test_symlink_escape_forbidden() {
    let root = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    fs::write(outside.path().join("private.key"), b"secret").unwrap();
    fs::create_dir_all(root.path().join("pub")).unwrap();
    std::os::unix::fs::symlink(outside.path(), root.path().join("pub/escape")).unwrap();

    let (service, registry) = memory_service(&root);

    assert!(matches!(
        service.torrent_for("pub/escape/private.key"),
        Err(Error::Security(_))
    ));
    assert!(registry.is_empty());
}

#[test]
fn test_fallback_strips_leading_segments() {
    let root = TempDir::new().unwrap();
    fs::create_dir_all(root.path().join("releases/v1")).unwrap();
    fs::write(root.path().join("releases/v1/app.tar"), vec![1u8; 100]).unwrap();
    let config = Config {
        webseed_urls: vec!["http://cdn.example/".into()],
        ..config(&root)
    };
    let service = TorrentService::new(
        &config,
        Arc::new(Mutex::new(CacheStore::new(4))),
        Arc::new(MemoryRegistry::new()),
    )
    .unwrap();

    let response = service.torrent_for("downloads/releases/v1/app.tar").unwrap();
    let torrent = Torrent::from_bytes(&response.bytes).unwrap();

    // Webseed follows the file's location under the root, not the alias
    assert_eq!(torrent.web_seeds(), ["http://cdn.example/releases/v1/app.tar"]);
}
