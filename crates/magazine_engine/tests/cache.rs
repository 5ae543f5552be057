use std::fs::File;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use magazine_engine::{
    cache_key, CacheStore, CachedResponse, DiskCacheStore, FailureKind, FetchError, Fetcher,
    KeyedCache, MemoryCacheStore, Transport,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use url::Url;

#[derive(Clone)]
struct CountingTransport {
    calls: Arc<AtomicUsize>,
    status: u16,
}

impl CountingTransport {
    fn ok() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            status: 200,
        }
    }

    fn with_status(status: u16) -> Self {
        Self {
            status,
            ..Self::ok()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for CountingTransport {
    fn get(&self, url: &Url) -> Result<CachedResponse, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CachedResponse {
            status: self.status,
            url: url.to_string(),
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            body: format!("response #{n}").into_bytes(),
        })
    }
}

fn response(body: &str) -> CachedResponse {
    CachedResponse {
        status: 200,
        url: "https://example.com/".to_string(),
        headers: Vec::new(),
        body: body.as_bytes().to_vec(),
    }
}

#[test]
fn second_fetch_within_window_hits_cache() {
    let transport = CountingTransport::ok();
    let fetcher = Fetcher::new(KeyedCache::new(Box::new(MemoryCacheStore::new())), transport.clone());

    let first = fetcher.get("https://example.com/issue", &[("page", "1")]).unwrap();
    let second = fetcher.get("https://example.com/issue", &[("page", "1")]).unwrap();

    assert_eq!(transport.calls(), 1);
    assert_eq!(first.to_blob().unwrap(), second.to_blob().unwrap());
    assert_eq!(second.text(), "response #1");
}

#[test]
fn query_parameters_reach_the_transport() {
    let transport = CountingTransport::ok();
    let fetcher = Fetcher::new(KeyedCache::new(Box::new(MemoryCacheStore::new())), transport);

    let response = fetcher
        .get("https://example.com/search", &[("q", "a b"), ("page", "2")])
        .unwrap();

    assert_eq!(response.url, "https://example.com/search?q=a+b&page=2");
}

#[test]
fn parameter_order_shares_one_entry() {
    let transport = CountingTransport::ok();
    let fetcher = Fetcher::new(KeyedCache::new(Box::new(MemoryCacheStore::new())), transport.clone());

    fetcher
        .get("https://example.com/", &[("a", "1"), ("b", "2")])
        .unwrap();
    fetcher
        .get("https://example.com/", &[("b", "2"), ("a", "1")])
        .unwrap();

    assert_eq!(transport.calls(), 1);
}

#[test]
fn failed_status_is_raised_and_not_cached() {
    let transport = CountingTransport::with_status(404);
    let store = Arc::new(MemoryCacheStore::new());
    let fetcher = Fetcher::new(
        KeyedCache::new(Box::new(SharedStore(store.clone()))),
        transport.clone(),
    );

    let err = fetcher.get("https://example.com/gone", &[]).unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert!(store.is_empty());

    fetcher.get("https://example.com/gone", &[]).unwrap_err();
    assert_eq!(transport.calls(), 2);
}

#[test]
fn entry_modified_exactly_at_epoch_is_stale() {
    let epoch = SystemTime::now() - Duration::from_secs(3600);
    let store = MemoryCacheStore::new();
    let key = cache_key("https://example.com/", &[]);
    store.insert(key, response("old").to_blob().unwrap(), epoch);

    let cache = KeyedCache::with_epoch(Box::new(store), epoch);
    let mut fetched = false;
    let result = cache
        .get_or_fetch("https://example.com/", &[], || {
            fetched = true;
            Ok(response("new"))
        })
        .unwrap();

    assert!(fetched);
    assert_eq!(result.text(), "new");
}

#[test]
fn entry_modified_after_epoch_is_fresh() {
    let epoch = SystemTime::now() - Duration::from_secs(3600);
    let store = MemoryCacheStore::new();
    let key = cache_key("https://example.com/", &[]);
    store.insert(
        key,
        response("old").to_blob().unwrap(),
        epoch + Duration::from_secs(1),
    );

    let cache = KeyedCache::with_epoch(Box::new(store), epoch);
    let result = cache
        .get_or_fetch("https://example.com/", &[], || {
            panic!("fresh entry must not be refetched")
        })
        .unwrap();

    assert_eq!(result.text(), "old");
}

#[test]
fn epoch_is_fixed_at_construction() {
    let before = SystemTime::now();
    let cache = KeyedCache::new(Box::new(MemoryCacheStore::new()));
    let epoch = cache.epoch();

    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(cache.epoch(), epoch);
    assert!(epoch <= before - Duration::from_secs(3600) + Duration::from_secs(1));
}

#[test]
fn undecodable_entry_is_refetched() {
    let store = MemoryCacheStore::new();
    store.insert(
        cache_key("https://example.com/", &[]),
        b"not a blob".to_vec(),
        SystemTime::now(),
    );
    let cache = KeyedCache::new(Box::new(store));

    let result = cache
        .get_or_fetch("https://example.com/", &[], || Ok(response("fresh")))
        .unwrap();
    assert_eq!(result.text(), "fresh");
}

#[test]
fn disk_store_lays_out_one_file_per_key_under_site_dir() {
    let temp = TempDir::new().unwrap();
    let store = DiskCacheStore::new(temp.path(), "weekly");
    let cache = KeyedCache::new(Box::new(store.clone()));

    cache
        .get_or_fetch("https://example.com/a", &[], || Ok(response("A")))
        .unwrap();

    let key = cache_key("https://example.com/a", &[]);
    let path = temp.path().join("weekly").join(&key);
    assert!(path.is_file());
    assert_eq!(store.path_for(&key), path);

    let entries: Vec<_> = std::fs::read_dir(temp.path().join("weekly"))
        .unwrap()
        .collect();
    assert_eq!(entries.len(), 1, "no temp files are left behind");

    let cached = CachedResponse::from_blob(&std::fs::read(path).unwrap()).unwrap();
    assert_eq!(cached, response("A"));
}

#[test]
fn disk_store_honours_file_mtime() {
    let temp = TempDir::new().unwrap();
    let store = DiskCacheStore::new(temp.path(), "weekly");
    let key = cache_key("https://example.com/a", &[]);
    store.store(&key, &response("old").to_blob().unwrap()).unwrap();

    let epoch = SystemTime::now() - Duration::from_secs(3600);
    File::options()
        .write(true)
        .open(store.path_for(&key))
        .unwrap()
        .set_modified(epoch)
        .unwrap();

    let cache = KeyedCache::with_epoch(Box::new(store.clone()), epoch);
    let result = cache
        .get_or_fetch("https://example.com/a", &[], || Ok(response("new")))
        .unwrap();
    assert_eq!(result.text(), "new");

    let reread = CachedResponse::from_blob(&std::fs::read(store.path_for(&key)).unwrap()).unwrap();
    assert_eq!(reread.text(), "new");
}

/// Lets a test keep a handle on a store owned by the cache.
struct SharedStore(Arc<MemoryCacheStore>);

impl CacheStore for SharedStore {
    fn modified(&self, key: &str) -> Option<SystemTime> {
        self.0.modified(key)
    }

    fn load(&self, key: &str) -> std::io::Result<Vec<u8>> {
        self.0.load(key)
    }

    fn store(&self, key: &str, blob: &[u8]) -> std::io::Result<()> {
        self.0.store(key, blob)
    }
}
