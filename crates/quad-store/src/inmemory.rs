//! An in-process, non-persistent backend: a reference adapter
//! exercising the backend contract, enabled by the default
//! `in-memory` feature.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::backend::{BackendFactory, StorageBackend, StorageStats};
use crate::error::{StorageError, StorageResult};

/// A backend that keeps every key in a lock-free concurrent map and never
/// touches disk. Useful for tests and for workloads that fit comfortably
/// in memory and do not need durability across restarts.
#[derive(Clone)]
pub struct InMemoryBackend {
    data: Arc<DashMap<Vec<u8>, Vec<u8>>>,
    closed: Arc<RwLock<bool>>,
    disk_size_hint: Arc<AtomicU64>,
}

impl InMemoryBackend {
    /// Construct an empty backend.
    pub fn new() -> Self {
        InMemoryBackend {
            data: Arc::new(DashMap::new()),
            closed: Arc::new(RwLock::new(false)),
            disk_size_hint: Arc::new(AtomicU64::new(0)),
        }
    }

    fn check_open(&self) -> StorageResult<()> {
        if *self.closed.read() {
            return Err(StorageError::Backend("backend is closed".into()));
        }
        Ok(())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        InMemoryBackend::new()
    }
}

impl StorageBackend for InMemoryBackend {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.check_open()?;
        Ok(self.data.get(key).map(|v| v.clone()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.check_open()?;
        let is_new = !self.data.contains_key(key);
        self.data.insert(key.to_vec(), value.to_vec());
        if is_new {
            self.disk_size_hint.fetch_add((key.len() + value.len()) as u64, Ordering::Relaxed);
        }
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> StorageResult<()> {
        self.check_open()?;
        if let Some((_, v)) = self.data.remove(key) {
            self.disk_size_hint
                .fetch_sub((key.len() + v.len()) as u64, Ordering::Relaxed);
        }
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.check_open()?;
        let mut out: Vec<(Vec<u8>, Vec<u8>)> = self
            .data
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    fn range_scan(&self, start: &[u8], end: Option<&[u8]>) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.check_open()?;
        let mut out: Vec<(Vec<u8>, Vec<u8>)> = self
            .data
            .iter()
            .filter(|entry| {
                let key = entry.key().as_slice();
                key >= start && end.map(|e| key < e).unwrap_or(true)
            })
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    fn apply_batch(&self, puts: &[(Vec<u8>, Vec<u8>)], deletes: &[Vec<u8>]) -> StorageResult<()> {
        self.check_open()?;
        for (k, v) in puts {
            self.put(k, v)?;
        }
        for k in deletes {
            self.delete(k)?;
        }
        Ok(())
    }

    fn flush(&self) -> StorageResult<()> {
        self.check_open()
    }

    fn stats(&self) -> StorageStats {
        StorageStats {
            key_count: self.data.len() as u64,
            disk_size: self.disk_size_hint.load(Ordering::Relaxed),
        }
    }

    fn close(&self) -> StorageResult<()> {
        *self.closed.write() = true;
        Ok(())
    }
}

/// Factory for [`InMemoryBackend`]. `path` is ignored; every call produces
/// an independent, empty backend, so `init` and `open` behave identically.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryFactory;

impl BackendFactory for InMemoryFactory {
    type Backend = InMemoryBackend;

    fn init(&self, _path: &str) -> StorageResult<Self::Backend> {
        Ok(InMemoryBackend::new())
    }

    fn open(&self, _path: &str) -> StorageResult<Self::Backend> {
        Ok(InMemoryBackend::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let backend = InMemoryBackend::new();
        backend.put(b"k", b"v").unwrap();
        assert_eq!(backend.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn delete_removes_key() {
        let backend = InMemoryBackend::new();
        backend.put(b"k", b"v").unwrap();
        backend.delete(b"k").unwrap();
        assert_eq!(backend.get(b"k").unwrap(), None);
    }

    #[test]
    fn prefix_scan_returns_sorted_matches() {
        let backend = InMemoryBackend::new();
        backend.put(b"a/2", b"").unwrap();
        backend.put(b"a/1", b"").unwrap();
        backend.put(b"b/1", b"").unwrap();
        let got = backend.prefix_scan(b"a/").unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].0, b"a/1");
        assert_eq!(got[1].0, b"a/2");
    }

    #[test]
    fn stats_tracks_key_count() {
        let backend = InMemoryBackend::new();
        backend.put(b"a", b"1").unwrap();
        backend.put(b"b", b"2").unwrap();
        assert_eq!(backend.stats().key_count, 2);
        backend.delete(b"a").unwrap();
        assert_eq!(backend.stats().key_count, 1);
    }

    #[test]
    fn closed_backend_errors_on_access() {
        let backend = InMemoryBackend::new();
        backend.close().unwrap();
        assert!(backend.get(b"k").is_err());
    }
}
