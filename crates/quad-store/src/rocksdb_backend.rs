//! A persistent backend on top of RocksDB, feature-gated so the
//! default build does not need a C++ toolchain.

use rocksdb::{IteratorMode, Options, WriteBatch, DB};

use crate::backend::{BackendFactory, StorageBackend, StorageStats};
use crate::error::{StorageError, StorageResult};

fn to_storage_error(e: rocksdb::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// A backend durable across process restarts, backed by a single RocksDB
/// column family (the default one).
pub struct RocksDbBackend {
    db: DB,
}

fn tuned_options(create_if_missing: bool) -> Options {
    let mut opts = Options::default();
    opts.create_if_missing(create_if_missing);
    opts.set_max_open_files(512);
    opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
    opts
}

impl RocksDbBackend {
    /// Open (creating if necessary) a RocksDB database at `path`.
    fn open_with(path: &str, create_if_missing: bool) -> StorageResult<Self> {
        let opts = tuned_options(create_if_missing);
        let db = DB::open(&opts, path).map_err(to_storage_error)?;
        Ok(RocksDbBackend { db })
    }

}

impl StorageBackend for RocksDbBackend {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.db.get(key).map_err(to_storage_error).map(|v| v.map(|v| v.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.db.put(key, value).map_err(to_storage_error)
    }

    fn delete(&self, key: &[u8]) -> StorageResult<()> {
        self.db.delete(key).map_err(to_storage_error)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut out = Vec::new();
        let iter = self.db.iterator(IteratorMode::From(prefix, rocksdb::Direction::Forward));
        for item in iter {
            let (key, value) = item.map_err(to_storage_error)?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key.to_vec(), value.to_vec()));
        }
        Ok(out)
    }

    fn range_scan(&self, start: &[u8], end: Option<&[u8]>) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut out = Vec::new();
        let iter = self.db.iterator(IteratorMode::From(start, rocksdb::Direction::Forward));
        for item in iter {
            let (key, value) = item.map_err(to_storage_error)?;
            if let Some(end) = end {
                if key.as_ref() >= end {
                    break;
                }
            }
            out.push((key.to_vec(), value.to_vec()));
        }
        Ok(out)
    }

    fn apply_batch(&self, puts: &[(Vec<u8>, Vec<u8>)], deletes: &[Vec<u8>]) -> StorageResult<()> {
        let mut batch = WriteBatch::default();
        for (k, v) in puts {
            batch.put(k, v);
        }
        for k in deletes {
            batch.delete(k);
        }
        self.db.write(batch).map_err(to_storage_error)
    }

    fn flush(&self) -> StorageResult<()> {
        self.db.flush().map_err(to_storage_error)
    }

    fn stats(&self) -> StorageStats {
        let key_count = self
            .db
            .property_int_value("rocksdb.estimate-num-keys")
            .ok()
            .flatten()
            .unwrap_or(0);
        let disk_size = self
            .db
            .property_int_value("rocksdb.total-sst-files-size")
            .ok()
            .flatten()
            .unwrap_or(0);
        StorageStats { key_count, disk_size }
    }

    fn close(&self) -> StorageResult<()> {
        self.flush()
    }
}

/// Factory for [`RocksDbBackend`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RocksDbFactory;

impl BackendFactory for RocksDbFactory {
    type Backend = RocksDbBackend;

    fn init(&self, path: &str) -> StorageResult<Self::Backend> {
        if std::path::Path::new(path).join("CURRENT").exists() {
            return Err(StorageError::DatabaseExists);
        }
        RocksDbBackend::open_with(path, true)
    }

    fn open(&self, path: &str) -> StorageResult<Self::Backend> {
        if !std::path::Path::new(path).join("CURRENT").exists() {
            return Err(StorageError::DatabaseMissing);
        }
        RocksDbBackend::open_with(path, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let backend = RocksDbBackend::open_with(dir.path().to_str().unwrap(), true).unwrap();
        backend.put(b"k", b"v").unwrap();
        assert_eq!(backend.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn data_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        {
            let backend = RocksDbBackend::open_with(path, true).unwrap();
            backend.put(b"k", b"v").unwrap();
            backend.flush().unwrap();
        }
        let backend = RocksDbBackend::open_with(path, false).unwrap();
        assert_eq!(backend.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn prefix_scan_stops_at_prefix_boundary() {
        let dir = tempdir().unwrap();
        let backend = RocksDbBackend::open_with(dir.path().to_str().unwrap(), true).unwrap();
        backend.put(b"a/1", b"1").unwrap();
        backend.put(b"a/2", b"2").unwrap();
        backend.put(b"b/1", b"3").unwrap();
        let got = backend.prefix_scan(b"a/").unwrap();
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn factory_open_without_init_is_an_error() {
        let dir = tempdir().unwrap();
        let factory = RocksDbFactory;
        let err = factory.open(dir.path().to_str().unwrap());
        assert!(matches!(err, Err(StorageError::DatabaseMissing)));
    }
}
