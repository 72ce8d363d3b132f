//! RocksDB-backed key/value store
//!
//! All durable records (accounts, rounds, bets, reward codes, audit rows)
//! live here under typed key prefixes. A `WriteBatch` commit is the single
//! transactional boundary for every multi-entity mutation.

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct Store {
    db: Arc<DB>,
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rocksdb::Error> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(64 * 1024 * 1024);
        opts.set_max_write_buffer_number(4);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path)?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.db.get(key).ok().flatten()
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<(), rocksdb::Error> {
        self.db.put(key, value)
    }

    pub fn delete(&self, key: &[u8]) -> Result<(), rocksdb::Error> {
        self.db.delete(key)
    }

    /// Commit a set of writes atomically. Either every item lands or none do.
    pub fn batch_write<K, V>(&self, items: &[(K, V)]) -> Result<(), rocksdb::Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let mut batch = WriteBatch::default();
        for (key, value) in items {
            batch.put(key, value);
        }
        self.db.write(batch)
    }

    /// Last key under `prefix` in byte order, if any. Suffixes longer than
    /// 17 bytes would sort past the probe bound and be missed.
    pub fn last_key_under_prefix(&self, prefix: &[u8]) -> Option<Vec<u8>> {
        let mut bound = prefix.to_vec();
        bound.extend_from_slice(&[0xff; 17]);

        let mut iter = self
            .db
            .iterator(IteratorMode::From(&bound, Direction::Reverse));
        match iter.next() {
            Some(Ok((key, _))) if key.starts_with(prefix) => Some(key.to_vec()),
            _ => None,
        }
    }

    /// Scan keys under `prefix`, starting strictly after `cursor` when given,
    /// returning at most `limit` rows in key order.
    pub fn scan_prefix(
        &self,
        prefix: &[u8],
        cursor: Option<&[u8]>,
        limit: usize,
    ) -> Vec<(Vec<u8>, Vec<u8>)> {
        let start: Vec<u8> = match cursor {
            // Seek one past the cursor key so pagination never repeats a row.
            Some(c) => {
                let mut k = c.to_vec();
                k.push(0);
                k
            }
            None => prefix.to_vec(),
        };

        let iter = self
            .db
            .iterator(IteratorMode::From(&start, Direction::Forward));

        let mut rows = Vec::new();
        for item in iter {
            let Ok((key, value)) = item else { break };
            if !key.starts_with(prefix) {
                break;
            }
            rows.push((key.to_vec(), value.to_vec()));
            if rows.len() >= limit {
                break;
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_put_get_delete() {
        let (_dir, store) = open_temp();
        store.put(b"k1", b"v1").unwrap();
        assert_eq!(store.get(b"k1"), Some(b"v1".to_vec()));

        store.delete(b"k1").unwrap();
        assert_eq!(store.get(b"k1"), None);
    }

    #[test]
    fn test_batch_write_is_atomic_set() {
        let (_dir, store) = open_temp();
        store
            .batch_write(&[(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec())])
            .unwrap();
        assert_eq!(store.get(b"a"), Some(b"1".to_vec()));
        assert_eq!(store.get(b"b"), Some(b"2".to_vec()));
    }

    #[test]
    fn test_last_key_under_prefix() {
        let (_dir, store) = open_temp();
        store.put(b"p:1", b"x").unwrap();
        store.put(b"p:2", b"y").unwrap();
        store.put(b"q:1", b"other").unwrap();

        assert_eq!(store.last_key_under_prefix(b"p:"), Some(b"p:2".to_vec()));
        assert_eq!(store.last_key_under_prefix(b"r:"), None);
    }

    #[test]
    fn test_scan_prefix_with_cursor() {
        let (_dir, store) = open_temp();
        store.put(b"p:1", b"x").unwrap();
        store.put(b"p:2", b"y").unwrap();
        store.put(b"p:3", b"z").unwrap();
        store.put(b"q:1", b"other").unwrap();

        let rows = store.scan_prefix(b"p:", None, 10);
        assert_eq!(rows.len(), 3);

        let rows = store.scan_prefix(b"p:", Some(b"p:1"), 10);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, b"p:2".to_vec());
    }
}
