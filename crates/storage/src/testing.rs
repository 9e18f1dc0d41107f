//! Storage fault injection for tests
//!
//! `FaultyStorage` wraps another storage and fails writes or reads on
//! demand, to check that callers surface backend errors instead of
//! swallowing them.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use appstruct_core::Storage;
//! use appstruct_storage::{testing::FaultyStorage, MemStorage};
//!
//! let s = FaultyStorage::new(Arc::new(MemStorage::new()));
//! s.fail_writes(true);
//! assert!(s.put(b"p", b"c", b"v").is_err());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use appstruct_core::{BatchItem, Error, GetBatchItem, Result, Storage};

/// Storage wrapper that fails on demand
pub struct FaultyStorage {
    inner: Arc<dyn Storage>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl FaultyStorage {
    /// Wrap a storage; no faults are injected initially
    pub fn new(inner: Arc<dyn Storage>) -> Self {
        FaultyStorage {
            inner,
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Make `put` and `put_batch` fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make `get`, `get_batch` and `read` fail
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(Error::storage(format!("injected {} failure", op)));
        }
        Ok(())
    }
}

impl Storage for FaultyStorage {
    fn put(&self, p_key: &[u8], c_cols: &[u8], value: &[u8]) -> Result<()> {
        Self::check(&self.fail_writes, "put")?;
        self.inner.put(p_key, c_cols, value)
    }

    fn put_batch(&self, items: &[BatchItem]) -> Result<()> {
        Self::check(&self.fail_writes, "put batch")?;
        self.inner.put_batch(items)
    }

    fn get(&self, p_key: &[u8], c_cols: &[u8]) -> Result<Option<Vec<u8>>> {
        Self::check(&self.fail_reads, "get")?;
        self.inner.get(p_key, c_cols)
    }

    fn get_batch(&self, p_key: &[u8], items: &mut [GetBatchItem]) -> Result<()> {
        Self::check(&self.fail_reads, "get batch")?;
        self.inner.get_batch(p_key, items)
    }

    fn read(
        &self,
        p_key: &[u8],
        start: &[u8],
        finish: &[u8],
        cb: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>,
    ) -> Result<()> {
        Self::check(&self.fail_reads, "read")?;
        self.inner.read(p_key, start, finish, cb)
    }
}
