//! MemStorage: in-memory backend for one application
//!
//! - `BTreeMap<p_key, BTreeMap<c_cols, value>>` keeps rows of a partition
//!   in clustering order, so range reads are a `range()` call
//! - `parking_lot::RwLock` guards the whole map; batches are applied under
//!   one write lock and are therefore atomic
//!
//! Values are copied in and out. Callers never hold references into the map.

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;

use appstruct_core::{BatchItem, GetBatchItem, Result, Storage};

type Partition = BTreeMap<Vec<u8>, Vec<u8>>;

/// In-memory storage for a single application
#[derive(Debug, Default)]
pub struct MemStorage {
    data: RwLock<BTreeMap<Vec<u8>, Partition>>,
}

impl MemStorage {
    /// Create an empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of partitions
    pub fn partition_count(&self) -> usize {
        self.data.read().len()
    }

    /// Number of rows across all partitions
    pub fn row_count(&self) -> usize {
        self.data.read().values().map(BTreeMap::len).sum()
    }
}

impl Storage for MemStorage {
    fn put(&self, p_key: &[u8], c_cols: &[u8], value: &[u8]) -> Result<()> {
        self.data
            .write()
            .entry(p_key.to_vec())
            .or_default()
            .insert(c_cols.to_vec(), value.to_vec());
        Ok(())
    }

    fn put_batch(&self, items: &[BatchItem]) -> Result<()> {
        let mut data = self.data.write();
        for item in items {
            data.entry(item.p_key.clone())
                .or_default()
                .insert(item.c_cols.clone(), item.value.clone());
        }
        Ok(())
    }

    fn get(&self, p_key: &[u8], c_cols: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self
            .data
            .read()
            .get(p_key)
            .and_then(|p| p.get(c_cols))
            .cloned())
    }

    fn get_batch(&self, p_key: &[u8], items: &mut [GetBatchItem]) -> Result<()> {
        let data = self.data.read();
        let partition = data.get(p_key);
        for item in items.iter_mut() {
            item.data = partition.and_then(|p| p.get(&item.c_cols)).cloned();
        }
        Ok(())
    }

    fn read(
        &self,
        p_key: &[u8],
        start: &[u8],
        finish: &[u8],
        cb: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>,
    ) -> Result<()> {
        // Rows are collected first so that `cb` may write to this storage
        let rows: Vec<(Vec<u8>, Vec<u8>)> = {
            let data = self.data.read();
            let Some(partition) = data.get(p_key) else {
                return Ok(());
            };
            let upper = if finish.is_empty() {
                Bound::Unbounded
            } else {
                Bound::Excluded(finish.to_vec())
            };
            if !finish.is_empty() && start >= finish {
                return Ok(());
            }
            partition
                .range((Bound::Included(start.to_vec()), upper))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };
        for (c_cols, value) in rows {
            cb(&c_cols, &value)?;
        }
        Ok(())
    }
}
