//! Storage contract consumed by the engine
//!
//! Keys are `(partition key, clustering columns)` byte pairs. Rows within a
//! partition are ordered by clustering columns, which makes range reads
//! (`read`) possible. The engine depends on nothing else from a backend.

use std::sync::Arc;

use crate::error::Result;
use crate::qname::AppQName;

/// One row of a batch write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    /// Partition key
    pub p_key: Vec<u8>,
    /// Clustering columns
    pub c_cols: Vec<u8>,
    /// Stored value
    pub value: Vec<u8>,
}

/// One row of a batch read within a partition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetBatchItem {
    /// Clustering columns to look up
    pub c_cols: Vec<u8>,
    /// Value found, `None` if the row is absent
    pub data: Option<Vec<u8>>,
}

impl GetBatchItem {
    /// Create a lookup for the given clustering columns
    pub fn new(c_cols: Vec<u8>) -> Self {
        GetBatchItem { c_cols, data: None }
    }
}

/// Application-scoped key-value storage
///
/// Thread safety: all methods may be called concurrently.
pub trait Storage: Send + Sync {
    /// Store a value
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn put(&self, p_key: &[u8], c_cols: &[u8], value: &[u8]) -> Result<()>;

    /// Store several values atomically
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails; nothing is written then.
    fn put_batch(&self, items: &[BatchItem]) -> Result<()>;

    /// Load a value, `None` if absent
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn get(&self, p_key: &[u8], c_cols: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Load several values from one partition, filling `items[i].data`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn get_batch(&self, p_key: &[u8], items: &mut [GetBatchItem]) -> Result<()>;

    /// Visit rows of a partition with `start <= c_cols < finish`, in
    /// clustering order. An empty `finish` means no upper bound.
    ///
    /// # Errors
    ///
    /// Returns the first error from the backend or from `cb`.
    fn read(
        &self,
        p_key: &[u8],
        start: &[u8],
        finish: &[u8],
        cb: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>,
    ) -> Result<()>;
}

/// Hands out storage per application
pub trait StorageProvider: Send + Sync {
    /// Storage of the application, created on first use
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot open the application keyspace.
    fn app_storage(&self, app: &AppQName) -> Result<Arc<dyn Storage>>;
}
