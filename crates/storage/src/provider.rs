//! Storage provider handing out one `MemStorage` per application

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use appstruct_core::{AppQName, Result, Storage, StorageProvider};

use crate::mem::MemStorage;

/// In-memory storage provider
///
/// Storages live as long as the provider. Asking twice for the same
/// application returns the same storage.
#[derive(Debug, Default)]
pub struct MemStorageProvider {
    apps: DashMap<AppQName, Arc<MemStorage>>,
}

impl MemStorageProvider {
    /// Create a provider with no applications
    pub fn new() -> Self {
        Self::default()
    }

    /// Concrete storage of the application, created on first use
    pub fn mem_storage(&self, app: &AppQName) -> Arc<MemStorage> {
        Arc::clone(self.apps.entry(app.clone()).or_insert_with(|| {
            debug!(target: "appstruct::storage", app = %app, "Created in-memory app storage");
            Arc::new(MemStorage::new())
        }).value())
    }

    /// Number of applications with storage
    pub fn app_count(&self) -> usize {
        self.apps.len()
    }
}

impl StorageProvider for MemStorageProvider {
    fn app_storage(&self, app: &AppQName) -> Result<Arc<dyn Storage>> {
        Ok(self.mem_storage(app))
    }
}
