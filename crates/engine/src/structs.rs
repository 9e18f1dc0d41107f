//! Application structures: the event logs and records of one application
//! over its storage, and the provider that builds them on first use.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use appstruct_appdef::AppDef;
use appstruct_core::{AppQName, ClusterAppID, Storage, StorageProvider};

use crate::config::{AppConfig, AppConfigs, PreparedApp};
use crate::error::{Error, ErrorKind, Result};
use crate::events::Events;
use crate::records::Records;
use crate::resources::Resources;

/// Event logs and records of one application
pub struct AppStructs {
    config: Arc<AppConfig>,
    prepared: Arc<PreparedApp>,
    events: Events,
    records: Records,
}

impl fmt::Debug for AppStructs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppStructs")
            .field("app", self.config.name())
            .finish()
    }
}

impl AppStructs {
    /// Prepare the configuration against the storage and open the logs
    ///
    /// # Errors
    ///
    /// Fails if preparation fails.
    pub fn new(config: &AppConfig, storage: Arc<dyn Storage>) -> Result<Self> {
        let prepared = config.prepare(storage.as_ref())?;
        let config = Arc::new(config.clone());
        let records = Records::new(Arc::clone(&prepared), Arc::clone(&storage));
        let events = Events::new(
            Arc::clone(&config),
            Arc::clone(&prepared),
            storage,
            records.clone(),
        );
        Ok(AppStructs {
            config,
            prepared,
            events,
            records,
        })
    }

    /// Application name
    pub fn app_qname(&self) -> &AppQName {
        self.config.name()
    }

    /// Cluster ID of the application
    pub fn cluster_app_id(&self) -> ClusterAppID {
        self.config.cluster_app_id()
    }

    /// Application definition
    pub fn app_def(&self) -> &Arc<AppDef> {
        self.config.app_def()
    }

    /// Application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Prepared system tables
    pub fn prepared(&self) -> &Arc<PreparedApp> {
        &self.prepared
    }

    /// Registered functions
    pub fn resources(&self) -> &Resources {
        self.config.resources()
    }

    /// Event logs
    pub fn events(&self) -> &Events {
        &self.events
    }

    /// Records
    pub fn records(&self) -> &Records {
        &self.records
    }
}

/// Builds and caches [`AppStructs`] per application
pub struct AppStructsProvider {
    configs: AppConfigs,
    storages: Arc<dyn StorageProvider>,
    structs: Mutex<HashMap<AppQName, Arc<AppStructs>>>,
}

impl fmt::Debug for AppStructsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppStructsProvider")
            .field("configs", &self.configs)
            .field("opened", &self.structs.lock().len())
            .finish()
    }
}

impl AppStructsProvider {
    /// Provider over the configurations and the storage provider
    pub fn new(configs: AppConfigs, storages: Arc<dyn StorageProvider>) -> Self {
        AppStructsProvider {
            configs,
            storages,
            structs: Mutex::new(HashMap::new()),
        }
    }

    /// Application configurations
    pub fn configs(&self) -> &AppConfigs {
        &self.configs
    }

    /// Structures of the application, prepared on first request
    ///
    /// # Errors
    ///
    /// `AppNotFound` for an unconfigured application, or the storage and
    /// preparation errors.
    pub fn app_structs(&self, name: &AppQName) -> Result<Arc<AppStructs>> {
        let mut structs = self.structs.lock();
        if let Some(s) = structs.get(name) {
            return Ok(Arc::clone(s));
        }
        let config = self.configs.get_config(name).ok_or_else(|| {
            Error::new(ErrorKind::AppNotFound, format!("application «{}» is not configured", name))
        })?;
        let storage = self.storages.app_storage(name)?;
        let s = Arc::new(AppStructs::new(config, storage)?);
        structs.insert(name.clone(), Arc::clone(&s));
        info!(target: "appstruct::config", app = %name, "App structures opened");
        Ok(s)
    }
}
