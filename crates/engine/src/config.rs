//! Application configuration
//!
//! An [`AppConfig`] ties an application name to its frozen [`AppDef`], its
//! registered functions and validators, and the engine parameters read
//! from TOML. Before events can be encoded the config is prepared against
//! the application storage: QName, container and singleton IDs are loaded
//! or assigned once and kept in a [`PreparedApp`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use appstruct_appdef::{AppDef, AppDefBuilder};
use appstruct_core::{AppQName, ClusterAppID, Storage};

use crate::containers::Containers;
use crate::error::{Error, ErrorKind, Result};
use crate::qnames::QNames;
use crate::resources::{Resource, Resources};
use crate::singletons::Singletons;
use crate::validation::{CudValidator, EventValidator};
use crate::versions::Versions;

/// Default number of PLog events kept in memory
pub const DEFAULT_PLOG_EVENT_CACHE_SIZE: usize = 10_000;

/// Engine parameters of an application
///
/// # Example
///
/// ```toml
/// # Events kept in the PLog cache, 0 disables the cache
/// plog_event_cache_size = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfigParams {
    /// PLog events kept in memory
    #[serde(default = "default_plog_event_cache_size")]
    pub plog_event_cache_size: usize,
}

fn default_plog_event_cache_size() -> usize {
    DEFAULT_PLOG_EVENT_CACHE_SIZE
}

impl Default for AppConfigParams {
    fn default() -> Self {
        Self {
            plog_event_cache_size: default_plog_event_cache_size(),
        }
    }
}

impl AppConfigParams {
    /// Returns the default parameter file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# appstruct application parameters
#
# Number of PLog events kept in memory (default: 10000).
# 0 disables the cache.
plog_event_cache_size = 10000
"#
    }

    /// Parse parameters from TOML text
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if the text does not parse.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| {
            Error::new(ErrorKind::Config, format!("failed to parse app parameters: {}", e))
        })
    }

    /// Read and parse parameters from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::new(
                ErrorKind::Config,
                format!("failed to read config file '{}': {}", path.display(), e),
            )
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::new(
                ErrorKind::Config,
                format!("failed to parse config file '{}': {}", path.display(), e),
            )
        })
    }

    /// Serialize the parameters to TOML and write them to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            Error::new(ErrorKind::Config, format!("failed to serialize app parameters: {}", e))
        })?;
        std::fs::write(path, content).map_err(|e| {
            Error::new(
                ErrorKind::Config,
                format!("failed to write config file '{}': {}", path.display(), e),
            )
        })
    }
}

/// Applications deployed in the cluster with their cluster IDs
#[derive(Debug, Clone, Default)]
pub struct ClusterApps {
    ids: BTreeMap<AppQName, ClusterAppID>,
}

impl ClusterApps {
    /// No applications
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an application
    pub fn add(&mut self, name: AppQName, id: ClusterAppID) -> &mut Self {
        self.ids.insert(name, id);
        self
    }

    /// Cluster ID of the application
    pub fn id(&self, name: &AppQName) -> Option<ClusterAppID> {
        self.ids.get(name).copied()
    }
}

impl FromIterator<(AppQName, ClusterAppID)> for ClusterApps {
    fn from_iter<I: IntoIterator<Item = (AppQName, ClusterAppID)>>(iter: I) -> Self {
        ClusterApps {
            ids: iter.into_iter().collect(),
        }
    }
}

const MAX_POOLED_BUFFERS: usize = 64;

/// Reusable event byte buffers
#[derive(Debug, Default)]
pub struct BufferPool {
    bufs: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    /// Take an empty buffer
    pub fn take(&self) -> Vec<u8> {
        self.bufs.lock().pop().unwrap_or_default()
    }

    /// Return a buffer for reuse
    pub fn give(&self, mut buf: Vec<u8>) {
        buf.clear();
        let mut bufs = self.bufs.lock();
        if bufs.len() < MAX_POOLED_BUFFERS {
            bufs.push(buf);
        }
    }

    /// Number of idle buffers
    pub fn len(&self) -> usize {
        self.bufs.lock().len()
    }

    /// Returns true if no buffer is idle
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Application state shared by events after preparation
#[derive(Debug)]
pub struct PreparedApp {
    name: AppQName,
    app_def: Arc<AppDef>,
    qnames: QNames,
    containers: Containers,
    singletons: Singletons,
    pool: BufferPool,
}

impl PreparedApp {
    /// Application name
    pub fn name(&self) -> &AppQName {
        &self.name
    }

    /// Application definition
    pub fn app_def(&self) -> &Arc<AppDef> {
        &self.app_def
    }

    /// QName IDs
    pub fn qnames(&self) -> &QNames {
        &self.qnames
    }

    /// Container IDs
    pub fn containers(&self) -> &Containers {
        &self.containers
    }

    /// Singleton IDs
    pub fn singletons(&self) -> &Singletons {
        &self.singletons
    }

    /// Event buffer pool
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }
}

/// Configuration of one application
#[derive(Debug, Clone)]
pub struct AppConfig {
    name: AppQName,
    cluster_app_id: ClusterAppID,
    app_def: Arc<AppDef>,
    resources: Resources,
    params: AppConfigParams,
    cud_validators: Vec<CudValidator>,
    event_validators: Vec<EventValidator>,
    prepared: OnceCell<Arc<PreparedApp>>,
}

impl AppConfig {
    /// Configuration of a built application
    pub fn new(name: AppQName, cluster_app_id: ClusterAppID, app_def: Arc<AppDef>) -> Self {
        AppConfig {
            name,
            cluster_app_id,
            app_def,
            resources: Resources::new(),
            params: AppConfigParams::default(),
            cud_validators: Vec::new(),
            event_validators: Vec::new(),
            prepared: OnceCell::new(),
        }
    }

    /// Application name
    pub fn name(&self) -> &AppQName {
        &self.name
    }

    /// Cluster ID of the application
    pub fn cluster_app_id(&self) -> ClusterAppID {
        self.cluster_app_id
    }

    /// Application definition
    pub fn app_def(&self) -> &Arc<AppDef> {
        &self.app_def
    }

    /// Registered functions
    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Engine parameters
    pub fn params(&self) -> &AppConfigParams {
        &self.params
    }

    /// Replace the engine parameters
    pub fn set_params(&mut self, params: AppConfigParams) -> &mut Self {
        self.params = params;
        self
    }

    /// Register a command or query function
    pub fn add_resource(&mut self, r: impl Into<Resource>) -> &mut Self {
        self.resources.add(r);
        self
    }

    /// Register a validator for created and updated records
    pub fn add_cud_validator(&mut self, v: CudValidator) -> &mut Self {
        self.cud_validators.push(v);
        self
    }

    /// Register a validator for whole events
    pub fn add_event_validator(&mut self, v: EventValidator) -> &mut Self {
        self.event_validators.push(v);
        self
    }

    /// Record validators
    pub fn cud_validators(&self) -> &[CudValidator] {
        &self.cud_validators
    }

    /// Event validators
    pub fn event_validators(&self) -> &[EventValidator] {
        &self.event_validators
    }

    /// Returns true once `prepare` has succeeded
    pub fn is_prepared(&self) -> bool {
        self.prepared.get().is_some()
    }

    /// Prepared state, if `prepare` has succeeded
    pub fn prepared(&self) -> Option<&Arc<PreparedApp>> {
        self.prepared.get()
    }

    /// Load or assign the system table IDs of the application. Only the
    /// first successful call touches storage; later calls return the same
    /// prepared state.
    ///
    /// # Errors
    ///
    /// Fails if the storage fails or a system table is exhausted.
    pub fn prepare(&self, storage: &dyn Storage) -> Result<Arc<PreparedApp>> {
        self.prepared
            .get_or_try_init(|| {
                let mut versions = Versions::load(storage)?;
                let mut qnames = QNames::new();
                qnames.prepare(storage, &mut versions, &self.app_def, self.resources.qnames())?;
                let mut containers = Containers::new();
                containers.prepare(storage, &mut versions, &self.app_def)?;
                let mut singletons = Singletons::new();
                singletons.prepare(storage, &mut versions, &self.app_def)?;
                info!(
                    target: "appstruct::config",
                    app = %self.name,
                    types = self.app_def.type_count(),
                    resources = self.resources.len(),
                    "App config prepared"
                );
                Ok(Arc::new(PreparedApp {
                    name: self.name.clone(),
                    app_def: Arc::clone(&self.app_def),
                    qnames,
                    containers,
                    singletons,
                    pool: BufferPool::default(),
                }))
            })
            .cloned()
    }
}

/// Configurations of every application
#[derive(Debug, Default)]
pub struct AppConfigs {
    cluster_apps: ClusterApps,
    configs: BTreeMap<AppQName, AppConfig>,
}

impl AppConfigs {
    /// No configurations yet
    pub fn new(cluster_apps: ClusterApps) -> Self {
        AppConfigs {
            cluster_apps,
            configs: BTreeMap::new(),
        }
    }

    /// Build the application definition and add its configuration
    ///
    /// # Errors
    ///
    /// Fails with `AppNotFound` for applications unknown to the cluster and
    /// with the validation errors of the definition if it does not build.
    pub fn add_config(&mut self, name: AppQName, def: &AppDefBuilder) -> Result<&mut AppConfig> {
        let id = self.cluster_apps.id(&name).ok_or_else(|| {
            Error::new(ErrorKind::AppNotFound, format!("application «{}» is not in the cluster", name))
        })?;
        let app_def = Arc::new(def.build()?);
        debug!(target: "appstruct::config", app = %name, id, "Added app config");
        let cfg = AppConfig::new(name.clone(), id, app_def);
        self.configs.insert(name.clone(), cfg);
        self.configs
            .get_mut(&name)
            .ok_or_else(|| Error::new(ErrorKind::AppNotFound, format!("application «{}»", name)))
    }

    /// Configuration of the application
    pub fn get_config(&self, name: &AppQName) -> Option<&AppConfig> {
        self.configs.get(name)
    }

    /// Mutable configuration of the application
    pub fn get_config_mut(&mut self, name: &AppQName) -> Option<&mut AppConfig> {
        self.configs.get_mut(name)
    }

    /// Configured application names
    pub fn names(&self) -> impl Iterator<Item = &AppQName> {
        self.configs.keys()
    }
}
