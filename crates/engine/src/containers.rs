//! Compact container name IDs

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use appstruct_appdef::AppDef;
use appstruct_core::Storage;

use crate::error::{Error, ErrorKind, Result};
use crate::versions::{load_table, store_table, VersionKey, Versions};

/// Container ID
pub type ContainerID = u16;

/// ID of the empty container name
pub const NULL_CONTAINER_ID: ContainerID = 0;
/// First ID handed out to container names
pub const FIRST_USER_CONTAINER_ID: ContainerID = 64;

const CONTAINERS_VERSION: u16 = 1;

/// Container name to ID table
#[derive(Debug, Clone)]
pub struct Containers {
    ids: HashMap<String, ContainerID>,
    names: HashMap<ContainerID, String>,
    last_id: ContainerID,
}

impl Default for Containers {
    fn default() -> Self {
        Self::new()
    }
}

impl Containers {
    /// Table with the empty name only
    pub fn new() -> Self {
        let mut t = Containers {
            ids: HashMap::new(),
            names: HashMap::new(),
            last_id: FIRST_USER_CONTAINER_ID - 1,
        };
        t.insert(String::new(), NULL_CONTAINER_ID);
        t
    }

    fn insert(&mut self, name: String, id: ContainerID) {
        self.names.insert(id, name.clone());
        self.ids.insert(name, id);
    }

    /// ID of the container name
    pub fn id(&self, name: &str) -> Result<ContainerID> {
        self.ids.get(name).copied().ok_or_else(|| {
            Error::new(ErrorKind::NameNotFound, format!("container «{}» has no ID", name))
        })
    }

    /// Container name of the ID
    pub fn container(&self, id: ContainerID) -> Result<&str> {
        self.names.get(&id).map(String::as_str).ok_or_else(|| {
            Error::new(ErrorKind::NameNotFound, format!("unknown container ID «{}»", id))
        })
    }

    /// Load stored IDs, assign IDs to new container names of the
    /// application and store the table if it changed
    pub fn prepare(&mut self, storage: &dyn Storage, versions: &mut Versions, app: &AppDef) -> Result<()> {
        let stored: BTreeMap<String, ContainerID> =
            load_table(storage, versions, VersionKey::Containers, CONTAINERS_VERSION)?;
        for (name, id) in stored {
            self.last_id = self.last_id.max(id);
            self.insert(name, id);
        }

        let mut wanted: Vec<&str> = app
            .structures()
            .flat_map(|s| s.containers().iter().map(|c| c.name()))
            .collect();
        wanted.sort_unstable();
        wanted.dedup();

        let mut added = 0;
        for name in wanted {
            if self.ids.contains_key(name) {
                continue;
            }
            let id = self.last_id.checked_add(1).ok_or_else(|| {
                Error::new(ErrorKind::IDsExhausted, format!("no container ID left for «{}»", name))
            })?;
            self.last_id = id;
            self.insert(name.to_string(), id);
            added += 1;
        }

        if added > 0 {
            let table: BTreeMap<&str, ContainerID> = self
                .ids
                .iter()
                .filter(|(_, id)| **id >= FIRST_USER_CONTAINER_ID)
                .map(|(n, id)| (n.as_str(), *id))
                .collect();
            store_table(storage, versions, VersionKey::Containers, CONTAINERS_VERSION, &table)?;
        }
        debug!(target: "appstruct::config", added, "Container IDs prepared");
        Ok(())
    }
}
