//! Singleton CDoc IDs
//!
//! A singleton CDoc has exactly one record per workspace. Its ID does not
//! come from the ID generator: every singleton type owns a fixed ID from
//! the singleton range, so repeated creates and updates of the same
//! singleton always address the same record.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use appstruct_appdef::AppDef;
use appstruct_core::{QName, RecordID, Storage, FIRST_SINGLETON_ID, MAX_SINGLETON_ID};

use crate::error::{Error, ErrorKind, Result};
use crate::versions::{load_table, store_table, VersionKey, Versions};

const SINGLETONS_VERSION: u16 = 1;

/// Singleton type to ID table
#[derive(Debug, Clone, Default)]
pub struct Singletons {
    ids: BTreeMap<QName, RecordID>,
    names: HashMap<RecordID, QName>,
    last_id: Option<RecordID>,
}

impl Singletons {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// ID of the singleton type
    pub fn id(&self, name: &QName) -> Result<RecordID> {
        self.ids.get(name).copied().ok_or_else(|| {
            Error::new(ErrorKind::NameNotFound, format!("singleton «{}» has no ID", name))
        })
    }

    /// Singleton type of the ID
    pub fn qname(&self, id: RecordID) -> Option<&QName> {
        self.names.get(&id)
    }

    /// Singleton types with their IDs, in name order
    pub fn iter(&self) -> impl Iterator<Item = (&QName, RecordID)> {
        self.ids.iter().map(|(n, id)| (n, *id))
    }

    fn insert(&mut self, name: QName, id: RecordID) {
        self.names.insert(id, name.clone());
        self.ids.insert(name, id);
        if self.last_id.map_or(true, |last| id > last) {
            self.last_id = Some(id);
        }
    }

    /// Load stored IDs, assign IDs to new singletons of the application and
    /// store the table if it changed
    pub fn prepare(&mut self, storage: &dyn Storage, versions: &mut Versions, app: &AppDef) -> Result<()> {
        let stored: BTreeMap<String, u64> =
            load_table(storage, versions, VersionKey::Singletons, SINGLETONS_VERSION)?;
        for (name, id) in &stored {
            let qname: QName = name
                .parse()
                .map_err(|e| Error::decode(format!("stored singleton «{}»: {}", name, e)))?;
            self.insert(qname, RecordID(*id));
        }

        let mut added = 0;
        for s in app.singletons() {
            if self.ids.contains_key(s.name()) {
                continue;
            }
            let id = match self.last_id {
                None => FIRST_SINGLETON_ID,
                Some(last) => RecordID(last.0 + 1),
            };
            if id > MAX_SINGLETON_ID {
                return Err(Error::new(
                    ErrorKind::IDsExhausted,
                    format!("no singleton ID left for «{}»", s.name()),
                ));
            }
            self.insert(s.name().clone(), id);
            added += 1;
        }

        if added > 0 {
            let table: BTreeMap<String, u64> =
                self.ids.iter().map(|(n, id)| (n.to_string(), id.0)).collect();
            store_table(storage, versions, VersionKey::Singletons, SINGLETONS_VERSION, &table)?;
        }
        debug!(target: "appstruct::config", added, total = self.ids.len(), "Singleton IDs prepared");
        Ok(())
    }
}
