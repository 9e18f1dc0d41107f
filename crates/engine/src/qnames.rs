//! Compact QName IDs
//!
//! The compact event codec writes type names as `u16` IDs. IDs are assigned
//! once per application and persisted, so events written by one process
//! decode in another. New types get new IDs; existing IDs never change.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use appstruct_appdef::AppDef;
use appstruct_core::{QName, Storage, NULL_QNAME, QNAME_COMMAND_CUD, QNAME_FOR_ERROR};

use crate::error::{Error, ErrorKind, Result};
use crate::versions::{load_table, store_table, VersionKey, Versions};

/// QName ID
pub type QNameID = u16;

/// ID of the null QName
pub const NULL_QNAME_ID: QNameID = 0;
/// ID of `sys.Error`
pub const QNAME_ID_FOR_ERROR: QNameID = 1;
/// ID of `sys.CUD`
pub const QNAME_ID_COMMAND_CUD: QNameID = 2;
/// First ID handed out to application names
pub const FIRST_USER_QNAME_ID: QNameID = 256;

const QNAMES_VERSION: u16 = 1;

/// QName to ID table
#[derive(Debug, Clone)]
pub struct QNames {
    ids: HashMap<QName, QNameID>,
    names: HashMap<QNameID, QName>,
    last_id: QNameID,
}

impl Default for QNames {
    fn default() -> Self {
        Self::new()
    }
}

impl QNames {
    /// Table with the system names only
    pub fn new() -> Self {
        let mut t = QNames {
            ids: HashMap::new(),
            names: HashMap::new(),
            last_id: FIRST_USER_QNAME_ID - 1,
        };
        t.insert(NULL_QNAME, NULL_QNAME_ID);
        t.insert(QNAME_FOR_ERROR, QNAME_ID_FOR_ERROR);
        t.insert(QNAME_COMMAND_CUD, QNAME_ID_COMMAND_CUD);
        t
    }

    fn insert(&mut self, name: QName, id: QNameID) {
        self.names.insert(id, name.clone());
        self.ids.insert(name, id);
    }

    /// ID of the name
    pub fn id(&self, name: &QName) -> Result<QNameID> {
        self.ids.get(name).copied().ok_or_else(|| {
            Error::new(ErrorKind::NameNotFound, format!("QName «{}» has no ID", name))
        })
    }

    /// Name of the ID
    pub fn qname(&self, id: QNameID) -> Result<QName> {
        self.names.get(&id).cloned().ok_or_else(|| {
            Error::new(ErrorKind::NameNotFound, format!("unknown QName ID «{}»", id))
        })
    }

    /// Number of names, system names included
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if the table holds no names
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Load stored IDs, assign IDs to new names of the application and the
    /// extra names, and store the table if it changed
    pub fn prepare<'a>(
        &mut self,
        storage: &dyn Storage,
        versions: &mut Versions,
        app: &AppDef,
        extra: impl IntoIterator<Item = &'a QName>,
    ) -> Result<()> {
        let stored: BTreeMap<String, QNameID> =
            load_table(storage, versions, VersionKey::QNames, QNAMES_VERSION)?;
        for (name, id) in &stored {
            let qname: QName = name
                .parse()
                .map_err(|e| Error::decode(format!("stored QName «{}»: {}", name, e)))?;
            self.insert(qname, *id);
            self.last_id = self.last_id.max(*id);
        }

        let mut wanted: Vec<QName> = app.types().map(|t| t.name().clone()).collect();
        wanted.extend(extra.into_iter().cloned());
        wanted.sort();
        wanted.dedup();

        let mut added = 0;
        for name in wanted {
            if self.ids.contains_key(&name) {
                continue;
            }
            let id = self.last_id.checked_add(1).ok_or_else(|| {
                Error::new(ErrorKind::IDsExhausted, format!("no QName ID left for «{}»", name))
            })?;
            self.last_id = id;
            self.insert(name, id);
            added += 1;
        }

        if added > 0 {
            let table: BTreeMap<String, QNameID> = self
                .ids
                .iter()
                .filter(|(_, id)| **id >= FIRST_USER_QNAME_ID)
                .map(|(n, id)| (n.to_string(), *id))
                .collect();
            store_table(storage, versions, VersionKey::QNames, QNAMES_VERSION, &table)?;
        }
        debug!(target: "appstruct::config", added, total = self.len(), "QName IDs prepared");
        Ok(())
    }
}
