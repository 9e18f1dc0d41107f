//! Versions of the system tables
//!
//! Each system table is stored as one MessagePack blob under its own
//! partition key, with the table version as clustering columns. The
//! versions themselves are kept in one more blob.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use appstruct_core::Storage;

use crate::error::{Error, ErrorKind, Result};
use crate::keys;

/// System table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VersionKey {
    /// QName IDs
    QNames,
    /// Container IDs
    Containers,
    /// Singleton IDs
    Singletons,
}

impl VersionKey {
    fn code(self) -> u16 {
        match self {
            VersionKey::QNames => keys::SYS_QNAMES,
            VersionKey::Containers => keys::SYS_CONTAINERS,
            VersionKey::Singletons => keys::SYS_SINGLETONS,
        }
    }
}

/// Version of a table that was never stored
pub const UNKNOWN_VERSION: u16 = 0;

/// Stored table versions
#[derive(Debug, Clone, Default)]
pub struct Versions {
    map: BTreeMap<u16, u16>,
}

impl Versions {
    /// Load versions from storage
    pub fn load(storage: &dyn Storage) -> Result<Self> {
        let map = match storage.get(&keys::sys_pkey(keys::SYS_VERSIONS), &[])? {
            Some(b) => rmp_serde::from_slice(&b)
                .map_err(|e| Error::decode(format!("invalid system versions blob: {}", e)))?,
            None => BTreeMap::new(),
        };
        Ok(Versions { map })
    }

    /// Stored version of the table, `UNKNOWN_VERSION` if never stored
    pub fn get(&self, key: VersionKey) -> u16 {
        self.map.get(&key.code()).copied().unwrap_or(UNKNOWN_VERSION)
    }

    /// Store a new version of the table
    pub fn put(&mut self, storage: &dyn Storage, key: VersionKey, version: u16) -> Result<()> {
        self.map.insert(key.code(), version);
        let blob = encode(&self.map)?;
        storage.put(&keys::sys_pkey(keys::SYS_VERSIONS), &[], &blob)?;
        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    rmp_serde::to_vec(value)
        .map_err(|e| Error::new(ErrorKind::Storage, format!("system table encoding failed: {}", e)))
}

/// Load a system table of the `current` version. A table that was never
/// stored loads as empty.
pub(crate) fn load_table<T: DeserializeOwned + Default>(
    storage: &dyn Storage,
    versions: &Versions,
    key: VersionKey,
    current: u16,
) -> Result<T> {
    match versions.get(key) {
        UNKNOWN_VERSION => Ok(T::default()),
        v if v == current => {
            match storage.get(&keys::sys_pkey(key.code()), &v.to_be_bytes())? {
                Some(b) => rmp_serde::from_slice(&b)
                    .map_err(|e| Error::decode(format!("invalid {:?} system table: {}", key, e))),
                None => Ok(T::default()),
            }
        }
        v => Err(Error::decode(format!(
            "unknown version «{}» of {:?} system table",
            v, key
        ))),
    }
}

/// Store a system table and record its version
pub(crate) fn store_table<T: Serialize>(
    storage: &dyn Storage,
    versions: &mut Versions,
    key: VersionKey,
    current: u16,
    table: &T,
) -> Result<()> {
    let blob = encode(table)?;
    storage.put(&keys::sys_pkey(key.code()), &current.to_be_bytes(), &blob)?;
    if versions.get(key) != current {
        versions.put(storage, key, current)?;
    }
    debug!(target: "appstruct::config", table = ?key, version = current, "Stored system table");
    Ok(())
}
