//! Storage ID generation
//!
//! Raw IDs chosen by the caller are replaced by storage IDs when an event
//! is committed. CDoc and CRecord records draw from their own register so
//! that plain records and configuration records never collide.

use tracing::warn;

use appstruct_appdef::TypeKind;
use appstruct_core::types::{FIRST_BASE_RECORD_ID, REGISTER_FACTOR};
use appstruct_core::RecordID;

use crate::error::{Error, ErrorKind, Result};

/// Source of storage IDs
pub trait IdGenerator {
    /// Next storage ID for a record of `kind` that was created with `raw`
    fn next_id(&mut self, raw: RecordID, kind: TypeKind) -> Result<RecordID>;

    /// Record that `id` is already taken, so it is never generated again.
    /// Called for events that arrive with storage IDs assigned elsewhere.
    fn update_on_sync(&mut self, id: RecordID, kind: TypeKind);
}

/// Generator with one counter per register
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageIdGenerator {
    next_base: u64,
    next_cdoc_base: u64,
}

impl Default for StorageIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageIdGenerator {
    /// Generator for an empty workspace
    pub fn new() -> Self {
        Self::with_bases(FIRST_BASE_RECORD_ID, FIRST_BASE_RECORD_ID)
    }

    /// Generator continuing from known counters
    pub fn with_bases(next_base: u64, next_cdoc_base: u64) -> Self {
        StorageIdGenerator {
            next_base,
            next_cdoc_base,
        }
    }

    /// Next base for plain records
    pub fn next_base(&self) -> u64 {
        self.next_base
    }

    /// Next base for CDoc and CRecord records
    pub fn next_cdoc_base(&self) -> u64 {
        self.next_cdoc_base
    }

    fn counter(&mut self, kind: TypeKind) -> &mut u64 {
        match kind {
            TypeKind::CDoc | TypeKind::CRecord => &mut self.next_cdoc_base,
            _ => &mut self.next_base,
        }
    }
}

impl IdGenerator for StorageIdGenerator {
    fn next_id(&mut self, raw: RecordID, kind: TypeKind) -> Result<RecordID> {
        let counter = self.counter(kind);
        let base = *counter;
        if base >= REGISTER_FACTOR {
            return Err(Error::new(
                ErrorKind::IDsExhausted,
                format!("no storage IDs left for {} record with raw ID «{}»", kind, raw),
            ));
        }
        *counter += 1;
        Ok(match kind {
            TypeKind::CDoc | TypeKind::CRecord => RecordID::new_cdoc_crecord(base),
            _ => RecordID::new_record(base),
        })
    }

    fn update_on_sync(&mut self, id: RecordID, kind: TypeKind) {
        if id.is_raw() || id.is_singleton() || id.is_null() {
            return;
        }
        let expected = match kind {
            TypeKind::CDoc | TypeKind::CRecord => id.is_cdoc_crecord(),
            _ => !id.is_cdoc_crecord(),
        };
        if !expected {
            warn!(target: "appstruct::events", id = %id, kind = %kind, "Synced ID from unexpected register");
        }
        let counter = if id.is_cdoc_crecord() {
            &mut self.next_cdoc_base
        } else {
            &mut self.next_base
        };
        if id.base() >= *counter {
            *counter = id.base() + 1;
        }
    }
}
