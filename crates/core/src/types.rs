//! Identifier types for records, workspaces and logs
//!
//! Record IDs live in two spaces:
//! - **raw IDs** (`1..=0xFFFF`) are chosen by the caller while an event is
//!   built and never reach storage as-is
//! - **storage IDs** are assigned at commit time
//!
//! Storage IDs are split into registers of `REGISTER_FACTOR` IDs each.
//! Plain records take IDs from register `CLUSTER_AS_REGISTER_ID` and CDoc /
//! CRecord records from `CLUSTER_AS_CRECORD_REGISTER_ID`, so the two
//! categories never collide. Singleton CDoc IDs sit in register zero just
//! above the raw range.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Workspace ID
pub type WSID = u64;

/// Log offset (PLog or WLog)
pub type Offset = u64;

/// First offset of any log
pub const FIRST_OFFSET: Offset = 1;

/// Partition ID
pub type PartitionID = u16;

/// Connected device ID for sync events
pub type ConnectedDeviceID = u16;

/// Milliseconds since the Unix epoch
pub type UnixMilli = i64;

/// Cluster-wide application ID
pub type ClusterAppID = u32;

/// IDs in one register
pub const REGISTER_FACTOR: u64 = 5_000_000_000;

/// Register for plain record IDs
pub const CLUSTER_AS_REGISTER_ID: u64 = 0xFFFF - 1000;

/// Register for CDoc and CRecord IDs
pub const CLUSTER_AS_CRECORD_REGISTER_ID: u64 = CLUSTER_AS_REGISTER_ID + 1;

/// First base handed out by a generator in either register
pub const FIRST_BASE_RECORD_ID: u64 = 1;

/// Record identifier
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RecordID(pub u64);

/// Absent record ID
pub const NULL_RECORD_ID: RecordID = RecordID(0);

/// Smallest raw ID
pub const MIN_RAW_RECORD_ID: RecordID = RecordID(1);

/// Largest raw ID
pub const MAX_RAW_RECORD_ID: RecordID = RecordID(0xFFFF);

/// ID of the first singleton CDoc
pub const FIRST_SINGLETON_ID: RecordID = RecordID(MAX_RAW_RECORD_ID.0 + 1);

/// ID of the last possible singleton CDoc
pub const MAX_SINGLETON_ID: RecordID = RecordID(FIRST_SINGLETON_ID.0 + 0x1FF);

impl RecordID {
    /// Plain record storage ID for a generator base
    pub const fn new_record(base: u64) -> Self {
        RecordID(CLUSTER_AS_REGISTER_ID * REGISTER_FACTOR + base)
    }

    /// CDoc / CRecord storage ID for a generator base
    pub const fn new_cdoc_crecord(base: u64) -> Self {
        RecordID(CLUSTER_AS_CRECORD_REGISTER_ID * REGISTER_FACTOR + base)
    }

    /// Returns true for the null ID
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Returns true for caller-chosen transient IDs
    pub const fn is_raw(self) -> bool {
        self.0 >= MIN_RAW_RECORD_ID.0 && self.0 <= MAX_RAW_RECORD_ID.0
    }

    /// Returns true for singleton CDoc IDs
    pub const fn is_singleton(self) -> bool {
        self.0 >= FIRST_SINGLETON_ID.0 && self.0 <= MAX_SINGLETON_ID.0
    }

    /// Register the ID belongs to
    pub const fn register(self) -> u64 {
        self.0 / REGISTER_FACTOR
    }

    /// Offset of the ID within its register
    pub const fn base(self) -> u64 {
        self.0 % REGISTER_FACTOR
    }

    /// Returns true for IDs from the CDoc / CRecord register
    pub const fn is_cdoc_crecord(self) -> bool {
        self.register() == CLUSTER_AS_CRECORD_REGISTER_ID
    }
}

impl fmt::Display for RecordID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RecordID {
    fn from(id: u64) -> Self {
        RecordID(id)
    }
}
