//! Storage key layout
//!
//! Every key is a `(partition key, clustering columns)` pair. Partition keys
//! start with a big-endian `u16` view prefix. Log and record keys split
//! their offset or ID: the high bits go to the partition key, the low
//! `LOW_BITS` bits to the clustering columns, so neighbouring entries share
//! a partition and can be read with one range scan.

use appstruct_core::{Offset, PartitionID, RecordID, WSID};

/// System table versions
pub(crate) const SYS_VERSIONS: u16 = 1;
/// QName ID table
pub(crate) const SYS_QNAMES: u16 = 2;
/// Container ID table
pub(crate) const SYS_CONTAINERS: u16 = 3;
/// Singleton ID table
pub(crate) const SYS_SINGLETONS: u16 = 4;
/// Partition log events
pub(crate) const PLOG: u16 = 16;
/// Workspace log events
pub(crate) const WLOG: u16 = 17;
/// Records
pub(crate) const RECORDS: u16 = 18;
/// Unique key index
pub(crate) const UNIQUES: u16 = 19;

pub(crate) const LOW_BITS: u32 = 12;
pub(crate) const LOW_MASK: u64 = (1 << LOW_BITS) - 1;

/// Partition key of a system table
pub(crate) fn sys_pkey(prefix: u16) -> Vec<u8> {
    prefix.to_be_bytes().to_vec()
}

fn split(prefix: u16, scope: &[u8], value: u64) -> (Vec<u8>, Vec<u8>) {
    let mut p = Vec::with_capacity(2 + scope.len() + 8);
    p.extend_from_slice(&prefix.to_be_bytes());
    p.extend_from_slice(scope);
    p.extend_from_slice(&(value >> LOW_BITS).to_be_bytes());
    let c = ((value & LOW_MASK) as u16).to_be_bytes().to_vec();
    (p, c)
}

/// Key of a PLog event
pub(crate) fn plog(partition: PartitionID, offset: Offset) -> (Vec<u8>, Vec<u8>) {
    split(PLOG, &partition.to_be_bytes(), offset)
}

/// Key of a WLog event
pub(crate) fn wlog(ws: WSID, offset: Offset) -> (Vec<u8>, Vec<u8>) {
    split(WLOG, &ws.to_be_bytes(), offset)
}

/// Key of a record
pub(crate) fn record(ws: WSID, id: RecordID) -> (Vec<u8>, Vec<u8>) {
    split(RECORDS, &ws.to_be_bytes(), id.0)
}

/// Key of a unique index entry: one partition per workspace and unique,
/// the unique field values as clustering columns
pub(crate) fn unique(ws: WSID, unique_id: u16, values: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut p = Vec::with_capacity(12);
    p.extend_from_slice(&UNIQUES.to_be_bytes());
    p.extend_from_slice(&ws.to_be_bytes());
    p.extend_from_slice(&unique_id.to_be_bytes());
    (p, values.to_vec())
}

/// Offset rebuilt from a log key
pub(crate) fn offset_of(pkey: &[u8], ccols: &[u8]) -> Offset {
    let hi = match pkey.len().checked_sub(8).and_then(|i| pkey.get(i..)) {
        Some(b) => b.iter().fold(0u64, |acc, x| (acc << 8) | u64::from(*x)),
        None => 0,
    };
    let lo = ccols.iter().fold(0u64, |acc, x| (acc << 8) | u64::from(*x));
    (hi << LOW_BITS) | lo
}
