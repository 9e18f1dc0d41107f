//! Core types and traits for appstruct
//!
//! This crate defines the leaf types used throughout the system:
//! - QName / AppQName: qualified type and application names
//! - Identifier validation
//! - Limits: fixed catalog bounds
//! - RecordID and its raw / storage / singleton ID spaces
//! - Error: core error type
//! - Traits: the consumed storage contract

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod qname;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use limits::{Occurs, OCCURS_UNBOUNDED};
pub use qname::{
    is_valid_ident, valid_ident, AppQName, QName, NULL_QNAME, QNAME_ANY, QNAME_COMMAND_CUD,
    QNAME_FOR_ERROR, SYS_PACKAGE,
};
pub use traits::{BatchItem, GetBatchItem, Storage, StorageProvider};
pub use types::{
    ClusterAppID, ConnectedDeviceID, Offset, PartitionID, RecordID, UnixMilli, FIRST_OFFSET,
    FIRST_SINGLETON_ID, MAX_RAW_RECORD_ID, MAX_SINGLETON_ID, MIN_RAW_RECORD_ID, NULL_RECORD_ID,
    WSID,
};
