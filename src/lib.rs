//! Appstruct - application type catalog and event/record engine
//!
//! An application declares its types with an [`AppDefBuilder`] and freezes
//! them into an [`AppDef`]. The engine then builds command events against
//! the catalog, validates them, assigns storage IDs and stores events and
//! records through the [`Storage`] contract.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use appstruct::*;
//!
//! let mut adb = AppDefBuilder::new();
//! adb.add_cdoc(QName::new("test", "doc")).add_field("name", DataKind::String, true);
//!
//! let app = AppQName::new("test", "app");
//! let mut configs = AppConfigs::new([(app.clone(), 1)].into_iter().collect());
//! configs.add_config(app.clone(), &adb)?;
//! let provider = AppStructsProvider::new(configs, Arc::new(MemStorageProvider::new()));
//! let structs = provider.app_structs(&app)?;
//! ```
//!
//! # Crates
//!
//! - `appstruct-core`: names, record IDs, the storage contract
//! - `appstruct-appdef`: the type catalog
//! - `appstruct-storage`: in-memory storage
//! - `appstruct-engine`: rows, events, codec, records and partitions

pub use appstruct_appdef as appdef;
pub use appstruct_engine as engine;
pub use appstruct_storage as storage;

pub use appstruct_appdef::{AppDef, AppDefBuilder, DataKind, TypeKind, ValidationErrors};
pub use appstruct_core::{
    AppQName, ClusterAppID, Offset, PartitionID, QName, RecordID, Storage, StorageProvider,
    NULL_QNAME, NULL_RECORD_ID, QNAME_COMMAND_CUD, QNAME_FOR_ERROR, WSID,
};
pub use appstruct_engine::{
    AppConfig, AppConfigs, AppPartitions, AppStructs, AppStructsProvider, ClusterApps, Error,
    ErrorKind, Event, LogEvent, Object, ProcessorKind, RawEventParams, Result, Row,
    StorageIdGenerator,
};
pub use appstruct_storage::{MemStorage, MemStorageProvider};
