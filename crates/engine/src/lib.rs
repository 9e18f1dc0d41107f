//! Event and record engine for appstruct
//!
//! The engine stores command events and the records they change:
//! - Row / Object: typed field values and object trees
//! - Cud: records created and updated by one event
//! - Event / LogEvent: built events and shared handles of stored ones
//! - codec: versioned binary layout of events and records
//! - IdGenerator: storage IDs for raw IDs
//! - AppConfig: application definition, functions, validators and the
//!   prepared QName, container and singleton ID tables
//! - AppStructs: PLog, WLog and records over the application storage
//! - AppPartitions: deployed applications and partition borrowing

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod config;
pub mod containers;
pub mod cud;
pub mod error;
pub mod event;
pub mod events;
pub mod idgen;
pub mod object;
pub mod partitions;
pub mod qnames;
pub mod records;
pub mod resources;
pub mod row;
pub mod singletons;
pub mod structs;
pub mod validation;
pub mod value;
pub mod versions;

mod keys;

pub use codec::{decode_event, encode_event, CODEC_COMPACT, CODEC_LAST, CODEC_RAW};
pub use config::{
    AppConfig, AppConfigParams, AppConfigs, BufferPool, ClusterApps, PreparedApp,
    DEFAULT_PLOG_EVENT_CACHE_SIZE,
};
pub use cud::{Cud, UpdateRec};
pub use error::{Error, ErrorKind, Result};
pub use event::{
    argument_names, Event, EventError, EventState, LogEvent, RawEventParams, SyncRawEventParams,
};
pub use events::{Events, READ_TO_THE_END};
pub use idgen::{IdGenerator, StorageIdGenerator};
pub use object::Object;
pub use partitions::{AppPartitions, BorrowedPartition, ProcessorKind};
pub use records::Records;
pub use resources::{CommandFunction, QueryFunction, Resource, Resources};
pub use row::{IdPlan, Row};
pub use structs::{AppStructs, AppStructsProvider};
pub use validation::{validate_event, CudValidator, EventValidator};
pub use value::Value;
