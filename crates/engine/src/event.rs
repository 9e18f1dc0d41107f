//! Events
//!
//! An event is one command call: its name, log coordinates, argument
//! object, unlogged argument object and CUD plan. Events move through
//! `Building` to either `Built` or `Invalid`. An invalid event is kept: it
//! carries the build error and the raw request bytes so it can be logged
//! and skipped on replay.
//!
//! Stored events are shared through [`LogEvent`] handles. Cloning a handle
//! adds a reference and [`LogEvent::release`] drops one. The event buffer
//! returns to the application pool when the last handle goes.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use appstruct_appdef::AppDef;
use appstruct_core::{
    ConnectedDeviceID, Offset, PartitionID, QName, UnixMilli, NULL_QNAME, QNAME_COMMAND_CUD,
    QNAME_FOR_ERROR, WSID,
};

use crate::codec;
use crate::config::PreparedApp;
use crate::cud::Cud;
use crate::error::{Error, ErrorKind, Errors, Result};
use crate::idgen::IdGenerator;
use crate::object::Object;

/// Parameters of a new event
#[derive(Debug, Clone, Default)]
pub struct RawEventParams {
    /// Command name
    pub name: QName,
    /// Partition that handles the event
    pub handling_partition: PartitionID,
    /// Offset in the partition log
    pub plog_offset: Offset,
    /// Workspace
    pub workspace: WSID,
    /// Offset in the workspace log
    pub wlog_offset: Offset,
    /// Registration time
    pub registered_at: UnixMilli,
    /// Request bytes, kept if the event turns out invalid
    pub event_bytes: Vec<u8>,
}

/// Parameters of an event synced from a device
#[derive(Debug, Clone, Default)]
pub struct SyncRawEventParams {
    /// Common parameters
    pub params: RawEventParams,
    /// Device the event comes from
    pub device: ConnectedDeviceID,
    /// Sync time
    pub synced_at: UnixMilli,
}

/// Lifecycle state of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    /// Filled by the caller
    Building,
    /// Built and valid
    Built,
    /// Failed to build or validate
    Invalid,
}

/// Build error of an invalid event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventError {
    pub(crate) valid: bool,
    pub(crate) message: String,
    pub(crate) qname: QName,
    pub(crate) bytes: Vec<u8>,
}

impl Default for EventError {
    fn default() -> Self {
        EventError {
            valid: true,
            message: String::new(),
            qname: NULL_QNAME,
            bytes: Vec::new(),
        }
    }
}

impl EventError {
    /// Returns true if the event is valid
    pub fn valid(&self) -> bool {
        self.valid
    }

    /// Error text
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Command name the event was requested with
    pub fn qname_from_params(&self) -> &QName {
        &self.qname
    }

    /// Request bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Argument and unlogged argument types of a command
///
/// `sys.CUD` has no arguments, an ODoc used as a command name is its own
/// argument.
pub fn argument_names(app: &AppDef, name: &QName) -> Result<(QName, QName)> {
    if *name == QNAME_COMMAND_CUD {
        return Ok((NULL_QNAME, NULL_QNAME));
    }
    if let Some(cmd) = app.command(name) {
        return Ok((cmd.param().clone(), cmd.unlogged_param().clone()));
    }
    if app.odoc(name).is_some() {
        return Ok((name.clone(), NULL_QNAME));
    }
    Err(Error::new(
        ErrorKind::NameNotFound,
        format!("command function «{}» not found", name),
    ))
}

/// Type an argument object is built with: structures only, anything else
/// leaves the object untyped
fn object_type(app: &AppDef, name: &QName) -> QName {
    if app.structure(name).is_some() {
        name.clone()
    } else {
        NULL_QNAME
    }
}

/// Command event
#[derive(Debug)]
pub struct Event {
    pub(crate) prepared: Arc<PreparedApp>,
    pub(crate) raw_bytes: Vec<u8>,
    pub(crate) partition: PartitionID,
    pub(crate) plog_offset: Offset,
    pub(crate) workspace: WSID,
    pub(crate) wlog_offset: Offset,
    pub(crate) name: QName,
    pub(crate) registered_at: UnixMilli,
    pub(crate) sync: bool,
    pub(crate) device: ConnectedDeviceID,
    pub(crate) synced_at: UnixMilli,
    pub(crate) arg: Object,
    pub(crate) arg_unlogged: Object,
    pub(crate) cud: Cud,
    pub(crate) error: EventError,
    pub(crate) state: EventState,
    pub(crate) bytes: OnceCell<Vec<u8>>,
}

impl Event {
    pub(crate) fn blank(prepared: Arc<PreparedApp>) -> Self {
        let app = Arc::clone(prepared.app_def());
        Event {
            raw_bytes: Vec::new(),
            partition: 0,
            plog_offset: 0,
            workspace: 0,
            wlog_offset: 0,
            name: NULL_QNAME,
            registered_at: 0,
            sync: false,
            device: 0,
            synced_at: 0,
            arg: Object::new(Arc::clone(&app), NULL_QNAME),
            arg_unlogged: Object::new(Arc::clone(&app), NULL_QNAME),
            cud: Cud::new(app),
            error: EventError::default(),
            state: EventState::Building,
            bytes: OnceCell::new(),
            prepared,
        }
    }

    /// Start building an event
    pub fn new(prepared: Arc<PreparedApp>, params: RawEventParams) -> Self {
        let mut ev = Event::blank(prepared);
        ev.raw_bytes = params.event_bytes;
        ev.partition = params.handling_partition;
        ev.plog_offset = params.plog_offset;
        ev.workspace = params.workspace;
        ev.wlog_offset = params.wlog_offset;
        ev.registered_at = params.registered_at;
        ev.name = params.name;
        if let Ok((arg, unlogged)) = argument_names(ev.prepared.app_def(), &ev.name) {
            let app = Arc::clone(ev.prepared.app_def());
            ev.arg = Object::new(Arc::clone(&app), object_type(&app, &arg));
            ev.arg_unlogged = Object::new(Arc::clone(&app), object_type(&app, &unlogged));
        }
        ev
    }

    /// Start building an event synced from a device
    pub fn new_sync(prepared: Arc<PreparedApp>, params: SyncRawEventParams) -> Self {
        let mut ev = Event::new(prepared, params.params);
        ev.sync = true;
        ev.device = params.device;
        ev.synced_at = params.synced_at;
        ev
    }

    /// Argument object to fill
    pub fn arg_object_builder(&mut self) -> &mut Object {
        &mut self.arg
    }

    /// Unlogged argument object to fill
    pub fn unlogged_arg_object_builder(&mut self) -> &mut Object {
        &mut self.arg_unlogged
    }

    /// CUD plan to fill
    pub fn cud_builder(&mut self) -> &mut Cud {
        &mut self.cud
    }

    fn reset_bytes(&mut self) {
        if let Some(buf) = self.bytes.take() {
            self.prepared.pool().give(buf);
        }
    }

    fn build_parts(&mut self) -> Result<()> {
        if self.name.is_null() {
            return Err(Error::new(ErrorKind::NameMissed, "empty event command name"));
        }
        if self.prepared.qnames().id(&self.name).is_err() {
            return Err(Error::new(
                ErrorKind::NameNotFound,
                format!("unknown event command «{}»", self.name),
            ));
        }
        let mut errs = Errors::default();
        errs.check(argument_names(self.prepared.app_def(), &self.name).map(|_| ()));
        errs.check(self.arg.build_rows());
        errs.check(self.arg_unlogged.build_rows());
        errs.check(self.cud.build());
        errs.into_result()
    }

    /// Build the argument trees and the CUD plan. On failure the event
    /// becomes invalid and keeps the error.
    ///
    /// # Errors
    ///
    /// Returns every problem found.
    pub fn build(&mut self) -> Result<()> {
        self.reset_bytes();
        let res = self.build_parts();
        match &res {
            Ok(()) => self.state = EventState::Built,
            Err(e) => self.set_build_error(e),
        }
        res
    }

    /// Turn the event invalid with the error
    pub fn set_build_error(&mut self, err: &Error) {
        self.reset_bytes();
        self.error = EventError {
            valid: false,
            message: err.to_string(),
            qname: self.name.clone(),
            bytes: self.raw_bytes.clone(),
        };
        self.state = EventState::Invalid;
    }

    /// Replace raw IDs in the argument tree and the CUD plan with storage
    /// IDs. Invalid events are left as they are.
    ///
    /// # Errors
    ///
    /// Fails if the generator fails or a raw reference is dangling.
    pub fn regenerate_ids(&mut self, gen: &mut dyn IdGenerator) -> Result<()> {
        if !self.error.valid {
            return Ok(());
        }
        self.reset_bytes();
        self.arg.regenerate_ids(gen)?;
        let prepared = Arc::clone(&self.prepared);
        self.cud.regenerate_ids(gen, prepared.singletons())?;
        Ok(())
    }

    /// Encoded event, encoded on first call and cached
    ///
    /// # Errors
    ///
    /// Fails if a name has no compact ID.
    pub fn bytes(&self) -> Result<&[u8]> {
        self.bytes
            .get_or_try_init(|| {
                let mut buf = self.prepared.pool().take();
                codec::encode_into(self, codec::CODEC_LAST, &mut buf)?;
                Ok(buf)
            })
            .map(Vec::as_slice)
    }

    /// Lifecycle state
    pub fn state(&self) -> EventState {
        self.state
    }

    /// Application definition
    pub fn app_def(&self) -> &Arc<AppDef> {
        self.prepared.app_def()
    }

    /// Prepared application
    pub fn prepared(&self) -> &Arc<PreparedApp> {
        &self.prepared
    }

    /// Event name: the command name, `sys.Error` for invalid events
    pub fn qname(&self) -> QName {
        if self.error.valid {
            self.name.clone()
        } else {
            QNAME_FOR_ERROR
        }
    }

    /// Command name the event was requested with
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Argument object
    pub fn arg_object(&self) -> &Object {
        &self.arg
    }

    /// Unlogged argument object; never stored
    pub fn unlogged_arg_object(&self) -> &Object {
        &self.arg_unlogged
    }

    /// CUD plan
    pub fn cud(&self) -> &Cud {
        &self.cud
    }

    /// Build error state
    pub fn error(&self) -> &EventError {
        &self.error
    }

    /// Request bytes
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    /// Handling partition
    pub fn partition(&self) -> PartitionID {
        self.partition
    }

    /// Offset in the partition log
    pub fn plog_offset(&self) -> Offset {
        self.plog_offset
    }

    /// Workspace
    pub fn workspace(&self) -> WSID {
        self.workspace
    }

    /// Offset in the workspace log
    pub fn wlog_offset(&self) -> Offset {
        self.wlog_offset
    }

    /// Registration time
    pub fn registered_at(&self) -> UnixMilli {
        self.registered_at
    }

    /// Returns true for events synced from a device
    pub fn synced(&self) -> bool {
        self.sync
    }

    /// Device of a synced event
    pub fn device(&self) -> ConnectedDeviceID {
        self.device
    }

    /// Sync time of a synced event
    pub fn synced_at(&self) -> UnixMilli {
        self.synced_at
    }
}

impl Drop for Event {
    fn drop(&mut self) {
        self.reset_bytes();
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event «{}»", self.qname())
    }
}

/// Shared handle of a stored event
///
/// The PLog cache and processors may hold the same event at once. Each
/// holder releases its handle exactly once, by `release()` or by dropping
/// it.
#[derive(Debug, Clone)]
pub struct LogEvent(Arc<Event>);

impl LogEvent {
    /// Wrap a built event
    pub fn new(event: Event) -> Self {
        LogEvent(Arc::new(event))
    }

    /// Drop this handle
    pub fn release(self) {}

    /// Number of live handles
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl Deref for LogEvent {
    type Target = Event;

    fn deref(&self) -> &Event {
        &self.0
    }
}
