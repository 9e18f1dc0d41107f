//! Partition and workspace event logs
//!
//! Events are written to the PLog of their handling partition, then to the
//! WLog of their workspace. Recently stored PLog events are kept in a
//! bounded FIFO cache of [`LogEvent`] handles, so readers of fresh events
//! share them with the writer instead of decoding bytes.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use appstruct_core::{Offset, PartitionID, Storage, WSID};

use crate::codec;
use crate::config::{AppConfig, PreparedApp};
use crate::error::{Error, Result};
use crate::event::{Event, LogEvent, RawEventParams, SyncRawEventParams};
use crate::idgen::IdGenerator;
use crate::keys;
use crate::records::Records;
use crate::validation::validate_event;

/// Read every event from the offset on
pub const READ_TO_THE_END: usize = usize::MAX;

#[derive(Debug, Default)]
struct PlogCache {
    capacity: usize,
    events: HashMap<(PartitionID, Offset), LogEvent>,
    order: VecDeque<(PartitionID, Offset)>,
}

impl PlogCache {
    fn new(capacity: usize) -> Self {
        PlogCache {
            capacity,
            ..Default::default()
        }
    }

    fn get(&self, key: (PartitionID, Offset)) -> Option<LogEvent> {
        self.events.get(&key).cloned()
    }

    fn put(&mut self, key: (PartitionID, Offset), ev: &LogEvent) {
        if self.capacity == 0 {
            return;
        }
        if self.events.insert(key, ev.clone()).is_none() {
            self.order.push_back(key);
        }
        while self.order.len() > self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.events.remove(&old);
            }
        }
    }

    fn len(&self) -> usize {
        self.events.len()
    }
}

/// Event logs of one application
pub struct Events {
    config: Arc<AppConfig>,
    prepared: Arc<PreparedApp>,
    storage: Arc<dyn Storage>,
    records: Records,
    cache: Mutex<PlogCache>,
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events")
            .field("app", self.prepared.name())
            .field("cached", &self.cache.lock().len())
            .finish()
    }
}

impl Events {
    pub(crate) fn new(
        config: Arc<AppConfig>,
        prepared: Arc<PreparedApp>,
        storage: Arc<dyn Storage>,
        records: Records,
    ) -> Self {
        let capacity = config.params().plog_event_cache_size;
        Events {
            config,
            prepared,
            storage,
            records,
            cache: Mutex::new(PlogCache::new(capacity)),
        }
    }

    /// Start building a command event
    pub fn new_raw_event(&self, params: RawEventParams) -> Event {
        Event::new(Arc::clone(&self.prepared), params)
    }

    /// Start building an event synced from a device
    pub fn new_sync_raw_event(&self, params: SyncRawEventParams) -> Event {
        Event::new_sync(Arc::clone(&self.prepared), params)
    }

    /// Build the event and validate it against the application and the
    /// stored records. A failed event turns invalid and keeps the error;
    /// it can still be stored with `put_plog`.
    ///
    /// # Errors
    ///
    /// Returns every build and validation problem.
    pub fn build_raw_event(&self, ev: &mut Event) -> Result<()> {
        ev.build()?;
        let res = validate_event(ev, &self.config).and_then(|()| self.records.valid_event(ev));
        if let Err(e) = &res {
            ev.set_build_error(e);
        }
        res
    }

    /// Store the event in the PLog. With a build error the event is
    /// stored as invalid; otherwise its raw IDs are replaced with storage
    /// IDs from `gen` first.
    ///
    /// # Errors
    ///
    /// Fails if ID generation or the storage fails. Nothing is stored then.
    pub fn put_plog(
        &self,
        mut ev: Event,
        build_err: Option<Error>,
        gen: &mut dyn IdGenerator,
    ) -> Result<LogEvent> {
        if let Some(e) = &build_err {
            ev.set_build_error(e);
        }
        if ev.error().valid() {
            // IDs issued here stay issued if the put below fails
            ev.regenerate_ids(gen)?;
        } else {
            warn!(
                target: "appstruct::events",
                partition = ev.partition(),
                offset = ev.plog_offset(),
                name = %ev.error().qname_from_params(),
                error = ev.error().message(),
                "Storing invalid event"
            );
        }

        let (pk, cc) = keys::plog(ev.partition(), ev.plog_offset());
        self.storage.put(&pk, &cc, ev.bytes()?)?;
        let key = (ev.partition(), ev.plog_offset());
        let le = LogEvent::new(ev);
        self.cache.lock().put(key, &le);
        debug!(target: "appstruct::events", partition = key.0, offset = key.1, "Event stored in PLog");
        Ok(le)
    }

    /// Store the event in the WLog of its workspace
    ///
    /// # Errors
    ///
    /// Fails if the storage fails.
    pub fn put_wlog(&self, ev: &LogEvent) -> Result<()> {
        let (pk, cc) = keys::wlog(ev.workspace(), ev.wlog_offset());
        self.storage.put(&pk, &cc, ev.bytes()?)?;
        debug!(
            target: "appstruct::events",
            ws = ev.workspace(),
            offset = ev.wlog_offset(),
            "Event stored in WLog"
        );
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<LogEvent> {
        Ok(LogEvent::new(codec::decode_event(&self.prepared, bytes)?))
    }

    /// PLog event at the offset, `None` if absent
    ///
    /// # Errors
    ///
    /// Fails if the storage fails or the stored bytes are malformed.
    pub fn get_plog(&self, partition: PartitionID, offset: Offset) -> Result<Option<LogEvent>> {
        if let Some(ev) = self.cache.lock().get((partition, offset)) {
            return Ok(Some(ev));
        }
        let (pk, cc) = keys::plog(partition, offset);
        let Some(bytes) = self.storage.get(&pk, &cc)? else {
            return Ok(None);
        };
        let ev = self.decode(&bytes)?;
        self.cache.lock().put((partition, offset), &ev);
        Ok(Some(ev))
    }

    /// Collect up to `count` stored entries starting at `offset`. Reading
    /// stops at the first key partition that has no entries left.
    fn read_log(
        &self,
        key: impl Fn(Offset) -> (Vec<u8>, Vec<u8>),
        offset: Offset,
        count: usize,
    ) -> Result<Vec<(Offset, Vec<u8>)>> {
        let mut out = Vec::new();
        let mut from = offset;
        while out.len() < count {
            let (pk, start) = key(from);
            let mut found = 0usize;
            self.storage.read(&pk, &start, &[], &mut |cc, value| {
                found += 1;
                if out.len() < count {
                    out.push((keys::offset_of(&pk, cc), value.to_vec()));
                }
                Ok(())
            })?;
            if found == 0 {
                break;
            }
            match (from | keys::LOW_MASK).checked_add(1) {
                Some(next) => from = next,
                None => break,
            }
        }
        Ok(out)
    }

    /// Visit up to `count` PLog events of the partition from `offset` on,
    /// in offset order
    ///
    /// # Errors
    ///
    /// Stops at the first storage, decoding or callback error.
    pub fn read_plog(
        &self,
        partition: PartitionID,
        offset: Offset,
        count: usize,
        cb: &mut dyn FnMut(Offset, LogEvent) -> Result<()>,
    ) -> Result<()> {
        let entries = self.read_log(|o| keys::plog(partition, o), offset, count)?;
        for (off, bytes) in entries {
            let cached = self.cache.lock().get((partition, off));
            let ev = match cached {
                Some(ev) => ev,
                None => self.decode(&bytes)?,
            };
            cb(off, ev)?;
        }
        Ok(())
    }

    /// Visit up to `count` WLog events of the workspace from `offset` on,
    /// in offset order
    ///
    /// # Errors
    ///
    /// Stops at the first storage, decoding or callback error.
    pub fn read_wlog(
        &self,
        ws: WSID,
        offset: Offset,
        count: usize,
        cb: &mut dyn FnMut(Offset, LogEvent) -> Result<()>,
    ) -> Result<()> {
        let entries = self.read_log(|o| keys::wlog(ws, o), offset, count)?;
        for (off, bytes) in entries {
            cb(off, self.decode(&bytes)?)?;
        }
        Ok(())
    }

    /// Number of events in the PLog cache
    pub fn cached_count(&self) -> usize {
        self.cache.lock().len()
    }
}
