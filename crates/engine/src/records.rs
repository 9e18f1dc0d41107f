//! Record storage
//!
//! Records are stored per workspace under their storage ID. Uniques and
//! the legacy unique field are indexed in the same batch as the records:
//! each index entry maps the unique values to the owning record ID, and an
//! empty entry marks a released key.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use appstruct_appdef::{Structure, SYS_FIELD_PARENT_ID};
use appstruct_core::{BatchItem, GetBatchItem, QName, RecordID, Storage, WSID};

use crate::codec;
use crate::config::PreparedApp;
use crate::error::{Error, ErrorKind, Errors, Result};
use crate::event::Event;
use crate::keys;
use crate::row::Row;
use crate::value::Value;

const LEGACY_UNIQUE: u16 = u16::MAX;

/// Stored records of one application
#[derive(Clone)]
pub struct Records {
    prepared: Arc<PreparedApp>,
    storage: Arc<dyn Storage>,
}

impl fmt::Debug for Records {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Records")
            .field("app", self.prepared.name())
            .finish()
    }
}

fn key_bytes(v: &Value, out: &mut Vec<u8>) {
    match v {
        Value::Int32(x) => out.extend_from_slice(&x.to_be_bytes()),
        Value::Int64(x) => out.extend_from_slice(&x.to_be_bytes()),
        Value::Float32(x) => out.extend_from_slice(&x.to_be_bytes()),
        Value::Float64(x) => out.extend_from_slice(&x.to_be_bytes()),
        Value::Bytes(b) => {
            out.extend_from_slice(&(b.len() as u32).to_be_bytes());
            out.extend_from_slice(b);
        }
        Value::String(s) => {
            out.extend_from_slice(&(s.len() as u32).to_be_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        Value::QName(q) => {
            let s = q.to_string();
            out.extend_from_slice(&(s.len() as u32).to_be_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        Value::Bool(b) => out.push(u8::from(*b)),
        Value::RecordID(id) => out.extend_from_slice(&id.0.to_be_bytes()),
    }
}

fn index_values<'a>(rec: &Row, ordinal: u16, fields: impl IntoIterator<Item = &'a str>) -> Option<Vec<u8>> {
    let mut buf = ordinal.to_be_bytes().to_vec();
    for name in fields {
        key_bytes(rec.value(name)?, &mut buf);
    }
    Some(buf)
}

/// Unique keys of the record. A unique with an empty field is not indexed.
fn unique_keys(s: &Structure, rec: &Row) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    for (i, u) in s.uniques().iter().enumerate() {
        let ordinal = u16::try_from(i).unwrap_or(LEGACY_UNIQUE - 1);
        out.extend(index_values(rec, ordinal, u.fields().iter().map(String::as_str)));
    }
    if let Some(f) = s.unique_field() {
        out.extend(index_values(rec, LEGACY_UNIQUE, [f.name()]));
    }
    out
}

fn decode_owner(v: &[u8]) -> Option<RecordID> {
    let b: [u8; 8] = v.try_into().ok()?;
    Some(RecordID(u64::from_be_bytes(b)))
}

impl Records {
    pub(crate) fn new(prepared: Arc<PreparedApp>, storage: Arc<dyn Storage>) -> Self {
        Records { prepared, storage }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Row> {
        codec::decode_row(&self.prepared, bytes)
    }

    /// Record by ID, `None` if absent
    ///
    /// # Errors
    ///
    /// Fails if the storage fails or the stored bytes are malformed.
    pub fn get(&self, ws: WSID, id: RecordID) -> Result<Option<Row>> {
        let (pk, cc) = keys::record(ws, id);
        match self.storage.get(&pk, &cc)? {
            Some(bytes) => Ok(Some(self.decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Records by ID, in request order
    ///
    /// # Errors
    ///
    /// Fails if the storage fails or the stored bytes are malformed.
    pub fn get_batch(&self, ws: WSID, ids: &[RecordID]) -> Result<Vec<Option<Row>>> {
        let mut groups: BTreeMap<Vec<u8>, Vec<(usize, GetBatchItem)>> = BTreeMap::new();
        for (i, id) in ids.iter().enumerate() {
            let (pk, cc) = keys::record(ws, *id);
            groups.entry(pk).or_default().push((i, GetBatchItem::new(cc)));
        }
        let mut out: Vec<Option<Row>> = vec![None; ids.len()];
        for (pk, group) in groups {
            let (idx, mut items): (Vec<usize>, Vec<GetBatchItem>) = group.into_iter().unzip();
            self.storage.get_batch(&pk, &mut items)?;
            for (i, item) in idx.into_iter().zip(items) {
                if let Some(bytes) = item.data {
                    out[i] = Some(self.decode(&bytes)?);
                }
            }
        }
        Ok(out)
    }

    /// Singleton record of the type, `None` if not created yet
    ///
    /// # Errors
    ///
    /// `NameNotFound` if the type is not a singleton.
    pub fn get_singleton(&self, ws: WSID, qname: &QName) -> Result<Option<Row>> {
        let id = self.prepared.singletons().id(qname)?;
        self.get(ws, id)
    }

    /// Store the records of a valid event
    ///
    /// # Errors
    ///
    /// Fails if an updated record is missing, a unique key is taken by
    /// another record or the storage fails. Nothing is written then.
    pub fn apply(&self, ev: &Event) -> Result<()> {
        self.apply_with(ev, &mut |_| {})
    }

    /// Store the records of a valid event and hand every stored record to
    /// `cb`
    ///
    /// # Errors
    ///
    /// Same as [`Records::apply`].
    pub fn apply_with(&self, ev: &Event, cb: &mut dyn FnMut(&Row)) -> Result<()> {
        if !ev.error().valid() {
            return Ok(());
        }
        let ws = ev.workspace();
        let mut stored: Vec<Row> = Vec::new();
        ev.cud().apply_recs(
            &mut |id| Ok(self.get(ws, id)?.unwrap_or_else(|| Row::new(Arc::clone(self.prepared.app_def())))),
            &mut |rec| {
                stored.push(rec.clone());
                Ok(())
            },
        )?;

        // keys the event's updates give up, with the record giving them up
        let mut released: HashMap<(Vec<u8>, Vec<u8>), RecordID> = HashMap::new();
        for rec in stored.iter().filter(|r| !r.is_new()) {
            let Some(s) = rec.structure() else {
                continue;
            };
            let Some(old) = self.get(ws, rec.id())? else {
                continue;
            };
            let unique_id = self.prepared.qnames().id(rec.qname())?;
            let kept: HashSet<Vec<u8>> = if rec.is_active() {
                unique_keys(s, rec).into_iter().collect()
            } else {
                HashSet::new()
            };
            for values in unique_keys(s, &old) {
                if !kept.contains(&values) {
                    released.insert(keys::unique(ws, unique_id, &values), rec.id());
                }
            }
        }

        let mut batch = Vec::with_capacity(stored.len());
        let mut claimed: HashMap<(Vec<u8>, Vec<u8>), RecordID> = HashMap::new();
        for rec in &stored {
            let Some(s) = rec.structure() else {
                continue;
            };
            if rec.is_active() {
                let unique_id = self.prepared.qnames().id(rec.qname())?;
                for values in unique_keys(s, rec) {
                    let k = keys::unique(ws, unique_id, &values);
                    if let Some(other) = claimed.insert(k.clone(), rec.id()) {
                        if other != rec.id() {
                            return Err(Error::new(
                                ErrorKind::UniqueConstraintViolation,
                                format!("{} repeats a unique key of record «{}» in the same event", rec, other),
                            ));
                        }
                    }
                    if let Some(owner) = self.storage.get(&k.0, &k.1)?.as_deref().and_then(decode_owner) {
                        if owner != rec.id() && released.get(&k) != Some(&owner) {
                            return Err(Error::new(
                                ErrorKind::UniqueConstraintViolation,
                                format!("{} unique key is taken by record «{}»", rec, owner),
                            ));
                        }
                    }
                }
            }

            let (pk, cc) = keys::record(ws, rec.id());
            batch.push(BatchItem {
                p_key: pk,
                c_cols: cc,
                value: codec::encode_row(&self.prepared, rec)?,
            });
        }
        for k in released.keys() {
            if !claimed.contains_key(k) {
                batch.push(BatchItem {
                    p_key: k.0.clone(),
                    c_cols: k.1.clone(),
                    value: Vec::new(),
                });
            }
        }
        for ((pk, cc), id) in &claimed {
            batch.push(BatchItem {
                p_key: pk.clone(),
                c_cols: cc.clone(),
                value: id.0.to_be_bytes().to_vec(),
            });
        }

        self.storage.put_batch(&batch)?;
        for rec in &stored {
            cb(rec);
        }
        debug!(target: "appstruct::records", ws, records = stored.len(), "Records applied");
        Ok(())
    }

    /// Check the event against stored records: stored references must
    /// exist and be of an allowed type, stored parents must declare the
    /// container, updated records must exist with the same type, and a
    /// singleton can be created only once.
    ///
    /// # Errors
    ///
    /// Returns every problem found.
    pub fn valid_event(&self, ev: &Event) -> Result<()> {
        let ws = ev.workspace();
        let cud = ev.cud();
        let mut errs = Errors::default();
        let created: HashSet<RecordID> = cud.creates().iter().map(Row::id).collect();

        for rec in cud.creates() {
            if rec.structure().is_some_and(|s| s.is_singleton()) {
                if let Some(old) = self.get_singleton(ws, rec.qname())? {
                    if !ev.synced() || old.id() != rec.id() {
                        errs.add(
                            ErrorKind::RecordIDUniqueViolation,
                            format!("singleton «{}» already exists as «{}»", rec.qname(), old.id()),
                        );
                    }
                }
            }
        }
        for u in cud.updates() {
            match self.get(ws, u.id())? {
                None => errs.add(
                    ErrorKind::RecordIDNotFound,
                    format!("updated record «{}» not found", u.id()),
                ),
                Some(old) if old.qname() != u.changes().qname() => errs.add(
                    ErrorKind::WrongRecordID,
                    format!("record «{}» is «{}», not «{}»", u.id(), old.qname(), u.changes().qname()),
                ),
                Some(_) => {}
            }
        }

        let rows = cud.creates().iter().chain(cud.updates().map(|u| u.changes()));
        for rec in rows {
            let Some(s) = rec.structure() else {
                continue;
            };
            for (name, id) in rec.record_ids(false) {
                if id.is_raw() || created.contains(&id) {
                    continue;
                }
                let Some(target) = self.get(ws, id)? else {
                    errs.add(
                        ErrorKind::RecordIDNotFound,
                        format!("{} field «{}» refers to missing record «{}»", s, name, id),
                    );
                    continue;
                };
                let ok = if name == SYS_FIELD_PARENT_ID {
                    target
                        .structure()
                        .and_then(|p| p.container(rec.container()))
                        .is_some_and(|c| c.qname() == rec.qname())
                } else {
                    s.field(&name).is_some_and(|f| f.ref_allowed(target.qname()))
                };
                if !ok {
                    errs.add(
                        ErrorKind::WrongRecordID,
                        format!("{} field «{}» can not refer to «{}» of type «{}»", s, name, id, target.qname()),
                    );
                }
            }
        }
        errs.into_result()
    }
}
