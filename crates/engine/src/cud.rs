//! CUD plans: records created and updated by one event
//!
//! Creates are full rows with raw IDs. Updates keep three rows per record:
//! the stored `origin`, the `changes` written by the command and the
//! `result`, which is the origin patched with the changes. Only fields
//! present in the changes replace origin values.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use appstruct_appdef::AppDef;
use appstruct_core::{QName, RecordID};

use crate::error::{Error, ErrorKind, Errors, Result};
use crate::idgen::IdGenerator;
use crate::row::{IdPlan, Row};
use crate::singletons::Singletons;

/// Update of one stored record
#[derive(Debug, Clone)]
pub struct UpdateRec {
    origin: Row,
    changes: Row,
    result: Row,
}

impl UpdateRec {
    fn new(origin: &Row) -> Self {
        let app = Arc::clone(origin.app_def());
        let mut changes = Row::with_qname(Arc::clone(&app), origin.qname().clone());
        changes.set_id(origin.id());
        changes.set_active(origin.is_active());
        UpdateRec {
            origin: origin.clone(),
            changes,
            result: Row::new(app),
        }
    }

    fn from_changes(changes: Row) -> Self {
        let app = Arc::clone(changes.app_def());
        UpdateRec {
            origin: Row::new(Arc::clone(&app)),
            changes,
            result: Row::new(app),
        }
    }

    /// Stored record; empty if the update was decoded from bytes
    pub fn origin(&self) -> &Row {
        &self.origin
    }

    /// Changed fields
    pub fn changes(&self) -> &Row {
        &self.changes
    }

    /// Origin patched with the changes; empty until built
    pub fn result(&self) -> &Row {
        &self.result
    }

    /// ID of the updated record
    pub fn id(&self) -> RecordID {
        self.changes.id()
    }

    fn origin_loaded(&self) -> bool {
        !self.origin.is_empty()
    }
}

/// Patch `origin` with `changes`
///
/// # Errors
///
/// Fails if the changes move the record to another ID, parent or
/// container, change its type, or leave the result invalid.
pub(crate) fn update_result(origin: &Row, changes: &Row) -> Result<Row> {
    let mut errs = Errors::default();
    if changes.qname() != origin.qname() {
        errs.add(
            ErrorKind::InvalidTypeKind,
            format!(
                "record «{}» is of type «{}», update has type «{}»",
                origin.id(),
                origin.qname(),
                changes.qname()
            ),
        );
    }
    if changes.id() != origin.id() {
        errs.add(
            ErrorKind::UnableToUpdateSystemField,
            format!("can not change sys.ID of {} from «{}» to «{}»", origin, origin.id(), changes.id()),
        );
    }
    if !changes.parent().is_null() && changes.parent() != origin.parent() {
        errs.add(
            ErrorKind::UnableToUpdateSystemField,
            format!(
                "can not change sys.ParentID of {} from «{}» to «{}»",
                origin,
                origin.parent(),
                changes.parent()
            ),
        );
    }
    if !changes.container().is_empty() && changes.container() != origin.container() {
        errs.add(
            ErrorKind::UnableToUpdateSystemField,
            format!(
                "can not change sys.Container of {} from «{}» to «{}»",
                origin,
                origin.container(),
                changes.container()
            ),
        );
    }
    errs.into_result()?;

    let mut result = origin.clone();
    result.set_new(false);
    result.set_active(changes.is_active());
    for (name, value) in changes.values() {
        result.set_raw_value(name.to_string(), value.clone());
    }
    for name in changes.nils() {
        result.remove_value(name);
    }
    let mut errs = Errors::default();
    errs.check(result.build());
    errs.check(result.validate_required());
    errs.into_result()?;
    Ok(result)
}

/// Creates and updates of one event
#[derive(Debug, Clone)]
pub struct Cud {
    app: Arc<AppDef>,
    creates: Vec<Row>,
    updates: BTreeMap<RecordID, UpdateRec>,
}

impl Cud {
    /// Empty plan
    pub fn new(app: Arc<AppDef>) -> Self {
        Cud {
            app,
            creates: Vec::new(),
            updates: BTreeMap::new(),
        }
    }

    /// Add a new record of the type and return it for filling. The caller
    /// sets its raw `sys.ID`.
    pub fn create(&mut self, qname: QName) -> &mut Row {
        let mut row = Row::with_qname(Arc::clone(&self.app), qname);
        row.set_new(true);
        self.creates.push(row);
        let last = self.creates.len() - 1;
        &mut self.creates[last]
    }

    /// Start or continue an update of a stored record and return its
    /// changes for filling
    pub fn update(&mut self, origin: &Row) -> &mut Row {
        &mut self
            .updates
            .entry(origin.id())
            .or_insert_with(|| UpdateRec::new(origin))
            .changes
    }

    pub(crate) fn push_create(&mut self, mut row: Row) {
        row.set_new(true);
        self.creates.push(row);
    }

    pub(crate) fn push_update_changes(&mut self, changes: Row) {
        self.updates.insert(changes.id(), UpdateRec::from_changes(changes));
    }

    /// Created records in creation order
    pub fn creates(&self) -> &[Row] {
        &self.creates
    }

    /// Updates in record ID order
    pub fn updates(&self) -> impl Iterator<Item = &UpdateRec> {
        self.updates.values()
    }

    /// Number of created and updated records
    pub fn len(&self) -> usize {
        self.creates.len() + self.updates.len()
    }

    /// Returns true if the plan has no records
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty()
    }

    /// Build every created row and changes row, and compute the results
    /// of updates whose origin is known
    ///
    /// # Errors
    ///
    /// Returns every problem found.
    pub fn build(&mut self) -> Result<()> {
        let mut errs = Errors::default();
        for rec in &self.creates {
            errs.check(rec.build());
        }
        for u in self.updates.values_mut() {
            if let Err(e) = u.changes.build() {
                errs.push(e);
                continue;
            }
            if u.origin_loaded() {
                match update_result(&u.origin, &u.changes) {
                    Ok(r) => u.result = r,
                    Err(e) => errs.push(e),
                }
            }
        }
        errs.into_result()
    }

    /// Assign storage IDs to created records. Singleton CDocs take their
    /// fixed ID, records that already have a storage ID keep it and move
    /// the generator past it, the rest get the next generated ID. Raw
    /// references in creates and update changes are then rewritten.
    ///
    /// # Errors
    ///
    /// Fails if the generator is exhausted or a singleton has no ID.
    pub fn regenerate_ids(&mut self, gen: &mut dyn IdGenerator, singletons: &Singletons) -> Result<IdPlan> {
        let mut plan = IdPlan::new();
        for rec in &mut self.creates {
            let id = rec.id();
            let kind = rec.kind();
            if rec.structure().is_some_and(|s| s.is_singleton()) {
                let sid = singletons.id(rec.qname())?;
                if id.is_raw() {
                    plan.insert(id, sid);
                }
                rec.set_id(sid);
                continue;
            }
            if !id.is_raw() {
                gen.update_on_sync(id, kind);
                continue;
            }
            let new_id = gen.next_id(id, kind)?;
            rec.set_id(new_id);
            plan.insert(id, new_id);
        }

        for rec in &mut self.creates {
            rec.rewrite_ids(&plan, false)?;
        }
        for u in self.updates.values_mut() {
            if u.changes.rewrite_ids(&plan, false)? && u.origin_loaded() {
                u.result = update_result(&u.origin, &u.changes)?;
            }
        }
        debug!(target: "appstruct::events", ids = plan.len(), "Storage IDs assigned");
        Ok(plan)
    }

    /// Hand every resulting record to `store`: creates as they are, updates
    /// as results. An update decoded from bytes has no origin; it is loaded
    /// with `load` and patched the same way as in memory.
    ///
    /// # Errors
    ///
    /// Stops at the first error from `load`, patching or `store`.
    pub fn apply_recs(
        &self,
        load: &mut dyn FnMut(RecordID) -> Result<Row>,
        store: &mut dyn FnMut(&Row) -> Result<()>,
    ) -> Result<()> {
        for rec in &self.creates {
            store(rec)?;
        }
        for u in self.updates.values() {
            if u.origin_loaded() && !u.result.is_empty() {
                store(&u.result)?;
                continue;
            }
            let origin = load(u.id())?;
            if origin.is_empty() {
                return Err(Error::new(
                    ErrorKind::RecordIDNotFound,
                    format!("updated record «{}» not found", u.id()),
                ));
            }
            let result = update_result(&origin, &u.changes)?;
            store(&result)?;
        }
        Ok(())
    }
}
