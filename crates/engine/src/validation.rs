//! Event validation
//!
//! Runs after an event builds and before it is stored. Structural checks
//! cover the argument objects and the CUD plan; registered validators run
//! last and only when the structure is sound. Storage-level checks live in
//! `Records::valid_event`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use appstruct_appdef::{AppDef, SYS_FIELD_PARENT_ID};
use appstruct_core::{QName, RecordID, WSID};

use crate::config::AppConfig;
use crate::error::{Error, ErrorKind, Errors, Result};
use crate::event::{argument_names, Event};
use crate::object::Object;
use crate::row::Row;

type CudValidateFn = Arc<dyn Fn(&Row, WSID, &QName) -> Result<()> + Send + Sync>;
type EventValidateFn = Arc<dyn Fn(&Event, WSID) -> Result<()> + Send + Sync>;

/// Validator of created and updated records
///
/// Called with the record, the workspace and the command name.
#[derive(Clone)]
pub struct CudValidator {
    match_qnames: Vec<QName>,
    validate: CudValidateFn,
}

impl CudValidator {
    /// Validator for records of the listed types; an empty list matches
    /// every record
    pub fn new(
        match_qnames: impl IntoIterator<Item = QName>,
        validate: impl Fn(&Row, WSID, &QName) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        CudValidator {
            match_qnames: match_qnames.into_iter().collect(),
            validate: Arc::new(validate),
        }
    }

    /// Returns true if the validator applies to records of the type
    pub fn matches(&self, qname: &QName) -> bool {
        self.match_qnames.is_empty() || self.match_qnames.contains(qname)
    }

    /// Run the validator
    pub fn validate(&self, rec: &Row, ws: WSID, cmd: &QName) -> Result<()> {
        (self.validate)(rec, ws, cmd)
    }
}

impl fmt::Debug for CudValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CudValidator")
            .field("match_qnames", &self.match_qnames)
            .finish()
    }
}

/// Validator of whole events
#[derive(Clone)]
pub struct EventValidator {
    validate: EventValidateFn,
}

impl EventValidator {
    /// Wrap a validation function
    pub fn new(validate: impl Fn(&Event, WSID) -> Result<()> + Send + Sync + 'static) -> Self {
        EventValidator {
            validate: Arc::new(validate),
        }
    }

    /// Run the validator
    pub fn validate(&self, event: &Event, ws: WSID) -> Result<()> {
        (self.validate)(event, ws)
    }
}

impl fmt::Debug for EventValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventValidator")
    }
}

fn validate_arg(app: &AppDef, obj: &Object, expected: &QName, what: &str) -> Result<()> {
    if expected.is_null() {
        if !obj.qname().is_null() || obj.children("").next().is_some() {
            return Err(Error::new(
                ErrorKind::InvalidTypeKind,
                format!("command takes no {}, got «{}»", what, obj.qname()),
            ));
        }
        return Ok(());
    }
    if app.structure(expected).is_none() {
        // data and sys.ANY arguments carry no object tree
        return Ok(());
    }
    if obj.qname() != expected {
        return Err(Error::new(
            ErrorKind::InvalidTypeKind,
            format!("{} must be «{}», got «{}»", what, expected, obj.qname()),
        ));
    }
    let mut errs = Errors::default();
    errs.check(obj.validate_tree());
    errs.check(obj.validate_ids());
    errs.into_result()
}

fn check_cud_type(rec: &Row, errs: &mut Errors) -> bool {
    let Some(s) = rec.structure() else {
        errs.add(
            ErrorKind::NameMissed,
            format!("CUD record «{}» has no type", rec.id()),
        );
        return false;
    };
    if !s.kind().is_cud_kind() {
        errs.add(
            ErrorKind::InvalidTypeKind,
            format!("{} can not be created or updated by CUD", s),
        );
        return false;
    }
    if s.is_abstract() {
        errs.add(
            ErrorKind::AbstractType,
            format!("{} is abstract", s),
        );
        return false;
    }
    true
}

fn validate_cud(ev: &Event) -> Result<()> {
    let app = ev.app_def();
    let cud = ev.cud();
    let mut errs = Errors::default();
    let mut created: HashMap<RecordID, QName> = HashMap::new();
    let mut singletons: HashSet<QName> = HashSet::new();

    for rec in cud.creates() {
        if !check_cud_type(rec, &mut errs) {
            continue;
        }
        let id = rec.id();
        if id.is_null() {
            errs.add(ErrorKind::FieldIsEmpty, format!("{} has no ID", rec));
        } else if ev.synced() && id.is_raw() {
            errs.add(
                ErrorKind::UnexpectedRawRecordID,
                format!("synced {} has raw ID «{}»", rec, id),
            );
        } else if !ev.synced() && !id.is_raw() {
            errs.add(
                ErrorKind::RawRecordIDRequired,
                format!("{} must have a raw ID, got «{}»", rec, id),
            );
        }
        if !id.is_null() && created.insert(id, rec.qname().clone()).is_some() {
            errs.add(
                ErrorKind::RecordIDUniqueViolation,
                format!("ID «{}» used by more than one created record", id),
            );
        }
        if rec.structure().is_some_and(|s| s.is_singleton()) && !singletons.insert(rec.qname().clone()) {
            errs.add(
                ErrorKind::RecordIDUniqueViolation,
                format!("singleton «{}» created twice", rec.qname()),
            );
        }
        errs.check(rec.validate_required());
    }

    for u in cud.updates() {
        let rec = u.changes();
        if !check_cud_type(rec, &mut errs) {
            continue;
        }
        if u.id().is_raw() {
            errs.add(
                ErrorKind::UnexpectedRawRecordID,
                format!("updated {} has raw ID «{}»", rec, u.id()),
            );
        }
        if created.contains_key(&u.id()) {
            errs.add(
                ErrorKind::RecordIDUniqueViolation,
                format!("record «{}» is created and updated by one event", u.id()),
            );
        }
    }

    for rec in cud.creates() {
        let Some(s) = rec.structure() else {
            continue;
        };
        if !s.kind().is_contained_record() {
            continue;
        }
        if rec.parent().is_null() {
            errs.add(ErrorKind::FieldIsEmpty, format!("{} has no parent ID", rec));
            continue;
        }
        if rec.container().is_empty() {
            errs.add(ErrorKind::FieldIsEmpty, format!("{} has no container", rec));
            continue;
        }
        if !rec.parent().is_raw() {
            continue;
        }
        let Some(parent) = created.get(&rec.parent()) else {
            errs.add(
                ErrorKind::RecordIDNotFound,
                format!("{} parent «{}» is not created by the event", rec, rec.parent()),
            );
            continue;
        };
        match app.structure(parent).and_then(|p| p.container(rec.container())) {
            None => errs.add(
                ErrorKind::NameNotFound,
                format!("parent «{}» has no container «{}» for {}", parent, rec.container(), rec),
            ),
            Some(c) if c.qname() != rec.qname() => errs.add(
                ErrorKind::InvalidTypeKind,
                format!(
                    "container «{}» of «{}» holds «{}», got {}",
                    c.name(),
                    parent,
                    c.qname(),
                    rec
                ),
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
            if name == SYS_FIELD_PARENT_ID || !id.is_raw() {
                continue;
            }
            match created.get(&id) {
                None => errs.add(
                    ErrorKind::RecordIDNotFound,
                    format!("{} field «{}» refers to unknown raw ID «{}»", s, name, id),
                ),
                Some(target) if !s.field(&name).is_some_and(|f| f.ref_allowed(target)) => errs.add(
                    ErrorKind::WrongRecordID,
                    format!("{} field «{}» can not refer to «{}» of type «{}»", s, name, id, target),
                ),
                Some(_) => {}
            }
        }
    }
    errs.into_result()
}

fn rejected(e: Error, what: impl fmt::Display) -> Error {
    warn!(target: "appstruct::events", error = %e, "{} rejected by validator", what);
    Error::new(ErrorKind::Validator, format!("{} rejected: {}", what, e))
}

fn run_validators(ev: &Event, cfg: &AppConfig) -> Result<()> {
    let mut errs = Errors::default();
    let ws = ev.workspace();
    let cmd = ev.name();
    let rows = ev.cud().creates().iter().chain(ev.cud().updates().map(|u| {
        if u.result().is_empty() {
            u.changes()
        } else {
            u.result()
        }
    }));
    for rec in rows {
        for v in cfg.cud_validators().iter().filter(|v| v.matches(rec.qname())) {
            if let Err(e) = v.validate(rec, ws, cmd) {
                errs.push(rejected(e, rec));
            }
        }
    }
    for v in cfg.event_validators() {
        if let Err(e) = v.validate(ev, ws) {
            errs.push(rejected(e, ev));
        }
    }
    errs.into_result()
}

/// Validate a built event against the application: arguments, CUD plan,
/// then registered validators
///
/// # Errors
///
/// Returns every problem found.
pub fn validate_event(ev: &Event, cfg: &AppConfig) -> Result<()> {
    let app = ev.app_def();
    let mut errs = Errors::default();
    match argument_names(app, ev.name()) {
        Ok((arg, unlogged)) => {
            errs.check(validate_arg(app, ev.arg_object(), &arg, "argument"));
            errs.check(validate_arg(app, ev.unlogged_arg_object(), &unlogged, "unlogged argument"));
        }
        Err(e) => errs.push(e),
    }
    errs.check(validate_cud(ev));
    if !errs.is_empty() {
        return errs.into_result();
    }
    run_validators(ev, cfg)
}
