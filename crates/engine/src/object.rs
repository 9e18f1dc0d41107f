//! Object trees: a row with child rows in named containers
//!
//! Objects carry command arguments. A child created through
//! [`Object::child_builder`] takes its type from the container declaration
//! of the parent. Children of an untyped parent stay untyped until the
//! parent gets its type.

use std::collections::HashSet;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use appstruct_appdef::{AppDef, TypeKind};
use appstruct_core::{QName, RecordID, NULL_QNAME, OCCURS_UNBOUNDED};

use crate::error::{Error, ErrorKind, Errors, Result};
use crate::idgen::IdGenerator;
use crate::row::{IdPlan, Row};

/// Row with nested children
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    row: Row,
    children: Vec<Object>,
}

impl Deref for Object {
    type Target = Row;

    fn deref(&self) -> &Row {
        &self.row
    }
}

impl DerefMut for Object {
    fn deref_mut(&mut self) -> &mut Row {
        &mut self.row
    }
}

impl Object {
    /// Create an object of the given type; a null name leaves it untyped
    pub fn new(app: Arc<AppDef>, qname: QName) -> Self {
        let mut o = Object {
            row: Row::new(app),
            children: Vec::new(),
        };
        if !qname.is_null() {
            o.set_qname(qname);
        }
        o
    }

    pub(crate) fn from_row(row: Row) -> Self {
        Object {
            row,
            children: Vec::new(),
        }
    }

    pub(crate) fn push_child(&mut self, child: Object) {
        self.children.push(child);
    }

    /// The object row
    pub fn row(&self) -> &Row {
        &self.row
    }

    /// Bind the object to a type and resolve untyped children
    pub(crate) fn set_qname(&mut self, qname: QName) {
        self.row.set_qname(qname);
        self.resolve_children();
    }

    fn resolve_children(&mut self) {
        let parent_id = self.row.id();
        for i in 0..self.children.len() {
            if !self.children[i].qname().is_null() {
                continue;
            }
            let container = self.children[i].container().to_string();
            let target = self
                .row
                .structure()
                .and_then(|s| s.container(&container))
                .map(|c| c.qname().clone());
            if let Some(target) = target {
                let child = &mut self.children[i];
                child.set_qname(target);
                child.row.set_container(container);
                if !parent_id.is_null() {
                    child.row.set_parent(parent_id);
                }
            }
        }
    }

    /// Add a child to the container and return it for filling
    pub fn child_builder(&mut self, container: &str) -> &mut Object {
        let target = self
            .row
            .structure()
            .and_then(|s| s.container(container))
            .map(|c| c.qname().clone());
        let mut child = Object {
            row: Row::new(Arc::clone(self.row.app_def())),
            children: Vec::new(),
        };
        if let Some(target) = target {
            child.set_qname(target);
            if !self.row.id().is_null() {
                child.row.set_parent(self.row.id());
            }
        }
        child.row.set_container(container);
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Children in the container; an empty name means every child
    pub fn children<'a>(&'a self, container: &'a str) -> impl Iterator<Item = &'a Object> + 'a {
        self.children
            .iter()
            .filter(move |c| container.is_empty() || c.container() == container)
    }

    /// Names of the containers that have children, in first-use order
    pub fn containers(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.children
            .iter()
            .map(|c| c.container())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Visit the object and every descendant, parents first
    pub fn for_each(&self, f: &mut dyn FnMut(&Object) -> Result<()>) -> Result<()> {
        f(self)?;
        for c in &self.children {
            c.for_each(f)?;
        }
        Ok(())
    }

    pub(crate) fn for_each_mut(&mut self, f: &mut dyn FnMut(&mut Object) -> Result<()>) -> Result<()> {
        f(self)?;
        for c in &mut self.children {
            c.for_each_mut(f)?;
        }
        Ok(())
    }

    /// Fill fields and children from a JSON map. Numbers, strings and
    /// bools become field values, arrays of maps become container children.
    /// Problems are collected and reported by `build()`.
    pub fn fill_from_json(&mut self, data: &Map<String, JsonValue>) {
        for (name, value) in data {
            match value {
                JsonValue::Number(n) => match n.as_f64() {
                    Some(f) => self.row.put_number(name, f),
                    None => {
                        let e = Error::new(
                            ErrorKind::WrongFieldType,
                            format!("number {} for field «{}» is out of range", n, name),
                        );
                        self.row.collect(e);
                    }
                },
                JsonValue::String(s) => self.row.put_chars(name, s),
                JsonValue::Bool(b) => self.row.put_bool(name, *b),
                JsonValue::Array(items) => {
                    let known = self
                        .row
                        .structure()
                        .is_some_and(|s| s.container(name).is_some());
                    if !known {
                        let e = Error::new(
                            ErrorKind::NameNotFound,
                            format!("container «{}» not found in {}", name, self.row),
                        );
                        self.row.collect(e);
                        continue;
                    }
                    for (i, item) in items.iter().enumerate() {
                        match item {
                            JsonValue::Object(m) => self.child_builder(name).fill_from_json(m),
                            _ => {
                                let e = Error::new(
                                    ErrorKind::WrongFieldType,
                                    format!("child «{}[{}]» of {} is not an object", name, i, self.row),
                                );
                                self.row.collect(e);
                                break;
                            }
                        }
                    }
                }
                JsonValue::Null | JsonValue::Object(_) => {}
            }
        }
    }

    /// Copy the parent ID into children that have none
    fn link_children(&mut self) {
        let id = self.row.id();
        for c in &mut self.children {
            let has_parent = c.structure().is_some_and(|s| s.kind().is_contained_record());
            if has_parent && c.parent().is_null() && !id.is_null() {
                c.row.set_parent(id);
            }
            c.link_children();
        }
    }

    /// Link children to their parents and build every row of the tree
    ///
    /// # Errors
    ///
    /// Returns the joined row build errors.
    pub(crate) fn build_rows(&mut self) -> Result<()> {
        self.link_children();
        let mut errs = Errors::default();
        self.for_each(&mut |o| {
            errs.check(o.row.build());
            Ok(())
        })?;
        errs.into_result()
    }

    /// Build the tree and validate it as a standalone object: the root must
    /// be typed as an object or document, required fields must be filled,
    /// children must match container declarations and occurrences, and IDs
    /// must be unique and resolvable.
    ///
    /// # Errors
    ///
    /// Returns every problem found.
    pub fn build(&mut self) -> Result<()> {
        self.build_rows()?;
        if self.qname().is_null() {
            return Err(Error::new(ErrorKind::NameMissed, "object has no type name"));
        }
        let kind = self.kind();
        if !matches!(kind, TypeKind::Object | TypeKind::ODoc | TypeKind::CDoc | TypeKind::WDoc) {
            return Err(Error::new(
                ErrorKind::InvalidTypeKind,
                format!("{} can not be the root of an object tree", self.row),
            ));
        }
        let mut errs = Errors::default();
        errs.check(self.validate_tree());
        errs.check(self.validate_ids());
        errs.into_result()
    }

    /// Check required fields, containers, occurrences and parent links of
    /// the whole tree
    pub(crate) fn validate_tree(&self) -> Result<()> {
        let mut errs = Errors::default();
        self.validate_node(&mut errs);
        errs.into_result()
    }

    fn validate_node(&self, errs: &mut Errors) {
        errs.check(self.row.validate_required());
        let Some(s) = self.structure() else {
            return;
        };

        for cont in s.containers().iter() {
            let n = self.children(cont.name()).count();
            if n < usize::from(cont.min_occurs()) {
                errs.add(
                    ErrorKind::MinOccursViolation,
                    format!(
                        "{} container «{}» has {} children, minimum is {}",
                        s, cont.name(), n, cont.min_occurs()
                    ),
                );
            }
            if cont.max_occurs() != OCCURS_UNBOUNDED && n > usize::from(cont.max_occurs()) {
                errs.add(
                    ErrorKind::MaxOccursViolation,
                    format!(
                        "{} container «{}» has {} children, maximum is {}",
                        s, cont.name(), n, cont.max_occurs()
                    ),
                );
            }
        }

        for child in &self.children {
            match s.container(child.container()) {
                None => errs.add(
                    ErrorKind::NameNotFound,
                    format!("{} has no container «{}»", s, child.container()),
                ),
                Some(cont) if cont.qname() != child.qname() => errs.add(
                    ErrorKind::InvalidTypeKind,
                    format!(
                        "{} container «{}» holds «{}», got «{}»",
                        s, cont.name(), cont.qname(), child.qname()
                    ),
                ),
                Some(_) => {
                    let linked = !child.kind().is_contained_record()
                        || self.id().is_null()
                        || child.parent() == self.id();
                    if !linked {
                        errs.add(
                            ErrorKind::WrongRecordID,
                            format!(
                                "{} in container «{}» has parent ID «{}», expected «{}»",
                                child.row, child.container(), child.parent(), self.id()
                            ),
                        );
                    }
                }
            }
            child.validate_node(errs);
        }
    }

    /// Check that record IDs are unique within the tree and that raw
    /// references point into it
    pub(crate) fn validate_ids(&self) -> Result<()> {
        let mut errs = Errors::default();
        let mut ids: HashSet<RecordID> = HashSet::new();
        let mut types = std::collections::HashMap::new();
        self.for_each(&mut |o| {
            let id = o.id();
            if o.kind().is_record() && id.is_null() {
                errs.add(ErrorKind::FieldIsEmpty, format!("{} has no ID", o.row));
            } else if !id.is_null() && !ids.insert(id) {
                errs.add(
                    ErrorKind::RecordIDUniqueViolation,
                    format!("{} repeats ID «{}»", o.row, id),
                );
            }
            if !id.is_null() {
                types.insert(id, o.qname().clone());
            }
            Ok(())
        })?;
        self.for_each(&mut |o| {
            let Some(s) = o.structure() else {
                return Ok(());
            };
            for (name, id) in o.record_ids(false) {
                if !id.is_raw() || name == appstruct_appdef::SYS_FIELD_PARENT_ID {
                    continue;
                }
                match types.get(&id) {
                    None => errs.add(
                        ErrorKind::RecordIDNotFound,
                        format!("{} field «{}» refers to unknown raw ID «{}»", s, name, id),
                    ),
                    Some(target) => {
                        let allowed = s.field(&name).is_some_and(|f| f.ref_allowed(target));
                        if !allowed {
                            errs.add(
                                ErrorKind::WrongRecordID,
                                format!(
                                    "{} field «{}» refers to «{}» of type «{}»",
                                    s, name, id, target
                                ),
                            );
                        }
                    }
                }
            }
            Ok(())
        })?;
        errs.into_result()
    }

    /// Replace raw IDs with storage IDs. The first pass assigns an ID to
    /// every node, the second rewrites references, so a reference may point
    /// to any node of the tree regardless of order.
    ///
    /// # Errors
    ///
    /// Fails if the generator fails or a reference names a raw ID that no
    /// node of the tree carries.
    pub fn regenerate_ids(&mut self, gen: &mut dyn IdGenerator) -> Result<IdPlan> {
        let mut plan = IdPlan::new();
        self.for_each_mut(&mut |o| {
            let id = o.id();
            if id.is_raw() {
                let new_id = gen.next_id(id, o.kind())?;
                o.row.set_id(new_id);
                plan.insert(id, new_id);
            }
            Ok(())
        })?;
        self.for_each_mut(&mut |o| {
            o.row.rewrite_ids(&plan, true)?;
            Ok(())
        })?;
        Ok(plan)
    }
}
