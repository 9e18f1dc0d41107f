//! Frozen application definition
//!
//! `AppDef` is immutable and cheap to share behind an `Arc`. Lookups by
//! name are typed: asking for a CDoc under the name of a WDoc yields `None`.

use std::collections::BTreeMap;

use appstruct_core::{QName, QNAME_ANY};

use crate::container::Container;
use crate::data::Data;
use crate::data_kind::DataKind;
use crate::function::{Command, Query};
use crate::projector::Projector;
use crate::structure::Structure;
use crate::type_kind::TypeKind;
use crate::types::Type;
use crate::view::View;
use crate::workspace::Workspace;

/// A validated, immutable catalog of types
#[derive(Debug, Clone)]
pub struct AppDef {
    types: BTreeMap<QName, Type>,
}

impl AppDef {
    pub(crate) fn new(types: BTreeMap<QName, Type>) -> Self {
        AppDef { types }
    }

    /// Type by name
    pub fn type_by_name(&self, name: &QName) -> Option<&Type> {
        self.types.get(name)
    }

    /// Kind of the named type; `Null` if there is none, `Any` for `sys.ANY`
    pub fn type_kind(&self, name: &QName) -> TypeKind {
        if name == &QNAME_ANY {
            return TypeKind::Any;
        }
        self.types.get(name).map_or(TypeKind::Null, Type::kind)
    }

    /// All types in name order
    pub fn types(&self) -> impl Iterator<Item = &Type> {
        self.types.values()
    }

    /// Number of types, system data types included
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Data type by name
    pub fn data(&self, name: &QName) -> Option<&Data> {
        self.types.get(name).and_then(Type::as_data)
    }

    /// System data type for a data kind
    pub fn sys_data(&self, kind: DataKind) -> Option<&Data> {
        self.data(&kind.sys_data_name())
    }

    /// Data types in name order
    pub fn data_types(&self, include_sys: bool) -> impl Iterator<Item = &Data> {
        self.types
            .values()
            .filter_map(Type::as_data)
            .filter(move |d| include_sys || !d.is_system())
    }

    /// Structure of any kind by name
    pub fn structure(&self, name: &QName) -> Option<&Structure> {
        self.types.get(name).and_then(Type::as_structure)
    }

    /// Structures of every kind in name order
    pub fn structures(&self) -> impl Iterator<Item = &Structure> {
        self.types.values().filter_map(Type::as_structure)
    }

    /// Record (a document or a record) by name
    pub fn record(&self, name: &QName) -> Option<&Structure> {
        self.structure(name).filter(|s| s.kind().is_record())
    }

    /// Records in name order
    pub fn records(&self) -> impl Iterator<Item = &Structure> {
        self.structures().filter(|s| s.kind().is_record())
    }

    fn structure_of(&self, name: &QName, kind: TypeKind) -> Option<&Structure> {
        self.structure(name).filter(|s| s.kind() == kind)
    }

    /// Object by name
    pub fn object(&self, name: &QName) -> Option<&Structure> {
        self.structure_of(name, TypeKind::Object)
    }

    /// CDoc by name
    pub fn cdoc(&self, name: &QName) -> Option<&Structure> {
        self.structure_of(name, TypeKind::CDoc)
    }

    /// CRecord by name
    pub fn crecord(&self, name: &QName) -> Option<&Structure> {
        self.structure_of(name, TypeKind::CRecord)
    }

    /// ODoc by name
    pub fn odoc(&self, name: &QName) -> Option<&Structure> {
        self.structure_of(name, TypeKind::ODoc)
    }

    /// ORecord by name
    pub fn orecord(&self, name: &QName) -> Option<&Structure> {
        self.structure_of(name, TypeKind::ORecord)
    }

    /// WDoc by name
    pub fn wdoc(&self, name: &QName) -> Option<&Structure> {
        self.structure_of(name, TypeKind::WDoc)
    }

    /// WRecord by name
    pub fn wrecord(&self, name: &QName) -> Option<&Structure> {
        self.structure_of(name, TypeKind::WRecord)
    }

    /// Singleton CDocs in name order
    pub fn singletons(&self) -> impl Iterator<Item = &Structure> {
        self.structures().filter(|s| s.is_singleton())
    }

    /// Command by name
    pub fn command(&self, name: &QName) -> Option<&Command> {
        match self.types.get(name) {
            Some(Type::Command(c)) => Some(c),
            _ => None,
        }
    }

    /// Commands in name order
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.types.values().filter_map(|t| match t {
            Type::Command(c) => Some(c),
            _ => None,
        })
    }

    /// Query by name
    pub fn query(&self, name: &QName) -> Option<&Query> {
        match self.types.get(name) {
            Some(Type::Query(q)) => Some(q),
            _ => None,
        }
    }

    /// Queries in name order
    pub fn queries(&self) -> impl Iterator<Item = &Query> {
        self.types.values().filter_map(|t| match t {
            Type::Query(q) => Some(q),
            _ => None,
        })
    }

    /// Projector by name
    pub fn projector(&self, name: &QName) -> Option<&Projector> {
        match self.types.get(name) {
            Some(Type::Projector(p)) => Some(p),
            _ => None,
        }
    }

    /// Projectors in name order
    pub fn projectors(&self) -> impl Iterator<Item = &Projector> {
        self.types.values().filter_map(|t| match t {
            Type::Projector(p) => Some(p),
            _ => None,
        })
    }

    /// View by name
    pub fn view(&self, name: &QName) -> Option<&View> {
        match self.types.get(name) {
            Some(Type::View(v)) => Some(v),
            _ => None,
        }
    }

    /// Views in name order
    pub fn views(&self) -> impl Iterator<Item = &View> {
        self.types.values().filter_map(|t| match t {
            Type::View(v) => Some(v),
            _ => None,
        })
    }

    /// Workspace by name
    pub fn workspace(&self, name: &QName) -> Option<&Workspace> {
        match self.types.get(name) {
            Some(Type::Workspace(w)) => Some(w),
            _ => None,
        }
    }

    /// Workspaces in name order
    pub fn workspaces(&self) -> impl Iterator<Item = &Workspace> {
        self.types.values().filter_map(|t| match t {
            Type::Workspace(w) => Some(w),
            _ => None,
        })
    }

    /// Returns true if the workspace declares the type itself or inherits it
    pub fn workspace_has_type(&self, ws: &QName, name: &QName) -> bool {
        let mut stack = vec![ws.clone()];
        let mut seen = std::collections::BTreeSet::new();
        while let Some(w) = stack.pop() {
            if !seen.insert(w.clone()) {
                continue;
            }
            if let Some(w) = self.workspace(&w) {
                if w.has_type(name) {
                    return true;
                }
                stack.extend(w.ancestors().iter().cloned());
            }
        }
        false
    }

    /// Structure a container of `parent` holds
    pub fn container_type(&self, parent: &QName, container: &str) -> Option<&Structure> {
        let c: &Container = self.structure(parent)?.container(container)?;
        self.structure(c.qname())
    }
}
