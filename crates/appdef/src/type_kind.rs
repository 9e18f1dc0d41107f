//! Type kinds and the rules that depend only on kind

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data_kind::DataKind;
use crate::field::{
    SYS_FIELD_CONTAINER, SYS_FIELD_ID, SYS_FIELD_IS_ACTIVE, SYS_FIELD_PARENT_ID, SYS_FIELD_QNAME,
};

/// Kind of a catalog type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// No type
    Null,
    /// Wildcard parameter or result
    Any,
    /// Data type
    Data,
    /// Configuration document
    CDoc,
    /// Configuration record
    CRecord,
    /// Operation document
    ODoc,
    /// Operation record
    ORecord,
    /// Workflow document
    WDoc,
    /// Workflow record
    WRecord,
    /// Plain nested data carrier
    Object,
    /// Command function
    Command,
    /// Query function
    Query,
    /// Projector
    Projector,
    /// View record
    ViewRecord,
    /// Workspace
    Workspace,
    /// Role
    Role,
    /// Tag
    Tag,
}

const OBJECT_SYS_FIELDS: &[&str] = &[SYS_FIELD_QNAME, SYS_FIELD_CONTAINER];
const DOC_SYS_FIELDS: &[&str] = &[SYS_FIELD_QNAME, SYS_FIELD_ID, SYS_FIELD_IS_ACTIVE];
const ODOC_SYS_FIELDS: &[&str] = &[SYS_FIELD_QNAME, SYS_FIELD_ID];
const RECORD_SYS_FIELDS: &[&str] = &[
    SYS_FIELD_QNAME,
    SYS_FIELD_ID,
    SYS_FIELD_PARENT_ID,
    SYS_FIELD_CONTAINER,
    SYS_FIELD_IS_ACTIVE,
];
const ORECORD_SYS_FIELDS: &[&str] = &[
    SYS_FIELD_QNAME,
    SYS_FIELD_ID,
    SYS_FIELD_PARENT_ID,
    SYS_FIELD_CONTAINER,
];

impl TypeKind {
    /// Returns true for kinds with fields and containers
    pub fn is_structure(self) -> bool {
        matches!(
            self,
            TypeKind::Object
                | TypeKind::CDoc
                | TypeKind::CRecord
                | TypeKind::ODoc
                | TypeKind::ORecord
                | TypeKind::WDoc
                | TypeKind::WRecord
        )
    }

    /// Returns true for kinds whose instances carry `sys.ID`
    pub fn is_record(self) -> bool {
        self.is_structure() && self != TypeKind::Object
    }

    /// Returns true for document kinds
    pub fn is_doc(self) -> bool {
        matches!(self, TypeKind::CDoc | TypeKind::ODoc | TypeKind::WDoc)
    }

    /// Returns true for record kinds that live inside a document
    pub fn is_contained_record(self) -> bool {
        matches!(
            self,
            TypeKind::CRecord | TypeKind::ORecord | TypeKind::WRecord
        )
    }

    /// Returns true for kinds that a CUD may create or update
    pub fn is_cud_kind(self) -> bool {
        matches!(
            self,
            TypeKind::CDoc | TypeKind::CRecord | TypeKind::WDoc | TypeKind::WRecord
        )
    }

    /// Returns true for kinds whose instances can be deactivated
    pub fn has_is_active(self) -> bool {
        self.system_fields().contains(&SYS_FIELD_IS_ACTIVE)
    }

    /// System fields implicitly present in structures of this kind
    pub fn system_fields(self) -> &'static [&'static str] {
        match self {
            TypeKind::Object => OBJECT_SYS_FIELDS,
            TypeKind::CDoc | TypeKind::WDoc => DOC_SYS_FIELDS,
            TypeKind::ODoc => ODOC_SYS_FIELDS,
            TypeKind::CRecord | TypeKind::WRecord => RECORD_SYS_FIELDS,
            TypeKind::ORecord => ORECORD_SYS_FIELDS,
            _ => &[],
        }
    }

    /// Returns true if a structure of this kind may hold fields of `kind`
    pub fn field_kind_allowed(self, kind: DataKind) -> bool {
        match self {
            TypeKind::ViewRecord => kind.is_scalar(),
            k if k.is_structure() => kind.is_scalar(),
            _ => false,
        }
    }

    /// Returns true if a structure of this kind may contain `target`
    pub fn container_allowed(self, target: TypeKind) -> bool {
        matches!(
            (self, target),
            (TypeKind::CDoc | TypeKind::CRecord, TypeKind::CRecord)
                | (TypeKind::ODoc | TypeKind::ORecord, TypeKind::ORecord)
                | (TypeKind::WDoc | TypeKind::WRecord, TypeKind::WRecord)
                | (TypeKind::Object, TypeKind::Object)
        )
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
