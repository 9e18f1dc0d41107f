//! The closed set of catalog types
//!
//! `Type` is a tagged union; every variant embeds a `TypeBase` with the
//! name, kind, comment and abstract flag. Structure kinds share the single
//! `Structure` variant and are told apart by kind.

use std::fmt;

use appstruct_core::QName;

use crate::data::Data;
use crate::function::{Command, Query};
use crate::projector::Projector;
use crate::structure::Structure;
use crate::type_kind::TypeKind;
use crate::view::View;
use crate::workspace::Workspace;

/// Attributes common to every type
#[derive(Debug, Clone)]
pub struct TypeBase {
    pub(crate) name: QName,
    pub(crate) kind: TypeKind,
    pub(crate) comment: String,
    pub(crate) is_abstract: bool,
}

impl TypeBase {
    pub(crate) fn new(name: QName, kind: TypeKind) -> Self {
        TypeBase {
            name,
            kind,
            comment: String::new(),
            is_abstract: false,
        }
    }

    /// Type name
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Type kind
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Comment
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Abstract flag
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }
}

/// A catalog type
#[derive(Debug, Clone)]
pub enum Type {
    /// Data type
    Data(Data),
    /// Object, document or record
    Structure(Structure),
    /// Command
    Command(Command),
    /// Query
    Query(Query),
    /// Projector
    Projector(Projector),
    /// View
    View(View),
    /// Workspace
    Workspace(Workspace),
    /// Role
    Role(TypeBase),
    /// Tag
    Tag(TypeBase),
}

impl Type {
    /// Common attributes
    pub fn base(&self) -> &TypeBase {
        match self {
            Type::Data(t) => &t.base,
            Type::Structure(t) => &t.base,
            Type::Command(t) => &t.base,
            Type::Query(t) => &t.base,
            Type::Projector(t) => &t.base,
            Type::View(t) => &t.base,
            Type::Workspace(t) => &t.base,
            Type::Role(b) | Type::Tag(b) => b,
        }
    }

    pub(crate) fn base_mut(&mut self) -> &mut TypeBase {
        match self {
            Type::Data(t) => &mut t.base,
            Type::Structure(t) => &mut t.base,
            Type::Command(t) => &mut t.base,
            Type::Query(t) => &mut t.base,
            Type::Projector(t) => &mut t.base,
            Type::View(t) => &mut t.base,
            Type::Workspace(t) => &mut t.base,
            Type::Role(b) | Type::Tag(b) => b,
        }
    }

    /// Type name
    pub fn name(&self) -> &QName {
        &self.base().name
    }

    /// Type kind
    pub fn kind(&self) -> TypeKind {
        self.base().kind
    }

    /// Comment
    pub fn comment(&self) -> &str {
        &self.base().comment
    }

    /// Abstract flag
    pub fn is_abstract(&self) -> bool {
        self.base().is_abstract
    }

    /// Data type, if this is one
    pub fn as_data(&self) -> Option<&Data> {
        match self {
            Type::Data(d) => Some(d),
            _ => None,
        }
    }

    /// Structure, if this is one
    pub fn as_structure(&self) -> Option<&Structure> {
        match self {
            Type::Structure(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Data(d) => d.fmt(f),
            _ => write!(f, "{} «{}»", self.kind(), self.name()),
        }
    }
}
