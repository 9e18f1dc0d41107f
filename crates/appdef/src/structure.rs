//! Structures: objects, documents and records
//!
//! Every structure kind shares one shape: fields, containers and uniques.
//! The kind decides which system fields are present and which containers are
//! allowed.

use std::fmt;

use appstruct_core::QName;

use crate::container::{Container, Containers};
use crate::field::{Field, Fields};
use crate::type_kind::TypeKind;
use crate::types::TypeBase;
use crate::unique::{Unique, Uniques};

/// Object, document or record type
#[derive(Debug, Clone)]
pub struct Structure {
    pub(crate) base: TypeBase,
    pub(crate) fields: Fields,
    pub(crate) containers: Containers,
    pub(crate) uniques: Uniques,
    pub(crate) singleton: bool,
    pub(crate) ancestor: QName,
}

impl Structure {
    pub(crate) fn new(base: TypeBase) -> Self {
        let fields = Fields::with_sys(base.kind.system_fields());
        Structure {
            base,
            fields,
            containers: Containers::default(),
            uniques: Uniques::default(),
            singleton: false,
            ancestor: QName::default(),
        }
    }

    /// Type name
    pub fn name(&self) -> &QName {
        &self.base.name
    }

    /// Type kind
    pub fn kind(&self) -> TypeKind {
        self.base.kind
    }

    /// Comment
    pub fn comment(&self) -> &str {
        &self.base.comment
    }

    /// Returns true if instances may not be created directly
    pub fn is_abstract(&self) -> bool {
        self.base.is_abstract
    }

    /// Returns true for singleton CDocs
    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    /// Structure this one inherits from; null if none
    pub fn ancestor(&self) -> &QName {
        &self.ancestor
    }

    /// All fields
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.field(name)
    }

    /// Number of fields, system fields included
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Number of user fields
    pub fn user_field_count(&self) -> usize {
        self.fields.user_count()
    }

    /// All containers
    pub fn containers(&self) -> &Containers {
        &self.containers
    }

    /// Container by name
    pub fn container(&self, name: &str) -> Option<&Container> {
        self.containers.container(name)
    }

    /// Number of containers
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// All uniques
    pub fn uniques(&self) -> &Uniques {
        &self.uniques
    }

    /// Unique by name
    pub fn unique(&self, name: &QName) -> Option<&Unique> {
        self.uniques.unique(name)
    }

    /// Legacy unique field
    pub fn unique_field(&self) -> Option<&Field> {
        self.uniques.unique_field().and_then(|n| self.fields.field(n))
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} «{}»", self.base.kind, self.base.name)
    }
}
