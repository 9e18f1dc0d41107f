//! Workspaces

use std::collections::BTreeSet;
use std::fmt;

use appstruct_core::QName;

use crate::types::TypeBase;

/// A workspace: a descriptor document plus the set of types it holds
#[derive(Debug, Clone)]
pub struct Workspace {
    pub(crate) base: TypeBase,
    pub(crate) descriptor: QName,
    pub(crate) types: BTreeSet<QName>,
    pub(crate) ancestors: Vec<QName>,
}

impl Workspace {
    pub(crate) fn new(base: TypeBase) -> Self {
        Workspace {
            base,
            descriptor: QName::default(),
            types: BTreeSet::new(),
            ancestors: Vec::new(),
        }
    }

    /// Workspace name
    pub fn name(&self) -> &QName {
        &self.base.name
    }

    /// Comment
    pub fn comment(&self) -> &str {
        &self.base.comment
    }

    /// Returns true if the workspace can not be created directly
    pub fn is_abstract(&self) -> bool {
        self.base.is_abstract
    }

    /// Descriptor CDoc; null if none
    pub fn descriptor(&self) -> &QName {
        &self.descriptor
    }

    /// Types declared in the workspace, sorted
    pub fn types(&self) -> impl Iterator<Item = &QName> {
        self.types.iter()
    }

    /// Returns true if the type is declared in the workspace itself
    pub fn has_type(&self, name: &QName) -> bool {
        self.types.contains(name)
    }

    /// Workspaces this one inherits from
    pub fn ancestors(&self) -> &[QName] {
        &self.ancestors
    }
}

impl fmt::Display for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Workspace «{}»", self.base.name)
    }
}
