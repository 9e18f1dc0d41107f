//! Data types
//!
//! A data type narrows a data kind with constraints. It always derives from
//! an ancestor of the same kind, ending at the system data type of the kind
//! (`sys.string`, `sys.int32`, ...). Constraints are inherited along the
//! chain; a constraint of the same kind declared lower replaces the inherited
//! one.

use std::collections::BTreeMap;
use std::fmt;

use appstruct_core::QName;

use crate::constraint::{Constraint, ConstraintKind};
use crate::data_kind::DataKind;
use crate::types::TypeBase;

/// A data type
#[derive(Debug, Clone)]
pub struct Data {
    pub(crate) base: TypeBase,
    data_kind: DataKind,
    ancestor: QName,
    own: BTreeMap<ConstraintKind, Constraint>,
    resolved: BTreeMap<ConstraintKind, Constraint>,
}

impl Data {
    pub(crate) fn new(base: TypeBase, data_kind: DataKind, ancestor: QName) -> Self {
        Data {
            base,
            data_kind,
            ancestor,
            own: BTreeMap::new(),
            resolved: BTreeMap::new(),
        }
    }

    /// Type name
    pub fn name(&self) -> &QName {
        &self.base.name
    }

    /// Comment
    pub fn comment(&self) -> &str {
        &self.base.comment
    }

    /// Data kind
    pub fn data_kind(&self) -> DataKind {
        self.data_kind
    }

    /// Ancestor data type; null for system data types
    pub fn ancestor(&self) -> &QName {
        &self.ancestor
    }

    /// Returns true for `sys.*` data types
    pub fn is_system(&self) -> bool {
        self.ancestor.is_null()
    }

    /// Constraints declared on this type, or with `with_inherited` the
    /// effective set including ancestors
    pub fn constraints(&self, with_inherited: bool) -> &BTreeMap<ConstraintKind, Constraint> {
        if with_inherited {
            &self.resolved
        } else {
            &self.own
        }
    }

    pub(crate) fn add_constraint(&mut self, c: Constraint) {
        self.own.insert(c.kind(), c);
    }

    pub(crate) fn set_resolved(&mut self, resolved: BTreeMap<ConstraintKind, Constraint>) {
        self.resolved = resolved;
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-data «{}»", self.data_kind, self.base.name)
    }
}
