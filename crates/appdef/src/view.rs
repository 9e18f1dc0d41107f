//! Views
//!
//! A view record has a key split into partition key fields and clustering
//! columns, plus value fields. Partition key fields must be fixed-width;
//! among clustering columns only the last may be variable-width.

use std::fmt;

use appstruct_core::QName;

use crate::field::{Field, Fields};
use crate::types::TypeBase;

/// A view
#[derive(Debug, Clone)]
pub struct View {
    pub(crate) base: TypeBase,
    pub(crate) partition_key: Fields,
    pub(crate) clust_cols: Fields,
    pub(crate) value: Fields,
}

impl View {
    pub(crate) fn new(base: TypeBase) -> Self {
        View {
            base,
            partition_key: Fields::default(),
            clust_cols: Fields::default(),
            value: Fields::default(),
        }
    }

    /// View name
    pub fn name(&self) -> &QName {
        &self.base.name
    }

    /// Comment
    pub fn comment(&self) -> &str {
        &self.base.comment
    }

    /// Partition key fields
    pub fn partition_key(&self) -> &Fields {
        &self.partition_key
    }

    /// Clustering columns
    pub fn clust_cols(&self) -> &Fields {
        &self.clust_cols
    }

    /// Value fields
    pub fn value(&self) -> &Fields {
        &self.value
    }

    /// Field by name from any part of the view
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.partition_key
            .field(name)
            .or_else(|| self.clust_cols.field(name))
            .or_else(|| self.value.field(name))
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewRecord «{}»", self.base.name)
    }
}
