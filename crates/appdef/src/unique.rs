//! Uniques of structures
//!
//! A unique is a named set of fields whose combined values must not repeat
//! among active records of the type. Field names are stored sorted.

use std::fmt;

use appstruct_core::QName;

/// A unique constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unique {
    name: QName,
    fields: Vec<String>,
}

impl Unique {
    pub(crate) fn new(name: QName, mut fields: Vec<String>) -> Self {
        fields.sort();
        Unique { name, fields }
    }

    /// Unique name
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Field names, sorted
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Returns true if every field of `self` is also in `other`
    pub fn is_subset_of(&self, other: &Unique) -> bool {
        self.fields
            .iter()
            .all(|f| other.fields.binary_search(f).is_ok())
    }

    /// Returns true if one field set includes the other
    pub fn overlaps(&self, other: &Unique) -> bool {
        self.is_subset_of(other) || other.is_subset_of(self)
    }
}

impl fmt::Display for Unique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unique «{}» [{}]", self.name, self.fields.join(", "))
    }
}

/// Uniques of one structure
#[derive(Debug, Clone, Default)]
pub struct Uniques {
    list: Vec<Unique>,
    unique_field: Option<String>,
}

impl Uniques {
    pub(crate) fn push(&mut self, u: Unique) {
        self.list.push(u);
    }

    pub(crate) fn set_unique_field(&mut self, name: Option<String>) {
        self.unique_field = name;
    }

    /// Unique by name
    pub fn unique(&self, name: &QName) -> Option<&Unique> {
        self.list.iter().find(|u| &u.name == name)
    }

    /// Uniques in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Unique> {
        self.list.iter()
    }

    /// Number of uniques
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns true if there are no uniques
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Legacy single unique field
    pub fn unique_field(&self) -> Option<&str> {
        self.unique_field.as_deref()
    }
}
