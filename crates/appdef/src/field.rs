//! Fields of structures and views

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use appstruct_core::QName;

use crate::constraint::{Constraint, ConstraintKind};
use crate::data_kind::DataKind;

/// Type name of the instance
pub const SYS_FIELD_QNAME: &str = "sys.QName";
/// Record ID
pub const SYS_FIELD_ID: &str = "sys.ID";
/// ID of the parent record
pub const SYS_FIELD_PARENT_ID: &str = "sys.ParentID";
/// Container name within the parent
pub const SYS_FIELD_CONTAINER: &str = "sys.Container";
/// Activity flag
pub const SYS_FIELD_IS_ACTIVE: &str = "sys.IsActive";

/// Returns true for system field names
pub fn is_sys_field(name: &str) -> bool {
    matches!(
        name,
        SYS_FIELD_QNAME | SYS_FIELD_ID | SYS_FIELD_PARENT_ID | SYS_FIELD_CONTAINER
            | SYS_FIELD_IS_ACTIVE
    )
}

/// Data kind of a system field
pub fn sys_field_kind(name: &str) -> Option<DataKind> {
    match name {
        SYS_FIELD_QNAME => Some(DataKind::QName),
        SYS_FIELD_ID | SYS_FIELD_PARENT_ID => Some(DataKind::RecordID),
        SYS_FIELD_CONTAINER => Some(DataKind::String),
        SYS_FIELD_IS_ACTIVE => Some(DataKind::Bool),
        _ => None,
    }
}

/// How a field value is verified by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VerificationKind {
    /// By e-mail
    EMail,
    /// By phone
    Phone,
}

impl VerificationKind {
    /// Every verification kind
    pub const ANY: [VerificationKind; 2] = [VerificationKind::EMail, VerificationKind::Phone];
}

/// A field
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    data_kind: DataKind,
    data: QName,
    required: bool,
    verifiable: BTreeSet<VerificationKind>,
    refs: Vec<QName>,
    comment: String,
    sys: bool,
    local: BTreeMap<ConstraintKind, Constraint>,
    constraints: BTreeMap<ConstraintKind, Constraint>,
}

impl Field {
    pub(crate) fn new(name: impl Into<String>, data_kind: DataKind, data: QName, required: bool) -> Self {
        Field {
            name: name.into(),
            data_kind,
            data,
            required,
            verifiable: BTreeSet::new(),
            refs: Vec::new(),
            comment: String::new(),
            sys: false,
            local: BTreeMap::new(),
            constraints: BTreeMap::new(),
        }
    }

    pub(crate) fn new_sys(name: &str) -> Self {
        let kind = sys_field_kind(name).unwrap_or(DataKind::Null);
        let mut f = Field::new(name, kind, kind.sys_data_name(), name == SYS_FIELD_QNAME);
        f.sys = true;
        f
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Data kind of values
    pub fn data_kind(&self) -> DataKind {
        self.data_kind
    }

    /// Data type the field is declared with
    pub fn data(&self) -> &QName {
        &self.data
    }

    /// Returns true if a value is required
    pub fn required(&self) -> bool {
        self.required
    }

    /// Returns true for fixed-width data kinds
    pub fn is_fixed_width(&self) -> bool {
        self.data_kind.is_fixed()
    }

    /// Returns true for implicit system fields
    pub fn is_sys(&self) -> bool {
        self.sys
    }

    /// Returns true if the value must be verified
    pub fn verifiable(&self) -> bool {
        !self.verifiable.is_empty()
    }

    /// Returns true if the value may be verified this way
    pub fn verification_kind(&self, kind: VerificationKind) -> bool {
        self.verifiable.contains(&kind)
    }

    /// Allowed target types of a reference field; empty means any
    pub fn refs(&self) -> &[QName] {
        &self.refs
    }

    /// Returns true for reference fields declared by `add_ref_field`
    pub fn is_ref(&self) -> bool {
        self.data_kind == DataKind::RecordID && !self.sys
    }

    /// Returns true if a record of `target` may be referenced
    pub fn ref_allowed(&self, target: &QName) -> bool {
        self.refs.is_empty() || self.refs.contains(target)
    }

    /// Comment
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Effective constraints: data type chain overridden by field constraints
    pub fn constraints(&self) -> &BTreeMap<ConstraintKind, Constraint> {
        &self.constraints
    }

    /// Effective constraint of the kind
    pub fn constraint(&self, kind: ConstraintKind) -> Option<&Constraint> {
        self.constraints.get(&kind)
    }

    pub(crate) fn set_comment(&mut self, comment: String) {
        self.comment = comment;
    }

    pub(crate) fn set_verify(&mut self, kinds: &[VerificationKind]) {
        self.verifiable = kinds.iter().copied().collect();
    }

    pub(crate) fn set_refs(&mut self, refs: Vec<QName>) {
        self.refs = refs;
    }

    pub(crate) fn add_local(&mut self, c: Constraint) {
        self.local.insert(c.kind(), c);
    }

    pub(crate) fn resolve(&mut self, inherited: &BTreeMap<ConstraintKind, Constraint>) {
        let mut all = inherited.clone();
        for (k, c) in &self.local {
            all.insert(*k, c.clone());
        }
        self.constraints = all;
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-field «{}»", self.data_kind, self.name)
    }
}

/// Ordered list of fields with name lookup
#[derive(Debug, Clone, Default)]
pub struct Fields {
    list: Vec<Field>,
    index: HashMap<String, usize>,
}

impl Fields {
    pub(crate) fn with_sys(names: &[&str]) -> Self {
        let mut fields = Fields::default();
        for n in names {
            fields.push(Field::new_sys(n));
        }
        fields
    }

    pub(crate) fn push(&mut self, f: Field) {
        self.index.insert(f.name.clone(), self.list.len());
        self.list.push(f);
    }

    pub(crate) fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        let i = *self.index.get(name)?;
        self.list.get_mut(i)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Field> {
        self.list.iter_mut()
    }

    /// Field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.index.get(name).map(|&i| &self.list[i])
    }

    /// Position of the field in declaration order
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Field at a position in declaration order
    pub fn get(&self, index: usize) -> Option<&Field> {
        self.list.get(index)
    }

    /// All fields in declaration order, system fields first
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.list.iter()
    }

    /// Number of fields, system fields included
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns true if there are no fields
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Fields declared by the user
    pub fn user_fields(&self) -> impl Iterator<Item = &Field> {
        self.list.iter().filter(|f| !f.sys)
    }

    /// Number of user fields
    pub fn user_count(&self) -> usize {
        self.user_fields().count()
    }

    /// Reference fields
    pub fn ref_fields(&self) -> impl Iterator<Item = &Field> {
        self.list.iter().filter(|f| f.is_ref())
    }
}
