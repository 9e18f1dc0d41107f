//! Catalog builder
//!
//! `AppDefBuilder` collects type declarations and freezes them with
//! [`AppDefBuilder::build`]. Declaring something malformed (bad or duplicate
//! names, exceeded limits, incompatible constraints) panics on the spot:
//! schemas are authored by code, so such mistakes are bugs. Problems that
//! need the whole graph (unknown targets, kind mismatches, cycles) are
//! collected by `build()` instead.
//!
//! Each `add_*` returns a builder handle for the new type. Handle methods
//! take and return `&mut Self`, so declarations chain:
//!
//! ```
//! use appstruct_appdef::{AppDefBuilder, DataKind, TypeKind};
//! use appstruct_core::{QName, OCCURS_UNBOUNDED};
//!
//! let doc = QName::new("test", "doc");
//! let rec = QName::new("test", "rec");
//!
//! let mut app = AppDefBuilder::new();
//! app.add_cdoc(doc.clone())
//!     .add_field("f1", DataKind::Int64, true)
//!     .add_container("rec", rec.clone(), 0, OCCURS_UNBOUNDED);
//! app.add_crecord(rec.clone()).add_field("f1", DataKind::Int64, false);
//!
//! let app = app.build().unwrap();
//! let c = app.cdoc(&doc).unwrap().container("rec").unwrap();
//! assert_eq!(app.type_kind(c.qname()), TypeKind::CRecord);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::debug;

use appstruct_core::limits::{
    DEFAULT_FIELD_MAX_LENGTH, MAX_TYPE_CONTAINER_COUNT, MAX_TYPE_FIELD_COUNT,
    MAX_TYPE_UNIQUE_COUNT, MAX_TYPE_UNIQUE_FIELDS_COUNT,
};
use appstruct_core::{valid_ident, Occurs, QName};

use crate::appdef::AppDef;
use crate::constraint::Constraint;
use crate::container::Container;
use crate::data::Data;
use crate::data_kind::DataKind;
use crate::error::{panic_with, AppDefError, ErrorKind, Result};
use crate::field::{Field, Fields, VerificationKind};
use crate::function::{Command, Query};
use crate::projector::{Projector, ProjectorEvent, ProjectorEventKind};
use crate::structure::Structure;
use crate::type_kind::TypeKind;
use crate::types::{Type, TypeBase};
use crate::unique::Unique;
use crate::validate;
use crate::view::View;
use crate::workspace::Workspace;

/// Mutable catalog under construction
///
/// Not safe for concurrent mutation; build it on one thread, then share the
/// frozen [`AppDef`].
#[derive(Debug, Clone)]
pub struct AppDefBuilder {
    pub(crate) types: BTreeMap<QName, Type>,
}

impl Default for AppDefBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn check_ident(name: &str, context: impl fmt::Display) {
    if let Err(e) = valid_ident(name) {
        panic!("{}", AppDefError::from_name(e, context));
    }
}

fn check_qname(name: &QName, context: impl fmt::Display) {
    if let Err(e) = name.validate() {
        panic!("{}", AppDefError::from_name(e, context));
    }
}

impl AppDefBuilder {
    /// New builder with the system data types
    pub fn new() -> Self {
        let mut types = BTreeMap::new();
        for kind in DataKind::SCALARS {
            let name = kind.sys_data_name();
            let mut data = Data::new(
                TypeBase::new(name.clone(), TypeKind::Data),
                kind,
                QName::default(),
            );
            if matches!(kind, DataKind::String | DataKind::Bytes) {
                data.add_constraint(Constraint::max_len(DEFAULT_FIELD_MAX_LENGTH));
            }
            types.insert(name, Type::Data(data));
        }
        AppDefBuilder { types }
    }

    fn add_type(&mut self, t: Type) {
        let name = t.name().clone();
        check_qname(&name, format_args!("type name «{}»", name));
        if let Some(existing) = self.types.get(&name) {
            panic_with(
                ErrorKind::NameUniqueViolation,
                format!("type name «{}» already used by {}", name, existing),
            );
        }
        self.types.insert(name, t);
    }

    /// Type declared so far
    pub fn type_by_name(&self, name: &QName) -> Option<&Type> {
        self.types.get(name)
    }

    /// Declare a data type. A null `ancestor` means the system data type of
    /// `kind`.
    ///
    /// # Panics
    ///
    /// Panics if the name is invalid or taken, if the ancestor does not exist
    /// or is not a data type of the same kind.
    pub fn add_data(&mut self, name: QName, kind: DataKind, ancestor: QName) -> DataBuilder<'_> {
        let ancestor = if ancestor.is_null() {
            kind.sys_data_name()
        } else {
            ancestor
        };
        match self.types.get(&ancestor) {
            None => panic_with(
                ErrorKind::NameNotFound,
                format!("ancestor data type «{}» of «{}» not found", ancestor, name),
            ),
            Some(Type::Data(a)) if a.data_kind() != kind => panic_with(
                ErrorKind::InvalidTypeKind,
                format!("ancestor {} of «{}» is not {}", a, name, kind),
            ),
            Some(Type::Data(_)) => {}
            Some(other) => panic_with(
                ErrorKind::InvalidTypeKind,
                format!("ancestor {} of «{}» is not a data type", other, name),
            ),
        }
        let data = Data::new(TypeBase::new(name.clone(), TypeKind::Data), kind, ancestor);
        self.add_type(Type::Data(data));
        DataBuilder { app: self, name }
    }

    /// Reopen a data type
    pub fn alter_data(&mut self, name: &QName) -> DataBuilder<'_> {
        data_mut(&mut self.types, name);
        DataBuilder {
            app: self,
            name: name.clone(),
        }
    }

    fn add_structure(&mut self, name: QName, kind: TypeKind) -> StructureBuilder<'_> {
        self.add_type(Type::Structure(Structure::new(TypeBase::new(
            name.clone(),
            kind,
        ))));
        StructureBuilder { app: self, name }
    }

    /// Declare an object
    pub fn add_object(&mut self, name: QName) -> StructureBuilder<'_> {
        self.add_structure(name, TypeKind::Object)
    }

    /// Declare a configuration document
    pub fn add_cdoc(&mut self, name: QName) -> StructureBuilder<'_> {
        self.add_structure(name, TypeKind::CDoc)
    }

    /// Declare a singleton configuration document
    pub fn add_singleton(&mut self, name: QName) -> StructureBuilder<'_> {
        let mut b = self.add_structure(name, TypeKind::CDoc);
        b.set_singleton();
        b
    }

    /// Declare a configuration record
    pub fn add_crecord(&mut self, name: QName) -> StructureBuilder<'_> {
        self.add_structure(name, TypeKind::CRecord)
    }

    /// Declare an operation document
    pub fn add_odoc(&mut self, name: QName) -> StructureBuilder<'_> {
        self.add_structure(name, TypeKind::ODoc)
    }

    /// Declare an operation record
    pub fn add_orecord(&mut self, name: QName) -> StructureBuilder<'_> {
        self.add_structure(name, TypeKind::ORecord)
    }

    /// Declare a workflow document
    pub fn add_wdoc(&mut self, name: QName) -> StructureBuilder<'_> {
        self.add_structure(name, TypeKind::WDoc)
    }

    /// Declare a workflow record
    pub fn add_wrecord(&mut self, name: QName) -> StructureBuilder<'_> {
        self.add_structure(name, TypeKind::WRecord)
    }

    /// Reopen a structure
    ///
    /// # Panics
    ///
    /// Panics if there is no structure with the name.
    pub fn alter_structure(&mut self, name: &QName) -> StructureBuilder<'_> {
        structure_mut(&mut self.types, name);
        StructureBuilder {
            app: self,
            name: name.clone(),
        }
    }

    /// Declare a command
    pub fn add_command(&mut self, name: QName) -> CommandBuilder<'_> {
        self.add_type(Type::Command(Command::new(TypeBase::new(
            name.clone(),
            TypeKind::Command,
        ))));
        CommandBuilder { app: self, name }
    }

    /// Declare a query
    pub fn add_query(&mut self, name: QName) -> QueryBuilder<'_> {
        self.add_type(Type::Query(Query::new(TypeBase::new(
            name.clone(),
            TypeKind::Query,
        ))));
        QueryBuilder { app: self, name }
    }

    /// Declare a projector
    pub fn add_projector(&mut self, name: QName) -> ProjectorBuilder<'_> {
        self.add_type(Type::Projector(Projector::new(TypeBase::new(
            name.clone(),
            TypeKind::Projector,
        ))));
        ProjectorBuilder { app: self, name }
    }

    /// Declare a view
    pub fn add_view(&mut self, name: QName) -> ViewBuilder<'_> {
        self.add_type(Type::View(View::new(TypeBase::new(
            name.clone(),
            TypeKind::ViewRecord,
        ))));
        ViewBuilder { app: self, name }
    }

    /// Declare a workspace
    pub fn add_workspace(&mut self, name: QName) -> WorkspaceBuilder<'_> {
        self.add_type(Type::Workspace(Workspace::new(TypeBase::new(
            name.clone(),
            TypeKind::Workspace,
        ))));
        WorkspaceBuilder { app: self, name }
    }

    /// Declare a role
    pub fn add_role(&mut self, name: QName) -> TypeBuilder<'_> {
        self.add_type(Type::Role(TypeBase::new(name.clone(), TypeKind::Role)));
        TypeBuilder { app: self, name }
    }

    /// Declare a tag
    pub fn add_tag(&mut self, name: QName) -> TypeBuilder<'_> {
        self.add_type(Type::Tag(TypeBase::new(name.clone(), TypeKind::Tag)));
        TypeBuilder { app: self, name }
    }

    /// Validate the whole graph and freeze it.
    ///
    /// The builder is left untouched and may be changed and built again.
    ///
    /// # Errors
    ///
    /// Returns every problem found, not only the first.
    pub fn build(&self) -> Result<AppDef> {
        let mut types = self.types.clone();
        let errs = validate::validate(&mut types);
        if !errs.is_empty() {
            debug!(target: "appstruct::appdef", errors = errs.len(), "Application definition rejected");
            return Err(errs);
        }
        debug!(target: "appstruct::appdef", types = types.len(), "Application definition built");
        Ok(AppDef::new(types))
    }
}

fn type_mut<'t>(types: &'t mut BTreeMap<QName, Type>, name: &QName) -> &'t mut Type {
    match types.get_mut(name) {
        Some(t) => t,
        None => panic_with(ErrorKind::NameNotFound, format!("type «{}» not found", name)),
    }
}

fn structure_mut<'t>(types: &'t mut BTreeMap<QName, Type>, name: &QName) -> &'t mut Structure {
    match type_mut(types, name) {
        Type::Structure(s) => s,
        other => panic_with(
            ErrorKind::InvalidTypeKind,
            format!("{} is not a structure", other),
        ),
    }
}

fn data_mut<'t>(types: &'t mut BTreeMap<QName, Type>, name: &QName) -> &'t mut Data {
    match type_mut(types, name) {
        Type::Data(d) => d,
        other => panic_with(
            ErrorKind::InvalidTypeKind,
            format!("{} is not a data type", other),
        ),
    }
}

/// Handle to a role or tag under construction
pub struct TypeBuilder<'a> {
    app: &'a mut AppDefBuilder,
    name: QName,
}

impl TypeBuilder<'_> {
    /// Set the comment
    pub fn set_comment(&mut self, comment: impl Into<String>) -> &mut Self {
        type_mut(&mut self.app.types, &self.name).base_mut().comment = comment.into();
        self
    }
}

/// Handle to a data type under construction
pub struct DataBuilder<'a> {
    app: &'a mut AppDefBuilder,
    name: QName,
}

impl DataBuilder<'_> {
    /// Name of the data type
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Set the comment
    pub fn set_comment(&mut self, comment: impl Into<String>) -> &mut Self {
        data_mut(&mut self.app.types, &self.name).base.comment = comment.into();
        self
    }

    /// Add constraints; a constraint of a kind already present replaces it.
    ///
    /// # Panics
    ///
    /// Panics with `IncompatibleConstraints` if a constraint does not fit the
    /// data kind, including enum values of another kind.
    pub fn add_constraints(&mut self, constraints: impl IntoIterator<Item = Constraint>) -> &mut Self {
        let data = data_mut(&mut self.app.types, &self.name);
        for c in constraints {
            if !c.fits(data.data_kind()) {
                panic_with(
                    ErrorKind::IncompatibleConstraints,
                    format!("constraint {} is not compatible with {}", c, data),
                );
            }
            data.add_constraint(c);
        }
        self
    }
}

/// Handle to a structure under construction
pub struct StructureBuilder<'a> {
    app: &'a mut AppDefBuilder,
    name: QName,
}

impl StructureBuilder<'_> {
    fn structure(&mut self) -> &mut Structure {
        structure_mut(&mut self.app.types, &self.name)
    }

    fn data_kind_of(&self, data: &QName) -> DataKind {
        match self.app.types.get(data) {
            Some(Type::Data(d)) => d.data_kind(),
            Some(other) => panic_with(
                ErrorKind::InvalidTypeKind,
                format!("{} is not a data type", other),
            ),
            None => panic_with(
                ErrorKind::NameNotFound,
                format!("data type «{}» not found", data),
            ),
        }
    }

    fn field_mut(&mut self, name: &str) -> &mut Field {
        let s = self.structure();
        let owner = s.to_string();
        match s.fields.field_mut(name) {
            Some(f) => f,
            None => panic_with(
                ErrorKind::NameNotFound,
                format!("{} field «{}» not found", owner, name),
            ),
        }
    }

    fn push_field(&mut self, field: Field) {
        let s = self.structure();
        let name = field.name().to_string();
        check_ident(&name, format_args!("{} field name «{}»", s, name));
        if s.fields.field(&name).is_some() || s.containers.container(&name).is_some() {
            panic_with(
                ErrorKind::NameUniqueViolation,
                format!("{} already has field or container «{}»", s, name),
            );
        }
        if !s.kind().field_kind_allowed(field.data_kind()) {
            panic_with(
                ErrorKind::InvalidDataKind,
                format!("{} can not have {} field «{}»", s, field.data_kind(), name),
            );
        }
        if s.fields.len() >= MAX_TYPE_FIELD_COUNT {
            panic_with(
                ErrorKind::TooManyFields,
                format!("{} already has {} fields", s, MAX_TYPE_FIELD_COUNT),
            );
        }
        s.fields.push(field);
    }

    /// Name of the structure
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Set the comment
    pub fn set_comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.structure().base.comment = comment.into();
        self
    }

    /// Mark the structure abstract
    pub fn set_abstract(&mut self) -> &mut Self {
        self.structure().base.is_abstract = true;
        self
    }

    /// Mark a CDoc as singleton
    ///
    /// # Panics
    ///
    /// Panics with `InvalidTypeKind` for other kinds.
    pub fn set_singleton(&mut self) -> &mut Self {
        let s = self.structure();
        if s.kind() != TypeKind::CDoc {
            panic_with(
                ErrorKind::InvalidTypeKind,
                format!("{} can not be a singleton, only CDoc can", s),
            );
        }
        s.singleton = true;
        self
    }

    /// Inherit fields, containers and uniques from a structure of the same
    /// kind. Checked by `build()`.
    pub fn set_ancestor(&mut self, ancestor: QName) -> &mut Self {
        let s = self.structure();
        check_qname(&ancestor, format_args!("{} ancestor", s));
        s.ancestor = ancestor;
        self
    }

    /// Add a field with the system data type of `kind`
    ///
    /// # Panics
    ///
    /// Panics if the name is invalid or taken, the kind is not allowed for
    /// structures, or the field limit is reached.
    pub fn add_field(&mut self, name: &str, kind: DataKind, required: bool) -> &mut Self {
        self.push_field(Field::new(name, kind, kind.sys_data_name(), required));
        self
    }

    /// Add a field declared with a data type
    ///
    /// # Panics
    ///
    /// As `add_field`, and if `data` is not a known data type.
    pub fn add_data_field(&mut self, name: &str, data: QName, required: bool) -> &mut Self {
        let kind = self.data_kind_of(&data);
        self.push_field(Field::new(name, kind, data, required));
        self
    }

    /// Add a record ID field that may refer to the given types; no types
    /// means any record
    pub fn add_ref_field(&mut self, name: &str, required: bool, refs: &[QName]) -> &mut Self {
        let mut field = Field::new(name, DataKind::RecordID, DataKind::RecordID.sys_data_name(), required);
        field.set_refs(refs.to_vec());
        self.push_field(field);
        self
    }

    /// Add constraints local to a field
    ///
    /// # Panics
    ///
    /// Panics with `IncompatibleConstraints` if a constraint does not fit the
    /// field data kind.
    pub fn add_field_constraints(
        &mut self,
        name: &str,
        constraints: impl IntoIterator<Item = Constraint>,
    ) -> &mut Self {
        let field = self.field_mut(name);
        for c in constraints {
            if !c.fits(field.data_kind()) {
                panic_with(
                    ErrorKind::IncompatibleConstraints,
                    format!("constraint {} is not compatible with {}", c, field),
                );
            }
            field.add_local(c);
        }
        self
    }

    /// Set a field comment
    pub fn set_field_comment(&mut self, name: &str, comment: impl Into<String>) -> &mut Self {
        self.field_mut(name).set_comment(comment.into());
        self
    }

    /// Mark a field verifiable by the given kinds
    pub fn set_field_verify(&mut self, name: &str, kinds: &[VerificationKind]) -> &mut Self {
        self.field_mut(name).set_verify(kinds);
        self
    }

    /// Add a container
    ///
    /// # Panics
    ///
    /// Panics if the name is invalid or taken, the type name is missed or
    /// invalid, the bounds are wrong (`min > max` or `max == 0`), or the
    /// container limit is reached. Kind compatibility is checked by `build()`.
    pub fn add_container(&mut self, name: &str, qname: QName, min: Occurs, max: Occurs) -> &mut Self {
        let s = self.structure();
        check_ident(name, format_args!("{} container name «{}»", s, name));
        if s.fields.field(name).is_some() || s.containers.container(name).is_some() {
            panic_with(
                ErrorKind::NameUniqueViolation,
                format!("{} already has field or container «{}»", s, name),
            );
        }
        check_qname(&qname, format_args!("{} container «{}» type", s, name));
        if max == 0 || min > max {
            panic_with(
                ErrorKind::InvalidOccurs,
                format!("{} container «{}» occurs {}..{}", s, name, min, max),
            );
        }
        if s.containers.len() >= MAX_TYPE_CONTAINER_COUNT {
            panic_with(
                ErrorKind::TooManyContainers,
                format!("{} already has {} containers", s, MAX_TYPE_CONTAINER_COUNT),
            );
        }
        s.containers.push(Container::new(name, qname, min, max));
        self
    }

    /// Set a container comment
    pub fn set_container_comment(&mut self, name: &str, comment: impl Into<String>) -> &mut Self {
        let s = self.structure();
        let owner = s.to_string();
        match s.containers.container_mut(name) {
            Some(c) => c.set_comment(comment.into()),
            None => panic_with(
                ErrorKind::NameNotFound,
                format!("{} container «{}» not found", owner, name),
            ),
        }
        self
    }

    /// Add a named unique over the fields
    ///
    /// # Panics
    ///
    /// Panics if the name is invalid or taken, the field list is empty, too
    /// long or repeats a field, a field is unknown (unless it may come from
    /// the ancestor), or the unique limit is reached.
    pub fn add_unique(&mut self, name: QName, fields: &[&str]) -> &mut Self {
        let s = self.structure();
        check_qname(&name, format_args!("{} unique name", s));
        if s.uniques.unique(&name).is_some() {
            panic_with(
                ErrorKind::NameUniqueViolation,
                format!("{} already has unique «{}»", s, name),
            );
        }
        if s.uniques.len() >= MAX_TYPE_UNIQUE_COUNT {
            panic_with(
                ErrorKind::TooManyUniques,
                format!("{} already has {} uniques", s, MAX_TYPE_UNIQUE_COUNT),
            );
        }
        if fields.is_empty() {
            panic_with(
                ErrorKind::NameMissed,
                format!("{} unique «{}» has no fields", s, name),
            );
        }
        if fields.len() > MAX_TYPE_UNIQUE_FIELDS_COUNT {
            panic_with(
                ErrorKind::TooManyFields,
                format!(
                    "{} unique «{}» has {} fields, max is {}",
                    s,
                    name,
                    fields.len(),
                    MAX_TYPE_UNIQUE_FIELDS_COUNT
                ),
            );
        }
        let mut seen = BTreeSet::new();
        for f in fields {
            if !seen.insert(*f) {
                panic_with(
                    ErrorKind::NameUniqueViolation,
                    format!("{} unique «{}» repeats field «{}»", s, name, f),
                );
            }
            if s.fields.field(f).is_none() && s.ancestor.is_null() {
                panic_with(
                    ErrorKind::NameNotFound,
                    format!("{} unique «{}» field «{}» not found", s, name, f),
                );
            }
        }
        s.uniques
            .push(Unique::new(name, fields.iter().map(|f| f.to_string()).collect()));
        self
    }

    /// Set the legacy unique field
    pub fn set_unique_field(&mut self, name: &str) -> &mut Self {
        let s = self.structure();
        if s.fields.field(name).is_none() && s.ancestor.is_null() {
            panic_with(
                ErrorKind::NameNotFound,
                format!("{} unique field «{}» not found", s, name),
            );
        }
        s.uniques.set_unique_field(Some(name.to_string()));
        self
    }
}

/// Handle to a command under construction
pub struct CommandBuilder<'a> {
    app: &'a mut AppDefBuilder,
    name: QName,
}

impl CommandBuilder<'_> {
    fn command(&mut self) -> &mut Command {
        match type_mut(&mut self.app.types, &self.name) {
            Type::Command(c) => c,
            other => panic_with(ErrorKind::InvalidTypeKind, format!("{} is not a command", other)),
        }
    }

    /// Set the comment
    pub fn set_comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.command().base.comment = comment.into();
        self
    }

    /// Set the parameter type
    pub fn set_param(&mut self, name: QName) -> &mut Self {
        self.command().param = name;
        self
    }

    /// Set the unlogged parameter type
    pub fn set_unlogged_param(&mut self, name: QName) -> &mut Self {
        self.command().unlogged_param = name;
        self
    }

    /// Set the result type
    pub fn set_result(&mut self, name: QName) -> &mut Self {
        self.command().result = name;
        self
    }
}

/// Handle to a query under construction
pub struct QueryBuilder<'a> {
    app: &'a mut AppDefBuilder,
    name: QName,
}

impl QueryBuilder<'_> {
    fn query(&mut self) -> &mut Query {
        match type_mut(&mut self.app.types, &self.name) {
            Type::Query(q) => q,
            other => panic_with(ErrorKind::InvalidTypeKind, format!("{} is not a query", other)),
        }
    }

    /// Set the comment
    pub fn set_comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.query().base.comment = comment.into();
        self
    }

    /// Set the parameter type
    pub fn set_param(&mut self, name: QName) -> &mut Self {
        self.query().param = name;
        self
    }

    /// Set the result type
    pub fn set_result(&mut self, name: QName) -> &mut Self {
        self.query().result = name;
        self
    }
}

/// Handle to a projector under construction
pub struct ProjectorBuilder<'a> {
    app: &'a mut AppDefBuilder,
    name: QName,
}

impl ProjectorBuilder<'_> {
    fn projector(&mut self) -> &mut Projector {
        match type_mut(&mut self.app.types, &self.name) {
            Type::Projector(p) => p,
            other => panic_with(ErrorKind::InvalidTypeKind, format!("{} is not a projector", other)),
        }
    }

    /// Set the comment
    pub fn set_comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.projector().base.comment = comment.into();
        self
    }

    /// Run the projector in the command's transaction
    pub fn set_sync(&mut self, sync: bool) -> &mut Self {
        self.projector().sync = sync;
        self
    }

    /// Trigger on events of `on`. No kinds means the kinds natural for the
    /// type, decided by `build()`. Repeated triggers on one type merge.
    pub fn add_event(&mut self, on: QName, kinds: &[ProjectorEventKind]) -> &mut Self {
        let p = self.projector();
        check_qname(&on, format_args!("{} event", p));
        match p.events.iter_mut().find(|e| e.on == on) {
            Some(e) => e.kinds.extend(kinds.iter().copied()),
            None => p.events.push(ProjectorEvent {
                on,
                kinds: kinds.iter().copied().collect(),
            }),
        }
        self
    }
}

/// Handle to a view under construction
pub struct ViewBuilder<'a> {
    app: &'a mut AppDefBuilder,
    name: QName,
}

enum ViewPart {
    PartitionKey,
    ClustCols,
    Value,
}

impl ViewBuilder<'_> {
    fn view(&mut self) -> &mut View {
        match type_mut(&mut self.app.types, &self.name) {
            Type::View(v) => v,
            other => panic_with(ErrorKind::InvalidTypeKind, format!("{} is not a view", other)),
        }
    }

    fn push(&mut self, part: ViewPart, name: &str, kind: DataKind, required: bool) {
        let v = self.view();
        check_ident(name, format_args!("{} field name «{}»", v, name));
        if v.field(name).is_some() {
            panic_with(
                ErrorKind::NameUniqueViolation,
                format!("{} already has field «{}»", v, name),
            );
        }
        if !TypeKind::ViewRecord.field_kind_allowed(kind) {
            panic_with(
                ErrorKind::InvalidDataKind,
                format!("{} can not have {} field «{}»", v, kind, name),
            );
        }
        let count = v.partition_key.len() + v.clust_cols.len() + v.value.len();
        if count >= MAX_TYPE_FIELD_COUNT {
            panic_with(
                ErrorKind::TooManyFields,
                format!("{} already has {} fields", v, MAX_TYPE_FIELD_COUNT),
            );
        }
        let field = Field::new(name, kind, kind.sys_data_name(), required);
        let fields: &mut Fields = match part {
            ViewPart::PartitionKey => &mut v.partition_key,
            ViewPart::ClustCols => &mut v.clust_cols,
            ViewPart::Value => &mut v.value,
        };
        fields.push(field);
    }

    /// Set the comment
    pub fn set_comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.view().base.comment = comment.into();
        self
    }

    /// Add a partition key field
    pub fn add_partition_field(&mut self, name: &str, kind: DataKind) -> &mut Self {
        self.push(ViewPart::PartitionKey, name, kind, true);
        self
    }

    /// Add a clustering column
    pub fn add_clust_col(&mut self, name: &str, kind: DataKind) -> &mut Self {
        self.push(ViewPart::ClustCols, name, kind, true);
        self
    }

    /// Add a value field
    pub fn add_value_field(&mut self, name: &str, kind: DataKind, required: bool) -> &mut Self {
        self.push(ViewPart::Value, name, kind, required);
        self
    }
}

/// Handle to a workspace under construction
pub struct WorkspaceBuilder<'a> {
    app: &'a mut AppDefBuilder,
    name: QName,
}

impl WorkspaceBuilder<'_> {
    fn workspace(&mut self) -> &mut Workspace {
        match type_mut(&mut self.app.types, &self.name) {
            Type::Workspace(w) => w,
            other => panic_with(ErrorKind::InvalidTypeKind, format!("{} is not a workspace", other)),
        }
    }

    /// Set the comment
    pub fn set_comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.workspace().base.comment = comment.into();
        self
    }

    /// Mark the workspace abstract
    pub fn set_abstract(&mut self) -> &mut Self {
        self.workspace().base.is_abstract = true;
        self
    }

    /// Set the descriptor CDoc
    pub fn set_descriptor(&mut self, name: QName) -> &mut Self {
        self.workspace().descriptor = name;
        self
    }

    /// Declare a type in the workspace
    pub fn add_type(&mut self, name: QName) -> &mut Self {
        let w = self.workspace();
        check_qname(&name, format_args!("{} type", w));
        w.types.insert(name);
        self
    }

    /// Set the workspaces this one inherits from
    pub fn set_ancestors(&mut self, ancestors: &[QName]) -> &mut Self {
        self.workspace().ancestors = ancestors.to_vec();
        self
    }
}
