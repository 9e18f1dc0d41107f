//! Application type catalog
//!
//! An application declares its types through [`AppDefBuilder`] and freezes
//! them into an immutable [`AppDef`]:
//! - data types with constraints
//! - structures: objects, documents and records with fields, containers and uniques
//! - commands, queries and projectors
//! - views and workspaces
//!
//! Declaration mistakes panic at once; graph problems are collected by
//! [`AppDefBuilder::build`] into [`ValidationErrors`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod appdef;
pub mod builder;
pub mod constraint;
pub mod container;
pub mod data;
pub mod data_kind;
pub mod error;
pub mod field;
pub mod function;
pub mod projector;
pub mod structure;
pub mod type_kind;
pub mod types;
pub mod unique;
pub mod view;
pub mod workspace;

mod validate;

pub use appdef::AppDef;
pub use builder::{
    AppDefBuilder, CommandBuilder, DataBuilder, ProjectorBuilder, QueryBuilder, StructureBuilder,
    TypeBuilder, ViewBuilder, WorkspaceBuilder,
};
pub use constraint::{Constraint, ConstraintKind, ConstraintValue, EnumValues};
pub use container::{Container, Containers};
pub use data::Data;
pub use data_kind::DataKind;
pub use error::{AppDefError, ErrorKind, Result, ValidationErrors};
pub use field::{
    is_sys_field, sys_field_kind, Field, Fields, VerificationKind, SYS_FIELD_CONTAINER,
    SYS_FIELD_ID, SYS_FIELD_IS_ACTIVE, SYS_FIELD_PARENT_ID, SYS_FIELD_QNAME,
};
pub use function::{Command, Query};
pub use projector::{Projector, ProjectorEvent, ProjectorEventKind};
pub use structure::Structure;
pub use type_kind::TypeKind;
pub use types::{Type, TypeBase};
pub use unique::{Unique, Uniques};
pub use view::View;
pub use workspace::Workspace;
