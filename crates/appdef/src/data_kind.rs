//! Data kinds
//!
//! The closed set of value kinds a field or data type can hold. The numeric
//! code of each kind is persisted, so the order is frozen.

use serde::{Deserialize, Serialize};
use std::fmt;

use appstruct_core::{QName, SYS_PACKAGE};

use crate::constraint::ConstraintKind;

/// Kind of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataKind {
    /// No value
    Null = 0,
    /// 32-bit signed integer
    Int32 = 1,
    /// 64-bit signed integer
    Int64 = 2,
    /// 32-bit float
    Float32 = 3,
    /// 64-bit float
    Float64 = 4,
    /// Byte string
    Bytes = 5,
    /// UTF-8 string
    String = 6,
    /// Qualified name
    QName = 7,
    /// Boolean
    Bool = 8,
    /// Record identifier
    RecordID = 9,
    /// Nested record (views only)
    Record = 10,
    /// Nested event (views only)
    Event = 11,
}

impl DataKind {
    /// Every kind, in code order
    pub const ALL: [DataKind; 12] = [
        DataKind::Null,
        DataKind::Int32,
        DataKind::Int64,
        DataKind::Float32,
        DataKind::Float64,
        DataKind::Bytes,
        DataKind::String,
        DataKind::QName,
        DataKind::Bool,
        DataKind::RecordID,
        DataKind::Record,
        DataKind::Event,
    ];

    /// Kinds that have a system data type and may be used in fields
    pub const SCALARS: [DataKind; 9] = [
        DataKind::Int32,
        DataKind::Int64,
        DataKind::Float32,
        DataKind::Float64,
        DataKind::Bytes,
        DataKind::String,
        DataKind::QName,
        DataKind::Bool,
        DataKind::RecordID,
    ];

    /// Short name, as used in system data type names
    pub fn name(self) -> &'static str {
        match self {
            DataKind::Null => "null",
            DataKind::Int32 => "int32",
            DataKind::Int64 => "int64",
            DataKind::Float32 => "float32",
            DataKind::Float64 => "float64",
            DataKind::Bytes => "bytes",
            DataKind::String => "string",
            DataKind::QName => "QName",
            DataKind::Bool => "bool",
            DataKind::RecordID => "RecordID",
            DataKind::Record => "Record",
            DataKind::Event => "Event",
        }
    }

    /// Persisted code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Kind for a persisted code
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Returns true for constant-width encodings
    pub fn is_fixed(self) -> bool {
        matches!(
            self,
            DataKind::Int32
                | DataKind::Int64
                | DataKind::Float32
                | DataKind::Float64
                | DataKind::QName
                | DataKind::Bool
                | DataKind::RecordID
        )
    }

    /// Returns true for the four number kinds
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            DataKind::Int32 | DataKind::Int64 | DataKind::Float32 | DataKind::Float64
        )
    }

    /// Returns true if the kind is a scalar usable in structure fields
    pub fn is_scalar(self) -> bool {
        Self::SCALARS.contains(&self)
    }

    /// Returns true if a constraint of the given kind can restrict values of this kind
    pub fn is_supported_constraint(self, c: ConstraintKind) -> bool {
        use ConstraintKind::*;
        match self {
            DataKind::Bytes => matches!(c, MinLen | MaxLen | Pattern),
            DataKind::String => matches!(c, MinLen | MaxLen | Pattern | Enum),
            DataKind::Int32 | DataKind::Int64 | DataKind::Float32 | DataKind::Float64 => {
                matches!(c, MinIncl | MinExcl | MaxIncl | MaxExcl | Enum)
            }
            _ => false,
        }
    }

    /// Name of the system data type for this kind, e.g. `sys.int32`
    pub fn sys_data_name(self) -> QName {
        QName::new(SYS_PACKAGE, self.name())
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
