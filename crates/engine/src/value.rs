//! Typed field values

use std::fmt;

use appstruct_appdef::DataKind;
use appstruct_core::{QName, RecordID};

/// Value of a row field
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 32-bit integer
    Int32(i32),
    /// 64-bit integer
    Int64(i64),
    /// 32-bit float
    Float32(f32),
    /// 64-bit float
    Float64(f64),
    /// Byte string
    Bytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Qualified name
    QName(QName),
    /// Boolean
    Bool(bool),
    /// Record reference
    RecordID(RecordID),
}

impl Value {
    /// Data kind of the value
    pub fn data_kind(&self) -> DataKind {
        match self {
            Value::Int32(_) => DataKind::Int32,
            Value::Int64(_) => DataKind::Int64,
            Value::Float32(_) => DataKind::Float32,
            Value::Float64(_) => DataKind::Float64,
            Value::Bytes(_) => DataKind::Bytes,
            Value::String(_) => DataKind::String,
            Value::QName(_) => DataKind::QName,
            Value::Bool(_) => DataKind::Bool,
            Value::RecordID(_) => DataKind::RecordID,
        }
    }

    /// Empty strings and byte strings stand for "no value"
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Bytes(b) => b.is_empty(),
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Numeric value widened to f64, for range constraints
    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(v) => Some(f64::from(*v)),
            Value::Int64(v) => Some(*v as f64),
            Value::Float32(v) => Some(f64::from(*v)),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "{:?}", v),
            Value::String(v) => write!(f, "{:?}", v),
            Value::QName(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::RecordID(v) => write!(f, "{}", v),
        }
    }
}
