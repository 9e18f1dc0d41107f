//! Data constraints
//!
//! A constraint restricts the values of a data type or a field. Which
//! constraint kinds apply to which data kinds is fixed by
//! [`DataKind::is_supported_constraint`](crate::DataKind::is_supported_constraint).
//!
//! Enum values are kept sorted and deduplicated so lookups are binary
//! searches.

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

use crate::data_kind::DataKind;

/// Kind of a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstraintKind {
    /// Minimum length in bytes
    MinLen,
    /// Maximum length in bytes
    MaxLen,
    /// Regular expression the value must match
    Pattern,
    /// Inclusive lower bound
    MinIncl,
    /// Exclusive lower bound
    MinExcl,
    /// Inclusive upper bound
    MaxIncl,
    /// Exclusive upper bound
    MaxExcl,
    /// Allowed values
    Enum,
}

impl ConstraintKind {
    /// Every constraint kind
    pub const ALL: [ConstraintKind; 8] = [
        ConstraintKind::MinLen,
        ConstraintKind::MaxLen,
        ConstraintKind::Pattern,
        ConstraintKind::MinIncl,
        ConstraintKind::MinExcl,
        ConstraintKind::MaxIncl,
        ConstraintKind::MaxExcl,
        ConstraintKind::Enum,
    ];
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Values of an enum constraint
#[derive(Debug, Clone, PartialEq)]
pub enum EnumValues {
    /// int32 values
    Int32(Vec<i32>),
    /// int64 values
    Int64(Vec<i64>),
    /// float32 values
    Float32(Vec<f32>),
    /// float64 values
    Float64(Vec<f64>),
    /// string values
    String(Vec<String>),
}

fn sorted<T: PartialOrd>(mut v: Vec<T>) -> Vec<T> {
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    v.dedup_by(|a, b| a == b);
    v
}

fn search<T: PartialOrd>(values: &[T], v: &T) -> bool {
    values
        .binary_search_by(|x| x.partial_cmp(v).unwrap_or(Ordering::Less))
        .is_ok()
}

impl EnumValues {
    /// Data kind of the values
    pub fn data_kind(&self) -> DataKind {
        match self {
            EnumValues::Int32(_) => DataKind::Int32,
            EnumValues::Int64(_) => DataKind::Int64,
            EnumValues::Float32(_) => DataKind::Float32,
            EnumValues::Float64(_) => DataKind::Float64,
            EnumValues::String(_) => DataKind::String,
        }
    }

    /// Number of values
    pub fn len(&self) -> usize {
        match self {
            EnumValues::Int32(v) => v.len(),
            EnumValues::Int64(v) => v.len(),
            EnumValues::Float32(v) => v.len(),
            EnumValues::Float64(v) => v.len(),
            EnumValues::String(v) => v.len(),
        }
    }

    /// Returns true if there are no values
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn normalized(self) -> Self {
        match self {
            EnumValues::Int32(v) => EnumValues::Int32(sorted(v)),
            EnumValues::Int64(v) => EnumValues::Int64(sorted(v)),
            EnumValues::Float32(v) => EnumValues::Float32(sorted(v)),
            EnumValues::Float64(v) => EnumValues::Float64(sorted(v)),
            EnumValues::String(v) => EnumValues::String(sorted(v)),
        }
    }

    /// Returns true if the int32 value is allowed
    pub fn contains_int32(&self, v: i32) -> bool {
        matches!(self, EnumValues::Int32(vs) if search(vs, &v))
    }

    /// Returns true if the int64 value is allowed
    pub fn contains_int64(&self, v: i64) -> bool {
        matches!(self, EnumValues::Int64(vs) if search(vs, &v))
    }

    /// Returns true if the float32 value is allowed
    pub fn contains_float32(&self, v: f32) -> bool {
        matches!(self, EnumValues::Float32(vs) if search(vs, &v))
    }

    /// Returns true if the float64 value is allowed
    pub fn contains_float64(&self, v: f64) -> bool {
        matches!(self, EnumValues::Float64(vs) if search(vs, &v))
    }

    /// Returns true if the string value is allowed
    pub fn contains_str(&self, v: &str) -> bool {
        match self {
            EnumValues::String(vs) => vs.binary_search_by(|x| x.as_str().cmp(v)).is_ok(),
            _ => false,
        }
    }
}

impl fmt::Display for EnumValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, v: &[T]) -> fmt::Result {
            f.write_str("[")?;
            for (i, x) in v.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{}", x)?;
            }
            f.write_str("]")
        }
        match self {
            EnumValues::Int32(v) => list(f, v),
            EnumValues::Int64(v) => list(f, v),
            EnumValues::Float32(v) => list(f, v),
            EnumValues::Float64(v) => list(f, v),
            EnumValues::String(v) => list(f, v),
        }
    }
}

impl From<Vec<i32>> for EnumValues {
    fn from(v: Vec<i32>) -> Self {
        EnumValues::Int32(v)
    }
}

impl From<Vec<i64>> for EnumValues {
    fn from(v: Vec<i64>) -> Self {
        EnumValues::Int64(v)
    }
}

impl From<Vec<f32>> for EnumValues {
    fn from(v: Vec<f32>) -> Self {
        EnumValues::Float32(v)
    }
}

impl From<Vec<f64>> for EnumValues {
    fn from(v: Vec<f64>) -> Self {
        EnumValues::Float64(v)
    }
}

impl From<Vec<String>> for EnumValues {
    fn from(v: Vec<String>) -> Self {
        EnumValues::String(v)
    }
}

impl From<Vec<&str>> for EnumValues {
    fn from(v: Vec<&str>) -> Self {
        EnumValues::String(v.into_iter().map(String::from).collect())
    }
}

/// Value of a constraint
#[derive(Debug, Clone)]
pub enum ConstraintValue {
    /// Length bound for MinLen / MaxLen
    Len(u16),
    /// Compiled pattern
    Pattern(Regex),
    /// Numeric bound for Min* / Max*
    Number(f64),
    /// Allowed values
    Enum(EnumValues),
}

/// A constraint with its value
#[derive(Debug, Clone)]
pub struct Constraint {
    kind: ConstraintKind,
    value: ConstraintValue,
    comment: String,
}

impl Constraint {
    /// Minimum length in bytes
    pub fn min_len(n: u16) -> Self {
        Self::make(ConstraintKind::MinLen, ConstraintValue::Len(n))
    }

    /// Maximum length in bytes
    pub fn max_len(n: u16) -> Self {
        Self::make(ConstraintKind::MaxLen, ConstraintValue::Len(n))
    }

    /// Pattern the value must match.
    ///
    /// # Panics
    ///
    /// Panics if the expression does not compile.
    pub fn pattern(expr: &str) -> Self {
        match Regex::new(expr) {
            Ok(re) => Self::make(ConstraintKind::Pattern, ConstraintValue::Pattern(re)),
            Err(e) => panic!("invalid pattern «{}»: {}", expr, e),
        }
    }

    /// Inclusive lower bound
    pub fn min_incl(v: f64) -> Self {
        Self::make(ConstraintKind::MinIncl, ConstraintValue::Number(v))
    }

    /// Exclusive lower bound
    pub fn min_excl(v: f64) -> Self {
        Self::make(ConstraintKind::MinExcl, ConstraintValue::Number(v))
    }

    /// Inclusive upper bound
    pub fn max_incl(v: f64) -> Self {
        Self::make(ConstraintKind::MaxIncl, ConstraintValue::Number(v))
    }

    /// Exclusive upper bound
    pub fn max_excl(v: f64) -> Self {
        Self::make(ConstraintKind::MaxExcl, ConstraintValue::Number(v))
    }

    /// Allowed values; the value type selects the data kind
    pub fn enumeration(values: impl Into<EnumValues>) -> Self {
        Self::make(
            ConstraintKind::Enum,
            ConstraintValue::Enum(values.into().normalized()),
        )
    }

    fn make(kind: ConstraintKind, value: ConstraintValue) -> Self {
        Constraint {
            kind,
            value,
            comment: String::new(),
        }
    }

    /// Attach a comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Constraint kind
    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    /// Constraint value
    pub fn value(&self) -> &ConstraintValue {
        &self.value
    }

    /// Comment
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Returns true if the constraint can restrict values of `kind`.
    /// Enum values must also be of exactly that kind.
    pub fn fits(&self, kind: DataKind) -> bool {
        if !kind.is_supported_constraint(self.kind) {
            return false;
        }
        match &self.value {
            ConstraintValue::Enum(values) => values.data_kind() == kind,
            _ => true,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            ConstraintValue::Len(n) => write!(f, "{}: {}", self.kind, n),
            ConstraintValue::Pattern(re) => write!(f, "{}: `{}`", self.kind, re.as_str()),
            ConstraintValue::Number(v) => write!(f, "{}: {}", self.kind, v),
            ConstraintValue::Enum(v) => write!(f, "{}: {}", self.kind, v),
        }
    }
}
