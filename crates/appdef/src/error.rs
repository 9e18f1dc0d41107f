//! Catalog errors
//!
//! Builder misuse panics with the `Display` of an [`AppDefError`]. Problems
//! that need the whole graph are collected by `build()` into
//! [`ValidationErrors`].

use std::fmt;
use thiserror::Error;

/// Result type alias for catalog builds
pub type Result<T> = std::result::Result<T, ValidationErrors>;

/// Class of a catalog error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Empty name
    NameMissed,
    /// Malformed name
    InvalidName,
    /// Referenced name does not exist
    NameNotFound,
    /// Name is already taken
    NameUniqueViolation,
    /// Type kind is not allowed here
    InvalidTypeKind,
    /// Data kind is not allowed here
    InvalidDataKind,
    /// Constraint does not fit the data kind
    IncompatibleConstraints,
    /// Field limit exceeded
    TooManyFields,
    /// Container limit exceeded
    TooManyContainers,
    /// Unique limit exceeded
    TooManyUniques,
    /// Bad occurrence bounds
    InvalidOccurs,
    /// Cycle in an inheritance graph
    CircularReference,
    /// Inherited name declared again
    Redefinition,
    /// Unique field set includes another one
    UniqueOverlaps,
    /// Abstract type used where a concrete one is required
    AbstractType,
    /// View key layout broken
    InvalidViewKey,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NameMissed => "name is missed",
            ErrorKind::InvalidName => "invalid name",
            ErrorKind::NameNotFound => "name not found",
            ErrorKind::NameUniqueViolation => "name already exists",
            ErrorKind::InvalidTypeKind => "invalid type kind",
            ErrorKind::InvalidDataKind => "invalid data kind",
            ErrorKind::IncompatibleConstraints => "incompatible constraints",
            ErrorKind::TooManyFields => "too many fields",
            ErrorKind::TooManyContainers => "too many containers",
            ErrorKind::TooManyUniques => "too many uniques",
            ErrorKind::InvalidOccurs => "invalid occurrences",
            ErrorKind::CircularReference => "circular reference",
            ErrorKind::Redefinition => "redefinition",
            ErrorKind::UniqueOverlaps => "unique overlaps",
            ErrorKind::AbstractType => "abstract type",
            ErrorKind::InvalidViewKey => "invalid view key",
        };
        f.write_str(s)
    }
}

/// A single catalog error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct AppDefError {
    kind: ErrorKind,
    message: String,
}

impl AppDefError {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        AppDefError {
            kind,
            message: message.into(),
        }
    }

    /// Error class
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Message without the kind prefix
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Wrap an identifier error with context
    pub(crate) fn from_name(err: appstruct_core::Error, context: impl fmt::Display) -> Self {
        match err {
            appstruct_core::Error::NameMissed => {
                AppDefError::new(ErrorKind::NameMissed, context.to_string())
            }
            appstruct_core::Error::InvalidName(msg) => {
                AppDefError::new(ErrorKind::InvalidName, format!("{}: {}", context, msg))
            }
            other => AppDefError::new(ErrorKind::InvalidName, format!("{}: {}", context, other)),
        }
    }
}

/// Panic with a catalog error. Builder misuse is a programming error.
#[track_caller]
pub(crate) fn panic_with(kind: ErrorKind, message: impl Into<String>) -> ! {
    panic!("{}", AppDefError::new(kind, message))
}

/// Every problem found by one `build()` call, sorted by message once the
/// build is done
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<AppDefError>,
}

impl ValidationErrors {
    pub(crate) fn push(&mut self, err: AppDefError) {
        if !self.errors.contains(&err) {
            self.errors.push(err);
        }
    }

    pub(crate) fn add(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.push(AppDefError::new(kind, message));
    }

    /// Order by message. Equal messages keep their report order.
    pub(crate) fn sort(&mut self) {
        self.errors.sort_by(|a, b| a.message.cmp(&b.message));
    }

    /// Collected errors
    pub fn errors(&self) -> &[AppDefError] {
        &self.errors
    }

    /// Iterate collected errors
    pub fn iter(&self) -> impl Iterator<Item = &AppDefError> {
        self.errors.iter()
    }

    /// Number of errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if nothing was collected
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns true if any error is of the given kind
    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }

    /// Number of errors of the given kind
    pub fn count_kind(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
