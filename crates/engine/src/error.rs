//! Engine errors
//!
//! Data problems found while building, validating or storing events are
//! returned, never panicked. Independent problems are joined into
//! `Error::Multiple` so one call reports all of them.

use std::fmt;

use thiserror::Error;

use appstruct_appdef::ValidationErrors;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Class of an engine error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Name is empty
    NameMissed,
    /// Name is malformed
    InvalidName,
    /// Referenced name is unknown
    NameNotFound,
    /// Type is of the wrong kind
    InvalidTypeKind,
    /// Abstract type used where a concrete one is required
    AbstractType,
    /// Event bytes carry an unknown codec version
    UnknownCodec,
    /// Update touches ID, parent or container
    UnableToUpdateSystemField,
    /// Referenced record does not exist
    RecordIDNotFound,
    /// Record ID refers to a record of the wrong type
    WrongRecordID,
    /// Raw ID expected but storage ID given
    RawRecordIDRequired,
    /// Storage ID expected but raw ID given
    UnexpectedRawRecordID,
    /// Same ID used twice
    RecordIDUniqueViolation,
    /// Required value is absent
    FieldIsEmpty,
    /// Value does not match the field data kind
    WrongFieldType,
    /// Value violates a data constraint
    DataConstraintViolation,
    /// Unique key already taken
    UniqueConstraintViolation,
    /// Too few children in a container
    MinOccursViolation,
    /// Too many children in a container
    MaxOccursViolation,
    /// ID register is exhausted
    IDsExhausted,
    /// Application is unknown
    AppNotFound,
    /// Partition is unknown
    PartitionNotFound,
    /// Partition is borrowed by a processor of the same kind
    PartitionBusy,
    /// Storage backend failure
    Storage,
    /// Malformed stored bytes
    Decode,
    /// Application definition does not build
    InvalidAppDef,
    /// Rejected by a registered validator
    Validator,
    /// Configuration file can not be read or parsed
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NameMissed => "name is missed",
            ErrorKind::InvalidName => "invalid name",
            ErrorKind::NameNotFound => "name not found",
            ErrorKind::InvalidTypeKind => "invalid type kind",
            ErrorKind::AbstractType => "abstract type",
            ErrorKind::UnknownCodec => "unknown codec",
            ErrorKind::UnableToUpdateSystemField => "unable to update system field",
            ErrorKind::RecordIDNotFound => "record ID not found",
            ErrorKind::WrongRecordID => "wrong record ID",
            ErrorKind::RawRecordIDRequired => "raw record ID required",
            ErrorKind::UnexpectedRawRecordID => "unexpected raw record ID",
            ErrorKind::RecordIDUniqueViolation => "record ID unique violation",
            ErrorKind::FieldIsEmpty => "field is empty",
            ErrorKind::WrongFieldType => "wrong field type",
            ErrorKind::DataConstraintViolation => "data constraint violation",
            ErrorKind::UniqueConstraintViolation => "unique constraint violation",
            ErrorKind::MinOccursViolation => "min occurs violation",
            ErrorKind::MaxOccursViolation => "max occurs violation",
            ErrorKind::IDsExhausted => "IDs exhausted",
            ErrorKind::AppNotFound => "application not found",
            ErrorKind::PartitionNotFound => "partition not found",
            ErrorKind::PartitionBusy => "partition is busy",
            ErrorKind::Storage => "storage error",
            ErrorKind::Decode => "decode error",
            ErrorKind::InvalidAppDef => "invalid application definition",
            ErrorKind::Validator => "validation rejected",
            ErrorKind::Config => "configuration error",
        };
        f.write_str(s)
    }
}

/// Engine error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Single classified error
    #[error("{kind}: {message}")]
    Kind {
        /// Error class
        kind: ErrorKind,
        /// Details
        message: String,
    },

    /// Error from names or the storage backend
    #[error(transparent)]
    Core(#[from] appstruct_core::Error),

    /// Application definition failed to build
    #[error("invalid application definition:\n{0}")]
    AppDef(#[from] ValidationErrors),

    /// Several independent errors
    #[error("{}", join_lines(.0))]
    Multiple(Vec<Error>),
}

fn join_lines(errs: &[Error]) -> String {
    errs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl Error {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error::Kind {
            kind,
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Decode, message)
    }

    /// Class of a single error; `None` for `Multiple`
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Kind { kind, .. } => Some(*kind),
            Error::Core(e) => Some(match e {
                appstruct_core::Error::NameMissed => ErrorKind::NameMissed,
                appstruct_core::Error::InvalidName(_) => ErrorKind::InvalidName,
                appstruct_core::Error::Storage(_) => ErrorKind::Storage,
                appstruct_core::Error::AppNotFound(_) => ErrorKind::AppNotFound,
            }),
            Error::AppDef(_) => Some(ErrorKind::InvalidAppDef),
            Error::Multiple(_) => None,
        }
    }

    /// Returns true if this error or any joined error is of `kind`
    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        match self {
            Error::Multiple(errs) => errs.iter().any(|e| e.has_kind(kind)),
            _ => self.kind() == Some(kind),
        }
    }

    /// Join errors: `Ok` if there are none, the error itself if there is
    /// one, `Multiple` otherwise. Nested `Multiple`s are flattened.
    pub fn join(errs: impl IntoIterator<Item = Error>) -> Result<()> {
        let mut all = Vec::new();
        for e in errs {
            match e {
                Error::Multiple(inner) => all.extend(inner),
                e => all.push(e),
            }
        }
        match all.len() {
            0 => Ok(()),
            1 => Err(all.remove(0)),
            _ => Err(Error::Multiple(all)),
        }
    }
}

/// Collects errors from several independent checks
#[derive(Debug, Default)]
pub(crate) struct Errors(Vec<Error>);

impl Errors {
    pub(crate) fn add(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.0.push(Error::new(kind, message));
    }

    pub(crate) fn check(&mut self, res: Result<()>) {
        if let Err(e) = res {
            self.0.push(e);
        }
    }

    pub(crate) fn push(&mut self, e: Error) {
        self.0.push(e);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn into_result(self) -> Result<()> {
        Error::join(self.0)
    }
}
