//! Fixed catalog limits
//!
//! These bounds are part of the persisted contract: stored events and system
//! tables are laid out assuming them. Each limit is inclusive, so a value equal
//! to the limit is accepted and the next one is rejected.

/// Maximum identifier length in bytes
pub const MAX_IDENT_LEN: usize = 255;

/// Maximum number of fields in a structure, system fields included
pub const MAX_TYPE_FIELD_COUNT: usize = 65536;

/// Maximum number of containers in a structure
pub const MAX_TYPE_CONTAINER_COUNT: usize = 65536;

/// Maximum length of a string or bytes field value (64K - 1)
pub const MAX_FIELD_LENGTH: u16 = u16::MAX;

/// Max length applied to string and bytes fields without an explicit limit
pub const DEFAULT_FIELD_MAX_LENGTH: u16 = 255;

/// Maximum number of uniques in a structure
pub const MAX_TYPE_UNIQUE_COUNT: usize = 100;

/// Maximum number of fields in one unique
pub const MAX_TYPE_UNIQUE_FIELDS_COUNT: usize = 256;

/// Container occurrence count
pub type Occurs = u16;

/// Unbounded maximum occurrences
pub const OCCURS_UNBOUNDED: Occurs = Occurs::MAX;
