//! Qualified names and identifier validation
//!
//! A `QName` is a `(package, entity)` pair rendered as `"package.entity"`.
//! It identifies every type in a catalog and is a component of most storage
//! keys. Ordering is structural: package first, then entity.
//!
//! ## Identifiers
//!
//! Both parts of a qualified name, field names and container names must be
//! identifiers:
//! - 1 to `MAX_IDENT_LEN` bytes
//! - first char is an ASCII letter, `_` or `$`
//! - other chars are ASCII letters, digits, `_` or `$`

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::limits::MAX_IDENT_LEN;

/// Package that holds built-in types
pub const SYS_PACKAGE: &str = "sys";

/// Absent name
pub const NULL_QNAME: QName = QName::from_static("", "");

/// Name reported by events that failed to build
pub const QNAME_FOR_ERROR: QName = QName::from_static(SYS_PACKAGE, "Error");

/// Built-in command that carries a bare CUD
pub const QNAME_COMMAND_CUD: QName = QName::from_static(SYS_PACKAGE, "CUD");

/// Wildcard type accepted where any parameter or result is allowed
pub const QNAME_ANY: QName = QName::from_static(SYS_PACKAGE, "ANY");

/// Validate an identifier.
///
/// Returns the first violation found.
pub fn valid_ident(ident: &str) -> Result<()> {
    if ident.is_empty() {
        return Err(Error::NameMissed);
    }
    if ident.len() > MAX_IDENT_LEN {
        return Err(Error::invalid_name(format!(
            "ident too long ({} > {})",
            ident.len(),
            MAX_IDENT_LEN
        )));
    }
    for (pos, c) in ident.chars().enumerate() {
        let ok = if pos == 0 {
            is_ident_start(c)
        } else {
            is_ident_char(c)
        };
        if !ok {
            return Err(Error::invalid_name(format!(
                "name char «{}» at pos {} is not valid",
                c, pos
            )));
        }
    }
    Ok(())
}

/// Returns true if the string is a valid identifier
pub fn is_valid_ident(ident: &str) -> bool {
    valid_ident(ident).is_ok()
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

/// Qualified name `(package, entity)`
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QName {
    pkg: Cow<'static, str>,
    entity: Cow<'static, str>,
}

impl QName {
    /// Create a name from owned or borrowed parts. Parts are not validated.
    pub fn new(pkg: impl Into<String>, entity: impl Into<String>) -> Self {
        QName {
            pkg: Cow::Owned(pkg.into()),
            entity: Cow::Owned(entity.into()),
        }
    }

    /// Create a name from static parts, usable in constants
    pub const fn from_static(pkg: &'static str, entity: &'static str) -> Self {
        QName {
            pkg: Cow::Borrowed(pkg),
            entity: Cow::Borrowed(entity),
        }
    }

    /// Name in the `sys` package
    pub fn sys(entity: impl Into<String>) -> Self {
        QName {
            pkg: Cow::Borrowed(SYS_PACKAGE),
            entity: Cow::Owned(entity.into()),
        }
    }

    /// Package part
    pub fn pkg(&self) -> &str {
        &self.pkg
    }

    /// Entity part
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Returns true for the null name
    pub fn is_null(&self) -> bool {
        self.pkg.is_empty() && self.entity.is_empty()
    }

    /// Returns true if both parts are valid identifiers
    pub fn validate(&self) -> Result<()> {
        if self.is_null() {
            return Err(Error::NameMissed);
        }
        valid_ident(&self.pkg).map_err(|e| qualify(self, e))?;
        valid_ident(&self.entity).map_err(|e| qualify(self, e))?;
        Ok(())
    }
}

fn qualify(name: &QName, err: Error) -> Error {
    match err {
        Error::NameMissed => Error::invalid_name(format!("«{}» has empty part", name)),
        Error::InvalidName(msg) => Error::invalid_name(format!("«{}»: {}", name, msg)),
        other => other,
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.pkg, self.entity)
    }
}

impl FromStr for QName {
    type Err = Error;

    /// Parse `"package.entity"`. The string `"."` parses to the null name.
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::NameMissed);
        }
        let mut parts = s.split('.');
        let (pkg, entity) = match (parts.next(), parts.next(), parts.next()) {
            (Some(pkg), Some(entity), None) => (pkg, entity),
            _ => {
                return Err(Error::invalid_name(format!(
                    "«{}» is not a qualified name, expected «pkg.entity»",
                    s
                )))
            }
        };
        let name = QName::new(pkg, entity);
        if name.is_null() {
            return Ok(NULL_QNAME);
        }
        name.validate()?;
        Ok(name)
    }
}

/// Application name `(owner, name)`, rendered as `"owner/name"`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AppQName {
    owner: Cow<'static, str>,
    name: Cow<'static, str>,
}

impl AppQName {
    /// Create an application name
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        AppQName {
            owner: Cow::Owned(owner.into()),
            name: Cow::Owned(name.into()),
        }
    }

    /// Create an application name from static parts
    pub const fn from_static(owner: &'static str, name: &'static str) -> Self {
        AppQName {
            owner: Cow::Borrowed(owner),
            name: Cow::Borrowed(name),
        }
    }

    /// Owner part
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Name part
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for AppQName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for AppQName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((owner, name)) if !name.contains('/') => {
                valid_ident(owner)?;
                valid_ident(name)?;
                Ok(AppQName::new(owner, name))
            }
            _ => Err(Error::invalid_name(format!(
                "«{}» is not an application name, expected «owner/name»",
                s
            ))),
        }
    }
}
