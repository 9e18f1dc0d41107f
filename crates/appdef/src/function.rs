//! Commands and queries

use std::fmt;

use appstruct_core::QName;

use crate::types::TypeBase;

/// A command: takes a parameter, an unlogged parameter and returns a result
#[derive(Debug, Clone)]
pub struct Command {
    pub(crate) base: TypeBase,
    pub(crate) param: QName,
    pub(crate) unlogged_param: QName,
    pub(crate) result: QName,
}

impl Command {
    pub(crate) fn new(base: TypeBase) -> Self {
        Command {
            base,
            param: QName::default(),
            unlogged_param: QName::default(),
            result: QName::default(),
        }
    }

    /// Command name
    pub fn name(&self) -> &QName {
        &self.base.name
    }

    /// Comment
    pub fn comment(&self) -> &str {
        &self.base.comment
    }

    /// Parameter type; null if none
    pub fn param(&self) -> &QName {
        &self.param
    }

    /// Unlogged parameter type; null if none
    pub fn unlogged_param(&self) -> &QName {
        &self.unlogged_param
    }

    /// Result type; null if none
    pub fn result(&self) -> &QName {
        &self.result
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command «{}»", self.base.name)
    }
}

/// A query: takes a parameter and returns a result
#[derive(Debug, Clone)]
pub struct Query {
    pub(crate) base: TypeBase,
    pub(crate) param: QName,
    pub(crate) result: QName,
}

impl Query {
    pub(crate) fn new(base: TypeBase) -> Self {
        Query {
            base,
            param: QName::default(),
            result: QName::default(),
        }
    }

    /// Query name
    pub fn name(&self) -> &QName {
        &self.base.name
    }

    /// Comment
    pub fn comment(&self) -> &str {
        &self.base.comment
    }

    /// Parameter type; null if none
    pub fn param(&self) -> &QName {
        &self.param
    }

    /// Result type; null if none
    pub fn result(&self) -> &QName {
        &self.result
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Query «{}»", self.base.name)
    }
}
