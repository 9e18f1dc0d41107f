//! Containers of structures

use std::collections::HashMap;
use std::fmt;

use appstruct_core::{QName, Occurs, OCCURS_UNBOUNDED};

/// A named slot for child structures
#[derive(Debug, Clone)]
pub struct Container {
    name: String,
    qname: QName,
    min_occurs: Occurs,
    max_occurs: Occurs,
    comment: String,
}

impl Container {
    pub(crate) fn new(name: impl Into<String>, qname: QName, min: Occurs, max: Occurs) -> Self {
        Container {
            name: name.into(),
            qname,
            min_occurs: min,
            max_occurs: max,
            comment: String::new(),
        }
    }

    /// Container name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type of the children
    pub fn qname(&self) -> &QName {
        &self.qname
    }

    /// Minimum number of children
    pub fn min_occurs(&self) -> Occurs {
        self.min_occurs
    }

    /// Maximum number of children, `OCCURS_UNBOUNDED` for no limit
    pub fn max_occurs(&self) -> Occurs {
        self.max_occurs
    }

    /// Comment
    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub(crate) fn set_comment(&mut self, comment: String) {
        self.comment = comment;
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container «{}: {}» [{}..", self.name, self.qname, self.min_occurs)?;
        if self.max_occurs == OCCURS_UNBOUNDED {
            f.write_str("unbounded]")
        } else {
            write!(f, "{}]", self.max_occurs)
        }
    }
}

/// Ordered list of containers with name lookup
#[derive(Debug, Clone, Default)]
pub struct Containers {
    list: Vec<Container>,
    index: HashMap<String, usize>,
}

impl Containers {
    pub(crate) fn push(&mut self, c: Container) {
        self.index.insert(c.name.clone(), self.list.len());
        self.list.push(c);
    }

    pub(crate) fn container_mut(&mut self, name: &str) -> Option<&mut Container> {
        let i = *self.index.get(name)?;
        self.list.get_mut(i)
    }

    /// Container by name
    pub fn container(&self, name: &str) -> Option<&Container> {
        self.index.get(name).map(|&i| &self.list[i])
    }

    /// Containers in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Container> {
        self.list.iter()
    }

    /// Number of containers
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns true if there are no containers
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}
