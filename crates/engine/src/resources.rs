//! Command and query functions registered by an application

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use appstruct_core::QName;

use crate::error::Result;
use crate::event::Event;
use crate::object::Object;

type CommandExec = Arc<dyn Fn(&Event) -> Result<()> + Send + Sync>;
type QueryExec = Arc<dyn Fn(&Object) -> Result<JsonValue> + Send + Sync>;

/// Command implementation
#[derive(Clone)]
pub struct CommandFunction {
    name: QName,
    exec: CommandExec,
}

impl CommandFunction {
    /// Create a command function
    pub fn new(name: QName, exec: impl Fn(&Event) -> Result<()> + Send + Sync + 'static) -> Self {
        CommandFunction {
            name,
            exec: Arc::new(exec),
        }
    }

    /// Command name
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Run the command on a built event
    pub fn exec(&self, event: &Event) -> Result<()> {
        (self.exec)(event)
    }
}

impl fmt::Debug for CommandFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandFunction").field("name", &self.name).finish()
    }
}

/// Query implementation
#[derive(Clone)]
pub struct QueryFunction {
    name: QName,
    exec: QueryExec,
}

impl QueryFunction {
    /// Create a query function
    pub fn new(name: QName, exec: impl Fn(&Object) -> Result<JsonValue> + Send + Sync + 'static) -> Self {
        QueryFunction {
            name,
            exec: Arc::new(exec),
        }
    }

    /// Query name
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Run the query with its argument object
    pub fn exec(&self, args: &Object) -> Result<JsonValue> {
        (self.exec)(args)
    }
}

impl fmt::Debug for QueryFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryFunction").field("name", &self.name).finish()
    }
}

/// Registered function
#[derive(Debug, Clone)]
pub enum Resource {
    /// Command
    Command(CommandFunction),
    /// Query
    Query(QueryFunction),
}

impl Resource {
    /// Function name
    pub fn name(&self) -> &QName {
        match self {
            Resource::Command(c) => c.name(),
            Resource::Query(q) => q.name(),
        }
    }
}

impl From<CommandFunction> for Resource {
    fn from(c: CommandFunction) -> Self {
        Resource::Command(c)
    }
}

impl From<QueryFunction> for Resource {
    fn from(q: QueryFunction) -> Self {
        Resource::Query(q)
    }
}

/// Functions by name
#[derive(Debug, Clone, Default)]
pub struct Resources {
    map: BTreeMap<QName, Resource>,
}

impl Resources {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function; a function with the same name is replaced
    pub fn add(&mut self, r: impl Into<Resource>) -> &mut Self {
        let r = r.into();
        self.map.insert(r.name().clone(), r);
        self
    }

    /// Function by name
    pub fn resource(&self, name: &QName) -> Option<&Resource> {
        self.map.get(name)
    }

    /// Command function by name
    pub fn command(&self, name: &QName) -> Option<&CommandFunction> {
        match self.map.get(name) {
            Some(Resource::Command(c)) => Some(c),
            _ => None,
        }
    }

    /// Query function by name
    pub fn query(&self, name: &QName) -> Option<&QueryFunction> {
        match self.map.get(name) {
            Some(Resource::Query(q)) => Some(q),
            _ => None,
        }
    }

    /// Names of the registered functions
    pub fn qnames(&self) -> impl Iterator<Item = &QName> {
        self.map.keys()
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
