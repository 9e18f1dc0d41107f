//! Projectors
//!
//! A projector reacts to events. Each trigger names a type and the kinds of
//! events on it the projector wants.

use std::collections::BTreeSet;
use std::fmt;

use appstruct_core::QName;

use crate::type_kind::TypeKind;
use crate::types::TypeBase;

/// Kind of event a projector reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProjectorEventKind {
    /// Record created
    Insert,
    /// Record updated
    Update,
    /// Record activated
    Activate,
    /// Record deactivated
    Deactivate,
    /// Command executed
    Execute,
    /// Command executed with a parameter of the type
    ExecuteWithParam,
}

impl ProjectorEventKind {
    /// Event kinds that apply to records
    pub const RECORD: [ProjectorEventKind; 4] = [
        ProjectorEventKind::Insert,
        ProjectorEventKind::Update,
        ProjectorEventKind::Activate,
        ProjectorEventKind::Deactivate,
    ];

    /// Returns true if the event kind applies to a type of `kind`
    pub fn applies_to(self, kind: TypeKind) -> bool {
        match self {
            ProjectorEventKind::Insert | ProjectorEventKind::Update => kind.is_record(),
            ProjectorEventKind::Activate | ProjectorEventKind::Deactivate => kind.has_is_active(),
            ProjectorEventKind::Execute => kind == TypeKind::Command,
            ProjectorEventKind::ExecuteWithParam => {
                matches!(kind, TypeKind::ODoc | TypeKind::Object)
            }
        }
    }

    /// Event kinds assumed when a trigger lists none
    pub fn defaults_for(kind: TypeKind) -> Vec<ProjectorEventKind> {
        match kind {
            TypeKind::Command => vec![ProjectorEventKind::Execute],
            TypeKind::ODoc | TypeKind::Object => vec![ProjectorEventKind::ExecuteWithParam],
            k if k.has_is_active() => Self::RECORD.to_vec(),
            k if k.is_record() => vec![ProjectorEventKind::Insert, ProjectorEventKind::Update],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for ProjectorEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One trigger of a projector
#[derive(Debug, Clone)]
pub struct ProjectorEvent {
    pub(crate) on: QName,
    pub(crate) kinds: BTreeSet<ProjectorEventKind>,
}

impl ProjectorEvent {
    /// Triggering type
    pub fn on(&self) -> &QName {
        &self.on
    }

    /// Event kinds
    pub fn kinds(&self) -> impl Iterator<Item = ProjectorEventKind> + '_ {
        self.kinds.iter().copied()
    }

    /// Returns true if the trigger reacts to the kind
    pub fn has_kind(&self, kind: ProjectorEventKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// A projector
#[derive(Debug, Clone)]
pub struct Projector {
    pub(crate) base: TypeBase,
    pub(crate) sync: bool,
    pub(crate) events: Vec<ProjectorEvent>,
}

impl Projector {
    pub(crate) fn new(base: TypeBase) -> Self {
        Projector {
            base,
            sync: false,
            events: Vec::new(),
        }
    }

    /// Projector name
    pub fn name(&self) -> &QName {
        &self.base.name
    }

    /// Comment
    pub fn comment(&self) -> &str {
        &self.base.comment
    }

    /// Returns true if the projector runs in the command's transaction
    pub fn is_sync(&self) -> bool {
        self.sync
    }

    /// Triggers in declaration order
    pub fn events(&self) -> &[ProjectorEvent] {
        &self.events
    }

    /// Trigger on the type, if any
    pub fn event(&self, on: &QName) -> Option<&ProjectorEvent> {
        self.events.iter().find(|e| &e.on == on)
    }
}

impl fmt::Display for Projector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Projector «{}»", self.base.name)
    }
}
