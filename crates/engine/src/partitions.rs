//! Application partitions
//!
//! Applications are deployed with a fixed partition count, then partitions
//! are deployed by ID. A processor borrows a partition for its kind: at
//! most one command, one query and one actualizer processor hold the same
//! partition at a time. The borrow ends when the handle is released or
//! dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use appstruct_appdef::AppDef;
use appstruct_core::{AppQName, PartitionID};

use crate::error::{Error, ErrorKind, Result};
use crate::structs::{AppStructs, AppStructsProvider};

/// Kind of processor borrowing a partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorKind {
    /// Command processor
    Command,
    /// Query processor
    Query,
    /// Projection actualizer
    Actualizer,
}

impl ProcessorKind {
    fn index(self) -> usize {
        match self {
            ProcessorKind::Command => 0,
            ProcessorKind::Query => 1,
            ProcessorKind::Actualizer => 2,
        }
    }
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug)]
struct DeployedApp {
    def: Arc<AppDef>,
    parts_count: usize,
    parts: HashMap<PartitionID, [bool; 3]>,
}

type Apps = Arc<RwLock<HashMap<AppQName, DeployedApp>>>;

fn app_not_found(name: &AppQName) -> Error {
    Error::new(ErrorKind::AppNotFound, format!("application «{}» is not deployed", name))
}

/// Deployed applications and their partitions
pub struct AppPartitions {
    apps: Apps,
    structs: Arc<AppStructsProvider>,
}

impl fmt::Debug for AppPartitions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppPartitions")
            .field("apps", &self.apps.read().len())
            .finish()
    }
}

impl AppPartitions {
    /// No deployed applications
    pub fn new(structs: Arc<AppStructsProvider>) -> Self {
        AppPartitions {
            apps: Arc::new(RwLock::new(HashMap::new())),
            structs,
        }
    }

    /// Deploy or redeploy an application. Deployed partitions stay.
    pub fn deploy_app(&self, name: AppQName, def: Arc<AppDef>, parts_count: usize) {
        let mut apps = self.apps.write();
        info!(target: "appstruct::parts", app = %name, parts_count, "App deployed");
        match apps.get_mut(&name) {
            Some(app) => {
                app.def = def;
                app.parts_count = parts_count;
            }
            None => {
                apps.insert(
                    name,
                    DeployedApp {
                        def,
                        parts_count,
                        parts: HashMap::new(),
                    },
                );
            }
        }
    }

    /// Deploy partitions of an application; deployed ones are kept
    ///
    /// # Errors
    ///
    /// `AppNotFound` for an undeployed application, `PartitionNotFound`
    /// for an ID outside the partition count. Nothing is deployed then.
    pub fn deploy_app_partitions(&self, name: &AppQName, ids: &[PartitionID]) -> Result<()> {
        let mut apps = self.apps.write();
        let app = apps.get_mut(name).ok_or_else(|| app_not_found(name))?;
        if let Some(id) = ids.iter().find(|id| usize::from(**id) >= app.parts_count) {
            return Err(Error::new(
                ErrorKind::PartitionNotFound,
                format!("application «{}» has {} partitions, got partition {}", name, app.parts_count, id),
            ));
        }
        for id in ids {
            app.parts.entry(*id).or_default();
        }
        info!(target: "appstruct::parts", app = %name, partitions = ids.len(), "App partitions deployed");
        Ok(())
    }

    /// Definition of a deployed application
    ///
    /// # Errors
    ///
    /// `AppNotFound` for an undeployed application.
    pub fn app_def(&self, name: &AppQName) -> Result<Arc<AppDef>> {
        let apps = self.apps.read();
        let app = apps.get(name).ok_or_else(|| app_not_found(name))?;
        Ok(Arc::clone(&app.def))
    }

    /// Declared partition count of a deployed application
    ///
    /// # Errors
    ///
    /// `AppNotFound` for an undeployed application.
    pub fn app_parts_count(&self, name: &AppQName) -> Result<usize> {
        let apps = self.apps.read();
        let app = apps.get(name).ok_or_else(|| app_not_found(name))?;
        Ok(app.parts_count)
    }

    /// Borrow a deployed partition for a processor
    ///
    /// # Errors
    ///
    /// `AppNotFound`, `PartitionNotFound` for an undeployed partition,
    /// `PartitionBusy` if a processor of the same kind holds it.
    pub fn borrow(&self, name: &AppQName, part: PartitionID, kind: ProcessorKind) -> Result<BorrowedPartition> {
        let structs = self.structs.app_structs(name)?;
        let mut apps = self.apps.write();
        let app = apps.get_mut(name).ok_or_else(|| app_not_found(name))?;
        let def = Arc::clone(&app.def);
        let busy = app.parts.get_mut(&part).ok_or_else(|| {
            Error::new(
                ErrorKind::PartitionNotFound,
                format!("partition {} of application «{}» is not deployed", part, name),
            )
        })?;
        if busy[kind.index()] {
            return Err(Error::new(
                ErrorKind::PartitionBusy,
                format!("partition {} of application «{}» is borrowed by a {} processor", part, name, kind),
            ));
        }
        busy[kind.index()] = true;
        debug!(target: "appstruct::parts", app = %name, part, %kind, "Partition borrowed");
        Ok(BorrowedPartition {
            apps: Arc::clone(&self.apps),
            app: name.clone(),
            part,
            kind,
            def,
            structs,
        })
    }
}

/// Partition held by a processor
///
/// Released once, by [`BorrowedPartition::release`] or on drop.
pub struct BorrowedPartition {
    apps: Apps,
    app: AppQName,
    part: PartitionID,
    kind: ProcessorKind,
    def: Arc<AppDef>,
    structs: Arc<AppStructs>,
}

impl fmt::Debug for BorrowedPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BorrowedPartition")
            .field("app", &self.app)
            .field("part", &self.part)
            .field("kind", &self.kind)
            .finish()
    }
}

impl BorrowedPartition {
    /// Application name
    pub fn app(&self) -> &AppQName {
        &self.app
    }

    /// Partition ID
    pub fn partition(&self) -> PartitionID {
        self.part
    }

    /// Processor kind holding the partition
    pub fn kind(&self) -> ProcessorKind {
        self.kind
    }

    /// Application definition at borrow time
    pub fn app_def(&self) -> &Arc<AppDef> {
        &self.def
    }

    /// Application structures
    pub fn app_structs(&self) -> &Arc<AppStructs> {
        &self.structs
    }

    /// Give the partition back
    pub fn release(self) {}
}

impl Drop for BorrowedPartition {
    fn drop(&mut self) {
        let mut apps = self.apps.write();
        if let Some(busy) = apps.get_mut(&self.app).and_then(|a| a.parts.get_mut(&self.part)) {
            busy[self.kind.index()] = false;
        }
        debug!(target: "appstruct::parts", app = %self.app, part = self.part, kind = %self.kind, "Partition released");
    }
}
