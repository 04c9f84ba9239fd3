use std::path::Path;

use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::field::Field;
use crate::node::NodeObservation;
use crate::registry::{Record, Registry};
use crate::root::RootObservation;
use crate::scheduler::PendingPulse;

/// A read-only snapshot of what a field is doing.
///
/// Design intent:
/// - Observers cannot mutate or steer the field.
/// - Snapshotting is *on-demand* and allocates; stepping is unaffected.
#[derive(Debug, Clone, Serialize)]
pub struct FieldSnapshot {
    pub tick: u64,
    pub pending: Vec<PendingPulse>,
    pub nodes: Vec<NodeObservation>,
    pub roots: Vec<RootObservation>,
}

pub struct FieldAdapter<'a> {
    field: &'a Field,
}

impl<'a> FieldAdapter<'a> {
    pub fn new(field: &'a Field) -> Self {
        Self { field }
    }

    /// `include_logs` adds node traces and root activity logs.
    pub fn snapshot(&self, include_logs: bool) -> FieldSnapshot {
        FieldSnapshot {
            tick: self.field.tick(),
            pending: self.field.pending().cloned().collect(),
            nodes: self
                .field
                .nodes()
                .map(|(_, n)| n.observe(include_logs))
                .collect(),
            roots: self
                .field
                .roots()
                .map(|(_, r)| r.observe(include_logs))
                .collect(),
        }
    }

    pub fn registry(&self) -> Option<RegistryView<'a>> {
        self.field.registry().map(RegistryView::new)
    }
}

/// The registry surface handed to presentation layers.
///
/// Lookups, enumeration and export only; there is no path from here to a
/// mutating call.
#[derive(Clone, Copy)]
pub struct RegistryView<'a> {
    registry: &'a Registry,
}

impl<'a> RegistryView<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    pub fn all_records(&self) -> Vec<&'a Record> {
        self.registry.all_records()
    }

    pub fn all_labels(&self) -> Vec<&'a str> {
        self.registry.all_labels()
    }

    pub fn get_by_label(&self, label: &str) -> Option<&'a Record> {
        self.registry.get_by_label(label)
    }

    pub fn get_by_id(&self, id: &Uuid) -> Option<&'a Record> {
        self.registry.get_by_id(id)
    }

    pub fn search_by_owner(&self, owner: &str) -> Vec<&'a Record> {
        self.registry.search_by_owner(owner)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn export(&self, path: &Path) -> Result<()> {
        self.registry.export(path)
    }
}
