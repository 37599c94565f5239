use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::backup::BackupRecord;
use crate::error::Result;
use crate::pipeline::model::FieldDescriptor;
use crate::remote::{RecordId, RemoteApi};

/// One field definition scheduled for removal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedDeletion {
    pub field_id: RecordId,
    pub model:    String,
    pub name:     String,
}

impl PlannedDeletion {
    fn from_descriptor(field: &FieldDescriptor) -> Self {
        Self {
            field_id: field.id,
            model:    field.model.clone(),
            name:     field.name.clone(),
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.model, self.name)
    }
}

/// The exact set of deletions a run will perform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionPlan {
    pub run_id:  Option<Uuid>,
    pub entries: Vec<PlannedDeletion>,
}

impl DeletionPlan {
    /// Candidates covered by `backup` for `run_id`; nothing else is ever planned
    pub fn for_run(candidates: &[FieldDescriptor], backup: &BackupRecord, run_id: Uuid) -> Self {
        Self {
            run_id:  Some(run_id),
            entries: candidates
                .iter()
                .filter(|field| backup.covers(run_id, field.id))
                .map(PlannedDeletion::from_descriptor)
                .collect(),
        }
    }

    /// What a run would plan for these candidates once backed up
    pub fn preview(candidates: &[FieldDescriptor]) -> Self {
        Self {
            run_id:  None,
            entries: candidates.iter().map(PlannedDeletion::from_descriptor).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A deletion that did not go through
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionFailure {
    pub field: PlannedDeletion,
    pub error: String,
}

/// Outcome of the delete loop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures:  Vec<DeletionFailure>,
}

/// Delete each planned entry in turn; a failure is recorded and the loop moves on
///
/// A precondition miss is not per-field: the remote cannot delete safely at all,
/// so the loop stops there and the error is returned.
pub fn execute_plan(
    remote: &dyn RemoteApi,
    plan: &DeletionPlan,
    mut on_entry: impl FnMut(&PlannedDeletion, Option<&str>),
) -> Result<DeletionReport> {
    let mut report = DeletionReport::default();
    for entry in &plan.entries {
        let outcome = match remote.delete_metadata(entry.field_id) {
            Ok(true) => Ok(()),
            Ok(false) => Err("nothing was removed".to_string()),
            Err(error) if error.current_context().is_precondition() => {
                warn!(
                    "Stopping before {}: {}",
                    entry.qualified_name(),
                    error.current_context()
                );
                return Err(error);
            },
            Err(error) => Err(error.current_context().to_string()),
        };
        report.attempted += 1;
        match outcome {
            Ok(()) => {
                report.succeeded += 1;
                on_entry(entry, None);
            },
            Err(error) => {
                warn!("Failed to remove {}: {error}", entry.qualified_name());
                on_entry(entry, Some(&error));
                report.failures.push(DeletionFailure {
                    field: entry.clone(),
                    error,
                });
            },
        }
    }
    info!(
        "Removed {} of {} field definitions",
        report.succeeded, report.attempted
    );
    Ok(report)
}
