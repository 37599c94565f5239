//! Cleanup Executor
//!
//! A run walks `Discovered → BackedUp → DryRunValidated → Confirmed → Deleted →
//! Verified` and each step checks that the previous one completed. Deletion
//! only ever touches fields captured in this run's backup.

mod backup;
mod plan;
mod verify;

use std::path::Path;

use error_stack::Report;
use strum::Display;
use tracing::info;
use uuid::Uuid;

pub use backup::{BackedUpField, BackupRecord};
pub use plan::{DeletionFailure, DeletionPlan, DeletionReport, PlannedDeletion, execute_plan};
pub use verify::{IntegrityViolation, VerificationReport, ViolationKind, verify_integrity};

use super::artifacts::save_json;
use super::discover::{FieldPredicate, discover_fields};
use super::model::{FieldDescriptor, MigrationReport};
use crate::confirmation::ConfirmationGate;
use crate::error::{Error, Result};
use crate::remote::RemoteApi;
use crate::storage::StorageProbe;

/// Where a cleanup run stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CleanupState {
    Discovered,
    BackedUp,
    DryRunValidated,
    Confirmed,
    Deleted,
    Verified,
}

/// One pass of the Cleanup Executor against one remote system
pub struct CleanupRun<'a> {
    remote:     &'a dyn RemoteApi,
    run_id:     Uuid,
    state:      CleanupState,
    candidates: Vec<FieldDescriptor>,
    backup:     Option<BackupRecord>,
    plan:       Option<DeletionPlan>,
}

impl<'a> CleanupRun<'a> {
    /// Start a run by discovering the current candidates
    pub fn discover(remote: &'a dyn RemoteApi, predicate: &FieldPredicate) -> Result<Self> {
        let candidates = discover_fields(remote, predicate)?;
        Ok(Self::from_candidates(remote, candidates))
    }

    /// Start a run over an already discovered candidate set
    pub fn from_candidates(remote: &'a dyn RemoteApi, candidates: Vec<FieldDescriptor>) -> Self {
        let run_id = Uuid::new_v4();
        info!("Cleanup run {run_id} starts with {} candidates", candidates.len());
        Self {
            remote,
            run_id,
            state: CleanupState::Discovered,
            candidates,
            backup: None,
            plan: None,
        }
    }

    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub const fn state(&self) -> CleanupState {
        self.state
    }

    pub fn candidates(&self) -> &[FieldDescriptor] {
        &self.candidates
    }

    /// Capture and persist full metadata for every candidate
    ///
    /// Nothing is kept unless the file was written.
    pub fn back_up(&mut self, path: &Path) -> Result<&BackupRecord> {
        self.expect_state(CleanupState::Discovered, "back up")?;
        let record = BackupRecord::capture(self.remote, self.run_id, &self.candidates)?;
        save_json(path, &record)?;
        info!("Backup of {} fields saved to {}", record.fields.len(), path.display());
        self.state = CleanupState::BackedUp;
        Ok(self.backup.insert(record))
    }

    /// Compute exactly what `delete` will remove; no remote call is made
    pub fn dry_run(&mut self) -> Result<&DeletionPlan> {
        self.expect_state(CleanupState::BackedUp, "dry run")?;
        let backup = self.require_backup()?;
        let plan = DeletionPlan::for_run(&self.candidates, backup, self.run_id);
        self.state = CleanupState::DryRunValidated;
        Ok(self.plan.insert(plan))
    }

    /// Ask the operator; a refusal leaves the run where it was
    pub fn confirm(&mut self, gate: &mut dyn ConfirmationGate) -> Result<bool> {
        self.expect_state(CleanupState::DryRunValidated, "confirm")?;
        let count = self.plan.as_ref().map_or(0, DeletionPlan::len);
        let prompt = format!(
            "This will remove {count} field definitions from the remote system. Continue?"
        );
        if gate.confirm(&prompt)? {
            self.state = CleanupState::Confirmed;
            Ok(true)
        } else {
            info!("Operator declined cleanup run {}", self.run_id);
            Ok(false)
        }
    }

    /// Remove each planned field definition, isolating failures per field
    pub fn delete(
        &mut self,
        on_entry: impl FnMut(&PlannedDeletion, Option<&str>),
    ) -> Result<DeletionReport> {
        self.expect_state(CleanupState::Confirmed, "delete")?;
        self.require_backup()?;
        let plan = self.plan.as_ref().ok_or_else(|| {
            Report::new(Error::InvalidState("no deletion plan for this run".to_string()))
        })?;
        let report = execute_plan(self.remote, plan, on_entry)?;
        self.state = CleanupState::Deleted;
        Ok(report)
    }

    /// Compare storage against the analysis taken before deletion
    pub fn verify(
        &mut self,
        report: &MigrationReport,
        probe: &dyn StorageProbe,
    ) -> Result<VerificationReport> {
        self.expect_state(CleanupState::Deleted, "verify")?;
        let result = verify_integrity(report, probe);
        self.state = CleanupState::Verified;
        Ok(result)
    }

    fn expect_state(&self, expected: CleanupState, step: &str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Report::new(Error::InvalidState(format!(
                "cannot {step} from state {}, expected {expected}",
                self.state
            ))))
        }
    }

    fn require_backup(&self) -> Result<&BackupRecord> {
        self.backup
            .as_ref()
            .filter(|backup| backup.run_id == self.run_id)
            .ok_or_else(|| {
                Report::new(Error::InvalidState(format!(
                    "no backup captured in run {}",
                    self.run_id
                )))
            })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, reason = "tests panic on setup failure")]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::MigrationSettings;
    use crate::confirmation::ScriptedGate;
    use crate::customizations::Customizations;
    use crate::pipeline::analyze::analyze_fields;
    use crate::pipeline::artifacts::load_backup;
    use crate::remote::constants::MODEL_FIELDS;
    use crate::remote::fake::InMemoryRemote;

    fn predicate() -> FieldPredicate {
        FieldPredicate::from_settings(&MigrationSettings::default())
    }

    fn studio_field(remote: &InMemoryRemote, model: &str, name: &str) -> i64 {
        remote.insert(
            MODEL_FIELDS,
            json!({"model": model, "name": name, "ttype": "char", "state": "manual",
                   "required": false, "readonly": false, "store": true,
                   "field_description": name}),
        )
    }

    fn seeded() -> (InMemoryRemote, Vec<i64>) {
        let remote = InMemoryRemote::new();
        let ids = vec![
            studio_field(&remote, "res.partner", "x_studio_tier"),
            studio_field(&remote, "res.partner", "x_studio_region"),
            studio_field(&remote, "sale.order", "x_studio_route"),
        ];
        remote.populate("res.partner", "x_studio_tier", 60, 50, &json!("gold"));
        remote.populate("sale.order", "x_studio_route", 4, 0, &json!(false));
        (remote, ids)
    }

    fn confirmed_run<'a>(remote: &'a InMemoryRemote, backup_path: &Path) -> CleanupRun<'a> {
        let mut run = CleanupRun::discover(remote, &predicate()).expect("discover");
        run.back_up(backup_path).expect("backup");
        run.dry_run().expect("dry run");
        assert!(run.confirm(&mut ScriptedGate::answering(&["yes"])).expect("confirm"));
        run
    }

    #[test]
    fn dry_run_matches_real_run_without_mutating() {
        let (remote, _) = seeded();
        let dir = tempfile::tempdir().expect("tempdir");
        let mut run = CleanupRun::discover(&remote, &predicate()).expect("discover");
        run.back_up(&dir.path().join("backup.json")).expect("backup");

        let planned: Vec<_> = run
            .dry_run()
            .expect("dry run")
            .entries
            .iter()
            .map(PlannedDeletion::qualified_name)
            .collect();
        assert_eq!(remote.mutations(), 0);
        assert_eq!(remote.call_count("delete", MODEL_FIELDS), 0);

        assert!(run.confirm(&mut ScriptedGate::answering(&["yes"])).expect("confirm"));
        let mut deleted = Vec::new();
        let report = run
            .delete(|entry, error| {
                assert!(error.is_none());
                deleted.push(entry.qualified_name());
            })
            .expect("delete");

        assert_eq!(deleted, planned);
        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 3);
        assert_eq!(remote.mutations(), 3);
    }

    #[test]
    fn backup_is_persisted_before_any_mutation() {
        let (remote, ids) = seeded();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("backup.json");
        let mut run = CleanupRun::discover(&remote, &predicate()).expect("discover");
        run.back_up(&path).expect("backup");

        let saved = load_backup(&path).expect("load backup");
        assert_eq!(saved.run_id, run.run_id());
        let mut saved_ids: Vec<_> = saved.fields.iter().map(|f| f.descriptor.id).collect();
        saved_ids.sort_unstable();
        assert_eq!(saved_ids, ids);
        assert_eq!(saved.fields[0].metadata.get("state"), Some(&json!("manual")));
        assert_eq!(remote.mutations(), 0);
    }

    #[test]
    fn failed_backup_blocks_the_run() {
        let (remote, _) = seeded();
        let dir = tempfile::tempdir().expect("tempdir");
        let unwritable = dir.path().join("missing").join("backup.json");
        let mut run = CleanupRun::discover(&remote, &predicate()).expect("discover");

        assert!(run.back_up(&unwritable).is_err());
        assert_eq!(run.state(), CleanupState::Discovered);
        assert!(run.backup.is_none());

        let error = run.dry_run().expect_err("no backup, no plan");
        assert!(matches!(error.current_context(), Error::InvalidState(_)));
        assert_eq!(remote.mutations(), 0);
    }

    #[test]
    fn steps_cannot_be_skipped_or_reordered() {
        let (remote, _) = seeded();
        let mut run = CleanupRun::discover(&remote, &predicate()).expect("discover");

        assert!(run.delete(|_, _| {}).is_err());
        assert!(run.confirm(&mut ScriptedGate::answering(&["yes"])).is_err());
        assert_eq!(run.state(), CleanupState::Discovered);
        assert_eq!(remote.call_count("delete", MODEL_FIELDS), 0);
    }

    #[test]
    fn anything_but_yes_aborts() {
        let (remote, _) = seeded();
        let dir = tempfile::tempdir().expect("tempdir");
        let mut run = CleanupRun::discover(&remote, &predicate()).expect("discover");
        run.back_up(&dir.path().join("backup.json")).expect("backup");
        run.dry_run().expect("dry run");

        let mut gate = ScriptedGate::answering(&["y"]);
        assert!(!run.confirm(&mut gate).expect("confirm"));
        assert_eq!(run.state(), CleanupState::DryRunValidated);
        assert!(gate.prompts[0].contains("remove 3 field definitions"));
        assert!(run.delete(|_, _| {}).is_err());
        assert_eq!(remote.mutations(), 0);
    }

    #[test]
    fn fields_outside_the_backup_are_never_planned() {
        let (remote, ids) = seeded();
        let candidates = discover_fields(&remote, &predicate()).expect("discover");
        let backup = BackupRecord::capture(&remote, Uuid::new_v4(), &candidates[..1])
            .expect("capture");

        let other_run = DeletionPlan::for_run(&candidates, &backup, Uuid::new_v4());
        assert!(other_run.is_empty());

        let same_run = DeletionPlan::for_run(&candidates, &backup, backup.run_id);
        assert_eq!(same_run.len(), 1);
        assert!(ids.contains(&same_run.entries[0].field_id));
    }

    #[test]
    fn one_failed_delete_does_not_stop_the_rest() {
        let (remote, ids) = seeded();
        remote.fail_delete(ids[1]);
        let dir = tempfile::tempdir().expect("tempdir");
        let mut run = confirmed_run(&remote, &dir.path().join("backup.json"));

        let report = run.delete(|_, _| {}).expect("delete");

        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].field.field_id, ids[1]);
        assert!(remote.contains(MODEL_FIELDS, ids[1]));
        assert!(!remote.contains(MODEL_FIELDS, ids[0]));
        assert_eq!(run.state(), CleanupState::Deleted);
    }

    #[test]
    fn no_safe_delete_path_stops_the_whole_run() {
        let (remote, ids) = seeded();
        remote.refuse_deletes();
        let dir = tempfile::tempdir().expect("tempdir");
        let mut run = confirmed_run(&remote, &dir.path().join("backup.json"));
        let mut seen = 0;

        let error = run.delete(|_, _| seen += 1).expect_err("refused");

        assert!(error.current_context().is_precondition());
        assert_eq!(seen, 0);
        assert_eq!(remote.call_count("delete", MODEL_FIELDS), 1);
        assert_eq!(remote.mutations(), 0);
        assert!(ids.iter().all(|id| remote.contains(MODEL_FIELDS, *id)));
        assert_eq!(run.state(), CleanupState::Confirmed);
    }

    #[test]
    fn verification_reports_lost_values() {
        let (remote, _) = seeded();
        let fields = discover_fields(&remote, &predicate()).expect("discover");
        let analysis = analyze_fields(&remote, fields, Customizations::default(), |_, _, _| {});
        let dir = tempfile::tempdir().expect("tempdir");
        let mut run = confirmed_run(&remote, &dir.path().join("backup.json"));
        run.delete(|_, _| {}).expect("delete");

        remote.clear_values("res.partner", "x_studio_tier", 5);
        let result = run.verify(&analysis, &remote).expect("verify");

        assert_eq!(run.state(), CleanupState::Verified);
        assert_eq!(result.checked, 1);
        assert_eq!(
            result.violations,
            vec![IntegrityViolation {
                model: "res.partner".to_string(),
                field: "x_studio_tier".to_string(),
                kind:  ViolationKind::CountMismatch {
                    expected: 50,
                    actual:   45,
                },
            }]
        );
        assert_eq!(
            result.violations[0].to_string(),
            "res.partner.x_studio_tier: data mismatch, expected=50, actual=45"
        );
    }

    #[test]
    fn verification_reports_missing_column_and_probe_failure() {
        let (remote, _) = seeded();
        remote.populate("sale.order", "x_studio_route", 3, 3, &json!("north"));
        let fields = discover_fields(&remote, &predicate()).expect("discover");
        let analysis = analyze_fields(&remote, fields, Customizations::default(), |_, _, _| {});
        assert_eq!(analysis.summary.fields_with_data, 2);

        remote.drop_column("res.partner", "x_studio_tier");
        remote.fail_probe("sale_order", "x_studio_route");
        let result = verify_integrity(&analysis, &remote);

        assert_eq!(result.checked, 2);
        assert!(!result.is_clean());
        assert_eq!(result.violations[0].kind, ViolationKind::ColumnMissing);
        assert!(matches!(
            result.violations[1].kind,
            ViolationKind::ProbeFailed { .. }
        ));
    }

    #[test]
    fn intact_storage_verifies_clean() {
        let (remote, _) = seeded();
        let fields = discover_fields(&remote, &predicate()).expect("discover");
        let analysis = analyze_fields(&remote, fields, Customizations::default(), |_, _, _| {});
        let result = verify_integrity(&analysis, &remote);
        assert!(result.is_clean());
        assert_eq!(result.intact, 1);
    }

    #[test]
    fn state_names_read_like_the_pipeline() {
        assert_eq!(CleanupState::DryRunValidated.to_string(), "DRY_RUN_VALIDATED");
        assert_eq!(CleanupState::BackedUp.to_string(), "BACKED_UP");
    }
}
