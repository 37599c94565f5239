//! End-to-end pipeline run
//!
//! Each stage consumes the previous stage's value and returns the next one, so
//! analysis results flow into generation and verification without a file
//! round-trip.
//! The report is still persisted along the way for the standalone commands.

use std::path::PathBuf;

use tracing::info;

use super::analyze::analyze_fields;
use super::artifacts::save_json;
use super::cleanup::{CleanupRun, DeletionPlan, DeletionReport, VerificationReport};
use super::discover::{FieldPredicate, discover_fields};
use super::generate::{Generation, ModuleOptions, generate_module};
use super::model::{FieldDescriptor, FieldReport, MigrationReport};
use crate::config::MigrationSettings;
use crate::confirmation::ConfirmationGate;
use crate::customizations::Customizations;
use crate::error::Result;
use crate::remote::RemoteApi;
use crate::storage::StorageProbe;

/// Collaborators shared by every stage of one run
pub struct Pipeline<'a> {
    pub remote:   &'a dyn RemoteApi,
    pub probe:    &'a dyn StorageProbe,
    pub settings: &'a MigrationSettings,
}

/// Fields found by the Discoverer
pub struct Discovered<'a> {
    pipeline: &'a Pipeline<'a>,
    pub fields: Vec<FieldDescriptor>,
}

/// Report produced by the Analyzer and saved to the report path
pub struct Analyzed<'a> {
    pipeline:   &'a Pipeline<'a>,
    pub report: MigrationReport,
}

/// Report plus the module written for it, if one was needed
pub struct Generated<'a> {
    pipeline:       &'a Pipeline<'a>,
    pub report:     MigrationReport,
    pub module_dir: Option<PathBuf>,
}

/// How the destructive phase ended
#[derive(Debug)]
pub enum CleanedUp {
    /// The generated module was not confirmed as installed; nothing was touched
    ModuleNotInstalled,
    /// Operator did not answer `yes`; nothing was deleted
    Declined,
    /// Deletion ran; failures are listed in `deletion`
    Completed {
        deletion:     DeletionReport,
        verification: VerificationReport,
    },
}

impl<'a> Pipeline<'a> {
    pub const fn new(
        remote: &'a dyn RemoteApi,
        probe: &'a dyn StorageProbe,
        settings: &'a MigrationSettings,
    ) -> Self {
        Self {
            remote,
            probe,
            settings,
        }
    }

    fn predicate(&self) -> FieldPredicate {
        FieldPredicate::from_settings(self.settings)
    }

    pub fn discover(&'a self) -> Result<Discovered<'a>> {
        let fields = discover_fields(self.remote, &self.predicate())?;
        Ok(Discovered {
            pipeline: self,
            fields,
        })
    }
}

impl<'a> Discovered<'a> {
    /// Analyze every discovered field and persist the report
    pub fn analyze(self, on_field: impl FnMut(usize, usize, &FieldReport)) -> Result<Analyzed<'a>> {
        let pipeline = self.pipeline;
        let customizations = Customizations::discover(pipeline.remote)?;
        let report = analyze_fields(pipeline.remote, self.fields, customizations, on_field);
        save_json(&pipeline.settings.report_path, &report)?;
        Ok(Analyzed { pipeline, report })
    }
}

impl<'a> Analyzed<'a> {
    /// Generate and write the module; skipped when no field holds data
    pub fn generate(self) -> Result<Generated<'a>> {
        let settings = self.pipeline.settings;
        let options = ModuleOptions::from_settings(settings);
        let module_dir = match generate_module(&self.report, &options)? {
            Generation::NoModuleNeeded => None,
            Generation::Module(module) => Some(module.write_to(&settings.output_dir)?),
        };
        Ok(Generated {
            pipeline: self.pipeline,
            report: self.report,
            module_dir,
        })
    }
}

impl Generated<'_> {
    /// Back up, plan, confirm, delete and verify
    ///
    /// When a module was written the operator must first confirm it is
    /// installed; the run ends here otherwise. Candidates are rediscovered at
    /// that point, so definitions the module already took over are left alone.
    pub fn clean_up(
        self,
        gate: &mut dyn ConfirmationGate,
        mut on_plan: impl FnMut(&DeletionPlan),
    ) -> Result<CleanedUp> {
        let pipeline = self.pipeline;
        if let Some(module_dir) = &self.module_dir {
            let prompt = format!(
                "Is the module at {} installed on the server?",
                module_dir.display()
            );
            if !gate.confirm(&prompt)? {
                info!("Stopping after generation, module not confirmed as installed");
                return Ok(CleanedUp::ModuleNotInstalled);
            }
        }

        let mut run = CleanupRun::discover(pipeline.remote, &pipeline.predicate())?;
        run.back_up(&pipeline.settings.backup_path)?;
        on_plan(run.dry_run()?);

        if !run.confirm(gate)? {
            return Ok(CleanedUp::Declined);
        }
        let deletion = run.delete(|_, _| {})?;
        let verification = run.verify(&self.report, pipeline.probe)?;
        info!(
            "Workflow finished: {} of {} removed, {} integrity violations",
            deletion.succeeded,
            deletion.attempted,
            verification.violations.len()
        );
        Ok(CleanedUp::Completed {
            deletion,
            verification,
        })
    }
}
