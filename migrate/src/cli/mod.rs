//! Command-line surface
//!
//! Every stage is its own subcommand so a run can be resumed from the
//! artifacts on disk; `workflow` chains them in one process.

mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub use commands::run;

use crate::config::MigrationSettings;
use crate::logging::TracingLevel;

#[derive(Parser, Debug)]
#[command(name = "studio-migrate")]
#[command(about = "Move Odoo Studio fields into a versioned module", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Instance name; selects `~/.odoo_config/{instance}.conf`
    #[arg(long, global = true, default_value = "default")]
    pub instance: String,

    /// Trace log verbosity
    #[arg(long, global = true, value_enum, default_value_t = TracingLevel::Warn)]
    pub log_level: TracingLevel,

    #[command(flatten)]
    pub settings: SettingsArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Authenticate and show who we are connected as
    TestConnection,
    /// List custom fields matching the Studio prefix
    Discover,
    /// Measure each field's data and save the analysis report
    Analyze,
    /// Build the replacement module from the saved report
    Generate,
    /// Back up, confirm and remove the Studio field definitions
    Cleanup,
    /// Show what `cleanup` would remove, without changing anything
    DryRun,
    /// Re-check stored data against the saved report
    Verify,
    /// List Studio views and reports
    Customizations,
    /// Set vendor/customer ranks from reference codes
    ClassifyContacts {
        /// Write the changes (still asks for confirmation)
        #[arg(long)]
        execute: bool,
    },
    /// Run every stage in one process
    Workflow,
}

/// Overrides for the pipeline defaults
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// Field name prefix that marks Studio fields
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    /// Field names never migrated or removed (repeatable)
    #[arg(long = "deny", global = true)]
    pub deny_list: Vec<String>,

    /// Analysis report location
    #[arg(long, global = true)]
    pub report: Option<PathBuf>,

    /// Field backup location
    #[arg(long, global = true)]
    pub backup: Option<PathBuf>,

    /// Technical name of the generated module
    #[arg(long, global = true)]
    pub module_name: Option<String>,

    /// Directory the module is written into
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Version written to the module manifest
    #[arg(long, global = true)]
    pub module_version: Option<String>,

    /// Modules the generated module depends on (repeatable); owning modules
    /// found during discovery are added to these
    #[arg(long = "depends", global = true)]
    pub depends: Vec<String>,
}

impl SettingsArgs {
    /// Defaults with any given overrides applied
    pub fn into_settings(self) -> MigrationSettings {
        let mut settings = MigrationSettings::default();
        if let Some(prefix) = self.prefix {
            settings.field_prefix = prefix;
        }
        if !self.deny_list.is_empty() {
            settings.deny_list = self.deny_list;
        }
        if let Some(report) = self.report {
            settings.report_path = report;
        }
        if let Some(backup) = self.backup {
            settings.backup_path = backup;
        }
        if let Some(module_name) = self.module_name {
            settings.module_name = module_name;
        }
        if let Some(output_dir) = self.output_dir {
            settings.output_dir = output_dir;
        }
        if let Some(module_version) = self.module_version {
            settings.module_version = module_version;
        }
        if !self.depends.is_empty() {
            settings.depends = self.depends;
        }
        settings
    }
}
