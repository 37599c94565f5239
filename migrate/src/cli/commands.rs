use error_stack::Report;
use itertools::Itertools;
use tracing::info;

use super::{Cli, Command};
use crate::config::{ConnectionConfig, MigrationSettings};
use crate::confirmation::TerminalGate;
use crate::contacts::classify_contacts;
use crate::customizations::Customizations;
use crate::error::{Error, Result};
use crate::pipeline::analyze::analyze_fields;
use crate::pipeline::artifacts::{load_report, save_json};
use crate::pipeline::cleanup::{
    CleanupRun, DeletionPlan, DeletionReport, VerificationReport, verify_integrity,
};
use crate::pipeline::discover::{FieldPredicate, discover_fields};
use crate::pipeline::generate::{Generation, ModuleOptions, generate_module};
use crate::pipeline::model::{AnalysisOutcome, FieldReport, MigrationReport};
use crate::pipeline::workflow::{CleanedUp, Pipeline};
use crate::remote::{OdooClient, RecordAccess, RemoteApi};
use crate::storage::{DIRECT_STORAGE_REQUIRED, OrmStorageProbe, PgStorage, StorageProbe};

/// Execute the parsed command line
pub fn run(cli: Cli) -> Result<()> {
    let settings = cli.settings.into_settings();
    info!("Running {:?} against instance '{}'", cli.command, cli.instance);
    let session = || connect(&cli.instance);

    match cli.command {
        // Generation works offline from the saved report
        Command::Generate => generate(&settings),
        Command::TestConnection => test_connection(&session()?),
        Command::Discover => discover(&session()?, &settings),
        Command::Analyze => analyze(&session()?, &settings).map(|_| ()),
        Command::Cleanup => cleanup(&session()?, &settings),
        Command::DryRun => dry_run(&session()?, &settings),
        Command::Verify => verify(&session()?, &settings),
        Command::Customizations => customizations(&session()?),
        Command::ClassifyContacts { execute } => classify(&session()?, execute),
        Command::Workflow => workflow(&session()?, &settings),
    }
}

/// Log in, attaching a direct database connection when `pg_url` is configured
fn connect(instance: &str) -> Result<OdooClient> {
    let config = ConnectionConfig::load(instance)?;
    let client = OdooClient::connect(&config)?;
    match &config.pg_url {
        Some(url) => Ok(client.with_direct_storage(PgStorage::connect(url)?)),
        None => {
            info!("No pg_url configured, field definitions cannot be removed");
            Ok(client)
        },
    }
}

/// Run `f` against the direct database when attached, the ORM otherwise
fn with_probe<T>(client: &OdooClient, f: impl FnOnce(&dyn StorageProbe) -> T) -> T {
    match client.direct_storage() {
        Some(storage) => f(storage),
        None => {
            println!("No pg_url configured - columns cannot be checked through the ORM");
            f(&OrmStorageProbe::new(client))
        },
    }
}

fn test_connection(client: &OdooClient) -> Result<()> {
    let user = client.current_user()?;
    let version = client.server_version()?;
    println!("Connected to database '{}' as uid {}", client.database(), client.uid());
    let direct = if client.direct_storage().is_some() { "connected" } else { "not configured" };
    println!("Direct database: {direct}");
    println!(
        "User: {} ({})",
        user.text("name").unwrap_or("?"),
        user.text("login").unwrap_or("?")
    );
    if let Some(server) = version.get("server_version").and_then(|v| v.as_str()) {
        println!("Server version: {server}");
    }
    Ok(())
}

fn discover(remote: &dyn RemoteApi, settings: &MigrationSettings) -> Result<()> {
    let fields = discover_fields(remote, &FieldPredicate::from_settings(settings))?;
    if fields.is_empty() {
        println!("No fields found with prefix '{}'", settings.field_prefix);
        return Ok(());
    }
    for (model, group) in &fields.iter().chunk_by(|field| field.model.as_str()) {
        let group: Vec<_> = group.collect();
        println!("{model} ({}): {} fields", group[0].model_display_name, group.len());
        for field in group {
            println!("  {} [{}]", field.name, field.field_type);
        }
    }
    println!("Total: {} fields", fields.len());
    Ok(())
}

fn print_progress(index: usize, total: usize, field: &FieldReport) {
    let detail = match &field.analysis {
        AnalysisOutcome::Measured(analysis) => format!(
            "{}/{} records",
            analysis.non_null_values(),
            analysis.total_records()
        ),
        AnalysisOutcome::Failed { error } => format!("error: {error}"),
    };
    println!("[{index}/{total}] {}: {detail}", field.descriptor.qualified_name());
}

fn print_summary(report: &MigrationReport) {
    let summary = &report.summary;
    println!();
    println!("Studio fields:       {}", summary.total_studio_fields);
    println!("  with data:         {}", summary.fields_with_data);
    println!("  without data:      {}", summary.fields_without_data);
    println!("  analysis failed:   {}", summary.fields_with_errors);
    if !report.customizations.is_empty() {
        println!(
            "Studio views: {}, Studio reports: {}",
            report.customizations.views.len(),
            report.customizations.reports.len()
        );
    }
}

fn analyze(remote: &dyn RemoteApi, settings: &MigrationSettings) -> Result<MigrationReport> {
    let fields = discover_fields(remote, &FieldPredicate::from_settings(settings))?;
    let customizations = Customizations::discover(remote)?;
    let report = analyze_fields(remote, fields, customizations, print_progress);
    save_json(&settings.report_path, &report)?;
    print_summary(&report);
    println!("Report saved to {}", settings.report_path.display());
    Ok(report)
}

fn generate(settings: &MigrationSettings) -> Result<()> {
    let report = load_report(&settings.report_path)?;
    match generate_module(&report, &ModuleOptions::from_settings(settings))? {
        Generation::NoModuleNeeded => {
            println!("No Studio field holds data - no module needed");
        },
        Generation::Module(module) => {
            let path = module.write_to(&settings.output_dir)?;
            println!(
                "Generated module '{}' with {} fields across {} models at {}",
                module.name,
                module.field_count(),
                module.definitions.len(),
                path.display()
            );
        },
    }
    Ok(())
}

fn print_plan(plan: &DeletionPlan) {
    for entry in &plan.entries {
        println!("  would remove {} (id {})", entry.qualified_name(), entry.field_id);
    }
    println!("{} field definitions in the deletion set", plan.len());
}

fn print_deletion(report: &DeletionReport) {
    println!("Removed {} of {} field definitions", report.succeeded, report.attempted);
    for failure in &report.failures {
        println!("  failed: {} - {}", failure.field.qualified_name(), failure.error);
    }
}

fn print_verification(result: &VerificationReport) {
    println!(
        "Verified {} fields with data: {} intact",
        result.checked, result.intact
    );
    for violation in &result.violations {
        println!("  INTEGRITY VIOLATION {violation}");
    }
}

fn cleanup(client: &OdooClient, settings: &MigrationSettings) -> Result<()> {
    let Some(storage) = client.direct_storage() else {
        return Err(Report::new(Error::precondition(DIRECT_STORAGE_REQUIRED)));
    };
    let report = load_report(&settings.report_path)?;
    let mut run = CleanupRun::discover(client, &FieldPredicate::from_settings(settings))?;
    if run.candidates().is_empty() {
        println!("No Studio fields left to remove");
        return Ok(());
    }

    let backup = run.back_up(&settings.backup_path)?;
    println!(
        "Backed up {} fields to {}",
        backup.fields.len(),
        settings.backup_path.display()
    );
    print_plan(run.dry_run()?);

    println!("Make sure the generated module is installed before continuing.");
    if !run.confirm(&mut TerminalGate)? {
        println!("Cleanup cancelled - nothing was removed");
        return Ok(());
    }

    let deletion = run.delete(|entry, error| match error {
        None => println!("  removed {}", entry.qualified_name()),
        Some(error) => println!("  failed {}: {error}", entry.qualified_name()),
    })?;
    print_deletion(&deletion);
    print_verification(&run.verify(&report, storage)?);
    info!("Cleanup run {} ended in state {}", run.run_id(), run.state());
    Ok(())
}

fn dry_run(remote: &dyn RemoteApi, settings: &MigrationSettings) -> Result<()> {
    let fields = discover_fields(remote, &FieldPredicate::from_settings(settings))?;
    let plan = DeletionPlan::preview(&fields);
    if plan.is_empty() {
        println!("No Studio fields to remove");
        return Ok(());
    }
    print_plan(&plan);
    println!("Dry run - nothing was changed");
    Ok(())
}

fn verify(client: &OdooClient, settings: &MigrationSettings) -> Result<()> {
    let report = load_report(&settings.report_path)?;
    let result = with_probe(client, |probe| verify_integrity(&report, probe));
    print_verification(&result);
    if result.is_clean() {
        Ok(())
    } else {
        Err(Report::new(Error::InvalidState(format!(
            "{} integrity violations found",
            result.violations.len()
        ))))
    }
}

fn customizations(remote: &dyn RemoteApi) -> Result<()> {
    let found = Customizations::discover(remote)?;
    println!("Studio views: {}", found.views.len());
    for view in &found.views {
        println!("  [{}] {} ({}, {})", view.id, view.name, view.model, view.view_type);
    }
    println!("Possible Studio reports: {}", found.reports.len());
    for report in &found.reports {
        let signals = report.signals.iter().join(", ");
        println!("  [{}] {} ({}) - {signals}", report.id, report.name, report.model);
    }
    Ok(())
}

fn classify(remote: &dyn RemoteApi, execute: bool) -> Result<()> {
    let result = classify_contacts(remote, execute, &mut TerminalGate, |change, error| {
        match error {
            None => println!("  updated {} {} ({})", change.role, change.name, change.reference),
            Some(error) => println!("  failed {} ({}): {error}", change.name, change.reference),
        }
    })?;
    let verb = if result.applied { "updated" } else { "to update" };
    println!("Vendors:   {} found, {} {verb}", result.vendors_found, result.vendors_updated);
    println!("Customers: {} found, {} {verb}", result.customers_found, result.customers_updated);
    if !result.errors.is_empty() {
        println!("Errors: {}", result.errors.len());
    }
    if !result.applied && !execute {
        println!("Dry run - pass --execute to apply");
    }
    Ok(())
}

fn workflow(client: &OdooClient, settings: &MigrationSettings) -> Result<()> {
    let orm = OrmStorageProbe::new(client);
    let probe: &dyn StorageProbe = match client.direct_storage() {
        Some(storage) => storage,
        None => &orm,
    };
    let pipeline = Pipeline::new(client, probe, settings);
    let analyzed = pipeline.discover()?.analyze(print_progress)?;
    print_summary(&analyzed.report);

    let generated = analyzed.generate()?;
    match &generated.module_dir {
        Some(path) => println!("Module written to {}", path.display()),
        None => println!("No Studio field holds data - no module needed"),
    }
    if client.direct_storage().is_none() {
        println!("{DIRECT_STORAGE_REQUIRED}");
        println!("Stopping after generation - nothing was removed");
        return Ok(());
    }

    match generated.clean_up(&mut TerminalGate, print_plan)? {
        CleanedUp::ModuleNotInstalled => {
            println!("Install the module, then run `studio-migrate cleanup`");
        },
        CleanedUp::Declined => println!("Cleanup cancelled - nothing was removed"),
        CleanedUp::Completed {
            deletion,
            verification,
        } => {
            print_deletion(&deletion);
            print_verification(&verification);
        },
    }
    Ok(())
}
