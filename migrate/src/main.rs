//! # Studio Migrate
//!
//! Moves Odoo Studio customizations into a versioned, installable module.
//!
//! The pipeline runs in four stages: discover the Studio fields, analyze which
//! of them hold data, generate a module that re-declares them natively, and
//! finally remove the Studio definitions while the stored data stays in place.
//! Each stage is a subcommand; the analysis report and field backup on disk
//! carry results from one stage to the next.

use std::process::ExitCode;

use clap::Parser;
use cli::Cli;

mod cli;
mod config;
mod confirmation;
mod contacts;
mod customizations;
mod error;
mod logging;
mod pipeline;
mod remote;
mod storage;

fn main() -> ExitCode {
    let cli = Cli::parse();
    cli.log_level.init_file_tracing();

    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) if report.current_context().is_precondition() => {
            eprintln!("{}", report.current_context());
            ExitCode::FAILURE
        },
        Err(report) => {
            tracing::error!("{report:?}");
            eprintln!("Error: {report:?}");
            ExitCode::FAILURE
        },
    }
}
