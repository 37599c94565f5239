//! The field-migration pipeline: discover, analyze, generate, clean up
//!
//! Stages communicate through `MigrationReport` and `BackupRecord`, either in
//! process through `workflow` or via the JSON artifacts in `artifacts`.

pub mod analyze;
pub mod artifacts;
pub mod cleanup;
pub mod discover;
pub mod generate;
pub mod model;
pub mod workflow;
