//! Durable stage hand-off files
//!
//! Writes go to a temporary file in the target directory and are renamed into
//! place, so a reader never sees a partial artifact.

use std::io::Write;
use std::path::Path;

use error_stack::{Report, ResultExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::cleanup::BackupRecord;
use super::model::MigrationReport;
use crate::error::{Error, Result};

/// Serialize `value` as pretty JSON and atomically replace `path`
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut file = tempfile::NamedTempFile::new_in(directory)
        .change_context(Error::io_failed("create temporary file in", directory, "I/O error"))?;

    serde_json::to_writer_pretty(&mut file, value)
        .change_context(Error::io_failed("serialize", path, "JSON error"))?;
    file.write_all(b"\n")
        .and_then(|()| file.as_file().sync_all())
        .change_context(Error::io_failed("write", path, "I/O error"))?;

    file.persist(path)
        .map_err(|e| Report::new(Error::io_failed("persist", path, e.error)))?;

    debug!("Wrote {}", path.display());
    Ok(())
}

fn load_json<T: DeserializeOwned>(path: &Path, missing_hint: &str) -> Result<T> {
    if !path.exists() {
        return Err(Report::new(Error::precondition(format!(
            "{} not found - {missing_hint}",
            path.display()
        ))));
    }
    let contents = std::fs::read_to_string(path)
        .change_context(Error::io_failed("read", path, "I/O error"))?;
    serde_json::from_str(&contents).map_err(|e| Report::new(Error::io_failed("parse", path, e)))
}

/// Load a previously saved analysis report
pub fn load_report(path: &Path) -> Result<MigrationReport> {
    let report: MigrationReport = load_json(path, "run `analyze` first")?;
    report
        .check_consistency()
        .attach(format!("Report file: {}", path.display()))?;
    Ok(report)
}

/// Load a previously saved field backup
pub fn load_backup(path: &Path) -> Result<BackupRecord> {
    load_json(path, "no backup has been taken")
}
