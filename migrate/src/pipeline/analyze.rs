//! Field Data Analyzer
//!
//! Each field gets a record total, a count of records where it is set and up to
//! five sample values. A failure on one field is stored against that field and
//! analysis moves on.

use tracing::{debug, info, warn};

use super::model::{
    AnalysisOutcome, FieldAnalysis, FieldDescriptor, FieldReport, MAX_SAMPLES, MigrationReport,
};
use crate::customizations::Customizations;
use crate::error::Result;
use crate::remote::{Domain, RemoteApi, is_truthy};

/// Measure one field
///
/// A model with no records short-circuits before the sampling query.
pub fn analyze_field(remote: &dyn RemoteApi, field: &FieldDescriptor) -> Result<FieldAnalysis> {
    let total = remote.count(&field.model, &Domain::all())?;
    if total == 0 {
        debug!("{}: model has no records", field.qualified_name());
        return Ok(FieldAnalysis::empty());
    }

    let is_set = Domain::is_set(field.name.as_str());
    let non_null = remote.count(&field.model, &is_set)?;

    let sample_ids = remote.search(&field.model, &is_set, Some(MAX_SAMPLES))?;
    let samples = if sample_ids.is_empty() {
        Vec::new()
    } else {
        remote
            .read(&field.model, &sample_ids, &[field.name.as_str()])?
            .into_iter()
            .filter_map(|mut record| record.remove(&field.name))
            .filter(is_truthy)
            .collect()
    };

    FieldAnalysis::new(total, non_null, samples)
}

/// Analyze every field in order and assemble the report
///
/// `on_field` sees each entry as it is produced, with its 1-based position.
pub fn analyze_fields(
    remote: &dyn RemoteApi,
    fields: Vec<FieldDescriptor>,
    customizations: Customizations,
    mut on_field: impl FnMut(usize, usize, &FieldReport),
) -> MigrationReport {
    let total = fields.len();
    let mut reports = Vec::with_capacity(total);

    for (index, descriptor) in fields.into_iter().enumerate() {
        let analysis = match analyze_field(remote, &descriptor) {
            Ok(analysis) => AnalysisOutcome::Measured(analysis),
            Err(report) => {
                warn!("Analysis of {} failed: {report:?}", descriptor.qualified_name());
                AnalysisOutcome::Failed {
                    error: report.current_context().to_string(),
                }
            },
        };
        let entry = FieldReport {
            descriptor,
            analysis,
        };
        on_field(index + 1, total, &entry);
        reports.push(entry);
    }

    let report = MigrationReport::new(reports, customizations);
    let summary = &report.summary;
    info!(
        "Analyzed {} fields: {} with data, {} without, {} failed",
        summary.total_studio_fields,
        summary.fields_with_data,
        summary.fields_without_data,
        summary.fields_with_errors
    );
    report
}
